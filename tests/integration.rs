//! Integration tests for context observation.

use context_observer::{
    ChangeBatch, ChangeNotification, ContextId, ContextObserver, EntityClass, EntityDescription,
    EventKind, HandlerConfig, ManagedObject, NotificationCenter, ObjectContext, ObjectId,
    SchemaModel,
};
use parking_lot::Mutex;
use std::sync::Arc;

const CONTEXT: ContextId = ContextId(1);

struct Person;

impl EntityClass for Person {
    const CLASS_NAME: &'static str = "contacts.Person";
}

struct Employee;

impl EntityClass for Employee {
    const CLASS_NAME: &'static str = "contacts.Employee";
}

struct Company;

impl EntityClass for Company {
    const CLASS_NAME: &'static str = "contacts.Company";
}

/// A contact-book object as handed out by the persistence layer.
struct Contact {
    id: ObjectId,
    entity: Arc<EntityDescription>,
    name: String,
    changed: Vec<String>,
}

impl ManagedObject for Contact {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn entity(&self) -> &Arc<EntityDescription> {
        &self.entity
    }

    fn changed_fields(&self) -> Vec<String> {
        self.changed.clone()
    }

    fn ignored_fields_for_observation(&self) -> Vec<String> {
        // Search index is rebuilt on every save.
        vec!["search_tokens".to_string()]
    }
}

type Object = Arc<Contact>;
type Events = Arc<Mutex<Vec<(String, EventKind, Vec<String>)>>>;

struct Book {
    context: Arc<ObjectContext>,
    person: Arc<EntityDescription>,
    employee: Arc<EntityDescription>,
    company: Arc<EntityDescription>,
}

impl Book {
    fn new() -> Self {
        let person = Arc::new(EntityDescription::new("Person", Person::CLASS_NAME));
        let employee = Arc::new(
            EntityDescription::new("Employee", Employee::CLASS_NAME).with_superentity(&person),
        );
        let company = Arc::new(EntityDescription::new("Company", Company::CLASS_NAME));
        let model =
            SchemaModel::new(vec![person.clone(), employee.clone(), company.clone()]).unwrap();

        Self {
            context: Arc::new(ObjectContext::new(CONTEXT, model)),
            person,
            employee,
            company,
        }
    }

    fn contact(&self, id: u64, entity: &Arc<EntityDescription>, name: &str) -> Object {
        Arc::new(Contact {
            id: ObjectId(id),
            entity: entity.clone(),
            name: name.to_string(),
            changed: Vec::new(),
        })
    }

    fn changed(&self, id: u64, entity: &Arc<EntityDescription>, fields: &[&str]) -> Object {
        Arc::new(Contact {
            id: ObjectId(id),
            entity: entity.clone(),
            name: format!("contact-{id}"),
            changed: fields.iter().map(|f| f.to_string()).collect(),
        })
    }
}

fn record(events: &Events) -> impl FnMut(&Object, EventKind, &[String]) + Send + 'static {
    let events = events.clone();
    move |object: &Object, kind: EventKind, fields: &[String]| {
        events.lock().push((object.name.clone(), kind, fields.to_vec()));
    }
}

// --- Realistic Workflow Tests ---

#[test]
fn test_contact_list_workflow() {
    let book = Book::new();
    let center = Arc::new(NotificationCenter::new());
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer
        .add()
        .filter_type::<Person>()
        .ignore_fields(["modified_at"])
        .on_change(record(&events));
    let _registration = observer.observe(&center);

    // Transaction 1: new people and a company
    let batch = ChangeBatch::new()
        .inserted(book.contact(1, &book.person, "Ada"))
        .inserted(book.contact(2, &book.employee, "Grace"))
        .inserted(book.contact(3, &book.company, "Initech"));
    assert_eq!(center.post(ChangeNotification::new(CONTEXT, batch)), 2);

    // Transaction 2: touch-only save, then a real edit
    let batch = ChangeBatch::new()
        .updated(book.changed(1, &book.person, &["modified_at", "search_tokens"]))
        .updated(book.changed(2, &book.employee, &["modified_at", "phone"]));
    assert_eq!(center.post(ChangeNotification::new(CONTEXT, batch)), 1);

    // Transaction 3: deletion
    let batch = ChangeBatch::new().deleted(book.contact(1, &book.person, "Ada"));
    center.post(ChangeNotification::new(CONTEXT, batch));

    let events = events.lock();
    let mut inserted: Vec<&str> = events
        .iter()
        .filter(|e| e.1 == EventKind::Inserted)
        .map(|e| e.0.as_str())
        .collect();
    inserted.sort();
    assert_eq!(inserted, vec!["Ada", "Grace"]);
    assert_eq!(
        events[2],
        ("contact-2".to_string(), EventKind::Updated, vec!["phone".to_string()])
    );
    assert_eq!(events[3], ("Ada".to_string(), EventKind::Deleted, vec![]));
    assert_eq!(events.len(), 4);
}

#[test]
fn test_detail_view_observes_single_object() {
    let book = Book::new();
    let events: Events = Arc::default();
    let ada = book.contact(1, &book.person, "Ada");

    let mut observer = ContextObserver::new(book.context.clone());
    observer
        .add_with(HandlerConfig::events(EventKind::Updated | EventKind::Deleted))
        .filter_object(&ada)
        .on_change(record(&events));

    let batch = ChangeBatch::new()
        .updated(book.changed(1, &book.person, &["name"]))
        .updated(book.changed(2, &book.person, &["name"]));
    assert_eq!(observer.on_batch(&batch), 1);

    let batch = ChangeBatch::new().deleted(ada.clone());
    assert_eq!(observer.on_batch(&batch), 1);

    let events = events.lock();
    assert_eq!(events[0].0, "contact-1");
    assert_eq!(events[1], ("Ada".to_string(), EventKind::Deleted, vec![]));
}

#[test]
fn test_predicate_per_entity() {
    let book = Book::new();
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer
        .add()
        .filter_type_where::<Company, _>(|c: &Object| c.name.starts_with('I'))
        .filter_entity_named("Employee")
        .on_change(record(&events));

    let batch = ChangeBatch::new()
        .inserted(book.contact(1, &book.company, "Initech"))
        .inserted(book.contact(2, &book.company, "Globex"))
        .inserted(book.contact(3, &book.employee, "Grace"))
        .inserted(book.contact(4, &book.person, "Ada"));

    assert_eq!(observer.on_batch(&batch), 2);
    let mut names: Vec<String> = events.lock().iter().map(|e| e.0.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Grace", "Initech"]);
}

// --- Dispatch Scenarios ---

#[test]
fn test_mask_excludes_updates() {
    let book = Book::new();
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer
        .add()
        .filter_events(EventKind::Inserted | EventKind::Deleted)
        .filter_type::<Person>()
        .on_change(record(&events));

    let updated = ChangeBatch::new().updated(book.changed(1, &book.person, &["name"]));
    assert_eq!(observer.on_batch(&updated), 0);
    assert!(events.lock().is_empty());

    let inserted = ChangeBatch::new().inserted(book.contact(1, &book.person, "Ada"));
    assert_eq!(observer.on_batch(&inserted), 1);
    assert_eq!(
        *events.lock(),
        vec![("Ada".to_string(), EventKind::Inserted, vec![])]
    );
}

#[test]
fn test_handlers_notified_in_order() {
    let book = Book::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut observer = ContextObserver::new(book.context.clone());
    for label in ["H1", "H2"] {
        let order = order.clone();
        observer
            .add()
            .filter_type::<Person>()
            .on_change(move |_: &Object, _, _: &[String]| order.lock().push(label));
    }

    let batch = ChangeBatch::new().inserted(book.contact(1, &book.person, "Ada"));
    observer.on_batch(&batch);
    assert_eq!(*order.lock(), vec!["H1", "H2"]);
}

#[test]
fn test_clear_silences_everything() {
    let book = Book::new();
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer.add().on_change(record(&events));
    observer.add().on_change(record(&events));
    observer.clear();

    let batch = ChangeBatch::new()
        .inserted(book.contact(1, &book.person, "Ada"))
        .refreshed(book.contact(2, &book.company, "Initech"));
    assert_eq!(observer.on_batch(&batch), 0);
    assert!(events.lock().is_empty());
}

#[test]
fn test_inactive_observer() {
    let book = Book::new();
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer.add().on_change(record(&events));
    observer.add().set_active(false);
    observer.set_active(false);

    let batch = ChangeBatch::new().inserted(book.contact(1, &book.person, "Ada"));
    assert_eq!(observer.on_batch(&batch), 0);
    assert!(events.lock().is_empty());
    assert!(observer.handlers()[0].is_active());
    assert!(!observer.handlers()[1].is_active());

    observer.set_active(true);
    assert_eq!(observer.on_batch(&batch), 1);
}

#[test]
fn test_refreshed_objects_reported() {
    let book = Book::new();
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer
        .add_with(HandlerConfig::events(EventKind::Refreshed))
        .on_change(record(&events));

    let batch = ChangeBatch::new()
        .refreshed(book.contact(1, &book.company, "Initech"))
        .inserted(book.contact(2, &book.company, "Globex"));
    assert_eq!(observer.on_batch(&batch), 1);
    assert_eq!(
        *events.lock(),
        vec![("Initech".to_string(), EventKind::Refreshed, vec![])]
    );
}

#[test]
fn test_other_context_is_ignored() {
    let book = Book::new();
    let center = Arc::new(NotificationCenter::new());
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer.add().on_change(record(&events));
    let registration = observer.observe(&center);

    let batch = ChangeBatch::new().inserted(book.contact(1, &book.person, "Ada"));
    assert_eq!(center.post(ChangeNotification::new(ContextId(2), batch.clone())), 0);
    assert_eq!(center.post(ChangeNotification::new(CONTEXT, batch.clone())), 1);

    drop(registration);
    assert_eq!(center.observer_count(), 0);
    assert_eq!(center.post(ChangeNotification::new(CONTEXT, batch)), 0);
    assert_eq!(events.lock().len(), 1);
}

#[test]
fn test_post_from_another_thread() {
    let book = Book::new();
    let center: Arc<NotificationCenter<Object>> = Arc::new(NotificationCenter::new());
    let events: Events = Arc::default();

    let mut observer = ContextObserver::new(book.context.clone());
    observer.add().on_change(record(&events));
    let _registration = observer.observe(&center);

    // The persistence context is confined to one thread, which need not be ours.
    let worker_center = center.clone();
    let ada = book.contact(1, &book.person, "Ada");
    std::thread::spawn(move || {
        worker_center.post(ChangeNotification::new(CONTEXT, ChangeBatch::new().inserted(ada)));
    })
    .join()
    .unwrap();

    assert_eq!(events.lock().len(), 1);
}
