//! A single subscription: filters plus the bound callback.

use crate::error::{ObserverError, Result};
use crate::schema::{EntityClass, EntityDescription, EntityResolver, ObjectContext};
use crate::types::{ChangeBatch, EventKind, EventMask, ManagedObject};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{ChangeCallback, EntityFilter, HandlerConfig, Predicate};

/// One subscriber's filter configuration and callback.
///
/// Created through [`ContextObserver::add`](super::ContextObserver::add) and
/// configured with the chaining `filter_*` methods.
pub struct Handler<O> {
    active: bool,
    event_mask: EventMask,
    entity_filters: Vec<EntityFilter<O>>,
    global_predicate: Option<Predicate<O>>,
    ignored_fields: Option<Vec<String>>,
    report_unchanged_updates: bool,
    callback: Option<ChangeCallback<O>>,
    resolver: EntityResolver,
    debug_output: bool,
}

impl<O: ManagedObject> Handler<O> {
    pub(crate) fn new(context: &ObjectContext, debug_output: bool) -> Self {
        Self {
            active: true,
            event_mask: EventMask::all(),
            entity_filters: Vec::new(),
            global_predicate: None,
            ignored_fields: None,
            report_unchanged_updates: false,
            callback: None,
            resolver: EntityResolver::new(context.model().cloned()),
            debug_output,
        }
    }

    // --- Configuration ---

    /// Bind the callback invoked for every match.
    pub fn on_change<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&O, EventKind, &[String]) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Apply the plain-data part of a configuration in one step.
    pub fn apply_config(&mut self, config: &HandlerConfig) -> &mut Self {
        self.active = config.active;
        self.event_mask = config.event_mask;
        self.ignored_fields = config.ignored_fields.clone();
        self.report_unchanged_updates = config.report_unchanged_updates;
        self
    }

    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.active = active;
        self
    }

    /// Report only the given event kinds.
    pub fn filter_events(&mut self, mask: impl Into<EventMask>) -> &mut Self {
        self.event_mask = mask.into();
        self
    }

    /// Replace the predicate every object must satisfy.
    pub fn filter_where<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.global_predicate = Some(Box::new(predicate));
        self
    }

    /// Observe objects of the entity implemented by `class_name`.
    ///
    /// Does nothing (after logging a warning) if the class is not registered.
    pub fn filter_class(&mut self, class_name: &str) -> &mut Self {
        self.add_class_filter(class_name, None)
    }

    /// Observe objects of the entity implemented by `class_name` that satisfy `predicate`.
    pub fn filter_class_where<F>(&mut self, class_name: &str, predicate: F) -> &mut Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.add_class_filter(class_name, Some(Box::new(predicate)))
    }

    /// Typed form of [`filter_class`](Self::filter_class).
    pub fn filter_type<T: EntityClass>(&mut self) -> &mut Self {
        self.add_class_filter(T::CLASS_NAME, None)
    }

    /// Typed form of [`filter_class_where`](Self::filter_class_where).
    pub fn filter_type_where<T, F>(&mut self, predicate: F) -> &mut Self
    where
        T: EntityClass,
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.add_class_filter(T::CLASS_NAME, Some(Box::new(predicate)))
    }

    /// Observe objects of the entity with the given schema name.
    pub fn filter_entity_named(&mut self, name: &str) -> &mut Self {
        self.add_named_filter(name, None)
    }

    pub fn filter_entity_named_where<F>(&mut self, name: &str, predicate: F) -> &mut Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.add_named_filter(name, Some(Box::new(predicate)))
    }

    /// Add one entity filter per class, paired with `predicates` if given.
    ///
    /// A predicate list of the wrong length leaves the filters untouched.
    pub fn filter_classes(
        &mut self,
        class_names: &[&str],
        predicates: Option<Vec<Predicate<O>>>,
    ) -> &mut Self {
        if let Some(ref predicates) = predicates {
            if predicates.len() != class_names.len() {
                let e = ObserverError::FilterCountMismatch {
                    classes: class_names.len(),
                    predicates: predicates.len(),
                };
                warn!("{e} - filtering won't work as expected");
                return self;
            }
        }

        match predicates {
            Some(predicates) => {
                for (class_name, predicate) in class_names.iter().zip(predicates) {
                    self.add_class_filter(class_name, Some(predicate));
                }
            }
            None => {
                for class_name in class_names {
                    self.add_class_filter(class_name, None);
                }
            }
        }
        self
    }

    /// Observe a single object.
    ///
    /// Objects of the same entity share one identity filter.
    pub fn filter_object(&mut self, object: &O) -> &mut Self {
        let entity = object.entity();
        let id = object.object_id();

        let existing = self.entity_filters.iter().position(|f| {
            f.observed_objects().is_some() && f.entity().as_ref() == entity.as_ref()
        });
        match existing {
            Some(index) => {
                self.entity_filters[index].observe_object(id);
            }
            None => {
                self.entity_filters
                    .push(EntityFilter::for_object(Arc::clone(entity), id));
            }
        }
        self
    }

    /// Observe each of the given objects.
    pub fn filter_objects(&mut self, objects: &[O]) -> &mut Self {
        for object in objects {
            self.filter_object(object);
        }
        self
    }

    /// Replace the fields that never count as a change.
    pub fn ignore_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Report updates whose changed fields were all ignored.
    pub fn report_unchanged_updates(&mut self, report: bool) -> &mut Self {
        self.report_unchanged_updates = report;
        self
    }

    /// Fallible form of [`filter_class`](Self::filter_class).
    pub fn try_filter_class(
        &mut self,
        class_name: &str,
        predicate: Option<Predicate<O>>,
    ) -> Result<&mut Self> {
        let entity = self.resolver.try_resolve(class_name)?;
        self.push_filter(entity, predicate);
        Ok(self)
    }

    /// Fallible form of [`filter_classes`](Self::filter_classes).
    ///
    /// Every class is resolved before any filter is added.
    pub fn try_filter_classes(
        &mut self,
        class_names: &[&str],
        predicates: Option<Vec<Predicate<O>>>,
    ) -> Result<&mut Self> {
        if let Some(ref predicates) = predicates {
            if predicates.len() != class_names.len() {
                return Err(ObserverError::FilterCountMismatch {
                    classes: class_names.len(),
                    predicates: predicates.len(),
                });
            }
        }

        let entities = class_names
            .iter()
            .map(|class_name| self.resolver.try_resolve(class_name))
            .collect::<Result<Vec<_>>>()?;

        let mut predicates = predicates.map(Vec::into_iter);
        for entity in entities {
            let predicate = predicates.as_mut().and_then(|p| p.next());
            self.push_filter(entity, predicate);
        }
        Ok(self)
    }

    fn add_class_filter(&mut self, class_name: &str, predicate: Option<Predicate<O>>) -> &mut Self {
        if let Some(entity) = self.resolver.resolve(class_name) {
            self.push_filter(entity, predicate);
        }
        self
    }

    fn add_named_filter(&mut self, name: &str, predicate: Option<Predicate<O>>) -> &mut Self {
        if let Some(entity) = self.resolver.resolve_named(name) {
            self.push_filter(entity, predicate);
        }
        self
    }

    fn push_filter(&mut self, entity: Arc<EntityDescription>, predicate: Option<Predicate<O>>) {
        self.entity_filters.push(EntityFilter::new(entity, predicate));
    }

    // --- Accessors ---

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn event_mask(&self) -> EventMask {
        self.event_mask
    }

    pub fn entity_filters(&self) -> &[EntityFilter<O>] {
        &self.entity_filters
    }

    pub fn has_global_predicate(&self) -> bool {
        self.global_predicate.is_some()
    }

    pub fn ignored_fields(&self) -> Option<&[String]> {
        self.ignored_fields.as_deref()
    }

    pub fn reports_unchanged_updates(&self) -> bool {
        self.report_unchanged_updates
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    // --- Matching ---

    /// Evaluate a batch against the filters, invoking the callback per match.
    ///
    /// Kinds are processed in the order updated, refreshed, deleted, inserted.
    /// Returns the number of matches, which are counted even when no callback
    /// is bound.
    pub fn evaluate(&mut self, batch: &ChangeBatch<O>) -> usize {
        if !self.active {
            return 0;
        }

        let mut matches = 0;

        if self.event_mask.contains(EventKind::Updated) {
            for object in &batch.updated {
                let fields = self.effective_changed_fields(object);
                if (!fields.is_empty() || self.report_unchanged_updates) && self.is_observed(object)
                {
                    self.dispatch(object, EventKind::Updated, &fields);
                    matches += 1;
                }
            }
        }

        for kind in [EventKind::Refreshed, EventKind::Deleted, EventKind::Inserted] {
            if !self.event_mask.contains(kind) {
                continue;
            }
            for object in batch.objects(kind) {
                if self.is_observed(object) {
                    self.dispatch(object, kind, &[]);
                    matches += 1;
                }
            }
        }

        matches
    }

    /// True if the object passes the global predicate and the entity filters.
    ///
    /// The first entity filter that applies to the object decides; later
    /// filters are not consulted.
    pub fn is_observed(&self, object: &O) -> bool {
        if let Some(ref predicate) = self.global_predicate {
            if !predicate(object) {
                return false;
            }
        }

        if !self.entity_filters.is_empty() {
            match self.entity_filters.iter().find(|f| f.applies_to(object)) {
                Some(filter) => return filter.admits(object),
                None => return false,
            }
        }

        true
    }

    /// Changed fields minus the handler's and the object's ignored fields.
    pub fn effective_changed_fields(&self, object: &O) -> Vec<String> {
        let mut fields = object.changed_fields();
        let own_ignored = object.ignored_fields_for_observation();
        let ignored = self.ignored_fields.as_deref().unwrap_or_default();

        fields.retain(|field| !ignored.contains(field) && !own_ignored.contains(field));
        fields
    }

    fn dispatch(&mut self, object: &O, kind: EventKind, fields: &[String]) {
        if self.debug_output {
            let entity = object.entity().name();
            if kind == EventKind::Updated {
                debug!("{} {} - {:?}", kind.code(), entity, fields);
            } else {
                debug!("{} {}", kind.code(), entity);
            }
        }

        if let Some(ref mut callback) = self.callback {
            callback(object, kind, fields);
        }
    }
}
