//! Change observation for a persistence context.
//!
//! A [`ContextObserver`] owns any number of [`Handler`]s. Each handler
//! declares which changes it cares about:
//! - Event kinds (inserted, deleted, updated, refreshed)
//! - Entity filters, optionally with a predicate per entity
//! - A global predicate
//! - Fields whose changes should be ignored
//!
//! # Example
//!
//! ```ignore
//! let mut observer = ContextObserver::new(context);
//!
//! observer
//!     .add()
//!     .filter_events(EventKind::Inserted | EventKind::Updated)
//!     .filter_type::<Person>()
//!     .ignore_fields(["modified_at"])
//!     .on_change(|person: &Arc<Person>, kind, fields: &[String]| {
//!         println!("{kind} {} {:?}", person.name, fields);
//!     });
//!
//! observer.on_batch(&batch);
//! ```

mod dispatcher;
mod handler;
mod types;

pub use dispatcher::ContextObserver;
pub use handler::Handler;
pub use types::{ChangeCallback, EntityFilter, HandlerConfig, ObserverConfig, Predicate};
