//! # Context Observer
//!
//! Filtered change notifications for an object-graph persistence context.
//!
//! ## Core Concepts
//!
//! - **Change batches**: Objects inserted, deleted, updated or refreshed by one transaction
//! - **Handlers**: A subscriber's filters plus the callback receiving matches
//! - **Context observers**: Fan each batch out to their handlers in registration order
//! - **Schema models**: Entity descriptions used to resolve class-based filters
//!
//! ## Example
//!
//! ```ignore
//! use context_observer::{ContextObserver, EventKind, NotificationCenter};
//!
//! let center = Arc::new(NotificationCenter::new());
//! let mut observer = ContextObserver::new(context.clone());
//!
//! // Report inserted and updated people, ignoring bookkeeping fields
//! observer
//!     .add()
//!     .filter_events(EventKind::Inserted | EventKind::Updated)
//!     .filter_class("app.Person")
//!     .ignore_fields(["modified_at"])
//!     .on_change(|person, kind, fields| println!("{kind}: {fields:?}"));
//!
//! let registration = observer.observe(&center);
//! center.post(ChangeNotification::new(context.id(), batch));
//! ```

pub mod error;
pub mod notifications;
pub mod observer;
pub mod schema;
pub mod types;

// Re-exports
pub use error::{ObserverError, Result};
pub use notifications::{NotificationCenter, ObserverId, ObserverRegistration, SharedObserver};
pub use observer::{
    ChangeCallback, ContextObserver, EntityFilter, Handler, HandlerConfig, ObserverConfig,
    Predicate,
};
pub use schema::{EntityClass, EntityDescription, EntityResolver, ObjectContext, SchemaModel};
pub use types::*;
