//! In-process notification stream for change batches.
//!
//! A persistence layer posts one [`ChangeNotification`](crate::ChangeNotification)
//! per transaction to a [`NotificationCenter`]. Context observers register
//! with the center and stay registered until their [`ObserverRegistration`]
//! is dropped.
//!
//! # Example
//!
//! ```ignore
//! let center = Arc::new(NotificationCenter::new());
//!
//! let mut observer = ContextObserver::new(context.clone());
//! observer.add().on_change(|object, kind, fields| { /* ... */ });
//! let registration = observer.observe(&center);
//!
//! // persistence layer, after each transaction:
//! center.post(ChangeNotification::new(context.id(), batch));
//!
//! drop(registration); // no further deliveries
//! ```

mod center;

pub use center::{NotificationCenter, ObserverId, ObserverRegistration, SharedObserver};
