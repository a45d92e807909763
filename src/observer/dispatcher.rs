//! Context observer fanning change batches out to handlers.

use crate::notifications::{NotificationCenter, ObserverRegistration};
use crate::schema::ObjectContext;
use crate::types::{ChangeBatch, ChangeNotification, ManagedObject};
use std::sync::Arc;
use tracing::trace;

use super::handler::Handler;
use super::types::{HandlerConfig, ObserverConfig};

/// Observes one persistence context and dispatches its change batches.
///
/// Handlers are evaluated in registration order, synchronously, on the
/// thread delivering the batch.
pub struct ContextObserver<O> {
    context: Arc<ObjectContext>,
    config: ObserverConfig,
    active: bool,
    handlers: Vec<Handler<O>>,
}

impl<O: ManagedObject> ContextObserver<O> {
    pub fn new(context: Arc<ObjectContext>) -> Self {
        Self::with_config(context, ObserverConfig::default())
    }

    pub fn with_config(context: Arc<ObjectContext>, config: ObserverConfig) -> Self {
        Self {
            context,
            config,
            active: true,
            handlers: Vec::new(),
        }
    }

    /// Register a new handler and return it for configuration.
    pub fn add(&mut self) -> &mut Handler<O> {
        let handler = Handler::new(&self.context, self.config.debug_output);
        self.handlers.push(handler);
        let index = self.handlers.len() - 1;
        &mut self.handlers[index]
    }

    /// Register a new handler with the given configuration applied.
    pub fn add_with(&mut self, config: HandlerConfig) -> &mut Handler<O> {
        let handler = self.add();
        handler.apply_config(&config);
        handler
    }

    /// Remove every handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn handlers(&self) -> &[Handler<O>] {
        &self.handlers
    }

    pub fn handler_mut(&mut self, index: usize) -> Option<&mut Handler<O>> {
        self.handlers.get_mut(index)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn context(&self) -> &Arc<ObjectContext> {
        &self.context
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Deliver a batch to every handler. Returns the number of matches.
    ///
    /// Handlers check their own `active` flag.
    pub fn on_batch(&mut self, batch: &ChangeBatch<O>) -> usize {
        if !self.active {
            return 0;
        }

        let mut matches = 0;
        for handler in &mut self.handlers {
            matches += handler.evaluate(batch);
        }

        trace!(
            objects = batch.len(),
            handlers = self.handlers.len(),
            matches,
            "change batch dispatched"
        );
        matches
    }

    /// Deliver a notification if it comes from the observed context.
    pub fn on_notification(&mut self, notification: &ChangeNotification<O>) -> usize {
        if !self.config.any_context && notification.context != self.context.id() {
            return 0;
        }
        self.on_batch(&notification.batch)
    }

    /// Register with a notification center.
    ///
    /// Delivery stops when the returned registration is dropped.
    pub fn observe(self, center: &Arc<NotificationCenter<O>>) -> ObserverRegistration<O> {
        ObserverRegistration::new(center, self)
    }
}
