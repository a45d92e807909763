//! Configuration and filter types for handlers.

use crate::schema::EntityDescription;
use crate::types::{EventKind, EventMask, ManagedObject, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Predicate evaluated against a changed object.
pub type Predicate<O> = Box<dyn Fn(&O) -> bool + Send + Sync>;

/// Callback receiving `(object, kind, changed fields)`.
///
/// The field list is empty for every kind except [`EventKind::Updated`].
pub type ChangeCallback<O> = Box<dyn FnMut(&O, EventKind, &[String]) + Send>;

/// Configuration for a context observer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Log every dispatched event at debug level.
    /// Default: false
    pub debug_output: bool,

    /// Accept notifications from any context, not only the observed one.
    /// Default: false
    pub any_context: bool,
}

/// Plain-data part of a handler's configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Default: true
    pub active: bool,

    /// Event kinds to report.
    /// Default: every kind
    pub event_mask: EventMask,

    /// Fields that never count as a change (None = nothing ignored).
    pub ignored_fields: Option<Vec<String>>,

    /// Report updates even when no non-ignored field changed.
    /// Default: false
    pub report_unchanged_updates: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            active: true,
            event_mask: EventMask::all(),
            ignored_fields: None,
            report_unchanged_updates: false,
        }
    }
}

impl HandlerConfig {
    /// Report only the given kinds.
    pub fn events(mask: impl Into<EventMask>) -> Self {
        Self {
            event_mask: mask.into(),
            ..Default::default()
        }
    }
}

/// What an entity filter checks once the entity matched.
pub(crate) enum Condition<O> {
    /// Every object of the entity.
    Any,
    Predicate(Predicate<O>),
    /// Only the listed objects.
    Objects(HashSet<ObjectId>),
}

/// An entity restriction with an optional predicate.
pub struct EntityFilter<O> {
    entity: Arc<EntityDescription>,
    condition: Condition<O>,
}

impl<O: ManagedObject> EntityFilter<O> {
    pub(crate) fn new(entity: Arc<EntityDescription>, predicate: Option<Predicate<O>>) -> Self {
        let condition = match predicate {
            Some(predicate) => Condition::Predicate(predicate),
            None => Condition::Any,
        };
        Self { entity, condition }
    }

    pub(crate) fn for_object(entity: Arc<EntityDescription>, id: ObjectId) -> Self {
        Self {
            entity,
            condition: Condition::Objects(HashSet::from([id])),
        }
    }

    pub fn entity(&self) -> &Arc<EntityDescription> {
        &self.entity
    }

    /// True unless the filter admits every object of its entity.
    pub fn has_predicate(&self) -> bool {
        !matches!(self.condition, Condition::Any)
    }

    /// Object identities admitted by an object filter.
    pub fn observed_objects(&self) -> Option<&HashSet<ObjectId>> {
        match self.condition {
            Condition::Objects(ref ids) => Some(ids),
            _ => None,
        }
    }

    /// Add another object to an object filter. Returns false for other filters.
    pub(crate) fn observe_object(&mut self, id: ObjectId) -> bool {
        match self.condition {
            Condition::Objects(ref mut ids) => {
                ids.insert(id);
                true
            }
            _ => false,
        }
    }

    /// True if the object is of this filter's entity or one of its subentities.
    pub fn applies_to(&self, object: &O) -> bool {
        object.entity().is_kind_of(&self.entity)
    }

    /// Evaluate the filter's condition, assuming [`applies_to`](Self::applies_to) holds.
    pub fn admits(&self, object: &O) -> bool {
        match self.condition {
            Condition::Any => true,
            Condition::Predicate(ref predicate) => predicate(object),
            Condition::Objects(ref ids) => ids.contains(&object.object_id()),
        }
    }
}

impl<O> fmt::Debug for EntityFilter<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let condition = match self.condition {
            Condition::Any => "any".to_string(),
            Condition::Predicate(_) => "predicate".to_string(),
            Condition::Objects(ref ids) => format!("{} objects", ids.len()),
        };
        f.debug_struct("EntityFilter")
            .field("entity", &self.entity.name())
            .field("condition", &condition)
            .finish()
    }
}
