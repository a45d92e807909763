//! Memoized class-to-entity resolution.

use super::model::{EntityDescription, SchemaModel};
use crate::error::{ObserverError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Resolves implementation classes to entity descriptions.
///
/// Results are cached forever, misses included: schema models are fixed for
/// the lifetime of a context.
#[derive(Clone, Debug)]
pub struct EntityResolver {
    model: Option<Arc<SchemaModel>>,
    /// Class name -> resolved entity (None = confirmed miss).
    by_class: HashMap<String, Option<Arc<EntityDescription>>>,
    /// Entity name -> resolved entity (None = confirmed miss).
    by_name: HashMap<String, Option<Arc<EntityDescription>>>,
}

impl EntityResolver {
    pub fn new(model: Option<Arc<SchemaModel>>) -> Self {
        Self {
            model,
            by_class: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Resolve a class, logging a warning when nothing is registered for it.
    pub fn resolve(&mut self, class_name: &str) -> Option<Arc<EntityDescription>> {
        match self.try_resolve(class_name) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!(class = class_name, "{e} - filtering won't work as expected");
                None
            }
        }
    }

    /// Resolve a class to its entity description.
    pub fn try_resolve(&mut self, class_name: &str) -> Result<Arc<EntityDescription>> {
        let model = self.model.as_ref().ok_or(ObserverError::NoModel)?;

        let cached = self
            .by_class
            .entry(class_name.to_string())
            .or_insert_with(|| model.entity_for_class(class_name).cloned());

        cached.clone().ok_or_else(|| ObserverError::EntityNotFound {
            class: class_name.to_string(),
        })
    }

    /// Resolve an entity by its schema name, logging a warning on a miss.
    pub fn resolve_named(&mut self, name: &str) -> Option<Arc<EntityDescription>> {
        match self.try_resolve_named(name) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!(entity = name, "{e} - filtering won't work as expected");
                None
            }
        }
    }

    pub fn try_resolve_named(&mut self, name: &str) -> Result<Arc<EntityDescription>> {
        let model = self.model.as_ref().ok_or(ObserverError::NoModel)?;

        let cached = self
            .by_name
            .entry(name.to_string())
            .or_insert_with(|| model.entity_named(name).cloned());

        cached.clone().ok_or_else(|| ObserverError::EntityNameNotFound {
            name: name.to_string(),
        })
    }

    /// Number of cached class lookups, hits and misses.
    pub fn cached_len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_cached(&self, class_name: &str) -> bool {
        self.by_class.contains_key(class_name)
    }

    pub fn model(&self) -> Option<&Arc<SchemaModel>> {
        self.model.as_ref()
    }
}
