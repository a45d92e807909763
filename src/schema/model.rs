//! Schema model and the observed context.

use crate::error::{ObserverError, Result};
use crate::types::ContextId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Metadata describing one entity of a schema model.
#[derive(Clone)]
pub struct EntityDescription {
    name: String,
    class_name: String,
    superentity: Option<Arc<EntityDescription>>,
}

impl EntityDescription {
    /// Create a root entity implemented by `class_name`.
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            superentity: None,
        }
    }

    /// Make this entity a subentity of `parent`.
    pub fn with_superentity(mut self, parent: &Arc<EntityDescription>) -> Self {
        self.superentity = Some(Arc::clone(parent));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully-qualified identity of the implementing type.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn superentity(&self) -> Option<&Arc<EntityDescription>> {
        self.superentity.as_ref()
    }

    /// True if `self` is `other` or one of its subentities.
    pub fn is_kind_of(&self, other: &EntityDescription) -> bool {
        let mut current = Some(self);
        while let Some(entity) = current {
            if entity.name == other.name {
                return true;
            }
            current = entity.superentity.as_deref();
        }
        false
    }
}

impl fmt::Debug for EntityDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescription")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("superentity", &self.superentity.as_ref().map(|e| e.name()))
            .finish()
    }
}

impl PartialEq for EntityDescription {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.class_name == other.class_name
    }
}

impl Eq for EntityDescription {}

/// The registered entities of a persistence context.
#[derive(Clone, Debug, Default)]
pub struct SchemaModel {
    entities: Vec<Arc<EntityDescription>>,
}

impl SchemaModel {
    /// Build a model from its entities.
    ///
    /// Entity names and class names must be unique.
    pub fn new(entities: Vec<Arc<EntityDescription>>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut classes = HashSet::new();
        for entity in &entities {
            if !names.insert(entity.name()) {
                return Err(ObserverError::DuplicateEntity(entity.name().to_string()));
            }
            if !classes.insert(entity.class_name()) {
                return Err(ObserverError::DuplicateClass(entity.class_name().to_string()));
            }
        }
        Ok(Self { entities })
    }

    pub fn entities(&self) -> &[Arc<EntityDescription>] {
        &self.entities
    }

    pub fn entity_named(&self, name: &str) -> Option<&Arc<EntityDescription>> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// Find the entity implemented by `class_name`.
    ///
    /// Models hold tens of entities, so this is a plain scan.
    pub fn entity_for_class(&self, class_name: &str) -> Option<&Arc<EntityDescription>> {
        self.entities.iter().find(|e| e.class_name() == class_name)
    }
}

/// A Rust type registered as the implementation of a schema entity.
pub trait EntityClass {
    /// Fully-qualified class identity, matched against
    /// [`EntityDescription::class_name`].
    const CLASS_NAME: &'static str;
}

/// Reference to the persistence context being observed.
#[derive(Clone, Debug)]
pub struct ObjectContext {
    id: ContextId,
    model: Option<Arc<SchemaModel>>,
}

impl ObjectContext {
    pub fn new(id: ContextId, model: SchemaModel) -> Self {
        Self {
            id,
            model: Some(Arc::new(model)),
        }
    }

    /// A context with no store attached, and therefore no model.
    pub fn without_model(id: ContextId) -> Self {
        Self { id, model: None }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn model(&self) -> Option<&Arc<SchemaModel>> {
        self.model.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> (Arc<EntityDescription>, Arc<EntityDescription>, Arc<EntityDescription>) {
        let item = Arc::new(EntityDescription::new("Item", "shop.Item"));
        let book = Arc::new(EntityDescription::new("Book", "shop.Book").with_superentity(&item));
        let ebook = Arc::new(EntityDescription::new("EBook", "shop.EBook").with_superentity(&book));
        (item, book, ebook)
    }

    #[test]
    fn test_is_kind_of_walks_superentities() {
        let (item, book, ebook) = hierarchy();

        assert!(ebook.is_kind_of(&ebook));
        assert!(ebook.is_kind_of(&book));
        assert!(ebook.is_kind_of(&item));
        assert!(!item.is_kind_of(&book));
        assert!(!book.is_kind_of(&ebook));
    }

    #[test]
    fn test_model_lookup() {
        let (item, book, ebook) = hierarchy();
        let model = SchemaModel::new(vec![item, book, ebook]).unwrap();

        assert_eq!(model.entities().len(), 3);
        assert_eq!(model.entity_for_class("shop.Book").unwrap().name(), "Book");
        assert_eq!(model.entity_named("EBook").unwrap().class_name(), "shop.EBook");
        assert!(model.entity_for_class("shop.Pen").is_none());
    }

    #[test]
    fn test_model_rejects_duplicates() {
        let a = Arc::new(EntityDescription::new("Item", "shop.Item"));
        let b = Arc::new(EntityDescription::new("Item", "shop.Other"));
        let result = SchemaModel::new(vec![a.clone(), b]);
        assert_eq!(result.unwrap_err(), ObserverError::DuplicateEntity("Item".to_string()));

        let c = Arc::new(EntityDescription::new("Other", "shop.Item"));
        let result = SchemaModel::new(vec![a, c]);
        assert_eq!(result.unwrap_err(), ObserverError::DuplicateClass("shop.Item".to_string()));
    }
}
