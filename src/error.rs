//! Error types for observer configuration.

use thiserror::Error;

/// Main error type for observer operations.
///
/// Delivery never fails; these errors only surface while building a schema
/// model or configuring handler filters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserverError {
    #[error("Observed context has no schema model")]
    NoModel,

    #[error("Entity description not found for class: {class}")]
    EntityNotFound { class: String },

    #[error("Entity description not found for name: {name}")]
    EntityNameNotFound { name: String },

    #[error("Filter count mismatch: {classes} classes, {predicates} predicates")]
    FilterCountMismatch { classes: usize, predicates: usize },

    #[error("Entity already registered: {0}")]
    DuplicateEntity(String),

    #[error("Class already registered: {0}")]
    DuplicateClass(String),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;
