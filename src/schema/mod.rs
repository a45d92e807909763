//! Entity schema descriptors and class resolution.
//!
//! A [`SchemaModel`] is registered once per persistence context and never
//! changes afterwards. Handlers resolve filter classes against it through an
//! [`EntityResolver`], which memoizes every lookup.

mod model;
mod resolver;

pub use model::{EntityClass, EntityDescription, ObjectContext, SchemaModel};
pub use resolver::EntityResolver;
