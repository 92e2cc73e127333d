//! Tessera ECS -- sparse entity-component core with self-describing
//! persistence.
//!
//! This crate provides a typed-component storage layer, an execution engine
//! that walks callbacks over entities satisfying a component-set predicate,
//! and a persistence driver that serializes the entire component universe to
//! a self-describing binary document (see the `tessera-doc` crate) and
//! reconstructs it losslessly.
//!
//! Storage is sparse: an entity may own any subset of registered component
//! types, each in its own per-type store kept in ascending entity-id order.
//! Serialized output is deterministic given a fixed registration order and
//! fixed entity insertion order.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Health {
//!     hp: i64,
//! }
//!
//! impl Component for Health {
//!     const NAME: &'static str = "health";
//!
//!     fn serialize(&self, w: &mut FieldWriter, _entity: EntityId) -> bool {
//!         w.write_i64("hp", self.hp);
//!         true
//!     }
//!
//!     fn deserialize(&mut self, r: &FieldReader<'_>) -> Result<(), CoreError> {
//!         self.hp = r.read_i64("hp")?;
//!         Ok(())
//!     }
//! }
//!
//! let mut world = World::new();
//! world.register_component::<Health>();
//!
//! let e = world.new_entity();
//! world.add_component(e, Health { hp: 10 }).unwrap();
//!
//! // Persist, then restore into a fresh world with the same registrations.
//! let doc = world.serialize_components();
//! let mut restored = World::new();
//! restored.register_component::<Health>();
//! restored.deserialize_components_create(&doc).unwrap();
//!
//! assert_eq!(restored.get_component::<Health>(e), Some(&Health { hp: 10 }));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod persist;
pub mod query;
pub mod store;
pub mod world;

use tessera_doc::DocError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by core operations.
///
/// All variants are recoverable by the caller; the contract violation of
/// walking or iterating an unnormalized store is a debug assertion instead,
/// since no safe recovery is defined for it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A component type was used before being registered.
    #[error("component type '{type_name}' has not been registered")]
    UnregisteredType { type_name: &'static str },

    /// A document references a type name with no matching registration.
    #[error("document references component type '{name}' with no matching registration. Registered components: [{registered}]")]
    UnknownComponentType { name: String, registered: String },

    /// Codec-level structural corruption in a document buffer.
    #[error("malformed document: {0}")]
    Document(#[from] DocError),

    /// A document entry's structure does not match the persistence layout.
    #[error("failed to deserialize component '{component}': {details}")]
    ComponentDeserialization { component: String, details: String },

    /// A field the live type declares is absent from the document.
    #[error("component '{component}' field '{field}' is missing from the document")]
    MissingField { component: String, field: String },

    /// A document field's type tag disagrees with the live type's schema.
    #[error("component '{component}' field '{field}': expected type tag '{expected}', found '{found}'")]
    TypeMismatch {
        component: String,
        field: String,
        expected: String,
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, TemplateId, TypeRegistry};
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::persist::{dump, load, FieldReader, FieldWriter, INT64_TAG};
    pub use crate::query::{ComponentSet, System};
    pub use crate::store::ComponentStore;
    pub use crate::world::World;
    pub use crate::CoreError;
    pub use tessera_doc::{decode, encode, Blob, Dict, DocError, Value};
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
