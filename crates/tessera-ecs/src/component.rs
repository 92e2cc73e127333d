//! Component type registration and the component persistence contract.
//!
//! Every component type used in the core must be registered at runtime in a
//! [`TypeRegistry`]. Registration produces a [`TemplateId`] whose ordering is
//! the registration order; that ordering fixes the component-type order of
//! serialized documents. Template ids are never persisted and carry no
//! meaning across processes.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::entity::EntityId;
use crate::persist::{FieldReader, FieldWriter};
use crate::CoreError;

// ---------------------------------------------------------------------------
// TemplateId
// ---------------------------------------------------------------------------

/// Lightweight ordinal identifying a registered component type.
///
/// Assigned in registration order starting from zero. If type A is registered
/// before type B, `id(A) < id(B)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub(crate) u32);

impl TemplateId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// The contract a type implements to live in a component store and survive
/// persistence.
///
/// A component supplies a stable [`NAME`](Component::NAME) used as its
/// document key, writes its named fields through a [`FieldWriter`], and
/// repopulates them from a [`FieldReader`]. The core never interprets field
/// payloads; a matrix is just a tagged blob of bytes to everything below the
/// component's own callbacks.
///
/// `serialize` must write the same field set for every instance -- the
/// per-type document header is captured by probing a `Default` instance, so
/// conditionally written fields would not be described by the header.
/// Returning `false` from `serialize` skips persisting that one instance
/// without being an error.
pub trait Component: Default + 'static {
    /// Stable name, used as the document key for this type.
    const NAME: &'static str;

    /// Write this instance's named fields. Return `false` to skip persisting
    /// this instance.
    fn serialize(&self, writer: &mut FieldWriter, entity: EntityId) -> bool;

    /// Populate this instance's fields by name from a decoded field
    /// dictionary.
    fn deserialize(&mut self, reader: &FieldReader<'_>) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// TypeRegistry
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Id assigned at registration time.
    pub id: TemplateId,
    /// The type's stable name ([`Component::NAME`]).
    pub name: &'static str,
    /// Rust `TypeId` for runtime type checking.
    pub type_id: TypeId,
}

/// Maps Rust types to [`TemplateId`]s and records their metadata.
///
/// Owned by a core instance -- there is no process-wide registry, so two
/// cores can register the same types in different orders without observing
/// each other. A type can only be registered once; subsequent registrations
/// return the existing id.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// TypeId -> TemplateId for dedup.
    by_type: HashMap<TypeId, TemplateId>,
    /// Name -> TemplateId for resolving document keys at load time.
    by_name: HashMap<&'static str, TemplateId>,
    /// Indexed by TemplateId.0; iteration order is registration order.
    infos: Vec<TypeInfo>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type.
    ///
    /// Idempotent: re-registering the same Rust type returns the existing
    /// [`TemplateId`]. Registering a *different* type under a name that is
    /// already taken panics -- two types sharing a document key is a
    /// programmer error with no sane recovery.
    pub fn register<T: Component>(&mut self) -> TemplateId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }

        if self.by_name.contains_key(T::NAME) {
            panic!(
                "component name '{}' is already registered for a different type",
                T::NAME
            );
        }

        let id = TemplateId(self.infos.len() as u32);
        self.infos.push(TypeInfo {
            id,
            name: T::NAME,
            type_id: rust_type_id,
        });
        self.by_type.insert(rust_type_id, id);
        self.by_name.insert(T::NAME, id);
        id
    }

    /// Look up a component type's id, if it has been registered.
    pub fn lookup<T: Component>(&self) -> Option<TemplateId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// The id assigned to `T`.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if `T` was never registered.
    pub fn id_of<T: Component>(&self) -> Result<TemplateId, CoreError> {
        self.lookup::<T>().ok_or(CoreError::UnregisteredType {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Resolve a document key back to a registered type's id.
    pub fn lookup_by_name(&self, name: &str) -> Option<TemplateId> {
        self.by_name.get(name).copied()
    }

    /// Metadata for a registered id.
    pub fn info(&self, id: TemplateId) -> Option<&TypeInfo> {
        self.infos.get(id.index())
    }

    /// Iterate registered types in template-id (registration) order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.infos.iter()
    }

    /// Total number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Registered names in template-id order, joined for error messages.
    pub(crate) fn names_for_error(&self) -> String {
        self.infos
            .iter()
            .map(|i| i.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
