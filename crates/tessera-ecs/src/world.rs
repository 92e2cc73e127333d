//! The [`World`] is the top-level container for the core. It owns the entity
//! allocator, the type registry, and one sparse component store per
//! registered type.

use crate::component::{Component, TemplateId, TypeRegistry};
use crate::entity::{EntityAllocator, EntityId};
use crate::store::{AnyStore, ComponentStore};
use crate::CoreError;

/// Top-level entity-component container.
///
/// All state is instance-owned: two worlds never observe each other's
/// registrations or entities, and template ids are only meaningful within the
/// world that assigned them.
pub struct World {
    pub(crate) allocator: EntityAllocator,
    pub(crate) registry: TypeRegistry,
    /// Indexed by `TemplateId`.
    pub(crate) stores: Vec<Box<dyn AnyStore>>,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            registry: TypeRegistry::new(),
            stores: Vec::new(),
        }
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Allocate a fresh entity id.
    ///
    /// Ids are monotonic and never reused within this world, including ids
    /// observed through deserialized documents.
    pub fn new_entity(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Register a component type, creating its store on first registration.
    ///
    /// Idempotent: re-registering returns the existing [`TemplateId`].
    /// Registration order fixes the type order of serialized documents.
    pub fn register_component<T: Component>(&mut self) -> TemplateId {
        let before = self.registry.len();
        let id = self.registry.register::<T>();
        if self.registry.len() > before {
            self.stores.push(Box::new(ComponentStore::<T>::new()));
            tracing::debug!(name = T::NAME, id = ?id, "registered component type");
        }
        id
    }

    /// Insert or overwrite the component of type `T` for `entity`.
    ///
    /// An entity that already owns a `T` gets it silently replaced.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if `T` was never registered.
    pub fn add_component<T: Component>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> Result<(), CoreError> {
        self.store_mut::<T>()?.add(entity, value);
        Ok(())
    }

    /// The component of type `T` owned by `entity`, if any.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.store::<T>().ok()?.get(entity)
    }

    /// Mutable access to the component of type `T` owned by `entity`.
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.store_mut::<T>().ok()?.get_mut(entity)
    }

    /// Whether `entity` owns a component of type `T`.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.store::<T>().map(|s| s.contains(entity)).unwrap_or(false)
    }

    /// Remove and return `entity`'s component of type `T`.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if `T` was never registered.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<T>, CoreError> {
        Ok(self.store_mut::<T>()?.remove(entity))
    }

    /// Remove `entity`'s components from every store.
    ///
    /// The entity id itself stays retired -- ids are never reissued.
    pub fn remove_entity(&mut self, entity: EntityId) {
        for store in &mut self.stores {
            store.remove_erased(entity);
        }
    }

    /// Restore ascending entity-id order in component stores.
    ///
    /// `all = true` visits every store; `all = false` skips stores already in
    /// normalized order. Must be called before walking systems or iterating
    /// stores after unordered mutation.
    pub fn renormalize(&mut self, all: bool) {
        for store in &mut self.stores {
            if all || !store.is_sorted() {
                store.renormalize();
            }
        }
    }

    /// Remove every component from every store.
    ///
    /// Registrations, template ids, and the entity allocator are untouched:
    /// a subsequent serialization still lists every type, each with an empty
    /// data array.
    pub fn clear_all_components(&mut self) {
        for store in &mut self.stores {
            store.clear();
        }
    }

    /// Number of components of type `T` currently stored.
    pub fn component_count<T: Component>(&self) -> usize {
        self.store::<T>().map(|s| s.len()).unwrap_or(0)
    }

    /// Number of registered component types.
    pub fn registered_type_count(&self) -> usize {
        self.registry.len()
    }

    /// Typed access to the store for `T`.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if `T` was never registered.
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, CoreError> {
        let id = self.registry.id_of::<T>()?;
        Ok(self.stores[id.index()]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .expect("store type matches registry entry"))
    }

    /// Mutable typed access to the store for `T`.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if `T` was never registered.
    pub fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>, CoreError> {
        let id = self.registry.id_of::<T>()?;
        Ok(self.stores[id.index()]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .expect("store type matches registry entry"))
    }

    /// Type-erased store access by template id.
    pub(crate) fn store_erased(&self, id: TemplateId) -> &dyn AnyStore {
        self.stores[id.index()].as_ref()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
