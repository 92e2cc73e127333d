//! Execution engine: walking entities by required component set.
//!
//! A walk visits every entity that owns *all* of a set of component types,
//! in ascending entity-id order, and invokes a callback once per entity with
//! references to each matching component. The intersection is computed by a
//! K-way merge over the stores' sorted entry sequences -- O(total entries),
//! never per-entity lookups into unsorted data.
//!
//! ## Contract
//!
//! Every required store must have been renormalized since its last unordered
//! mutation. Violating this is programmer error and trips a debug assertion;
//! release builds walk whatever order the stores are in.

use crate::component::{Component, TemplateId};
use crate::entity::EntityId;
use crate::world::World;
use crate::CoreError;

// ---------------------------------------------------------------------------
// ComponentSet -- a tuple of required component types
// ---------------------------------------------------------------------------

/// A fixed set of component types a system requires, expressed as a tuple:
/// `(A,)`, `(A, B)`, up to four types.
pub trait ComponentSet {
    /// Per-entity output: one reference per required type.
    type Refs<'w>;

    /// Resolve the template id of each required type, in declaration order.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if any type was never registered.
    fn template_ids(world: &World) -> Result<Vec<TemplateId>, CoreError>;

    /// Fetch references for an entity known to own every required type.
    fn fetch(world: &World, id: EntityId) -> Self::Refs<'_>;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Refs<'w> = ($(&'w $ty,)+);

            fn template_ids(world: &World) -> Result<Vec<TemplateId>, CoreError> {
                Ok(vec![$(world.registry().id_of::<$ty>()?),+])
            }

            fn fetch(world: &World, id: EntityId) -> Self::Refs<'_> {
                ($(
                    world
                        .store::<$ty>()
                        .expect("template ids resolved before fetch")
                        .get(id)
                        .expect("entity is in the store intersection"),
                )+)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);

// ---------------------------------------------------------------------------
// System -- a named callback bound to a component set
// ---------------------------------------------------------------------------

/// A system: a callback bound to a fixed set of required component types,
/// invoked once per qualifying entity by [`World::run_system`].
pub trait System {
    /// The component types this system requires.
    type Set: ComponentSet;

    /// Called once per entity owning every required type, ascending by id.
    fn run(&mut self, entity: EntityId, components: <Self::Set as ComponentSet>::Refs<'_>);
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

impl World {
    /// Invoke `f` once for each entity owning every component type in `S`,
    /// in ascending entity-id order. Returns the invocation count.
    ///
    /// Entities present in some but not all of the required stores are
    /// skipped entirely; an empty store yields zero invocations. All required
    /// stores must be renormalized first (debug assertion).
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if any type in `S` was never
    /// registered.
    pub fn walk<S: ComponentSet>(
        &self,
        mut f: impl FnMut(EntityId, S::Refs<'_>),
    ) -> Result<usize, CoreError> {
        let template_ids = S::template_ids(self)?;
        let stores: Vec<_> = template_ids
            .iter()
            .map(|&id| self.store_erased(id))
            .collect();

        for store in &stores {
            debug_assert!(
                store.is_sorted(),
                "walk requires World::renormalize() after unordered mutation"
            );
        }
        if stores.iter().any(|s| s.len() == 0) {
            return Ok(0);
        }

        // K-way merge: hold a cursor per store, raise the candidate id to the
        // largest id under any cursor, and advance the laggards until either
        // every cursor agrees (a match) or one runs out (done).
        let mut cursors = vec![0usize; stores.len()];
        let mut invocations = 0usize;

        'merge: loop {
            let Some(mut candidate) = stores[0].id_at(cursors[0]) else {
                break;
            };
            loop {
                let mut all_match = true;
                for (k, store) in stores.iter().enumerate() {
                    loop {
                        match store.id_at(cursors[k]) {
                            None => break 'merge,
                            Some(id) if id < candidate => cursors[k] += 1,
                            Some(id) if id == candidate => break,
                            Some(id) => {
                                candidate = id;
                                all_match = false;
                                break;
                            }
                        }
                    }
                }
                if all_match {
                    break;
                }
            }

            f(candidate, S::fetch(self, candidate));
            invocations += 1;
            for cursor in cursors.iter_mut() {
                *cursor += 1;
            }
        }

        Ok(invocations)
    }

    /// Run a named [`System`] over its required component set.
    ///
    /// Equivalent to [`walk`](Self::walk) with the system's `run` as the
    /// callback; returns the invocation count.
    pub fn run_system<S: System>(&self, system: &mut S) -> Result<usize, CoreError> {
        self.walk::<S::Set>(|entity, components| system.run(entity, components))
    }
}
