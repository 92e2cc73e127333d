//! Property tests for core operations.
//!
//! These tests use `proptest` to generate random sequences of store
//! mutations and verify the core's invariants against a shadow model: direct
//! lookups always agree with the model, and walk counts always equal the
//! model's set intersection.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tessera_ecs::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Pos {
    x: i64,
    y: i64,
}

impl Component for Pos {
    const NAME: &'static str = "pos";
    fn serialize(&self, w: &mut FieldWriter, _entity: EntityId) -> bool {
        w.write_i64("x", self.x);
        w.write_i64("y", self.y);
        true
    }
    fn deserialize(&mut self, r: &FieldReader<'_>) -> Result<(), CoreError> {
        self.x = r.read_i64("x")?;
        self.y = r.read_i64("y")?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Vel {
    dx: i64,
}

impl Component for Vel {
    const NAME: &'static str = "vel";
    fn serialize(&self, w: &mut FieldWriter, _entity: EntityId) -> bool {
        w.write_i64("dx", self.dx);
        true
    }
    fn deserialize(&mut self, r: &FieldReader<'_>) -> Result<(), CoreError> {
        self.dx = r.read_i64("dx")?;
        Ok(())
    }
}

/// Operations we can perform on the world.
#[derive(Debug, Clone)]
enum CoreOp {
    AddPos(u64, i64, i64),
    AddVel(u64, i64),
    RemovePos(u64),
    RemoveEntity(u64),
    ClearAll,
}

fn core_op_strategy() -> impl Strategy<Value = CoreOp> {
    // Entity ids drawn from a small range so overwrites and removals hit.
    let id = 1..40u64;
    prop_oneof![
        (id.clone(), any::<i64>(), any::<i64>()).prop_map(|(e, x, y)| CoreOp::AddPos(e, x, y)),
        (id.clone(), any::<i64>()).prop_map(|(e, dx)| CoreOp::AddVel(e, dx)),
        id.clone().prop_map(CoreOp::RemovePos),
        id.prop_map(CoreOp::RemoveEntity),
        Just(CoreOp::ClearAll),
    ]
}

fn setup_world() -> World {
    let mut world = World::new();
    world.register_component::<Pos>();
    world.register_component::<Vel>();
    world
}

proptest! {
    #[test]
    fn random_ops_preserve_store_and_walk_invariants(
        ops in prop::collection::vec(core_op_strategy(), 1..60),
    ) {
        let mut world = setup_world();
        let mut model_pos: BTreeMap<u64, (i64, i64)> = BTreeMap::new();
        let mut model_vel: BTreeMap<u64, i64> = BTreeMap::new();

        for op in ops {
            match op {
                CoreOp::AddPos(e, x, y) => {
                    world.add_component(EntityId::from_raw(e), Pos { x, y }).unwrap();
                    model_pos.insert(e, (x, y));
                }
                CoreOp::AddVel(e, dx) => {
                    world.add_component(EntityId::from_raw(e), Vel { dx }).unwrap();
                    model_vel.insert(e, dx);
                }
                CoreOp::RemovePos(e) => {
                    let removed = world.remove_component::<Pos>(EntityId::from_raw(e)).unwrap();
                    prop_assert_eq!(removed.is_some(), model_pos.remove(&e).is_some());
                }
                CoreOp::RemoveEntity(e) => {
                    world.remove_entity(EntityId::from_raw(e));
                    model_pos.remove(&e);
                    model_vel.remove(&e);
                }
                CoreOp::ClearAll => {
                    world.clear_all_components();
                    model_pos.clear();
                    model_vel.clear();
                }
            }

            // Direct lookups agree with the model at every step.
            prop_assert_eq!(world.component_count::<Pos>(), model_pos.len());
            prop_assert_eq!(world.component_count::<Vel>(), model_vel.len());
            for (&e, &(x, y)) in &model_pos {
                prop_assert_eq!(
                    world.get_component::<Pos>(EntityId::from_raw(e)),
                    Some(&Pos { x, y })
                );
            }
        }

        // After renormalizing, walks visit exactly the model intersection,
        // ascending.
        world.renormalize(false);

        let expected: Vec<u64> = model_pos
            .keys()
            .filter(|e| model_vel.contains_key(e))
            .copied()
            .collect();

        let mut visited = Vec::new();
        let count = world
            .walk::<(Pos, Vel)>(|entity, _| visited.push(entity.to_raw()))
            .unwrap();

        prop_assert_eq!(count, expected.len());
        prop_assert_eq!(visited, expected);
    }

    /// Serialize -> restore -> serialize yields a structurally identical
    /// document for arbitrary sparse populations.
    #[test]
    fn roundtrip_identity_for_arbitrary_populations(
        pos in prop::collection::btree_map(1..200u64, (any::<i64>(), any::<i64>()), 0..40),
        vel in prop::collection::btree_map(1..200u64, any::<i64>(), 0..40),
    ) {
        let mut world = setup_world();
        for (&e, &(x, y)) in &pos {
            world.add_component(EntityId::from_raw(e), Pos { x, y }).unwrap();
        }
        for (&e, &dx) in &vel {
            world.add_component(EntityId::from_raw(e), Vel { dx }).unwrap();
        }

        let doc = world.serialize_components();

        let mut restored = setup_world();
        restored.deserialize_components_create(&doc).unwrap();
        let doc2 = restored.serialize_components();

        prop_assert_eq!(&doc2, &doc);

        // And the encoded buffer round-trips losslessly.
        let bytes = dump(&doc);
        prop_assert_eq!(load(&bytes).unwrap(), doc);
    }

    /// The intersection walked is exactly the set intersection of owners,
    /// regardless of insertion order.
    #[test]
    fn walk_matches_set_intersection(
        pos_ids in prop::collection::vec(1..100u64, 0..50),
        vel_ids in prop::collection::vec(1..100u64, 0..50),
    ) {
        let mut world = setup_world();
        for &e in &pos_ids {
            world.add_component(EntityId::from_raw(e), Pos { x: 0, y: 0 }).unwrap();
        }
        for &e in &vel_ids {
            world.add_component(EntityId::from_raw(e), Vel { dx: 0 }).unwrap();
        }
        world.renormalize(true);

        let pos_set: BTreeSet<u64> = pos_ids.iter().copied().collect();
        let vel_set: BTreeSet<u64> = vel_ids.iter().copied().collect();
        let expected: Vec<u64> = pos_set.intersection(&vel_set).copied().collect();

        let mut visited = Vec::new();
        world
            .walk::<(Pos, Vel)>(|entity, _| visited.push(entity.to_raw()))
            .unwrap();
        prop_assert_eq!(visited, expected);
    }
}
