use archetype_store::engine::archetype::Archetype;
use archetype_store::engine::config::SceneConfig;
use archetype_store::engine::error::{CapacityError, ECSError, InvariantError, RangeError, ThreadingError};
use archetype_store::engine::scene::Scene;
use archetype_store::engine::types::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Mass(f32);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Tag(u64);

fn scene() -> (Scene, archetype_store::SceneOwner) {
    Scene::new(SceneConfig::default()).unwrap()
}

#[test]
fn add_component_keeps_shared_values() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Position>().unwrap().with::<Velocity>().unwrap().build();

    let e = scene.create_entity(&owner, archetype).unwrap();
    scene.set_component(e, Position { x: 1.0, y: 2.0 }).unwrap();
    scene.set_component(e, Velocity { x: 3.0, y: 4.0 }).unwrap();
    let old_archetype = scene.get_archetype(e).unwrap();

    scene.add_component::<Mass>(&owner, e).unwrap();

    let new_archetype = scene.get_archetype(e).unwrap();
    assert_ne!(old_archetype, new_archetype);
    assert_eq!(new_archetype.component_count(), 3);
    assert_eq!(scene.get_component::<Position>(e).unwrap(), Position { x: 1.0, y: 2.0 });
    assert_eq!(scene.get_component::<Velocity>(e).unwrap(), Velocity { x: 3.0, y: 4.0 });
    assert_eq!(scene.get_component::<Mass>(e).unwrap(), Mass(0.0));
    assert!(scene.has_component::<Mass>(e));
    assert_eq!(scene.entity_count(), 1);
}

#[test]
fn remove_component_drops_only_that_column() {
    let (scene, owner) = scene();
    let e = scene
        .create_entity2(&owner, |_| Position { x: 5.0, y: 6.0 }, |_| Mass(2.0))
        .unwrap();

    scene.remove_component::<Mass>(&owner, e).unwrap();

    assert!(!scene.has_component::<Mass>(e));
    assert_eq!(scene.get_component::<Position>(e).unwrap(), Position { x: 5.0, y: 6.0 });
    let err = scene.get_component::<Mass>(e).unwrap_err();
    assert!(matches!(err, ECSError::Invariant(InvariantError::MissingComponent { .. })));
}

#[test]
fn removing_the_last_component_keeps_the_entity() {
    let (scene, owner) = scene();
    let e = scene.create_entity1(&owner, |_| Mass(1.0)).unwrap();

    scene.remove_component::<Mass>(&owner, e).unwrap();

    assert!(scene.exists(e));
    assert_eq!(scene.get_archetype(e).unwrap(), Archetype::EMPTY);
}

#[test]
fn duplicate_and_absent_components_are_rejected() {
    let (scene, owner) = scene();
    let e = scene.create_entity1(&owner, |_| Mass(1.0)).unwrap();

    let err = scene.add_component::<Mass>(&owner, e).unwrap_err();
    assert!(matches!(err, ECSError::Invariant(InvariantError::DuplicateComponent { .. })));

    let err = scene.remove_component::<Velocity>(&owner, e).unwrap_err();
    assert!(matches!(err, ECSError::Invariant(InvariantError::AbsentComponent { .. })));

    assert_eq!(scene.get_component::<Mass>(e).unwrap(), Mass(1.0));
}

#[test]
fn swap_remove_updates_the_moved_entity() {
    let (scene, owner) = scene();
    let ids: Vec<EntityId> = (0..5)
        .map(|i| scene.create_entity1(&owner, |_| Mass(i as f32)).unwrap())
        .collect();

    scene.remove_entity(&owner, ids[1]).unwrap();

    assert_eq!(scene.entity_count(), 4);
    assert!(!scene.exists(ids[1]));
    for (i, &e) in ids.iter().enumerate().filter(|(i, _)| *i != 1) {
        assert_eq!(scene.get_component::<Mass>(e).unwrap(), Mass(i as f32));
    }
}

#[test]
fn index_resolves_every_entity_after_churn() {
    let (scene, owner) = scene();
    let mut alive: Vec<EntityId> = Vec::new();

    for round in 0..200u64 {
        let e = scene.create_entity1(&owner, |id| Tag(id.raw())).unwrap();
        alive.push(e);

        match round % 5 {
            0 => scene.add_component::<Mass>(&owner, e).unwrap(),
            1 if alive.len() > 3 => {
                let victim = alive.remove(alive.len() / 2);
                scene.remove_entity(&owner, victim).unwrap();
            }
            2 => {
                let first = alive[0];
                if scene.has_component::<Mass>(first) {
                    scene.remove_component::<Mass>(&owner, first).unwrap();
                } else {
                    scene.add_component::<Mass>(&owner, first).unwrap();
                }
            }
            _ => {}
        }
    }

    assert_eq!(scene.entity_count(), alive.len());
    for &e in &alive {
        assert_eq!(scene.get_component::<Tag>(e).unwrap(), Tag(e.raw()));
    }
}

#[test]
fn removing_unknown_entities_is_a_no_op() {
    let (scene, owner) = scene();
    let e = scene.create_entity(&owner, Archetype::EMPTY).unwrap();

    scene.remove_entity(&owner, e).unwrap();
    scene.remove_entity(&owner, e).unwrap();
    scene.remove_entity(&owner, EntityId(999)).unwrap();

    assert!(!scene.exists(e));
    let err = scene.get_component::<Mass>(e).unwrap_err();
    assert_eq!(err, ECSError::Range(RangeError::UnknownEntity { entity: e }));
    let err = scene.add_component::<Mass>(&owner, e).unwrap_err();
    assert_eq!(err, ECSError::Range(RangeError::UnknownEntity { entity: e }));
}

#[test]
fn ids_are_never_reused() {
    let (scene, owner) = scene();
    let first = scene.create_entity(&owner, Archetype::EMPTY).unwrap();
    assert_eq!(first, EntityId(1));

    scene.remove_entity(&owner, first).unwrap();
    let second = scene.create_entity(&owner, Archetype::EMPTY).unwrap();
    assert!(second > first);

    scene.clear(&owner).unwrap();
    let third = scene.create_entity(&owner, Archetype::EMPTY).unwrap();
    assert!(third > second);
    assert_eq!(scene.entity_count(), 1);
}

#[test]
fn clear_keeps_pools_and_registrations() {
    let (scene, owner) = scene();
    scene.create_entity2(&owner, |_| Position::default(), |_| Velocity::default()).unwrap();
    scene.create_entity1(&owner, |_| Mass(1.0)).unwrap();
    let pools = scene.pool_count();
    let components = scene.component_count();

    scene.clear(&owner).unwrap();

    assert_eq!(scene.entity_count(), 0);
    assert_eq!(scene.pool_count(), pools);
    assert_eq!(scene.component_count(), components);
}

#[test]
fn foreign_owner_is_rejected() {
    let (scene, _owner) = scene();
    let (_other, other_owner) = Scene::new(SceneConfig::default()).unwrap();

    let err = scene.create_entity(&other_owner, Archetype::EMPTY).unwrap_err();
    assert_eq!(err, ECSError::Threading(ThreadingError::ForeignOwner));
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn archetype_limit_is_enforced() {
    let config = SceneConfig { max_archetypes: 2, ..SceneConfig::default() };
    let (scene, owner) = Scene::new(config).unwrap();

    scene.create_entity(&owner, Archetype::EMPTY).unwrap();
    let e = scene.create_entity1(&owner, |_| Mass(1.0)).unwrap();

    let err = scene.add_component::<Tag>(&owner, e).unwrap_err();
    assert!(matches!(err, ECSError::Capacity(CapacityError::Archetypes { limit: 2, .. })));
    assert_eq!(scene.get_component::<Mass>(e).unwrap(), Mass(1.0));
}

#[test]
fn add_component_with_sets_the_value() {
    let (scene, owner) = scene();
    let e = scene.create_entity(&owner, Archetype::EMPTY).unwrap();

    scene.add_component_with(&owner, e, Velocity { x: 9.0, y: -1.0 }).unwrap();

    assert_eq!(scene.get_component::<Velocity>(e).unwrap(), Velocity { x: 9.0, y: -1.0 });
}

#[test]
fn component_ref_writes_through() {
    let (mut scene, owner) = scene();
    let e = scene.create_entity1(&owner, |_| Position { x: 0.0, y: 0.0 }).unwrap();

    scene.get_component_ref::<Position>(e).unwrap().x = 42.0;

    assert_eq!(scene.get_component::<Position>(e).unwrap().x, 42.0);
    assert!(scene.get_component_ref::<Velocity>(e).is_err());
}

#[test]
fn typed_create_passes_the_new_id() {
    let (scene, owner) = scene();

    let e = scene
        .create_entity3(&owner, |id| Tag(id.raw()), |_| Mass(3.0), |_| Position { x: 1.0, y: 1.0 })
        .unwrap();

    assert_eq!(scene.get_component::<Tag>(e).unwrap(), Tag(e.raw()));
    assert_eq!(scene.get_archetype(e).unwrap().component_count(), 3);
    let names = scene.archetype_name(scene.get_archetype(e).unwrap()).unwrap();
    assert_eq!(names, "[Mass + Position + Tag]");
}

#[test]
fn archetype_names_follow_migrations() {
    let (scene, owner) = scene();
    let e = scene.create_entity1(&owner, |_| Velocity::default()).unwrap();
    assert_eq!(scene.archetype_name(scene.get_archetype(e).unwrap()).unwrap(), "[Velocity]");

    scene.add_component::<Position>(&owner, e).unwrap();
    assert_eq!(scene.archetype_name(scene.get_archetype(e).unwrap()).unwrap(), "[Position + Velocity]");

    scene.remove_component::<Velocity>(&owner, e).unwrap();
    scene.remove_component::<Position>(&owner, e).unwrap();
    assert_eq!(scene.archetype_name(Archetype::EMPTY).unwrap(), "[]");
    assert_eq!(scene.get_archetype(e).unwrap(), Archetype::EMPTY);
}

#[test]
fn memory_report_lists_every_pool() {
    let (scene, owner) = scene();
    for _ in 0..5 {
        scene.create_entity1(&owner, |_| Mass(1.0)).unwrap();
    }
    scene.create_entity(&owner, Archetype::EMPTY).unwrap();

    let report = scene.memory_report().unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines, vec!["5/8 [Mass]", "1/4 []"]);
}

#[test]
fn scene_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Scene>();

    let (scene, _owner) = scene();
    let handle = std::thread::spawn(move || scene.entity_count());
    assert_eq!(handle.join().unwrap(), 0);
}
