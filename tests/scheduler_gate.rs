use std::thread;

use archetype_store::engine::commands::Command;
use archetype_store::engine::config::SceneConfig;
use archetype_store::engine::error::{ECSError, InvariantError, RangeError, ThreadingError};
use archetype_store::engine::scene::{Scene, SceneOwner};
use archetype_store::engine::types::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Health(u32);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Poisoned;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Shield(u32);

fn scene_with(count: usize) -> (Scene, SceneOwner, Vec<EntityId>) {
    let (scene, owner) = Scene::new(SceneConfig::default()).unwrap();
    let ids = (0..count)
        .map(|i| scene.create_entity1(&owner, |_| Health(i as u32)).unwrap())
        .collect();
    (scene, owner, ids)
}

#[test]
fn deferred_changes_apply_after_the_visit() {
    let (scene, owner, ids) = scene_with(4);
    let query = scene.define_query::<(Health,)>().unwrap();

    query
        .visit_each(&scene, |entity, health| {
            if health.0 % 2 == 0 {
                let direct = scene.add_component::<Poisoned>(&owner, entity);
                assert_eq!(direct, Err(ECSError::Threading(ThreadingError::QueryInProgress)));
                scene.scheduler().enqueue_add_component::<Poisoned>(entity);
            }
        })
        .unwrap();

    assert_eq!(scene.scheduler().len(), 2);
    assert!(!scene.has_component::<Poisoned>(ids[0]));

    assert_eq!(scene.drain(&owner).unwrap(), 2);
    assert!(scene.scheduler().is_empty());
    assert!(scene.has_component::<Poisoned>(ids[0]));
    assert!(!scene.has_component::<Poisoned>(ids[1]));
    assert!(scene.has_component::<Poisoned>(ids[2]));
    assert_eq!(scene.get_component::<Health>(ids[2]).unwrap(), Health(2));
}

#[test]
fn other_threads_enqueue_through_a_clone() {
    let (scene, owner, ids) = scene_with(8);
    let scheduler = scene.scheduler().clone();

    let handles: Vec<_> = ids
        .chunks(2)
        .map(|chunk| {
            let scheduler = scheduler.clone();
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                for entity in chunk {
                    scheduler.enqueue_remove(entity);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(scene.drain(&owner).unwrap(), 8);
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn parallel_workers_can_enqueue() {
    let (scene, owner, _ids) = scene_with(64);
    let query = scene.define_query::<(Health,)>().unwrap().with_parallel(true);
    let scheduler = scene.scheduler().clone();

    query
        .visit_all_par(&scene, |entities, health| {
            for (&entity, h) in entities.iter().zip(health.iter()) {
                if h.0 >= 32 {
                    scheduler.enqueue_add_component_with(entity, Shield(h.0));
                }
            }
        })
        .unwrap();

    assert_eq!(scene.drain(&owner).unwrap(), 32);
    let shielded = scene.define_query::<(Health, Shield)>().unwrap();
    assert_eq!(shielded.count(&scene).unwrap(), 32);
    shielded.visit_each(&scene, |_, h, s| assert_eq!(h.0, s.0)).unwrap();
}

#[test]
fn drain_stops_at_the_first_failure() {
    let (scene, owner, ids) = scene_with(3);
    let scheduler = scene.scheduler();

    scheduler.enqueue_add_component::<Poisoned>(ids[0]);
    scheduler.enqueue_remove_component::<Shield>(ids[1]);
    scheduler.enqueue_remove(ids[2]);

    let err = scene.drain(&owner).unwrap_err();
    assert!(matches!(err, ECSError::Invariant(InvariantError::AbsentComponent { .. })));
    assert!(scene.has_component::<Poisoned>(ids[0]));
    assert_eq!(scheduler.len(), 1);
    assert!(scene.exists(ids[2]));

    assert_eq!(scene.drain(&owner).unwrap(), 1);
    assert!(!scene.exists(ids[2]));
}

#[test]
fn operations_on_removed_entities_fail_on_drain() {
    let (scene, owner, ids) = scene_with(1);

    scene.scheduler().enqueue_remove(ids[0]);
    scene.scheduler().enqueue_add_component::<Shield>(ids[0]);

    let err = scene.drain(&owner).unwrap_err();
    assert_eq!(err, ECSError::Range(RangeError::UnknownEntity { entity: ids[0] }));
}

#[test]
fn drain_applies_in_fifo_order() {
    let (scene, owner, ids) = scene_with(1);
    let e = ids[0];

    scene.scheduler().enqueue_add_component_with(e, Shield(5));
    scene.scheduler().enqueue_remove_component::<Shield>(e);
    scene.scheduler().enqueue_add_component_with(e, Shield(9));

    assert_eq!(scene.drain(&owner).unwrap(), 3);
    assert_eq!(scene.get_component::<Shield>(e).unwrap(), Shield(9));
}

#[test]
fn commands_describe_their_target() {
    let add = Command::add_component::<Shield>(EntityId(4));
    assert_eq!(add.entity(), EntityId(4));
    assert!(add.component_name().unwrap().ends_with("Shield"));

    let remove = Command::remove_entity(EntityId(4));
    assert_eq!(remove.component_name(), None);

    let (scene, owner, ids) = scene_with(1);
    scene.scheduler().enqueue(Command::add_component_with(ids[0], Shield(1)));
    scene.drain(&owner).unwrap();
    assert_eq!(scene.get_component::<Shield>(ids[0]).unwrap(), Shield(1));
}

#[test]
fn clear_drops_queued_operations() {
    let (scene, owner, ids) = scene_with(2);
    scene.scheduler().enqueue_remove(ids[0]);

    scene.clear(&owner).unwrap();

    assert!(scene.scheduler().is_empty());
    assert_eq!(scene.drain(&owner).unwrap(), 0);
}

#[test]
fn drain_requires_the_owner() {
    let (scene, _owner, ids) = scene_with(1);
    let (_other, other_owner) = Scene::new(SceneConfig::default()).unwrap();
    scene.scheduler().enqueue_remove(ids[0]);

    let err = scene.drain(&other_owner).unwrap_err();
    assert_eq!(err, ECSError::Threading(ThreadingError::ForeignOwner));
    assert_eq!(scene.scheduler().len(), 1);
}
