use archetype_store::engine::config::SceneConfig;
use archetype_store::engine::error::{ECSError, InvariantError, ThreadingError};
use archetype_store::engine::scene::{Scene, SceneOwner};
use archetype_store::engine::types::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Agent {
    wealth: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Location(i32, i32);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Vision(u8);

fn scene() -> (Scene, SceneOwner) {
    Scene::new(SceneConfig::default()).unwrap()
}

#[test]
fn initializer_sees_consecutive_ids() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Agent>().unwrap().with::<Location>().unwrap().build();

    let mut seen = Vec::new();
    let first = scene
        .bulk()
        .create_entities2::<Agent, Location>(&owner, archetype, 10, |id, agent, location| {
            seen.push(id);
            agent.wealth = id.raw() as u32 * 10;
            *location = Location(id.raw() as i32, -(id.raw() as i32));
        })
        .unwrap();

    let expected: Vec<EntityId> = (0..10).map(|k| first.offset(k)).collect();
    assert_eq!(seen, expected);
    assert_eq!(scene.entity_count(), 10);
    for e in expected {
        assert_eq!(scene.get_component::<Agent>(e).unwrap().wealth, e.raw() as u32 * 10);
        assert_eq!(scene.get_component::<Location>(e).unwrap(), Location(e.raw() as i32, -(e.raw() as i32)));
        assert_eq!(scene.get_archetype(e).unwrap(), archetype);
    }
}

#[test]
fn bulk_ids_continue_after_single_creates() {
    let (scene, owner) = scene();
    let single = scene.create_entity1(&owner, |_| Vision(1)).unwrap();
    let archetype = scene.archetype().with::<Vision>().unwrap().build();

    let first = scene.bulk().create_entities(&owner, archetype, 5).unwrap();
    let next = scene.create_entity1(&owner, |_| Vision(2)).unwrap();

    assert_eq!(first, single.offset(1));
    assert_eq!(next, first.offset(5));
}

#[test]
fn plain_bulk_create_leaves_default_values() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Agent>().unwrap().with::<Vision>().unwrap().build();

    let first = scene.bulk().create_entities(&owner, archetype, 3).unwrap();

    for k in 0..3 {
        let e = first.offset(k);
        assert_eq!(scene.get_component::<Agent>(e).unwrap(), Agent::default());
        assert_eq!(scene.get_component::<Vision>(e).unwrap(), Vision(0));
    }
}

#[test]
fn initializer_types_must_belong_to_the_archetype() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Agent>().unwrap().build();

    let err = scene
        .bulk()
        .create_entities2::<Agent, Vision>(&owner, archetype, 4, |_, _, _| {})
        .unwrap_err();

    assert!(matches!(err, ECSError::Invariant(InvariantError::MissingComponent { .. })));
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn large_batches_grow_the_pool_by_doubling() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Agent>().unwrap().with::<Location>().unwrap().build();

    scene
        .bulk()
        .create_entities1::<Agent>(&owner, archetype, 100, |_, agent| agent.wealth = 1)
        .unwrap();

    assert_eq!(scene.memory_report().unwrap(), "100/128 [Agent + Location]");
    let query = scene.define_query::<(Agent,)>().unwrap();
    let mut total = 0;
    query.visit_each(&scene, |_, agent| total += agent.wealth).unwrap();
    assert_eq!(total, 100);
}

#[test]
fn removing_from_a_batch_keeps_the_rest_resolvable() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Vision>().unwrap().build();
    let first = scene
        .bulk()
        .create_entities1::<Vision>(&owner, archetype, 6, |id, vision| vision.0 = id.raw() as u8)
        .unwrap();

    scene.remove_entity(&owner, first.offset(1)).unwrap();
    scene.remove_entity(&owner, first.offset(2)).unwrap();

    for k in [0, 3, 4, 5] {
        let e = first.offset(k);
        assert_eq!(scene.get_component::<Vision>(e).unwrap(), Vision(e.raw() as u8));
    }
}

#[test]
fn bulk_create_is_gated_during_queries() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Vision>().unwrap().build();
    scene.bulk().create_entities(&owner, archetype, 1).unwrap();
    let query = scene.define_query::<(Vision,)>().unwrap();

    let mut attempt = None;
    query
        .visit_all(&scene, |_, _| attempt = Some(scene.bulk().create_entities(&owner, archetype, 2)))
        .unwrap();

    assert_eq!(attempt, Some(Err(ECSError::Threading(ThreadingError::QueryInProgress))));
    assert_eq!(scene.entity_count(), 1);
}

#[test]
fn empty_batches_are_rejected_without_taking_an_id() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Vision>().unwrap().build();

    let err = scene.bulk().create_entities(&owner, archetype, 0).unwrap_err();
    assert_eq!(err, ECSError::Invariant(InvariantError::EmptyBatch));

    let next = scene.create_entity1(&owner, |_| Vision(1)).unwrap();
    assert_eq!(next, EntityId(1));
    assert_eq!(scene.entity_count(), 1);
}

#[test]
fn initializer_runs_with_the_scene_locked() {
    let (scene, owner) = scene();
    let archetype = scene.archetype().with::<Vision>().unwrap().build();

    let mut attempts = Vec::new();
    let first = scene
        .bulk()
        .create_entities1::<Vision>(&owner, archetype, 3, |_, vision| {
            assert!(scene.is_query_in_progress());
            attempts.push(scene.create_entity1(&owner, |_| Vision(9)));
            vision.0 = 1;
        })
        .unwrap();

    assert!(!scene.is_query_in_progress());
    assert_eq!(attempts.len(), 3);
    assert!(attempts
        .iter()
        .all(|a| *a == Err(ECSError::Threading(ThreadingError::QueryInProgress))));

    let next = scene.create_entity1(&owner, |_| Vision(2)).unwrap();
    assert_eq!(next, first.offset(3));
    assert_eq!(scene.entity_count(), 4);
}
