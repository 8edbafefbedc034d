use criterion::*;
use std::hint::black_box;

use archetype_store::engine::error::ECSResult;
use archetype_store::engine::query::{Query1, Query2};
use archetype_store::engine::scene::{Scene, SceneOwner};
use archetype_store::engine::systems::{System, SystemManager, Time};

mod common;
use common::*;

struct Production {
    query: Option<Query2<Productivity, Wealth>>,
}

impl System for Production {
    fn initialize(&mut self, scene: &Scene, _owner: &SceneOwner) -> ECSResult<()> {
        self.query = Some(scene.define_query::<(Productivity, Wealth)>()?.with_parallel(true));
        Ok(())
    }

    fn update(&mut self, scene: &Scene, _owner: &SceneOwner, time: Time) -> ECSResult<()> {
        match &self.query {
            Some(query) => query.visit_all_par(scene, |_, productivity, wealth| {
                for (p, w) in productivity.iter().zip(wealth.iter_mut()) {
                    w.value += p.rate * time.delta_time;
                }
            }),
            None => Ok(()),
        }
    }
}

struct Decay {
    query: Option<Query1<Wealth>>,
}

impl System for Decay {
    fn initialize(&mut self, scene: &Scene, _owner: &SceneOwner) -> ECSResult<()> {
        self.query = Some(scene.define_query::<(Wealth,)>()?);
        Ok(())
    }

    fn update(&mut self, scene: &Scene, _owner: &SceneOwner, _time: Time) -> ECSResult<()> {
        match &self.query {
            Some(query) => query.visit_each(scene, |entity, w| {
                w.value *= 0.99;
                if w.value < 1.0 {
                    scene.scheduler().enqueue_remove(entity);
                }
            }),
            None => Ok(()),
        }
    }
}

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group.bench_function("tick_2_systems_1M", |b| {
        b.iter_batched(
            || {
                let (scene, owner) = setup_world(AGENTS_MED).unwrap();
                let mut systems = SystemManager::new();
                systems.add(Production { query: None }).unwrap();
                systems.add(Decay { query: None }).unwrap();
                systems.initialize_all(&scene, &owner).unwrap();
                (scene, owner, systems)
            },
            |(scene, owner, mut systems)| {
                let applied = scene
                    .tick(&owner, &mut systems, Time::new(0.0, 1.0 / 60.0))
                    .unwrap();

                black_box(applied);
                black_box((scene, owner, systems));
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
