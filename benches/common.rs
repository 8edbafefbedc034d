#![allow(dead_code)]

use archetype_store::engine::archetype::Archetype;
use archetype_store::engine::config::SceneConfig;
use archetype_store::engine::error::ECSResult;
use archetype_store::engine::scene::{Scene, SceneOwner};

pub const AGENTS_SMALL: usize = 100_000;
pub const AGENTS_MED: usize = 1_000_000;

#[derive(Clone, Copy, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Wealth {
    pub value: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Productivity {
    pub rate: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Age {
    pub years: u32,
}

#[derive(Clone, Copy, Default)]
pub struct Bankrupt;

pub fn agent_archetype(scene: &Scene) -> ECSResult<Archetype> {
    Ok(scene
        .archetype()
        .with::<Position>()?
        .with::<Wealth>()?
        .with::<Productivity>()?
        .with::<Age>()?
        .build())
}

pub fn setup_world(agent_count: usize) -> ECSResult<(Scene, SceneOwner)> {
    let (scene, owner) = Scene::new(SceneConfig::default())?;
    let archetype = agent_archetype(&scene)?;

    scene
        .bulk()
        .create_entities4::<Position, Wealth, Productivity, Age>(
            &owner,
            archetype,
            agent_count,
            |id, position, wealth, productivity, age| {
                position.x = (id.raw() % 1000) as f32;
                wealth.value = 100.0;
                productivity.rate = 1.0;
                age.years = (id.raw() % 80) as u32;
            },
        )?;

    Ok((scene, owner))
}
