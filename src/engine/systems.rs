//! Frame-level systems.
//!
//! A **system** is a unit of per-frame logic operating on a [`Scene`]. Systems
//! run sequentially on the owning thread, in the order they were added; they
//! parallelize internally through queries if they want to.
//!
//! ## Lifecycle
//!
//! 1. Systems are added to a [`SystemManager`]. Each concrete type may be
//!    added once.
//! 2. [`SystemManager::initialize_all`] runs every `initialize` once. No
//!    system can be added afterwards.
//! 3. Each frame, [`Scene::tick`] runs [`SystemManager::update_all`] and then
//!    drains the scheduler.
//!
//! ## Profiling
//!
//! Every system gets a [`PerformanceCounter`] holding its last 20 update
//! durations, plus one `SystemTotal` counter for the whole frame.
//! [`SystemManager::performance_report`] lists them by descending average.

use std::{
    any::{type_name, TypeId},
    collections::HashSet,
    fmt,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::engine::component::short_type_name;
use crate::engine::error::{ECSResult, InvariantError};
use crate::engine::scene::{Scene, SceneOwner};


/// Frame duration the percentages of a [`PerformanceCounter`] refer to.
pub const TARGET_FRAME_SECONDS: f64 = 1.0 / 60.0;

/// Number of measurements a [`PerformanceCounter`] averages over.
pub const MEASUREMENT_COUNT: usize = 20;

/// Frame timing handed to every system update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Time {
    /// Seconds elapsed since the previous frame.
    pub delta_time: f32,
    /// Seconds elapsed since start.
    pub total_time: f32,
}

impl Time {
    /// Builds a frame time.
    pub fn new(total_time: f32, delta_time: f32) -> Self {
        Self { delta_time, total_time }
    }

    /// The time of the next frame, `delta_time` seconds later.
    pub fn advance(self, delta_time: f32) -> Self {
        Self { delta_time, total_time: self.total_time + delta_time }
    }
}

/// Per-frame logic driven by a [`SystemManager`].
pub trait System: 'static {
    /// Display name used in performance reports.
    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }

    /// Runs once, before the first update.
    fn initialize(&mut self, _scene: &Scene, _owner: &SceneOwner) -> ECSResult<()> {
        Ok(())
    }

    /// Runs once per frame.
    fn update(&mut self, scene: &Scene, owner: &SceneOwner, time: Time) -> ECSResult<()>;
}

/// Rolling average over the last [`MEASUREMENT_COUNT`] durations.
#[derive(Clone, Debug)]
pub struct PerformanceCounter {
    name: String,
    measurements: [f64; MEASUREMENT_COUNT],
    cursor: usize,
}

impl PerformanceCounter {
    /// Creates a counter with every measurement at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), measurements: [0.0; MEASUREMENT_COUNT], cursor: 0 }
    }

    /// Counter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records one duration, overwriting the oldest.
    pub fn add_measurement(&mut self, elapsed: Duration) {
        self.measurements[self.cursor] = elapsed.as_secs_f64();
        self.cursor = (self.cursor + 1) % MEASUREMENT_COUNT;
    }

    /// Average in seconds.
    pub fn value(&self) -> f64 {
        self.measurements.iter().sum::<f64>() / MEASUREMENT_COUNT as f64
    }

    /// Resets every measurement to zero.
    pub fn clear(&mut self) {
        self.measurements = [0.0; MEASUREMENT_COUNT];
        self.cursor = 0;
    }
}

impl fmt::Display for PerformanceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value();
        write!(
            f,
            "{} = {:.3} ms  ({:.1}%)",
            self.name,
            value * 1000.0,
            value * 100.0 / TARGET_FRAME_SECONDS
        )
    }
}

struct SystemEntry {
    system: Box<dyn System>,
    counter: PerformanceCounter,
}

/// Ordered set of systems with per-system timing.
pub struct SystemManager {
    entries: Vec<SystemEntry>,
    types: HashSet<TypeId>,
    total: PerformanceCounter,
    initialized: bool,
}

impl Default for SystemManager {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            types: HashSet::new(),
            total: PerformanceCounter::new("SystemTotal"),
            initialized: false,
        }
    }
}

impl SystemManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `system`.
    ///
    /// # Errors
    /// - [`InvariantError::SystemsInitialized`] after [`initialize_all`](Self::initialize_all).
    /// - [`InvariantError::DuplicateSystem`] if a system of type `S` was already added.

    pub fn add<S: System>(&mut self, system: S) -> ECSResult<()> {
        if self.initialized {
            return Err(InvariantError::SystemsInitialized.into());
        }
        if !self.types.insert(TypeId::of::<S>()) {
            return Err(InvariantError::DuplicateSystem { name: type_name::<S>() }.into());
        }

        let counter = PerformanceCounter::new(system.name());
        self.entries.push(SystemEntry { system: Box::new(system), counter });
        Ok(())
    }

    /// Runs every system's `initialize` in order and closes the set.
    pub fn initialize_all(&mut self, scene: &Scene, owner: &SceneOwner) -> ECSResult<()> {
        for entry in &mut self.entries {
            entry.system.initialize(scene, owner)?;
        }
        self.initialized = true;
        debug!(systems = self.entries.len(), "systems initialized");
        Ok(())
    }

    /// Runs every system's `update` in order, timing each one.
    pub fn update_all(&mut self, scene: &Scene, owner: &SceneOwner, time: Time) -> ECSResult<()> {
        let frame_start = Instant::now();
        for entry in &mut self.entries {
            let start = Instant::now();
            entry.system.update(scene, owner, time)?;
            entry.counter.add_measurement(start.elapsed());
        }
        self.total.add_measurement(frame_start.elapsed());
        Ok(())
    }

    /// Number of systems.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no system was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` once [`initialize_all`](Self::initialize_all) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Counter of the system named `name`, or the `SystemTotal` counter.
    pub fn counter(&self, name: &str) -> Option<&PerformanceCounter> {
        if self.total.name() == name {
            return Some(&self.total);
        }
        self.entries
            .iter()
            .map(|entry| &entry.counter)
            .find(|counter| counter.name() == name)
    }

    /// Every counter, most expensive first, one per line.
    pub fn performance_report(&self) -> String {
        let mut counters: Vec<&PerformanceCounter> = self
            .entries
            .iter()
            .map(|entry| &entry.counter)
            .chain(std::iter::once(&self.total))
            .collect();
        counters.sort_by(|a, b| b.value().total_cmp(&a.value()));
        counters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Removes every system and reopens the set for additions.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.types.clear();
        self.total.clear();
        self.initialized = false;
    }
}

impl fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemManager")
            .field("systems", &self.entries.iter().map(|e| e.system.name()).collect::<Vec<_>>())
            .field("initialized", &self.initialized)
            .finish()
    }
}
