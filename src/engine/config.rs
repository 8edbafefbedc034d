//! Scene construction settings.
//!
//! A [`SceneConfig`] is supplied once when a [`Scene`](crate::engine::scene::Scene)
//! is built. It can be written in code or loaded from a TOML document; missing
//! keys fall back to their defaults.
//!
//! ```toml
//! max_component_types = 32
//! max_archetypes = 128
//! initial_entity_capacity = 10000
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::error::{ConfigError, ECSResult};
use crate::engine::types::{INITIAL_POOL_CAPACITY, MAX_COMPONENT_TYPES};


/// Limits and sizing hints for one scene.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Maximum number of distinct component types (hard cap 64).
    pub max_component_types: usize,

    /// Maximum number of distinct archetypes, bounding the pool table.
    pub max_archetypes: usize,

    /// Initial capacity of the entity index. A sizing hint only.
    pub initial_entity_capacity: usize,

    /// Slot capacity of a freshly created pool.
    pub initial_pool_capacity: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_component_types: MAX_COMPONENT_TYPES,
            max_archetypes: 256,
            initial_entity_capacity: 1024,
            initial_pool_capacity: INITIAL_POOL_CAPACITY,
        }
    }
}

impl SceneConfig {
    /// Parses a TOML document and validates the result.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed documents and the matching
    /// range variant for out-of-range values.

    pub fn from_toml_str(document: &str) -> ECSResult<Self> {
        let config: SceneConfig =
            toml::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> ECSResult<()> {
        if self.max_component_types == 0 || self.max_component_types > MAX_COMPONENT_TYPES {
            return Err(ConfigError::MaxComponentTypes {
                value: self.max_component_types,
                max: MAX_COMPONENT_TYPES,
            }
            .into());
        }
        if self.max_archetypes == 0 {
            return Err(ConfigError::MaxArchetypes.into());
        }
        if self.initial_pool_capacity == 0 {
            return Err(ConfigError::InitialPoolCapacity.into());
        }
        Ok(())
    }
}
