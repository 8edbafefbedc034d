//! # Engine Module
//!
//! Core entity/component store implementation.
//!
//! This module contains all building blocks of the store:
//! - Identifiers, errors and configuration
//! - The component registry and archetype masks
//! - Column storage and per-archetype pools
//! - The entity index and the scene orchestrator
//! - Query execution and the exclusivity lock
//! - Deferred commands, bulk creation and systems
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod config;
pub mod component;
pub mod archetype;
pub mod storage;
pub mod pool;
pub mod entity;
pub mod lock;
mod hooks;
pub mod scene;
pub mod query;
pub mod commands;
pub mod scheduler;
pub mod bulk;
pub mod systems;
pub mod inspect;
