//! # Arena Core
//!
//! Deterministic hex-grid battle simulation core.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Reproducible battles from a config and a seed
//! - Headless batch simulation
//! - Replay and snapshot systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`world`] - The battle world and its step loop
//! - [`components`] - Entity component definitions
//! - [`systems`] - Simulation systems, run in a fixed order
//! - [`factory`] - Validated entity spawning
//! - [`data`] - Authored stats, skills and spawn records
//! - [`grid`] / [`hex`] - Hex-grid math and obstacle maps
//! - [`expression`] - Stat-referencing effect expressions
//! - [`fixed_point`] - Fixed-point scalar math

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod data;
pub mod entity;
pub mod error;
pub mod event;
pub mod expression;
pub mod factory;
pub mod fixed_point;
pub mod grid;
pub mod hex;
pub mod intersection;
pub mod math;
pub mod systems;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::data::skills::{
        AbilitiesData, AbilityData, EffectDamageType, EffectPackage, SkillData,
        SkillDeploymentType, SkillTargetingType,
    };
    pub use crate::data::spawnables::{
        AllegianceType, AuraData, BeamData, ChainData, DashData, MarkData, ProjectileData,
        ShieldData, SplashData, ZoneData,
    };
    pub use crate::data::stats::{FullStatsData, StatType, StatsData};
    pub use crate::entity::{Entity, EntityId, Team, INVALID_ENTITY_ID};
    pub use crate::error::{SimError, SimResult};
    pub use crate::event::Event;
    pub use crate::expression::EffectExpression;
    pub use crate::fixed_point::FixedPoint;
    pub use crate::grid::GridConfig;
    pub use crate::hex::HexGridPosition;
    pub use crate::world::{BattleConfig, BattleResult, UnitEndState, World};
}
