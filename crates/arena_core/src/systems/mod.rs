//! Per-kind systems: each owns the per-step behavior and event reactions
//! of one entity kind, in the fixed order the world runs them.

pub mod ability;
pub mod beam;
pub mod chain;
pub mod destruction;
pub mod focus;
pub mod movement;
pub mod projectile;
pub mod splash;
pub mod zone;
