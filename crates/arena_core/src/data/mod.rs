//! Authored data records consumed by the factory and systems.

pub mod skills;
pub mod spawnables;
pub mod stats;
