//! Entity identity and the entity record itself.

use serde::{Deserialize, Serialize};

use crate::components::Components;

/// Stable entity identifier. Assigned monotonically, never reused within
/// a battle.
pub type EntityId = u32;

/// Reserved id meaning "no entity".
pub const INVALID_ENTITY_ID: EntityId = EntityId::MAX;

/// The two sides of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The red side. Spawns on rows `r <= 0` by convention.
    Red,
    /// The blue side.
    Blue,
}

impl Team {
    /// The opposing team.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

/// One live entity: identity, team, spawner and its component slots.
///
/// Entities are owned exclusively by the world; everything else refers to
/// them by id and resolves through the world each time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    team: Team,
    parent_id: EntityId,
    is_active: bool,
    /// Attached components.
    pub components: Components,
}

impl Entity {
    /// Create a fresh entity with no components attached.
    #[must_use]
    pub fn new(id: EntityId, team: Team, parent_id: EntityId) -> Self {
        Self {
            id,
            team,
            parent_id,
            is_active: true,
            components: Components::default(),
        }
    }

    /// The entity's id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Id of the entity that spawned this one, or
    /// [`INVALID_ENTITY_ID`] for board-setup entities.
    #[must_use]
    pub const fn parent_id(&self) -> EntityId {
        self.parent_id
    }

    /// Whether the entity still takes part in the simulation.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Deactivate the entity. It stays resident until the destruction
    /// sweep removes it.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Whether this entity is a combat unit.
    #[must_use]
    pub fn is_combat_unit(&self) -> bool {
        self.components.combat_unit.is_some()
    }

    /// Whether an enemy of `other_team` would target this entity.
    #[must_use]
    pub fn is_an_enemy_of(&self, other_team: Team) -> bool {
        self.team != other_team
    }
}
