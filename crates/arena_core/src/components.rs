//! The closed component catalogue.
//!
//! Each entity carries one optional slot per component kind. The catalogue
//! is fixed at compile time; systems read and mutate slots through the
//! world, never holding references across a time step.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::skills::AbilitiesData;
use crate::data::spawnables::{
    AuraData, BeamData, ChainData, DashData, MarkData, ProjectileData, ShieldData, SplashData,
    ZoneData,
};
use crate::data::stats::FullStatsData;
use crate::entity::{EntityId, INVALID_ENTITY_ID};
use crate::fixed_point::FixedPoint;
use crate::grid::time::{ms_to_time_steps, TIME_INFINITE};
use crate::hex::HexGridPosition;

/// Placement on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionComponent {
    /// Center of the entity in axial units.
    pub position: HexGridPosition,
    /// Collision radius in units.
    pub radius_units: i32,
    /// Whether the entity blocks cells in obstacle maps.
    pub taking_space: bool,
    /// A destination cell reserved ahead of arrival, if any. Reserved
    /// cells block other entities even before this one reaches them.
    pub reserved_position: Option<HexGridPosition>,
}

impl Default for PositionComponent {
    fn default() -> Self {
        Self {
            position: HexGridPosition::new(0, 0),
            radius_units: 0,
            taking_space: false,
            reserved_position: None,
        }
    }
}

/// Base and live stat tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsComponent {
    /// The entity's stats. Spawnables carry a snapshot of their sender's
    /// live stats taken at spawn time.
    pub stats: FullStatsData,
}

/// Marker for combat units, the only entities that can win or lose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatUnitComponent {
    /// Whether the unit has fainted this battle.
    pub fainted: bool,
}

/// Refocus policy of a focus holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RefocusType {
    /// Re-acquire whenever the focus dies.
    #[default]
    Always,
    /// Keep the focus for life. Used by spawnables so a payload in flight
    /// never retargets.
    Never,
}

/// Current target of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusComponent {
    /// The focused entity.
    pub focus_id: EntityId,
    /// The previous focus, used as an aiming fallback when the current
    /// focus just died.
    pub previous_focus_id: EntityId,
    /// Refocus policy.
    pub refocus_type: RefocusType,
}

impl Default for FocusComponent {
    fn default() -> Self {
        Self {
            focus_id: INVALID_ENTITY_ID,
            previous_focus_id: INVALID_ENTITY_ID,
            refocus_type: RefocusType::Always,
        }
    }
}

impl FocusComponent {
    /// Whether a focus is currently set.
    #[must_use]
    pub fn is_focus_set(&self) -> bool {
        self.focus_id != INVALID_ENTITY_ID
    }

    /// Replace the focus, remembering the old one.
    pub fn set_focus(&mut self, new_focus_id: EntityId) {
        if self.focus_id != INVALID_ENTITY_ID {
            self.previous_focus_id = self.focus_id;
        }
        self.focus_id = new_focus_id;
    }

    /// Clear the focus, remembering the old one.
    pub fn reset_focus(&mut self) {
        self.set_focus(INVALID_ENTITY_ID);
    }
}

/// Receiver deduplication for payload carriers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilteringComponent {
    /// Entities this carrier never hits.
    pub ignored_entities: BTreeSet<EntityId>,
    /// Entities already hit by this carrier.
    pub hit_entities: BTreeSet<EntityId>,
    /// Refuse to hit anything in `hit_entities` again.
    pub only_new_targets: bool,
}

impl FilteringComponent {
    /// Whether `id` may still be hit.
    #[must_use]
    pub fn can_hit(&self, id: EntityId) -> bool {
        if self.ignored_entities.contains(&id) {
            return false;
        }
        !(self.only_new_targets && self.hit_entities.contains(&id))
    }

    /// Record a hit.
    pub fn add_hit(&mut self, id: EntityId) {
        self.hit_entities.insert(id);
    }
}

/// Lifetime tracking for time-limited entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationComponent {
    /// Total lifetime in time steps. [`TIME_INFINITE`] never expires.
    pub total_time_steps: i32,
    /// Steps lived so far.
    pub elapsed_time_steps: i32,
}

impl Default for DurationComponent {
    fn default() -> Self {
        Self {
            total_time_steps: TIME_INFINITE,
            elapsed_time_steps: 0,
        }
    }
}

impl DurationComponent {
    /// A duration from milliseconds. Negative means infinite.
    #[must_use]
    pub fn from_ms(duration_ms: i32) -> Self {
        Self {
            total_time_steps: ms_to_time_steps(duration_ms),
            elapsed_time_steps: 0,
        }
    }

    /// Advance one step.
    pub fn tick(&mut self) {
        self.elapsed_time_steps += 1;
    }

    /// Whether the lifetime has run out.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.total_time_steps != TIME_INFINITE && self.elapsed_time_steps >= self.total_time_steps
    }
}

/// Two-phase destruction flag. The destruction sweep is the only code that
/// turns this flag into an actual removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeferredDestructionComponent {
    pending_destruction: bool,
}

impl DeferredDestructionComponent {
    /// Mark the owner for removal.
    pub fn mark(&mut self) {
        self.pending_destruction = true;
    }

    /// Whether the owner is waiting to be removed.
    #[must_use]
    pub const fn is_pending_destruction(&self) -> bool {
        self.pending_destruction
    }
}

/// One running ability activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAbility {
    /// Index into the owning [`AbilitiesComponent`]'s ability list.
    pub ability_index: usize,
    /// Index of the skill currently deploying.
    pub skill_index: usize,
    /// Step the activation started on.
    pub start_time_step: i32,
    /// Total activation length in steps, at least 1.
    pub total_duration_time_steps: i32,
    /// Whether the current skill's payload has been deployed.
    pub deployed: bool,
    /// Whether the ability is inside a channel window.
    pub is_channeling: bool,
}

/// Ability list plus activation state for one entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbilitiesComponent {
    /// The attack abilities of this entity.
    pub abilities: AbilitiesData,
    /// Round-robin cursor into the ability list.
    pub selection_index: usize,
    /// The running activation, if any.
    pub active: Option<ActiveAbility>,
    /// Earliest step the next activation may start on.
    pub next_activation_time_step: i32,
}

impl AbilitiesComponent {
    /// Whether an activation is still running.
    #[must_use]
    pub fn has_active_ability(&self) -> bool {
        self.active.is_some()
    }
}

/// Movement mode of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementType {
    /// Not moving.
    #[default]
    None,
    /// Move toward a fixed cell.
    DirectPosition {
        /// Destination in axial units.
        target: HexGridPosition,
    },
    /// Move along a fixed direction until destroyed.
    DirectVector {
        /// Direction in axial space, normalized and scaled by 1000.
        direction: HexGridPosition,
    },
    /// Copy another entity's position every step.
    Snap {
        /// The entity to follow.
        target_id: EntityId,
    },
}

/// Sub-unit movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementComponent {
    /// Movement mode.
    pub movement_type: MovementType,
    /// Speed in sub-units per time step.
    pub speed_sub_units_per_time_step: i32,
    /// Fractional progress carried between steps, in sub-units.
    pub sub_units_remainder: HexGridPosition,
    /// Steps to stand still before moving again.
    pub paused_time_steps: i32,
}

/// Ids of shields, marks and auras attached to this entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttachedEntitiesComponent {
    /// Attached entity ids in attach order.
    pub attached: Vec<EntityId>,
}

impl AttachedEntitiesComponent {
    /// Record an attachment.
    pub fn add(&mut self, id: EntityId) {
        if !self.attached.contains(&id) {
            self.attached.push(id);
        }
    }

    /// Remove an attachment if present.
    pub fn remove(&mut self, id: EntityId) {
        self.attached.retain(|attached_id| *attached_id != id);
    }
}

/// Zone runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneComponent {
    /// The spawn request this zone was built from. Radius grows in place.
    pub data: ZoneData,
    /// Steps lived so far.
    pub time_step_count: i32,
    /// Activations fired so far.
    pub activation_count: i32,
}

/// Beam runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BeamComponent {
    /// The spawn request this beam was built from. Direction and length
    /// are updated in place while homing.
    pub data: BeamData,
    /// Steps lived so far.
    pub time_step_count: i32,
    /// Activations fired so far.
    pub activation_count: i32,
    /// Set when the sender's channel ended early.
    pub is_interrupted: bool,
}

/// Chain runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainComponent {
    /// The spawn request this chain segment was built from.
    pub data: ChainData,
    /// Whether the payload has been delivered to this segment's receiver.
    pub has_delivered: bool,
    /// Whether this segment already spawned (or declined to spawn) its
    /// successor. Guards against double-bouncing.
    pub has_bounced: bool,
}

/// Projectile runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectileComponent {
    /// The spawn request this projectile was built from.
    pub data: ProjectileData,
    /// Whether the intended receiver has been reached.
    pub reached_target: bool,
}

/// Splash trigger state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplashComponent {
    /// The trigger request this splash was built from.
    pub data: SplashData,
}

/// Dash runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashComponent {
    /// The spawn request this dash was built from.
    pub data: DashData,
    /// Reserved landing cell.
    pub destination: HexGridPosition,
}

/// Shield runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShieldComponent {
    /// The spawn request this shield was built from.
    pub data: ShieldData,
    /// Absorption left before the shield breaks.
    pub remaining: FixedPoint,
}

/// Mark runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkComponent {
    /// The spawn request this mark was built from.
    pub data: MarkData,
}

/// Aura runtime state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuraComponent {
    /// The spawn request this aura was built from.
    pub data: AuraData,
}

/// The component slots of one entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Components {
    pub position: Option<PositionComponent>,
    pub stats: Option<StatsComponent>,
    pub combat_unit: Option<CombatUnitComponent>,
    pub focus: Option<FocusComponent>,
    pub filtering: Option<FilteringComponent>,
    pub duration: Option<DurationComponent>,
    pub deferred_destruction: Option<DeferredDestructionComponent>,
    pub abilities: Option<AbilitiesComponent>,
    pub movement: Option<MovementComponent>,
    pub attached_entities: Option<AttachedEntitiesComponent>,
    pub zone: Option<ZoneComponent>,
    pub beam: Option<BeamComponent>,
    pub chain: Option<ChainComponent>,
    pub projectile: Option<ProjectileComponent>,
    pub splash: Option<SplashComponent>,
    pub dash: Option<DashComponent>,
    pub shield: Option<ShieldComponent>,
    pub mark: Option<MarkComponent>,
    pub aura: Option<AuraComponent>,
}
