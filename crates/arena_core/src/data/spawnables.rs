//! Spawn request records for the transient entity kinds.
//!
//! These are plain value records describing one spawn: who asked for it,
//! where it goes, its geometry and timing, and the payload it delivers.
//! They are built by the skill execution path, consumed once by the entity
//! factory, and then owned by the spawned entity's component.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::skills::{AbilityData, EffectPackage, SkillData};
use crate::entity::{EntityId, INVALID_ENTITY_ID};
use crate::fixed_point::FixedPoint;
use crate::grid::time::TIME_INFINITE;

/// Shape of a zone's area of effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoneEffectShape {
    /// No shape set.
    #[default]
    None,
    /// Hexagon defined by a radius in sub-units.
    Hexagon,
    /// Rectangle defined by width and height in sub-units.
    Rectangle,
    /// Equilateral triangle with its apex at the zone position.
    Triangle,
}

/// Targeting / blocking filter relative to the sender's team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllegianceType {
    /// No filter set.
    #[default]
    None,
    /// Only the owning entity itself.
    OwnEntity,
    /// Entities on the sender's team.
    Ally,
    /// Entities on the opposing team.
    Enemy,
    /// Everything.
    All,
}

impl AllegianceType {
    /// Whether `other` falls inside this filter, seen from `own`.
    #[must_use]
    pub fn matches(
        self,
        own_team: crate::entity::Team,
        own_id: EntityId,
        other_team: crate::entity::Team,
        other_id: EntityId,
    ) -> bool {
        match self {
            Self::None => false,
            Self::OwnEntity => own_id == other_id,
            Self::Ally => own_team == other_team,
            Self::Enemy => own_team != other_team,
            Self::All => true,
        }
    }
}

/// Which ability slot produced a spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AbilityType {
    /// Unknown origin.
    #[default]
    None,
    /// Basic attack ability.
    Attack,
    /// Omega ability.
    Omega,
    /// Innate ability.
    Innate,
}

/// Provenance tags carried through spawn chains for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceContextType {
    /// Spawned through a splash trigger.
    Splash,
    /// Spawned as a shield.
    Shield,
    /// Spawned as a mark.
    Mark,
    /// Spawned as an aura.
    Aura,
    /// Spawned by a synergy holder.
    Synergy,
    /// Spawned by a drone augment holder.
    DroneAugment,
}

/// Provenance of a spawn request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceContext {
    /// The ability slot that triggered the spawn.
    pub combat_unit_ability_type: AbilityType,
    /// Name of the triggering ability, for logging.
    pub ability_name: String,
    /// Name of the triggering skill, for logging.
    pub skill_name: String,
    sources: Vec<SourceContextType>,
}

impl SourceContext {
    /// Whether the given tag is present.
    #[must_use]
    pub fn has(&self, context_type: SourceContextType) -> bool {
        self.sources.contains(&context_type)
    }

    /// Add a tag, ignoring duplicates.
    pub fn add(&mut self, context_type: SourceContextType) {
        if !self.has(context_type) {
            self.sources.push(context_type);
        }
    }

    /// Whether no tags are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Authored spawn positions resolved relative to a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PredefinedGridPosition {
    /// Not set.
    #[default]
    None,
    /// Center of the spawning team's board border.
    AllyBorderCenter,
    /// Center of the opposing team's board border.
    EnemyBorderCenter,
}

/// Kinds of position reservations made by abilities that move entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReservedPositionType {
    /// No reservation.
    #[default]
    None,
    /// Across the board from the current position.
    Across,
    /// Near the receiver.
    NearReceiver,
    /// Behind the receiver, seen from the sender.
    BehindReceiver,
}

/// One zone spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The skill whose effect package the zone delivers.
    pub skill_data: SkillData,
    /// Activation indices that deal no damage.
    pub skip_activations: Vec<i32>,
    /// The entity that spawned the zone.
    pub sender_id: EntityId,
    /// The original sender for chained spawns.
    pub original_sender_id: EntityId,
    /// Shape of the area of effect.
    pub shape: ZoneEffectShape,
    /// Current radius (hexagon) in sub-units.
    pub radius_sub_units: i32,
    /// Radius cap for growing zones, in sub-units.
    pub max_radius_sub_units: i32,
    /// Rectangle width in sub-units.
    pub width_sub_units: i32,
    /// Rectangle height in sub-units.
    pub height_sub_units: i32,
    /// Lifetime in milliseconds.
    pub duration_ms: i32,
    /// Activation period in milliseconds.
    pub frequency_ms: i32,
    /// Direction the zone was spawned towards, in degrees.
    pub spawn_direction_degrees: i32,
    /// Facing of directional shapes, in degrees.
    pub direction_degrees: i32,
    /// Movement speed for movable zones, sub-units per time step.
    pub movement_speed_sub_units_per_time_step: i32,
    /// Radius growth per time step, in sub-units.
    pub growth_rate_sub_units_per_time_step: i32,
    /// Entity the zone snaps to each step, if any.
    pub attach_to_entity: EntityId,
    /// Whether each entity is hit at most once over the zone's lifetime.
    pub apply_once: bool,
    /// Whether the payload crits.
    pub is_critical: bool,
    /// Whether the zone lives only while the sender channels.
    pub is_channeled: bool,
    /// Whether the zone dies with its sender.
    pub destroy_with_sender: bool,
}

impl Default for ZoneData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            skill_data: SkillData::default(),
            skip_activations: Vec::new(),
            sender_id: INVALID_ENTITY_ID,
            original_sender_id: INVALID_ENTITY_ID,
            shape: ZoneEffectShape::None,
            radius_sub_units: 0,
            max_radius_sub_units: 0,
            width_sub_units: 0,
            height_sub_units: 0,
            duration_ms: 0,
            frequency_ms: 0,
            spawn_direction_degrees: 0,
            direction_degrees: 0,
            movement_speed_sub_units_per_time_step: 0,
            growth_rate_sub_units_per_time_step: 0,
            attach_to_entity: INVALID_ENTITY_ID,
            apply_once: false,
            is_critical: false,
            is_channeled: false,
            destroy_with_sender: false,
        }
    }
}

/// One beam spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity that spawned the beam.
    pub sender_id: EntityId,
    /// The entity the beam is aimed at.
    pub receiver_id: EntityId,
    /// Beam width in sub-units.
    pub width_sub_units: i32,
    /// Beam length in world sub-units.
    pub length_world_sub_units: i32,
    /// Activation period in milliseconds.
    pub frequency_ms: i32,
    /// Current direction in degrees.
    pub direction_degrees: i32,
    /// Whether each entity is hit at most once.
    pub apply_once: bool,
    /// Whether the beam re-aims at its receiver every step.
    pub is_homing: bool,
    /// Whether an entity can stop the beam short.
    pub is_blockable: bool,
    /// Whether the payload crits.
    pub is_critical: bool,
    /// Which entities can block the beam.
    pub block_allegiance: AllegianceType,
    /// The skill whose effect package the beam delivers.
    pub skill_data: SkillData,
}

impl Default for BeamData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            receiver_id: INVALID_ENTITY_ID,
            width_sub_units: 0,
            length_world_sub_units: 0,
            frequency_ms: 0,
            direction_degrees: 0,
            apply_once: false,
            is_homing: false,
            is_blockable: false,
            is_critical: false,
            block_allegiance: AllegianceType::Enemy,
            skill_data: SkillData::default(),
        }
    }
}

/// One chain spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity that spawned the chain segment.
    pub sender_id: EntityId,
    /// The owning combat unit at the root of the chain.
    pub combat_unit_sender_id: EntityId,
    /// Receiver of the first propagation, if fixed.
    pub first_propagation_receiver_id: EntityId,
    /// Delay between bounces in milliseconds.
    pub chain_delay_ms: i32,
    /// Remaining bounces including this segment.
    pub chain_number: i32,
    /// Maximum bounce distance in units. Zero means unlimited.
    pub chain_bounce_max_distance_units: i32,
    /// Prefer targets that have not been hit yet.
    pub prioritize_new_targets: bool,
    /// Refuse to re-hit targets entirely.
    pub only_new_targets: bool,
    /// Skip the first propagation receiver when targeting.
    pub ignore_first_propagation_receiver: bool,
    /// Whether the payload crits.
    pub is_critical: bool,
    /// Entities already hit by earlier segments. Ordered for determinism.
    pub old_target_entities: BTreeSet<EntityId>,
    /// Payload delivered on each bounce.
    pub propagation_effect_package: EffectPackage,
    /// Which entities the chain may bounce to.
    pub targeting_group: AllegianceType,
}

impl Default for ChainData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            combat_unit_sender_id: INVALID_ENTITY_ID,
            first_propagation_receiver_id: INVALID_ENTITY_ID,
            chain_delay_ms: 0,
            chain_number: 1,
            chain_bounce_max_distance_units: 0,
            prioritize_new_targets: false,
            only_new_targets: false,
            ignore_first_propagation_receiver: false,
            is_critical: false,
            old_target_entities: BTreeSet::new(),
            propagation_effect_package: EffectPackage::default(),
            targeting_group: AllegianceType::Enemy,
        }
    }
}

/// One projectile spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity that fired the projectile.
    pub sender_id: EntityId,
    /// The entity the projectile is aimed at.
    pub receiver_id: EntityId,
    /// Projectile radius in units.
    pub radius_units: i32,
    /// Speed in sub-units per time step.
    pub move_speed_sub_units: i32,
    /// Whether entities other than the receiver can intercept it.
    pub is_blockable: bool,
    /// Whether it damages everything it passes through.
    pub apply_to_all: bool,
    /// Whether it tracks the receiver's position.
    pub is_homing: bool,
    /// Whether the payload crits.
    pub is_critical: bool,
    /// Whether it keeps flying after reaching the target.
    pub continue_after_target: bool,
    /// The skill whose effect package the projectile delivers.
    pub skill_data: SkillData,
}

impl Default for ProjectileData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            receiver_id: INVALID_ENTITY_ID,
            radius_units: 0,
            move_speed_sub_units: 0,
            is_blockable: false,
            apply_to_all: false,
            is_homing: false,
            is_critical: false,
            continue_after_target: false,
            skill_data: SkillData::default(),
        }
    }
}

/// One dash spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity performing the dash.
    pub sender_id: EntityId,
    /// The entity dashed towards.
    pub receiver_id: EntityId,
    /// Whether entities passed over are damaged.
    pub apply_to_all: bool,
    /// Whether the dash lands behind the receiver instead of in front.
    pub land_behind: bool,
    /// Dash range in units.
    pub range_units: i32,
    /// The skill whose effect package the dash delivers.
    pub skill_data: SkillData,
}

impl Default for DashData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            receiver_id: INVALID_ENTITY_ID,
            apply_to_all: false,
            land_behind: false,
            range_units: 0,
            skill_data: SkillData::default(),
        }
    }
}

/// One shield spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldData {
    /// The entity granting the shield.
    pub sender_id: EntityId,
    /// The entity receiving the shield.
    pub receiver_id: EntityId,
    /// Damage the shield absorbs before breaking.
    pub value: FixedPoint,
    /// Lifetime in milliseconds. Negative means infinite.
    pub duration_ms: i32,
    /// Provenance of this spawn.
    pub source_context: SourceContext,
}

impl Default for ShieldData {
    fn default() -> Self {
        Self {
            sender_id: INVALID_ENTITY_ID,
            receiver_id: INVALID_ENTITY_ID,
            value: FixedPoint::ZERO,
            duration_ms: TIME_INFINITE,
            source_context: SourceContext::default(),
        }
    }
}

/// One mark spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity placing the mark.
    pub sender_id: EntityId,
    /// The entity being marked.
    pub receiver_id: EntityId,
    /// Lifetime in milliseconds.
    pub duration_ms: i32,
    /// Whether the mark dies when its sender dies.
    pub should_destroy_on_sender_death: bool,
    /// Abilities the mark grants while attached.
    pub abilities_data: Vec<AbilityData>,
}

impl Default for MarkData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            receiver_id: INVALID_ENTITY_ID,
            duration_ms: 0,
            should_destroy_on_sender_death: false,
            abilities_data: Vec::new(),
        }
    }
}

/// One aura spawn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuraData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity projecting the aura.
    pub sender_id: EntityId,
    /// The entity the aura is attached to.
    pub receiver_id: EntityId,
    /// Lifetime in milliseconds.
    pub duration_ms: i32,
    /// Abilities the aura grants while attached.
    pub abilities_data: Vec<AbilityData>,
}

impl Default for AuraData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            receiver_id: INVALID_ENTITY_ID,
            duration_ms: 0,
            abilities_data: Vec::new(),
        }
    }
}

/// One splash trigger request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplashData {
    /// Provenance of this spawn.
    pub source_context: SourceContext,
    /// The entity the splash originates from.
    pub sender_id: EntityId,
    /// Whether the payload crits.
    pub is_critical: bool,
    /// Skip the propagation receiver in the follow-up zone.
    pub ignore_first_propagation_receiver: bool,
    /// Radius of the follow-up zone in units.
    pub splash_radius_units: i32,
    /// Payload the follow-up zone delivers.
    pub propagation_effect_package: EffectPackage,
}

impl Default for SplashData {
    fn default() -> Self {
        Self {
            source_context: SourceContext::default(),
            sender_id: INVALID_ENTITY_ID,
            is_critical: false,
            ignore_first_propagation_receiver: false,
            splash_radius_units: 0,
            propagation_effect_package: EffectPackage::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_context_deduplicates() {
        let mut context = SourceContext::default();
        assert!(context.is_empty());

        context.add(SourceContextType::Shield);
        context.add(SourceContextType::Shield);
        context.add(SourceContextType::Splash);

        assert!(context.has(SourceContextType::Shield));
        assert!(context.has(SourceContextType::Splash));
        assert!(!context.has(SourceContextType::Mark));
        assert_eq!(context.sources.len(), 2);
    }

    #[test]
    fn test_shield_defaults_to_infinite_duration() {
        let shield = ShieldData::default();
        assert_eq!(shield.duration_ms, TIME_INFINITE);
        assert_eq!(shield.sender_id, INVALID_ENTITY_ID);
    }

    #[test]
    fn test_chain_old_targets_iterate_in_id_order() {
        let mut chain = ChainData::default();
        chain.old_target_entities.insert(9);
        chain.old_target_entities.insert(3);
        chain.old_target_entities.insert(7);

        let collected: Vec<_> = chain.old_target_entities.iter().copied().collect();
        assert_eq!(collected, vec![3, 7, 9]);
    }
}
