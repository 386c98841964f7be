//! Skill, effect package and ability records.
//!
//! These records are authored data: a skill names a targeting rule, a
//! deployment kind and the sub-record for that kind, plus the effect
//! package delivered on hit. Spawnable entities carry a synthetic
//! single-skill attack ability built from these records so that every
//! payload flows through the same delivery path.

use serde::{Deserialize, Serialize};

use crate::data::spawnables::{AllegianceType, PredefinedGridPosition, ZoneEffectShape};
use crate::expression::EffectExpression;
use crate::grid::time::MS_PER_TIME_STEP;

/// Damage flavor of an effect, picking the resist stat applied against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectDamageType {
    /// Mitigated by physical resist and grit.
    #[default]
    Physical,
    /// Mitigated by energy resist and resolve.
    Energy,
    /// Ignores resists entirely.
    Pure,
}

/// One effect inside a package: an instant damage payload whose amount is
/// an expression evaluated at application time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectData {
    /// Damage flavor.
    pub damage_type: EffectDamageType,
    /// Amount, evaluated against sender/receiver stat snapshots.
    pub expression: EffectExpression,
}

impl EffectData {
    /// A damage effect.
    #[must_use]
    pub fn damage(damage_type: EffectDamageType, expression: EffectExpression) -> Self {
        Self {
            damage_type,
            expression,
        }
    }
}

/// Package-level attributes that modify how the whole package lands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectPackageAttributes {
    /// Whether landing this package triggers a splash zone around the hit.
    pub splash: bool,
    /// Radius of the splash zone in units.
    pub splash_radius_units: i32,
    /// Skip the entity that was hit when the splash zone activates.
    pub ignore_first_propagation_receiver: bool,
}

/// The payload a skill or spawnable delivers on activation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectPackage {
    /// Package-level attributes.
    pub attributes: EffectPackageAttributes,
    /// Effects applied in order.
    pub effects: Vec<EffectData>,
}

impl EffectPackage {
    /// Append a damage effect.
    pub fn add_damage_effect(&mut self, damage_type: EffectDamageType, expression: EffectExpression) {
        self.effects.push(EffectData::damage(damage_type, expression));
    }

    /// Whether the package carries no effects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// How a skill picks its receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkillTargetingType {
    /// The sender's current focus.
    #[default]
    CurrentFocus,
    /// The sender itself.
    OnSelf,
}

/// Targeting rule of one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillTargetingData {
    /// How receivers are picked.
    pub targeting_type: SkillTargetingType,
    /// Which allegiance the skill may target.
    pub group: AllegianceType,
}

/// How a skill reaches its receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkillDeploymentType {
    /// Not set.
    #[default]
    None,
    /// Apply the effect package immediately, no spawned carrier.
    Direct,
    /// Spawn a zone.
    Zone,
    /// Spawn a projectile.
    Projectile,
    /// Spawn a beam.
    Beam,
    /// Spawn a dash.
    Dash,
}

/// Deployment rule of one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillDeploymentData {
    /// The carrier kind.
    pub deployment_type: SkillDeploymentType,
    /// How far into the skill window deployment happens, in percent.
    pub pre_deployment_delay_percentage: i32,
    /// How far into the pre-deployment window the target is re-resolved,
    /// in percent.
    pub pre_deployment_retargeting_percentage: i32,
}

/// Zone parameters of a zone-deployed skill, in authoring units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillZoneData {
    /// Shape of the area of effect.
    pub shape: ZoneEffectShape,
    /// Hexagon/triangle radius in units.
    pub radius_units: i32,
    /// Radius cap for growing zones, in units. Zero means no growth.
    pub max_radius_units: i32,
    /// Rectangle width in units.
    pub width_units: i32,
    /// Rectangle height in units.
    pub height_units: i32,
    /// Facing override in degrees for directional shapes.
    pub direction_degrees: i32,
    /// Lifetime in milliseconds.
    pub duration_ms: i32,
    /// Activation period in milliseconds.
    pub frequency_ms: i32,
    /// Movement speed in sub-units per time step. Zero means stationary.
    pub movement_speed_sub_units_per_time_step: i32,
    /// Radius growth in sub-units per time step. Zero derives growth from
    /// the max radius and duration.
    pub growth_rate_sub_units_per_time_step: i32,
    /// Authored spawn position, overriding the targeting result.
    pub predefined_spawn_position: PredefinedGridPosition,
    /// Authored movement destination.
    pub predefined_target_position: PredefinedGridPosition,
    /// Whether each entity is hit at most once over the zone's lifetime.
    pub apply_once: bool,
    /// Whether the zone follows its target each step.
    pub attach_to_target: bool,
    /// Whether the zone dies with its sender.
    pub destroy_with_sender: bool,
    /// Activation indices that deal no damage.
    pub skip_activations: Vec<i32>,
}

impl Default for SkillZoneData {
    fn default() -> Self {
        Self {
            shape: ZoneEffectShape::None,
            radius_units: 0,
            max_radius_units: 0,
            width_units: 0,
            height_units: 0,
            direction_degrees: 0,
            duration_ms: 0,
            frequency_ms: 0,
            movement_speed_sub_units_per_time_step: 0,
            growth_rate_sub_units_per_time_step: 0,
            predefined_spawn_position: PredefinedGridPosition::None,
            predefined_target_position: PredefinedGridPosition::None,
            apply_once: false,
            attach_to_target: false,
            destroy_with_sender: false,
            skip_activations: Vec::new(),
        }
    }
}

/// Projectile parameters of a projectile-deployed skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillProjectileData {
    /// Projectile radius in units.
    pub size_units: i32,
    /// Speed in sub-units per second.
    pub speed_sub_units: i32,
    /// Whether the projectile tracks its receiver.
    pub is_homing: bool,
    /// Whether entities other than the receiver can intercept it.
    pub is_blockable: bool,
    /// Whether it damages everything it passes through.
    pub apply_to_all: bool,
    /// Whether it keeps flying to the map edge after the receiver.
    pub continue_after_target: bool,
}

/// Beam parameters of a beam-deployed skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBeamData {
    /// Beam width in units.
    pub width_units: i32,
    /// Activation period in milliseconds.
    pub frequency_ms: i32,
    /// Whether each entity is hit at most once.
    pub apply_once: bool,
    /// Whether the beam re-aims at its receiver every step.
    pub is_homing: bool,
    /// Whether an entity can stop the beam short.
    pub is_blockable: bool,
    /// Which entities can block the beam.
    pub block_allegiance: AllegianceType,
}

impl Default for SkillBeamData {
    fn default() -> Self {
        Self {
            width_units: 0,
            frequency_ms: 0,
            apply_once: false,
            is_homing: false,
            is_blockable: false,
            block_allegiance: AllegianceType::Enemy,
        }
    }
}

/// Dash parameters of a dash-deployed skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDashData {
    /// Whether entities passed over are damaged.
    pub apply_to_all: bool,
    /// Whether the dash lands behind the receiver instead of in front.
    pub land_behind: bool,
}

impl Default for SkillDashData {
    fn default() -> Self {
        Self {
            apply_to_all: true,
            land_behind: true,
        }
    }
}

/// One skill: targeting + deployment + the payload it delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillData {
    /// Skill name, for logging.
    pub name: String,
    /// How receivers are picked.
    pub targeting: SkillTargetingData,
    /// How the payload reaches them.
    pub deployment: SkillDeploymentData,
    /// Zone sub-record, read when deployment is [`SkillDeploymentType::Zone`].
    pub zone: SkillZoneData,
    /// Projectile sub-record.
    pub projectile: SkillProjectileData,
    /// Beam sub-record.
    pub beam: SkillBeamData,
    /// Dash sub-record.
    pub dash: SkillDashData,
    /// The payload.
    pub effect_package: EffectPackage,
    /// Share of the owning ability's duration this skill occupies.
    pub percentage_of_ability_duration: i32,
    /// Channel window in milliseconds, for channeled deployments.
    pub channel_time_ms: i32,
}

impl Default for SkillData {
    fn default() -> Self {
        Self {
            name: String::new(),
            targeting: SkillTargetingData::default(),
            deployment: SkillDeploymentData::default(),
            zone: SkillZoneData::default(),
            projectile: SkillProjectileData::default(),
            beam: SkillBeamData::default(),
            dash: SkillDashData::default(),
            effect_package: EffectPackage::default(),
            percentage_of_ability_duration: 100,
            channel_time_ms: 0,
        }
    }
}

impl SkillData {
    /// Configure this skill as the follow-up zone of a splash or chain
    /// propagation: a self-targeted hexagon zone that activates once,
    /// immediately, and hits each entity at most once.
    pub fn set_propagation_skill_splash_defaults(&mut self, radius_units: i32) {
        self.deployment.deployment_type = SkillDeploymentType::Zone;
        self.targeting.targeting_type = SkillTargetingType::OnSelf;
        self.zone.shape = ZoneEffectShape::Hexagon;
        self.zone.radius_units = radius_units;
        self.zone.duration_ms = 0;
        self.zone.frequency_ms = MS_PER_TIME_STEP;
        self.zone.apply_once = true;
    }
}

/// One ability: a named window of time running its skills in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbilityData {
    /// Ability name, for logging.
    pub name: String,
    /// Total ability duration in milliseconds.
    pub total_duration_ms: i32,
    /// Skills deployed over the ability window.
    pub skills: Vec<SkillData>,
}

impl AbilityData {
    /// An ability with a single skill spanning its whole duration.
    #[must_use]
    pub fn with_single_skill(name: impl Into<String>, total_duration_ms: i32, skill: SkillData) -> Self {
        Self {
            name: name.into(),
            total_duration_ms,
            skills: vec![skill],
        }
    }
}

/// How the next ability is picked from a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AbilitySelectionType {
    /// Round-robin through the list.
    #[default]
    Cycle,
}

/// The abilities of one slot (attack or omega) on an entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbilitiesData {
    /// The abilities, in authoring order.
    pub abilities: Vec<AbilityData>,
    /// Selection policy.
    pub selection_type: AbilitySelectionType,
}

impl AbilitiesData {
    /// Whether no abilities are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::FixedPoint;

    #[test]
    fn test_skill_defaults() {
        let skill = SkillData::default();
        assert_eq!(skill.percentage_of_ability_duration, 100);
        assert_eq!(skill.deployment.deployment_type, SkillDeploymentType::None);
        assert_eq!(skill.targeting.targeting_type, SkillTargetingType::CurrentFocus);
        assert!(skill.effect_package.is_empty());
    }

    #[test]
    fn test_propagation_splash_defaults() {
        let mut skill = SkillData::default();
        skill.set_propagation_skill_splash_defaults(3);

        assert_eq!(skill.deployment.deployment_type, SkillDeploymentType::Zone);
        assert_eq!(skill.targeting.targeting_type, SkillTargetingType::OnSelf);
        assert_eq!(skill.zone.shape, ZoneEffectShape::Hexagon);
        assert_eq!(skill.zone.radius_units, 3);
        assert_eq!(skill.zone.duration_ms, 0);
        assert_eq!(skill.zone.frequency_ms, MS_PER_TIME_STEP);
        assert!(skill.zone.apply_once);
    }

    #[test]
    fn test_add_damage_effect() {
        let mut package = EffectPackage::default();
        package.add_damage_effect(
            EffectDamageType::Energy,
            EffectExpression::from_value(FixedPoint::from_int(40)),
        );
        assert_eq!(package.effects.len(), 1);
        assert_eq!(package.effects[0].damage_type, EffectDamageType::Energy);
    }

    #[test]
    fn test_dash_defaults() {
        let dash = SkillDashData::default();
        assert!(dash.apply_to_all);
        assert!(dash.land_behind);
    }
}
