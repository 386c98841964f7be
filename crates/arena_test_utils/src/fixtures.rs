//! Test fixtures and helpers.
//!
//! Pre-built battle setups and entity configurations for consistent
//! testing across crates.

use arena_core::data::skills::{
    AbilitiesData, AbilityData, EffectDamageType, SkillData, SkillDeploymentType,
};
use arena_core::data::stats::{StatType, StatsData};
use arena_core::entity::{EntityId, Team};
use arena_core::expression::EffectExpression;
use arena_core::factory;
use arena_core::fixed_point::FixedPoint;
use arena_core::hex::HexGridPosition;
use arena_core::world::{BattleConfig, BattleResult, World};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i64) -> FixedPoint {
    FixedPoint::from_int(n)
}

/// Stats for a plain melee bruiser: slow attacks, short range.
#[must_use]
pub fn bruiser_stats(health: i64, attack_damage: i64) -> StatsData {
    StatsData::new()
        .with(StatType::MaxHealth, fixed(health))
        .with(StatType::CurrentHealth, fixed(health))
        .with(StatType::AttackSpeed, fixed(100))
        .with(StatType::AttackRangeUnits, fixed(2))
        .with(StatType::MoveSpeedSubUnits, fixed(2000))
        .with(StatType::CritChancePercentage, fixed(0))
        .with(StatType::CritAmplificationPercentage, fixed(150))
        .with(StatType::AttackDamage, fixed(attack_damage))
}

/// Stats for a ranged attacker: faster attacks, long range, fragile.
#[must_use]
pub fn ranger_stats(health: i64, attack_damage: i64) -> StatsData {
    StatsData::new()
        .with(StatType::MaxHealth, fixed(health))
        .with(StatType::CurrentHealth, fixed(health))
        .with(StatType::AttackSpeed, fixed(200))
        .with(StatType::AttackRangeUnits, fixed(20))
        .with(StatType::MoveSpeedSubUnits, fixed(2000))
        .with(StatType::CritChancePercentage, fixed(25))
        .with(StatType::CritAmplificationPercentage, fixed(150))
        .with(StatType::AttackDamage, fixed(attack_damage))
}

/// A single-ability attack set that applies its sender's attack damage
/// directly to the current focus.
#[must_use]
pub fn basic_attack_abilities() -> AbilitiesData {
    let mut skill = SkillData {
        name: "basic attack".into(),
        ..SkillData::default()
    };
    skill.deployment.deployment_type = SkillDeploymentType::Direct;
    skill.effect_package.add_damage_effect(
        EffectDamageType::Physical,
        EffectExpression::from_sender_live_stat(StatType::AttackDamage),
    );
    AbilitiesData {
        abilities: vec![AbilityData::with_single_skill("basic attack", 100, skill)],
        ..AbilitiesData::default()
    }
}

/// Spawn a bruiser with [`basic_attack_abilities`].
///
/// # Panics
///
/// Panics if the spawn position is rejected.
pub fn spawn_bruiser(world: &mut World, team: Team, q: i32, r: i32) -> EntityId {
    factory::spawn_combat_unit(
        world,
        team,
        HexGridPosition::new(q, r),
        1,
        bruiser_stats(500, 20),
        basic_attack_abilities(),
    )
    .unwrap()
}

/// A world with one red and one blue bruiser facing each other.
#[must_use]
pub fn duel_world(seed: u64) -> World {
    let mut world = World::new(BattleConfig {
        random_seed: seed,
        ..BattleConfig::default()
    });
    spawn_bruiser(&mut world, Team::Red, 0, -10);
    spawn_bruiser(&mut world, Team::Blue, 0, 10);
    world
}

/// A world with `per_team` bruisers per side, lined up in opposing rows.
///
/// # Panics
///
/// Panics if a row does not fit the grid.
#[must_use]
pub fn lineup_world(seed: u64, per_team: i32) -> World {
    let mut world = World::new(BattleConfig {
        random_seed: seed,
        ..BattleConfig::default()
    });
    for index in 0..per_team {
        let q = (index - per_team / 2) * 3;
        spawn_bruiser(&mut world, Team::Red, q, -10);
        spawn_bruiser(&mut world, Team::Blue, q, 10);
    }
    world
}

/// Step the world until the battle finishes or `max_steps` elapse.
pub fn run_battle(world: &mut World, max_steps: i32) -> Option<BattleResult> {
    for _ in 0..max_steps {
        world.time_step();
        if world.is_battle_finished() {
            break;
        }
    }
    world.battle_result()
}
