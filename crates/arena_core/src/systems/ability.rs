//! Attack cadence and skill deployment.
//!
//! Combat units attack on a cadence derived from their attack speed:
//! when the focus is in range the unit activates its next ability and
//! deploys every skill in it; when out of range it walks toward the
//! focus instead. Payload carriers (zones, beams, chains, projectiles,
//! dashes) reuse the same delivery path through their synthetic
//! single-skill ability via [`activate_synthetic`].

use tracing::warn;

use crate::components::{ActiveAbility, MovementType};
use crate::data::skills::{AbilityData, SkillData, SkillDeploymentType, SkillTargetingType};
use crate::data::spawnables::{BeamData, DashData, ProjectileData, ZoneData};
use crate::data::stats::StatType;
use crate::entity::{EntityId, INVALID_ENTITY_ID};
use crate::event::Event;
use crate::factory;
use crate::grid::time::{
    attack_speed_to_time_steps, ms_to_sub_units_per_time_step, ms_to_time_steps,
    sub_units_per_second_to_per_time_step,
};
use crate::hex::HexGridPosition;
use crate::math;
use crate::world::World;

/// Run the attack state machine of every living combat unit.
pub fn time_step(world: &mut World) {
    let current_step = world.time_step_count();
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active()
            || !entity
                .components
                .combat_unit
                .is_some_and(|unit| !unit.fainted)
        {
            continue;
        }
        let Some(abilities) = entity.components.abilities.as_ref() else {
            continue;
        };

        if let Some(active) = abilities.active {
            if current_step - active.start_time_step >= active.total_duration_time_steps {
                let ability_name = abilities
                    .abilities
                    .abilities
                    .get(active.ability_index)
                    .map(|ability| ability.name.clone())
                    .unwrap_or_default();
                if let Some(entity) = world.get_mut(id) {
                    if let Some(abilities) = entity.components.abilities.as_mut() {
                        abilities.active = None;
                    }
                }
                world.emit_event(Event::AbilityDeactivated {
                    sender_id: id,
                    ability_name,
                });
            }
            continue;
        }

        if abilities.abilities.is_empty() || current_step < abilities.next_activation_time_step {
            continue;
        }
        // A unit mid-dash finishes the dash before attacking again
        if entity
            .components
            .position
            .is_some_and(|position| position.reserved_position.is_some())
        {
            continue;
        }

        let Some(target) = attack_target(world, id) else {
            continue;
        };
        let Some(own_position) = entity.components.position.map(|position| position.position)
        else {
            continue;
        };
        let stats = entity
            .components
            .stats
            .map(|stats| stats.stats.live)
            .unwrap_or_default();

        let range_units = stats.get(StatType::AttackRangeUnits).to_int();
        let distance_units = i64::from((target.position - own_position).length());
        if distance_units > range_units {
            let speed_per_second =
                i32::try_from(stats.get(StatType::MoveSpeedSubUnits).to_int()).unwrap_or(0);
            let speed = sub_units_per_second_to_per_time_step(speed_per_second);
            if let Some(entity) = world.get_mut(id) {
                if let Some(movement) = entity.components.movement.as_mut() {
                    movement.movement_type = MovementType::DirectPosition {
                        target: target.position,
                    };
                    movement.speed_sub_units_per_time_step = speed;
                }
            }
            continue;
        }

        // In range: stop walking and activate
        if let Some(entity) = world.get_mut(id) {
            if let Some(movement) = entity.components.movement.as_mut() {
                movement.movement_type = MovementType::None;
            }
        }
        activate_next_ability(world, id, current_step, &stats);
    }
}

struct AttackTarget {
    position: HexGridPosition,
}

fn attack_target(world: &World, id: EntityId) -> Option<AttackTarget> {
    let focus = world.get(id)?.components.focus?;
    if !focus.is_focus_set() {
        return None;
    }
    let target = world.get(focus.focus_id)?;
    if !target.is_active() {
        return None;
    }
    Some(AttackTarget {
        position: target.components.position?.position,
    })
}

fn activate_next_ability(
    world: &mut World,
    sender_id: EntityId,
    current_step: i32,
    stats: &crate::data::stats::StatsData,
) {
    let Some(abilities) = world
        .get(sender_id)
        .and_then(|entity| entity.components.abilities.as_ref())
    else {
        return;
    };
    let ability_count = abilities.abilities.abilities.len();
    if ability_count == 0 {
        return;
    }
    let ability_index = abilities.selection_index % ability_count;
    let ability = abilities.abilities.abilities[ability_index].clone();

    // One crit roll covers every skill of the activation
    let is_critical = world.roll_chance(stats.get(StatType::CritChancePercentage));

    world.emit_event(Event::AbilityActivated {
        sender_id,
        ability_name: ability.name.clone(),
    });

    let mut channel_steps = 0;
    for skill in &ability.skills {
        channel_steps = channel_steps.max(deploy_skill(world, sender_id, &ability, skill, is_critical));
    }

    let attack_speed = i32::try_from(stats.get(StatType::AttackSpeed).to_int()).unwrap_or(0);
    let cadence = attack_speed_to_time_steps(attack_speed);
    if let Some(entity) = world.get_mut(sender_id) {
        if let Some(abilities) = entity.components.abilities.as_mut() {
            abilities.selection_index = (ability_index + 1) % ability_count;
            abilities.next_activation_time_step = current_step.saturating_add(cadence);
            if channel_steps > 0 {
                abilities.active = Some(ActiveAbility {
                    ability_index,
                    skill_index: 0,
                    start_time_step: current_step,
                    total_duration_time_steps: channel_steps,
                    deployed: true,
                    is_channeling: true,
                });
            }
        }
    }
    if channel_steps == 0 {
        world.emit_event(Event::AbilityDeactivated {
            sender_id,
            ability_name: ability.name,
        });
    }
}

/// Deploy one skill. Returns the channel window in steps for channeled
/// deployments, zero otherwise.
fn deploy_skill(
    world: &mut World,
    sender_id: EntityId,
    ability: &AbilityData,
    skill: &SkillData,
    is_critical: bool,
) -> i32 {
    let receiver_id = match skill.targeting.targeting_type {
        SkillTargetingType::OnSelf => sender_id,
        SkillTargetingType::CurrentFocus => {
            let focus_id = world
                .get(sender_id)
                .and_then(|entity| entity.components.focus)
                .filter(|focus| focus.is_focus_set())
                .map(|focus| focus.focus_id);
            match focus_id.filter(|&id| world.get(id).is_some_and(crate::entity::Entity::is_active))
            {
                Some(id) => id,
                None => {
                    world.emit_event(Event::SkillNoTargets {
                        sender_id,
                        skill_name: skill.name.clone(),
                    });
                    return 0;
                }
            }
        }
    };

    match skill.deployment.deployment_type {
        SkillDeploymentType::None => {
            warn!(sender_id, skill = %skill.name, "skill has no deployment type");
            0
        }
        SkillDeploymentType::Direct => {
            let owner_id = world.combat_unit_owner(sender_id).unwrap_or(sender_id);
            world.apply_effect_package(
                owner_id,
                sender_id,
                receiver_id,
                &skill.effect_package,
                is_critical,
            );
            0
        }
        SkillDeploymentType::Zone => {
            deploy_zone(world, sender_id, receiver_id, skill, is_critical);
            0
        }
        SkillDeploymentType::Projectile => {
            let projectile = skill.projectile;
            let data = ProjectileData {
                skill_data: skill.clone(),
                sender_id,
                receiver_id,
                radius_units: projectile.size_units,
                move_speed_sub_units: projectile.speed_sub_units,
                is_blockable: projectile.is_blockable,
                apply_to_all: projectile.apply_to_all,
                is_homing: projectile.is_homing,
                is_critical,
                continue_after_target: projectile.continue_after_target,
                ..ProjectileData::default()
            };
            let speed = sub_units_per_second_to_per_time_step(projectile.speed_sub_units);
            if let Err(err) = factory::spawn_projectile(world, data, speed) {
                warn!(?err, sender_id, "projectile deployment failed");
            }
            0
        }
        SkillDeploymentType::Beam => {
            let beam = skill.beam;
            let data = BeamData {
                skill_data: skill.clone(),
                sender_id,
                receiver_id,
                width_sub_units: math::units_to_sub_units(beam.width_units),
                frequency_ms: beam.frequency_ms,
                apply_once: beam.apply_once,
                is_homing: beam.is_homing,
                is_blockable: beam.is_blockable,
                is_critical,
                block_allegiance: beam.block_allegiance,
                ..BeamData::default()
            };
            if let Err(err) = factory::spawn_beam(world, data) {
                warn!(?err, sender_id, "beam deployment failed");
                return 0;
            }
            ms_to_time_steps(skill.channel_time_ms).max(1)
        }
        SkillDeploymentType::Dash => {
            deploy_dash(world, sender_id, receiver_id, ability, skill);
            0
        }
    }
}

fn deploy_zone(
    world: &mut World,
    sender_id: EntityId,
    receiver_id: EntityId,
    skill: &SkillData,
    is_critical: bool,
) {
    let zone = &skill.zone;
    let data = ZoneData {
        skill_data: skill.clone(),
        skip_activations: zone.skip_activations.clone(),
        sender_id,
        shape: zone.shape,
        radius_sub_units: math::units_to_sub_units(zone.radius_units),
        max_radius_sub_units: math::units_to_sub_units(zone.max_radius_units),
        width_sub_units: math::units_to_sub_units(zone.width_units),
        height_sub_units: math::units_to_sub_units(zone.height_units),
        duration_ms: zone.duration_ms,
        frequency_ms: zone.frequency_ms,
        direction_degrees: zone.direction_degrees,
        movement_speed_sub_units_per_time_step: zone.movement_speed_sub_units_per_time_step,
        growth_rate_sub_units_per_time_step: zone.growth_rate_sub_units_per_time_step,
        attach_to_entity: if zone.attach_to_target {
            receiver_id
        } else {
            INVALID_ENTITY_ID
        },
        apply_once: zone.apply_once,
        is_critical,
        is_channeled: skill.channel_time_ms > 0,
        destroy_with_sender: zone.destroy_with_sender,
        ..ZoneData::default()
    };

    let team = world.get(sender_id).map(crate::entity::Entity::team);
    let spawn_position = team
        .and_then(|team| {
            factory::resolve_predefined_position(
                world.grid_config(),
                zone.predefined_spawn_position,
                team,
            )
        })
        .or_else(|| {
            let anchor = match skill.targeting.targeting_type {
                SkillTargetingType::OnSelf => sender_id,
                SkillTargetingType::CurrentFocus => receiver_id,
            };
            world
                .get(anchor)
                .and_then(|entity| entity.components.position)
                .map(|position| position.position)
        });
    let Some(spawn_position) = spawn_position else {
        warn!(sender_id, "zone deployment has no spawn position");
        return;
    };
    if let Err(err) = factory::spawn_zone(world, data, spawn_position) {
        warn!(?err, sender_id, "zone deployment failed");
    }
}

fn deploy_dash(
    world: &mut World,
    sender_id: EntityId,
    receiver_id: EntityId,
    ability: &AbilityData,
    skill: &SkillData,
) {
    let positions = world
        .get(sender_id)
        .and_then(|entity| entity.components.position)
        .zip(
            world
                .get(receiver_id)
                .and_then(|entity| entity.components.position),
        );
    let Some((sender_position, receiver_position)) = positions else {
        return;
    };
    let distance_units = (receiver_position.position - sender_position.position).length();
    let duration_ms = ability.total_duration_ms * skill.percentage_of_ability_duration / 100;
    let speed = ms_to_sub_units_per_time_step(math::units_to_sub_units(distance_units), duration_ms)
        .max(1);

    let dash = skill.dash;
    let data = DashData {
        skill_data: skill.clone(),
        sender_id,
        receiver_id,
        apply_to_all: dash.apply_to_all,
        land_behind: dash.land_behind,
        range_units: distance_units,
        ..DashData::default()
    };
    if let Err(err) = factory::spawn_dash(world, data, speed) {
        warn!(?err, sender_id, "dash deployment failed");
    }
}

/// Fire a payload carrier's synthetic attack ability at a resolved
/// receiver set: activate, apply the effect package to each receiver in
/// order, deactivate. Carrier systems (zone, beam, chain, projectile,
/// dash) call this so every payload lands through the same path.
pub fn activate_synthetic(
    world: &mut World,
    carrier_id: EntityId,
    combat_unit_sender_id: EntityId,
    receiver_ids: &[EntityId],
    is_critical: bool,
) {
    let Some((ability_name, effect_package)) = world
        .get(carrier_id)
        .and_then(|entity| entity.components.abilities.as_ref())
        .and_then(|abilities| abilities.abilities.abilities.first())
        .map(|ability| {
            (
                ability.name.clone(),
                ability
                    .skills
                    .first()
                    .map(|skill| skill.effect_package.clone())
                    .unwrap_or_default(),
            )
        })
    else {
        return;
    };

    world.emit_event(Event::AbilityActivated {
        sender_id: carrier_id,
        ability_name: ability_name.clone(),
    });
    for &receiver_id in receiver_ids {
        world.apply_effect_package(
            combat_unit_sender_id,
            carrier_id,
            receiver_id,
            &effect_package,
            is_critical,
        );
    }
    world.emit_event(Event::AbilityDeactivated {
        sender_id: carrier_id,
        ability_name,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::skills::{
        AbilitiesData, EffectDamageType, SkillTargetingData,
    };
    use crate::data::stats::StatsData;
    use crate::entity::Team;
    use crate::expression::EffectExpression;
    use crate::fixed_point::FixedPoint;
    use crate::world::BattleConfig;

    fn attacker_stats() -> StatsData {
        StatsData::new()
            .with(StatType::MaxHealth, FixedPoint::from_int(100))
            .with(StatType::CurrentHealth, FixedPoint::from_int(100))
            .with(StatType::AttackSpeed, FixedPoint::from_int(100))
            .with(StatType::AttackRangeUnits, FixedPoint::from_int(10))
            .with(StatType::MoveSpeedSubUnits, FixedPoint::from_int(2000))
    }

    fn direct_attack(damage: i64) -> AbilitiesData {
        let mut skill = SkillData {
            name: "basic hit".into(),
            targeting: SkillTargetingData::default(),
            ..SkillData::default()
        };
        skill.deployment.deployment_type = SkillDeploymentType::Direct;
        skill.effect_package.add_damage_effect(
            EffectDamageType::Pure,
            EffectExpression::from_value(FixedPoint::from_int(damage)),
        );
        AbilitiesData {
            abilities: vec![AbilityData::with_single_skill("basic attack", 0, skill)],
            selection_type: Default::default(),
        }
    }

    fn spawn_unit(world: &mut World, team: Team, r: i32, abilities: AbilitiesData) -> EntityId {
        factory::spawn_combat_unit(
            world,
            team,
            HexGridPosition::new(0, r),
            1,
            attacker_stats(),
            abilities,
        )
        .unwrap()
    }

    fn focus_on(world: &mut World, id: EntityId, target: EntityId) {
        world
            .get_mut(id)
            .unwrap()
            .components
            .focus
            .as_mut()
            .unwrap()
            .set_focus(target);
    }

    fn current_health(world: &World, id: EntityId) -> FixedPoint {
        world
            .get(id)
            .unwrap()
            .components
            .stats
            .unwrap()
            .stats
            .live
            .get(StatType::CurrentHealth)
    }

    #[test]
    fn test_attacks_focus_in_range() {
        let mut world = World::new(BattleConfig::default());
        let attacker = spawn_unit(&mut world, Team::Red, -4, direct_attack(10));
        let victim = spawn_unit(&mut world, Team::Blue, 4, AbilitiesData::default());
        focus_on(&mut world, attacker, victim);

        time_step(&mut world);

        assert_eq!(current_health(&world, victim), FixedPoint::from_int(90));
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::AbilityActivated { sender_id, .. } if *sender_id == attacker)));
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::AbilityDeactivated { sender_id, .. } if *sender_id == attacker)));
    }

    #[test]
    fn test_walks_toward_out_of_range_focus() {
        let mut world = World::new(BattleConfig::default());
        let attacker = spawn_unit(&mut world, Team::Red, -20, direct_attack(10));
        let victim = spawn_unit(&mut world, Team::Blue, 20, AbilitiesData::default());
        focus_on(&mut world, attacker, victim);

        time_step(&mut world);

        assert_eq!(current_health(&world, victim), FixedPoint::from_int(100));
        let movement = world.get(attacker).unwrap().components.movement.unwrap();
        assert_eq!(
            movement.movement_type,
            MovementType::DirectPosition {
                target: HexGridPosition::new(0, 20)
            }
        );
        // 2000 sub-units per second at 10 steps per second
        assert_eq!(movement.speed_sub_units_per_time_step, 200);
    }

    #[test]
    fn test_attack_cadence_blocks_reactivation() {
        let mut world = World::new(BattleConfig::default());
        let attacker = spawn_unit(&mut world, Team::Red, -4, direct_attack(10));
        let victim = spawn_unit(&mut world, Team::Blue, 4, AbilitiesData::default());
        focus_on(&mut world, attacker, victim);

        time_step(&mut world);
        time_step(&mut world);

        // 100% attack speed means one attack per 10 steps
        assert_eq!(current_health(&world, victim), FixedPoint::from_int(90));
        let abilities = world.get(attacker).unwrap().components.abilities.as_ref().unwrap().clone();
        assert_eq!(abilities.next_activation_time_step, 10);
    }

    #[test]
    fn test_dead_focus_blocks_activation() {
        let mut world = World::new(BattleConfig::default());
        let attacker = spawn_unit(&mut world, Team::Red, -4, direct_attack(10));
        let victim = spawn_unit(&mut world, Team::Blue, 4, AbilitiesData::default());
        focus_on(&mut world, attacker, victim);

        // The focus dies between targeting and deployment
        world.get_mut(victim).unwrap().deactivate();
        time_step(&mut world);

        assert!(!world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::AbilityActivated { .. })));
    }

    #[test]
    fn test_channeled_beam_keeps_ability_active() {
        let mut world = World::new(BattleConfig::default());
        let mut skill = SkillData {
            name: "channel beam".into(),
            channel_time_ms: 300,
            ..SkillData::default()
        };
        skill.deployment.deployment_type = SkillDeploymentType::Beam;
        skill.beam.width_units = 2;
        skill.beam.frequency_ms = 100;
        let abilities = AbilitiesData {
            abilities: vec![AbilityData::with_single_skill("beam attack", 0, skill)],
            selection_type: Default::default(),
        };

        let attacker = spawn_unit(&mut world, Team::Red, -4, abilities);
        let victim = spawn_unit(&mut world, Team::Blue, 4, AbilitiesData::default());
        focus_on(&mut world, attacker, victim);

        time_step(&mut world);

        let active = world
            .get(attacker)
            .unwrap()
            .components
            .abilities
            .as_ref()
            .unwrap()
            .active
            .unwrap();
        assert!(active.is_channeling);
        assert_eq!(active.total_duration_time_steps, 3);
    }

    #[test]
    fn test_activate_synthetic_delivers_package() {
        let mut world = World::new(BattleConfig::default());
        let owner = spawn_unit(&mut world, Team::Red, -4, AbilitiesData::default());
        let victim = spawn_unit(&mut world, Team::Blue, 4, AbilitiesData::default());

        let carrier = world.add_entity(Team::Red, owner);
        let mut skill = SkillData {
            name: "payload".into(),
            ..SkillData::default()
        };
        skill.deployment.deployment_type = SkillDeploymentType::Direct;
        skill.effect_package.add_damage_effect(
            EffectDamageType::Pure,
            EffectExpression::from_value(FixedPoint::from_int(25)),
        );
        world.get_mut(carrier).unwrap().components.abilities =
            Some(crate::components::AbilitiesComponent {
                abilities: AbilitiesData {
                    abilities: vec![AbilityData::with_single_skill("payload", 0, skill)],
                    selection_type: Default::default(),
                },
                ..Default::default()
            });

        activate_synthetic(&mut world, carrier, owner, &[victim], false);
        assert_eq!(current_health(&world, victim), FixedPoint::from_int(75));
    }
}
