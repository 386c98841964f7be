//! Projectile behavior: homing pursuit, interception, arrival.
//!
//! Movement itself runs in the movement system; this system retargets
//! homing projectiles, resolves who the projectile touches this step and
//! decides whether the flight ends.

use crate::components::{MovementType, PositionComponent};
use crate::data::spawnables::ProjectileData;
use crate::entity::{EntityId, Team};
use crate::event::Event;
use crate::grid;
use crate::hex::HexGridPosition;
use crate::systems::ability;
use crate::world::World;

/// Advance every projectile by one step.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(projectile) = entity.components.projectile.clone() else {
            continue;
        };
        if entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction())
        {
            continue;
        }
        let Some(position) = entity.components.position else {
            continue;
        };
        let team = entity.team();
        let data = &projectile.data;

        if !world
            .grid_config()
            .is_in_map_rectangle_limits(position.position, 0, 0)
        {
            world.emit_event(Event::ProjectileDestroyed { entity_id: id });
            continue;
        }

        if data.is_homing && !projectile.reached_target {
            retarget(world, id, data.receiver_id);
        }

        let touching = touching_enemies(world, id, team, &position);
        let combat_unit_sender_id = world.combat_unit_owner(id).unwrap_or(data.sender_id);

        if data.apply_to_all || (projectile.reached_target && data.continue_after_target) {
            // Damage everything passed through, fly on
            for &receiver_id in &touching {
                deliver(world, id, combat_unit_sender_id, receiver_id, data);
            }
            if touching.contains(&data.receiver_id) && !projectile.reached_target {
                if data.continue_after_target {
                    mark_reached(world, id, data);
                } else {
                    world.emit_event(Event::ProjectileDestroyed { entity_id: id });
                }
                continue;
            }
            let arrived = world
                .get(id)
                .and_then(|entity| entity.components.movement)
                .is_some_and(|movement| movement.movement_type == MovementType::None);
            if arrived && !data.continue_after_target {
                world.emit_event(Event::ProjectileDestroyed { entity_id: id });
            }
            continue;
        }

        if data.is_blockable {
            // Anything in the way intercepts the projectile
            if let Some(&receiver_id) = touching.first() {
                deliver(world, id, combat_unit_sender_id, receiver_id, data);
                world.emit_event(Event::ProjectileDestroyed { entity_id: id });
                continue;
            }
        } else if touching.contains(&data.receiver_id) {
            deliver(world, id, combat_unit_sender_id, data.receiver_id, data);
            if data.continue_after_target {
                mark_reached(world, id, data);
            } else {
                world.emit_event(Event::ProjectileDestroyed { entity_id: id });
            }
            continue;
        }

        // The flight ended without touching the intended receiver (it
        // died or moved away from a non-homing path)
        let arrived = world
            .get(id)
            .and_then(|entity| entity.components.movement)
            .is_some_and(|movement| movement.movement_type == MovementType::None);
        if arrived {
            world.emit_event(Event::ProjectileDestroyed { entity_id: id });
        }
    }
}

fn retarget(world: &mut World, id: EntityId, receiver_id: EntityId) {
    let target = world
        .get(receiver_id)
        .filter(|receiver| receiver.is_active())
        .and_then(|receiver| receiver.components.position)
        .map(|position| position.position);
    let Some(target) = target else {
        return;
    };
    if let Some(entity) = world.get_mut(id) {
        if let Some(movement) = entity.components.movement.as_mut() {
            if matches!(movement.movement_type, MovementType::DirectPosition { .. }) {
                movement.movement_type = MovementType::DirectPosition { target };
            }
        }
    }
}

fn deliver(
    world: &mut World,
    projectile_id: EntityId,
    combat_unit_sender_id: EntityId,
    receiver_id: EntityId,
    data: &ProjectileData,
) {
    if let Some(entity) = world.get_mut(projectile_id) {
        if let Some(filtering) = entity.components.filtering.as_mut() {
            filtering.add_hit(receiver_id);
        }
    }
    ability::activate_synthetic(
        world,
        projectile_id,
        combat_unit_sender_id,
        &[receiver_id],
        data.is_critical,
    );
    world.emit_event(Event::ProjectileHit {
        entity_id: projectile_id,
        receiver_id,
    });
}

/// Switch an arrived projectile to straight-line flight along its current
/// heading so it keeps going until it leaves the board.
fn mark_reached(world: &mut World, id: EntityId, data: &ProjectileData) {
    let heading = world
        .get(id)
        .and_then(|entity| entity.components.position.zip(entity.components.movement))
        .and_then(|(position, movement)| match movement.movement_type {
            MovementType::DirectPosition { target } => Some(
                grid::sub_units_vector_between(position.position, target).to_normalized_and_scaled(),
            ),
            _ => None,
        })
        .filter(|direction| !direction.is_null())
        .unwrap_or_else(|| direction_from_sender(world, id, data));
    if let Some(entity) = world.get_mut(id) {
        if let Some(projectile) = entity.components.projectile.as_mut() {
            projectile.reached_target = true;
        }
        if let Some(movement) = entity.components.movement.as_mut() {
            movement.movement_type = MovementType::DirectVector { direction: heading };
        }
    }
}

fn direction_from_sender(world: &World, id: EntityId, data: &ProjectileData) -> HexGridPosition {
    let positions = world
        .get(data.sender_id)
        .and_then(|sender| sender.components.position)
        .zip(world.get(id).and_then(|entity| entity.components.position));
    match positions {
        Some((sender, own)) => {
            grid::sub_units_vector_between(sender.position, own.position).to_normalized_and_scaled()
        }
        None => HexGridPosition::new(0, 0),
    }
}

/// Living enemy combat units the projectile currently overlaps, ordered
/// by distance with id as the tiebreaker.
fn touching_enemies(
    world: &World,
    projectile_id: EntityId,
    team: Team,
    position: &PositionComponent,
) -> Vec<EntityId> {
    let filtering = world
        .get(projectile_id)
        .and_then(|entity| entity.components.filtering.clone());

    let mut hits: Vec<(i32, EntityId)> = Vec::new();
    for candidate in world.entities() {
        if candidate.id() == projectile_id
            || !candidate.is_active()
            || candidate.team() == team
            || !candidate
                .components
                .combat_unit
                .is_some_and(|unit| !unit.fainted)
        {
            continue;
        }
        let Some(candidate_position) = candidate.components.position else {
            continue;
        };
        if filtering
            .as_ref()
            .is_some_and(|filtering| !filtering.can_hit(candidate.id()))
        {
            continue;
        }
        let distance = (candidate_position.position - position.position).length();
        if distance <= position.radius_units + candidate_position.radius_units {
            hits.push((distance, candidate.id()));
        }
    }
    hits.sort_unstable();
    hits.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::skills::{AbilitiesData, EffectDamageType, SkillData};
    use crate::data::stats::{StatType, StatsData};
    use crate::expression::EffectExpression;
    use crate::factory;
    use crate::fixed_point::FixedPoint;
    use crate::world::BattleConfig;

    fn unit_stats(health: i64) -> StatsData {
        StatsData::new()
            .with(StatType::MaxHealth, FixedPoint::from_int(health))
            .with(StatType::CurrentHealth, FixedPoint::from_int(health))
    }

    fn spawn_unit(world: &mut World, team: Team, q: i32, r: i32) -> EntityId {
        factory::spawn_combat_unit(
            world,
            team,
            HexGridPosition::new(q, r),
            1,
            unit_stats(100),
            AbilitiesData::default(),
        )
        .unwrap()
    }

    fn damage_skill(damage: i64) -> SkillData {
        let mut skill = SkillData::default();
        skill.effect_package.add_damage_effect(
            EffectDamageType::Pure,
            EffectExpression::from_value(FixedPoint::from_int(damage)),
        );
        skill
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

    fn fly_projectile(world: &mut World, sender: EntityId, receiver: EntityId, speed: i32) -> EntityId {
        let data = ProjectileData {
            skill_data: damage_skill(10),
            sender_id: sender,
            receiver_id: receiver,
            radius_units: 1,
            is_homing: true,
            ..ProjectileData::default()
        };
        factory::spawn_projectile(world, data, speed).unwrap()
    }

    fn step(world: &mut World) {
        crate::systems::movement::time_step(world);
        time_step(world);
    }

    #[test]
    fn test_reaches_receiver_and_is_destroyed() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -5);
        let receiver = spawn_unit(&mut world, Team::Blue, 0, 5);
        let projectile_id = fly_projectile(&mut world, sender, receiver, 5000);

        step(&mut world); // moves 5 hexes, touching the receiver
        step(&mut world);

        assert_eq!(current_health(&world, receiver), FixedPoint::from_int(90));
        let events: Vec<_> = world.step_events().to_vec();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::ProjectileHit { entity_id, receiver_id }
                if *entity_id == projectile_id && *receiver_id == receiver)));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::ProjectileDestroyed { entity_id } if *entity_id == projectile_id)));
    }

    #[test]
    fn test_homing_follows_moved_receiver() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -5);
        let receiver = spawn_unit(&mut world, Team::Blue, 0, 5);
        let projectile_id = fly_projectile(&mut world, sender, receiver, 2000);

        world
            .get_mut(receiver)
            .unwrap()
            .components
            .position
            .as_mut()
            .unwrap()
            .position = HexGridPosition::new(6, 5);
        time_step(&mut world); // retargets before the next move

        let movement = world.get(projectile_id).unwrap().components.movement.unwrap();
        assert_eq!(
            movement.movement_type,
            MovementType::DirectPosition {
                target: HexGridPosition::new(6, 5)
            }
        );
    }

    #[test]
    fn test_blockable_projectile_is_intercepted() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -6);
        let receiver = spawn_unit(&mut world, Team::Blue, 0, 6);
        let interceptor = spawn_unit(&mut world, Team::Blue, 0, -2);

        let data = ProjectileData {
            skill_data: damage_skill(10),
            sender_id: sender,
            receiver_id: receiver,
            radius_units: 1,
            is_blockable: true,
            ..ProjectileData::default()
        };
        let projectile_id = factory::spawn_projectile(&mut world, data, 2000).unwrap();

        step(&mut world); // at r=-4
        step(&mut world); // at r=-2, touching the interceptor

        assert_eq!(current_health(&world, interceptor), FixedPoint::from_int(90));
        assert_eq!(current_health(&world, receiver), FixedPoint::from_int(100));
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::ProjectileDestroyed { entity_id } if *entity_id == projectile_id)));
    }

    #[test]
    fn test_apply_to_all_damages_everything_on_the_path() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -6);
        let receiver = spawn_unit(&mut world, Team::Blue, 0, 6);
        let bystander = spawn_unit(&mut world, Team::Blue, 0, -2);

        let data = ProjectileData {
            skill_data: damage_skill(10),
            sender_id: sender,
            receiver_id: receiver,
            radius_units: 1,
            apply_to_all: true,
            ..ProjectileData::default()
        };
        factory::spawn_projectile(&mut world, data, 2000).unwrap();

        for _ in 0..7 {
            step(&mut world);
        }

        assert_eq!(current_health(&world, bystander), FixedPoint::from_int(90));
        assert_eq!(current_health(&world, receiver), FixedPoint::from_int(90));
    }
}
