//! Beam behavior: follow the sender, re-aim while homing, activate on a
//! frequency, resolve blocking along the beam line.

use crate::data::spawnables::BeamData;
use crate::entity::{EntityId, Team};
use crate::event::Event;
use crate::grid::time::ms_to_time_steps;
use crate::grid::GridConfig;
use crate::hex::HexGridPosition;
use crate::intersection::BeamIntersectionCache;
use crate::math;
use crate::systems::ability;
use crate::world::World;

/// Advance every beam by one step.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(beam) = entity.components.beam.clone() else {
            continue;
        };
        if entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction())
        {
            continue;
        }
        let team = entity.team();

        // A beam only lives while its sender channels it
        if !sender_is_channeling(world, beam.data.sender_id) {
            if let Some(entity) = world.get_mut(id) {
                if let Some(beam) = entity.components.beam.as_mut() {
                    beam.is_interrupted = true;
                }
            }
            world.emit_event(Event::BeamDestroyed { entity_id: id });
            continue;
        }

        let mut data = beam.data;
        let grid = world.grid_config();

        // The beam origin rides on its sender
        let origin = world
            .get(data.sender_id)
            .and_then(|sender| sender.components.position)
            .map(|position| position.position);
        let Some(origin) = origin else {
            world.emit_event(Event::BeamDestroyed { entity_id: id });
            continue;
        };
        if let Some(entity) = world.get_mut(id) {
            if let Some(position) = entity.components.position.as_mut() {
                position.position = origin;
            }
        }

        if data.is_homing {
            if let Some(aim) = world
                .get(data.receiver_id)
                .filter(|receiver| receiver.is_active())
                .and_then(|receiver| receiver.components.position)
            {
                data.direction_degrees = grid.angle_360_between(origin, aim.position);
                let distance_units = (aim.position - origin).length();
                data.length_world_sub_units =
                    grid.to_world_scalar(math::units_to_sub_units(distance_units));
                world.emit_event(Event::BeamUpdated {
                    entity_id: id,
                    direction_degrees: data.direction_degrees,
                    length_world_sub_units: data.length_world_sub_units,
                });
            }
        }

        let frequency_steps = ms_to_time_steps(data.frequency_ms).max(1);
        let activates = beam.time_step_count % frequency_steps == 0;

        let receiver_ids = if activates {
            beam_receivers(world, id, team, &data, origin)
        } else {
            Vec::new()
        };
        let combat_unit_sender_id = world.combat_unit_owner(id).unwrap_or(data.sender_id);
        let is_critical = data.is_critical;

        if let Some(entity) = world.get_mut(id) {
            if let Some(beam) = entity.components.beam.as_mut() {
                beam.data = data;
                beam.time_step_count += 1;
                if activates {
                    beam.activation_count += 1;
                }
            }
            if activates {
                if let Some(filtering) = entity.components.filtering.as_mut() {
                    for &receiver_id in &receiver_ids {
                        filtering.add_hit(receiver_id);
                    }
                }
            }
        }

        if activates {
            if !receiver_ids.is_empty() {
                ability::activate_synthetic(world, id, combat_unit_sender_id, &receiver_ids, is_critical);
            }
            world.emit_event(Event::BeamActivated {
                entity_id: id,
                receiver_ids,
            });
        }
    }
}

fn sender_is_channeling(world: &World, sender_id: EntityId) -> bool {
    world
        .get(sender_id)
        .and_then(|entity| entity.components.abilities.as_ref())
        .and_then(|abilities| abilities.active)
        .is_some_and(|active| active.is_channeling)
}

/// Enemy combat units hit by the beam, ordered along the beam line with
/// entity id as the tiebreaker. A blockable beam is cut short after the
/// first entity matching its block allegiance.
fn beam_receivers(
    world: &World,
    beam_id: EntityId,
    beam_team: Team,
    data: &BeamData,
    origin: HexGridPosition,
) -> Vec<EntityId> {
    let grid = world.grid_config();
    let cache = BeamIntersectionCache::new(
        grid,
        origin,
        data.direction_degrees,
        data.width_sub_units,
        data.length_world_sub_units,
    );
    let filtering = world
        .get(beam_id)
        .and_then(|entity| entity.components.filtering.clone());

    let mut hits: Vec<(i32, EntityId, Team)> = Vec::new();
    for candidate in world.entities() {
        if candidate.id() == beam_id
            || candidate.id() == data.sender_id
            || !candidate.is_active()
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
        if !cache.intersects_entity(grid, candidate_position.position, candidate_position.radius_units)
        {
            continue;
        }
        let along = distance_along_beam(grid, data.direction_degrees, candidate_position.position);
        hits.push((along, candidate.id(), candidate.team()));
    }
    hits.sort_by_key(|&(along, id, _)| (along, id));

    let mut receiver_ids = Vec::new();
    for &(_, candidate_id, candidate_team) in &hits {
        let blocks = data.is_blockable
            && data
                .block_allegiance
                .matches(beam_team, beam_id, candidate_team, candidate_id);
        if candidate_team != beam_team {
            receiver_ids.push(candidate_id);
        }
        if blocks {
            break;
        }
    }
    receiver_ids
}

fn distance_along_beam(grid: GridConfig, direction_degrees: i32, position: HexGridPosition) -> i32 {
    grid.to_world_position(position).rotate(-direction_degrees).x
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

    fn start_channel(world: &mut World, id: EntityId) {
        let entity = world.get_mut(id).unwrap();
        let abilities = entity.components.abilities.as_mut().unwrap();
        abilities.active = Some(crate::components::ActiveAbility {
            ability_index: 0,
            skill_index: 0,
            start_time_step: 0,
            total_duration_time_steps: 100,
            deployed: true,
            is_channeling: true,
        });
    }

    fn beam_between(world: &mut World, sender: EntityId, receiver: EntityId, width_units: i32) -> EntityId {
        let data = BeamData {
            skill_data: damage_skill(10),
            sender_id: sender,
            receiver_id: receiver,
            width_sub_units: math::units_to_sub_units(width_units),
            frequency_ms: 100,
            ..BeamData::default()
        };
        factory::spawn_beam(world, data).unwrap()
    }

    #[test]
    fn test_hits_enemies_along_the_line() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, -5, 10);
        let receiver = spawn_unit(&mut world, Team::Blue, 5, 10);
        start_channel(&mut world, sender);
        let beam_id = beam_between(&mut world, sender, receiver, 2);

        time_step(&mut world);

        assert_eq!(current_health(&world, receiver), FixedPoint::from_int(90));
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::BeamActivated { entity_id, .. } if *entity_id == beam_id)));
    }

    #[test]
    fn test_equal_distance_ties_break_by_id() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, -5, 10);
        let receiver = spawn_unit(&mut world, Team::Blue, 5, 10);
        // These two positions project to the same point along the beam line
        let near_a = spawn_unit(&mut world, Team::Blue, 4, 8);
        let near_b = spawn_unit(&mut world, Team::Blue, 2, 12);
        start_channel(&mut world, sender);
        beam_between(&mut world, sender, receiver, 6);

        time_step(&mut world);

        let activated = world.step_events().iter().find_map(|event| match event {
            Event::BeamActivated { receiver_ids, .. } => Some(receiver_ids.clone()),
            _ => None,
        });
        let receiver_ids = activated.unwrap();
        let index_a = receiver_ids.iter().position(|&id| id == near_a).unwrap();
        let index_b = receiver_ids.iter().position(|&id| id == near_b).unwrap();
        assert!(index_a < index_b);
    }

    #[test]
    fn test_blockable_beam_stops_at_first_blocker() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, -5, 10);
        let receiver = spawn_unit(&mut world, Team::Blue, 5, 10);
        let blocker = spawn_unit(&mut world, Team::Blue, 0, 10);
        start_channel(&mut world, sender);

        let data = BeamData {
            skill_data: damage_skill(10),
            sender_id: sender,
            receiver_id: receiver,
            width_sub_units: math::units_to_sub_units(2),
            frequency_ms: 100,
            is_blockable: true,
            ..BeamData::default()
        };
        factory::spawn_beam(&mut world, data).unwrap();

        time_step(&mut world);

        assert_eq!(current_health(&world, blocker), FixedPoint::from_int(90));
        assert_eq!(current_health(&world, receiver), FixedPoint::from_int(100));
    }

    #[test]
    fn test_beam_dies_when_channel_ends() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, -5, 10);
        let receiver = spawn_unit(&mut world, Team::Blue, 5, 10);
        start_channel(&mut world, sender);
        let beam_id = beam_between(&mut world, sender, receiver, 2);

        // Channel ends before the next step
        world
            .get_mut(sender)
            .unwrap()
            .components
            .abilities
            .as_mut()
            .unwrap()
            .active = None;
        time_step(&mut world);

        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::BeamDestroyed { entity_id } if *entity_id == beam_id)));
        assert!(world
            .get(beam_id)
            .unwrap()
            .components
            .beam
            .as_ref()
            .unwrap()
            .is_interrupted);
    }

    #[test]
    fn test_homing_beam_reaims_at_moved_receiver() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, -5, 10);
        let receiver = spawn_unit(&mut world, Team::Blue, 5, 10);
        start_channel(&mut world, sender);

        let data = BeamData {
            skill_data: damage_skill(10),
            sender_id: sender,
            receiver_id: receiver,
            width_sub_units: math::units_to_sub_units(2),
            frequency_ms: 100,
            is_homing: true,
            ..BeamData::default()
        };
        let beam_id = factory::spawn_beam(&mut world, data).unwrap();
        let initial_direction = world
            .get(beam_id)
            .unwrap()
            .components
            .beam
            .as_ref()
            .unwrap()
            .data
            .direction_degrees;

        world
            .get_mut(receiver)
            .unwrap()
            .components
            .position
            .as_mut()
            .unwrap()
            .position = HexGridPosition::new(2, 16);
        time_step(&mut world);

        let updated = world
            .get(beam_id)
            .unwrap()
            .components
            .beam
            .as_ref()
            .unwrap()
            .data
            .direction_degrees;
        assert_ne!(updated, initial_direction);
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::BeamUpdated { entity_id, .. } if *entity_id == beam_id)));
    }
}
