//! Zone behavior: growth, periodic activation, teardown conditions.

use tracing::warn;

use crate::data::spawnables::{ZoneData, ZoneEffectShape};
use crate::entity::{EntityId, Team};
use crate::event::Event;
use crate::grid::time::ms_to_time_steps;
use crate::hex::HexGridPosition;
use crate::intersection::{
    does_hex_zone_intersect_entity, does_rectangle_zone_intersect_entity,
    TriangleZoneIntersectionCache,
};
use crate::math;
use crate::systems::ability;
use crate::world::World;

/// Advance every zone by one step.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(zone) = entity.components.zone.clone() else {
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

        let mut data = zone.data;
        if data.growth_rate_sub_units_per_time_step > 0
            && data.max_radius_sub_units > data.radius_sub_units
        {
            data.radius_sub_units = (data.radius_sub_units
                + data.growth_rate_sub_units_per_time_step)
                .min(data.max_radius_sub_units);
        }

        if should_destroy(world, id, &data, position.position) {
            write_back(world, id, data, zone.time_step_count + 1, zone.activation_count);
            world.emit_event(Event::ZoneDestroyed { entity_id: id });
            continue;
        }

        let frequency_steps = ms_to_time_steps(data.frequency_ms);
        if frequency_steps <= 0 {
            if zone.time_step_count == 0 {
                warn!(entity_id = id, frequency_ms = data.frequency_ms, "zone never activates");
            }
            write_back(world, id, data, zone.time_step_count + 1, zone.activation_count);
            continue;
        }
        if zone.time_step_count % frequency_steps != 0 {
            write_back(world, id, data, zone.time_step_count + 1, zone.activation_count);
            continue;
        }

        let activation_index = zone.activation_count;
        if data.skip_activations.contains(&activation_index) {
            write_back(world, id, data, zone.time_step_count + 1, activation_index + 1);
            continue;
        }

        let receiver_ids = zone_receivers(world, id, team, &data, position.position);
        let combat_unit_sender_id = data.original_sender_id;
        let is_critical = data.is_critical;
        write_back(world, id, data, zone.time_step_count + 1, activation_index + 1);
        if let Some(entity) = world.get_mut(id) {
            if let Some(filtering) = entity.components.filtering.as_mut() {
                for &receiver_id in &receiver_ids {
                    filtering.add_hit(receiver_id);
                }
            }
        }

        if !receiver_ids.is_empty() {
            ability::activate_synthetic(world, id, combat_unit_sender_id, &receiver_ids, is_critical);
        }
        world.emit_event(Event::ZoneActivated {
            entity_id: id,
            activation_index,
            receiver_ids,
        });
    }
}

fn write_back(world: &mut World, id: EntityId, data: ZoneData, time_step_count: i32, activation_count: i32) {
    let radius_units = math::sub_units_to_units(data.radius_sub_units);
    if let Some(entity) = world.get_mut(id) {
        if let Some(position) = entity.components.position.as_mut() {
            position.radius_units = radius_units;
        }
        if let Some(zone) = entity.components.zone.as_mut() {
            zone.data = data;
            zone.time_step_count = time_step_count;
            zone.activation_count = activation_count;
        }
    }
}

fn should_destroy(world: &World, id: EntityId, data: &ZoneData, position: HexGridPosition) -> bool {
    if !world.grid_config().is_in_map_rectangle_limits(position, 0, 0) {
        return true;
    }
    if data.is_channeled && !sender_is_channeling(world, data.sender_id) {
        return true;
    }
    if data.destroy_with_sender && !owner_is_alive(world, id) {
        return true;
    }
    false
}

fn sender_is_channeling(world: &World, sender_id: EntityId) -> bool {
    world
        .get(sender_id)
        .and_then(|entity| entity.components.abilities.as_ref())
        .and_then(|abilities| abilities.active)
        .is_some_and(|active| active.is_channeling)
}

fn owner_is_alive(world: &World, id: EntityId) -> bool {
    let Some(owner_id) = world.combat_unit_owner(id) else {
        return false;
    };
    world.get(owner_id).is_some_and(|owner| {
        owner.is_active()
            && owner
                .components
                .combat_unit
                .is_some_and(|unit| !unit.fainted)
    })
}

/// Living enemy combat units inside the zone's shape that the zone may
/// still hit. Walked in entity-store order.
fn zone_receivers(
    world: &World,
    zone_id: EntityId,
    zone_team: Team,
    data: &ZoneData,
    zone_position: HexGridPosition,
) -> Vec<EntityId> {
    let grid = world.grid_config();
    let radius_units = math::sub_units_to_units(data.radius_sub_units);
    let triangle = (data.shape == ZoneEffectShape::Triangle).then(|| {
        TriangleZoneIntersectionCache::new(grid, zone_position, data.direction_degrees, radius_units)
    });
    let filtering = world
        .get(zone_id)
        .and_then(|entity| entity.components.filtering.clone());

    let mut receiver_ids = Vec::new();
    for candidate in world.entities() {
        if candidate.id() == zone_id
            || !candidate.is_active()
            || candidate.team() == zone_team
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

        let hit = match data.shape {
            ZoneEffectShape::None | ZoneEffectShape::Hexagon => does_hex_zone_intersect_entity(
                radius_units,
                zone_position,
                candidate_position.position,
            ),
            ZoneEffectShape::Rectangle => does_rectangle_zone_intersect_entity(
                zone_position.to_sub_units(),
                candidate_position.position.to_sub_units(),
                data.width_sub_units,
                data.height_sub_units,
            ),
            ZoneEffectShape::Triangle => triangle
                .as_ref()
                .is_some_and(|cache| cache.intersects_entity(grid, candidate_position.position)),
        };
        if hit {
            receiver_ids.push(candidate.id());
        }
    }
    receiver_ids
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

    #[test]
    fn test_activates_on_enemies_in_radius() {
        let mut world = World::new(BattleConfig::default());
        let owner = spawn_unit(&mut world, Team::Red, 0, -2);
        let enemy = spawn_unit(&mut world, Team::Blue, 0, 2);
        let far_enemy = spawn_unit(&mut world, Team::Blue, 0, 20);

        let data = ZoneData {
            skill_data: damage_skill(10),
            sender_id: owner,
            radius_sub_units: 3000,
            duration_ms: 500,
            frequency_ms: 100,
            ..ZoneData::default()
        };
        let zone_id = factory::spawn_zone(&mut world, data, HexGridPosition::new(0, 0)).unwrap();

        time_step(&mut world);

        assert_eq!(current_health(&world, enemy), FixedPoint::from_int(90));
        assert_eq!(current_health(&world, far_enemy), FixedPoint::from_int(100));
        assert!(world.step_events().iter().any(|event| matches!(
            event,
            Event::ZoneActivated { entity_id, receiver_ids, .. }
                if *entity_id == zone_id && receiver_ids.contains(&enemy)
        )));
    }

    #[test]
    fn test_apply_once_hits_each_enemy_once() {
        let mut world = World::new(BattleConfig::default());
        let owner = spawn_unit(&mut world, Team::Red, 0, -2);
        let enemy = spawn_unit(&mut world, Team::Blue, 0, 2);

        let data = ZoneData {
            skill_data: damage_skill(10),
            sender_id: owner,
            radius_sub_units: 3000,
            duration_ms: 1000,
            frequency_ms: 100,
            apply_once: true,
            ..ZoneData::default()
        };
        factory::spawn_zone(&mut world, data, HexGridPosition::new(0, 0)).unwrap();

        time_step(&mut world);
        time_step(&mut world);

        assert_eq!(current_health(&world, enemy), FixedPoint::from_int(90));
    }

    #[test]
    fn test_growth_is_capped_at_max_radius() {
        let mut world = World::new(BattleConfig::default());
        let owner = spawn_unit(&mut world, Team::Red, 0, -2);

        let data = ZoneData {
            skill_data: damage_skill(10),
            sender_id: owner,
            radius_sub_units: 2000,
            max_radius_sub_units: 4000,
            growth_rate_sub_units_per_time_step: 1500,
            duration_ms: 1000,
            frequency_ms: 100,
            ..ZoneData::default()
        };
        let zone_id = factory::spawn_zone(&mut world, data, HexGridPosition::new(0, 0)).unwrap();

        let radius = |world: &World| {
            world
                .get(zone_id)
                .unwrap()
                .components
                .zone
                .as_ref()
                .unwrap()
                .data
                .radius_sub_units
        };
        time_step(&mut world);
        assert_eq!(radius(&world), 3500);
        time_step(&mut world);
        assert_eq!(radius(&world), 4000);
        time_step(&mut world);
        assert_eq!(radius(&world), 4000);
    }

    #[test]
    fn test_channeled_zone_dies_when_channel_ends() {
        let mut world = World::new(BattleConfig::default());
        let owner = spawn_unit(&mut world, Team::Red, 0, -2);

        let data = ZoneData {
            skill_data: damage_skill(10),
            sender_id: owner,
            radius_sub_units: 3000,
            duration_ms: 1000,
            frequency_ms: 100,
            is_channeled: true,
            ..ZoneData::default()
        };
        let zone_id = factory::spawn_zone(&mut world, data, HexGridPosition::new(0, 0)).unwrap();

        // The owner is not channeling anything
        time_step(&mut world);

        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::ZoneDestroyed { entity_id } if *entity_id == zone_id)));
    }

    #[test]
    fn test_frequency_gates_activation() {
        let mut world = World::new(BattleConfig::default());
        let owner = spawn_unit(&mut world, Team::Red, 0, -2);
        let enemy = spawn_unit(&mut world, Team::Blue, 0, 2);

        let data = ZoneData {
            skill_data: damage_skill(10),
            sender_id: owner,
            radius_sub_units: 3000,
            duration_ms: 1000,
            frequency_ms: 200,
            ..ZoneData::default()
        };
        factory::spawn_zone(&mut world, data, HexGridPosition::new(0, 0)).unwrap();

        time_step(&mut world); // step 0: activates
        time_step(&mut world); // step 1: off cycle
        assert_eq!(current_health(&world, enemy), FixedPoint::from_int(90));
        time_step(&mut world); // step 2: activates again
        assert_eq!(current_health(&world, enemy), FixedPoint::from_int(80));
    }
}
