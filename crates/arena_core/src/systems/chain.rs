//! Chain lifecycle: delivery to the first receiver, then one bounce per
//! chain entity. A bounce spawns a fresh chain with a decremented counter
//! and the accumulated target history, so a whole chain of `n` links is
//! `n` short-lived entities.

use crate::data::spawnables::ChainData;
use crate::entity::EntityId;
use crate::event::Event;
use crate::factory;
use crate::systems::ability;
use crate::world::World;
use tracing::debug;

/// Advance every chain by one step.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(chain) = entity.components.chain.clone() else {
            continue;
        };
        if entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction())
        {
            continue;
        }

        if !chain.has_delivered {
            deliver(world, id, &chain.data);
            continue;
        }

        let delay_elapsed = entity
            .components
            .duration
            .map_or(true, |duration| duration.is_expired());
        if !chain.has_bounced && delay_elapsed {
            try_bounce(world, id);
        }
    }
}

/// Zero-delay chains bounce as soon as their payload lands, without
/// waiting for the next step.
pub fn on_event(world: &mut World, event: &Event) {
    let Event::AbilityDeactivated { sender_id, .. } = event else {
        return;
    };
    let Some(entity) = world.get(*sender_id) else {
        return;
    };
    let ready = entity.components.chain.as_ref().is_some_and(|chain| {
        chain.has_delivered && !chain.has_bounced && chain.data.chain_delay_ms == 0
    });
    if ready {
        try_bounce(world, *sender_id);
    }
}

fn deliver(world: &mut World, id: EntityId, data: &ChainData) {
    let receiver_id = data.first_propagation_receiver_id;
    if let Some(entity) = world.get_mut(id) {
        if let Some(chain) = entity.components.chain.as_mut() {
            chain.has_delivered = true;
            chain.data.old_target_entities.insert(receiver_id);
        }
        if let Some(filtering) = entity.components.filtering.as_mut() {
            filtering.add_hit(receiver_id);
        }
    }
    let receiver_alive = world.get(receiver_id).is_some_and(|receiver| {
        receiver.is_active()
            && receiver
                .components
                .combat_unit
                .is_some_and(|unit| !unit.fainted)
    });
    if receiver_alive {
        ability::activate_synthetic(
            world,
            id,
            data.combat_unit_sender_id,
            &[receiver_id],
            data.is_critical,
        );
    } else {
        debug!(entity_id = id, receiver_id, "chain receiver died before delivery");
    }
}

fn try_bounce(world: &mut World, id: EntityId) {
    let data = {
        let Some(entity) = world.get_mut(id) else {
            return;
        };
        let Some(chain) = entity.components.chain.as_mut() else {
            return;
        };
        if chain.has_bounced {
            return;
        }
        chain.has_bounced = true;
        chain.data.clone()
    };
    let data = &data;

    if data.chain_number <= 1 {
        world.emit_event(Event::ChainDestroyed { entity_id: id });
        return;
    }

    let Some(receiver_id) = next_bounce_receiver(world, id, data) else {
        debug!(entity_id = id, "chain found no bounce receiver");
        world.emit_event(Event::ChainDestroyed { entity_id: id });
        return;
    };

    let next = ChainData {
        first_propagation_receiver_id: receiver_id,
        chain_number: data.chain_number - 1,
        ..data.clone()
    };
    match factory::spawn_chain(world, next) {
        Ok(new_chain_id) => {
            world.emit_event(Event::ChainBounced {
                entity_id: id,
                new_chain_id,
                receiver_id,
            });
        }
        Err(error) => {
            debug!(entity_id = id, %error, "chain bounce failed");
        }
    }
    world.emit_event(Event::ChainDestroyed { entity_id: id });
}

/// The nearest valid bounce target from the chain's current cell, ties
/// broken by id. New targets win over already-hit ones when
/// `prioritize_new_targets` is set.
fn next_bounce_receiver(world: &World, id: EntityId, data: &ChainData) -> Option<EntityId> {
    let entity = world.get(id)?;
    let own_team = entity.team();
    let own_position = entity.components.position?.position;
    let max_distance = data.chain_bounce_max_distance_units;

    let mut best: Option<(bool, i32, EntityId)> = None;
    for candidate in world.entities() {
        let candidate_id = candidate.id();
        if candidate_id == id
            || !candidate.is_active()
            || !candidate
                .components
                .combat_unit
                .is_some_and(|unit| !unit.fainted)
            || !data
                .targeting_group
                .matches(own_team, id, candidate.team(), candidate_id)
        {
            continue;
        }
        if data.ignore_first_propagation_receiver
            && candidate_id == data.first_propagation_receiver_id
        {
            continue;
        }
        // Without prioritization the target history is a hard exclusion,
        // otherwise old targets are only a last resort
        let already_hit = data.old_target_entities.contains(&candidate_id);
        if already_hit && (data.only_new_targets || !data.prioritize_new_targets) {
            continue;
        }
        let Some(candidate_position) = candidate.components.position else {
            continue;
        };
        let distance = (candidate_position.position - own_position).length();
        if max_distance > 0 && distance > max_distance {
            continue;
        }
        let key = (already_hit, distance, candidate_id);
        if best.map_or(true, |current| key < current) {
            best = Some(key);
        }
    }
    best.map(|(_, _, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::skills::{AbilitiesData, EffectDamageType, EffectPackage};
    use crate::data::stats::{StatType, StatsData};
    use crate::entity::Team;
    use crate::expression::EffectExpression;
    use crate::fixed_point::FixedPoint;
    use crate::hex::HexGridPosition;
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

    fn damage_package(damage: i64) -> EffectPackage {
        let mut package = EffectPackage::default();
        package.add_damage_effect(
            EffectDamageType::Pure,
            EffectExpression::from_value(FixedPoint::from_int(damage)),
        );
        package
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

    fn chain_of(sender: EntityId, receiver: EntityId, chain_number: i32) -> ChainData {
        ChainData {
            sender_id: sender,
            first_propagation_receiver_id: receiver,
            chain_number,
            chain_delay_ms: 100,
            only_new_targets: true,
            propagation_effect_package: damage_package(10),
            ..ChainData::default()
        }
    }

    fn tick_durations(world: &mut World) {
        for id in world.entity_ids() {
            if let Some(entity) = world.get_mut(id) {
                if let Some(duration) = entity.components.duration.as_mut() {
                    duration.tick();
                }
            }
        }
    }

    #[test]
    fn test_delivers_to_first_receiver() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -4);
        let receiver = spawn_unit(&mut world, Team::Blue, 0, 4);
        factory::spawn_chain(&mut world, chain_of(sender, receiver, 1)).unwrap();

        time_step(&mut world);

        assert_eq!(current_health(&world, receiver), FixedPoint::from_int(90));
    }

    #[test]
    fn test_bounces_to_nearest_new_target() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -6);
        let first = spawn_unit(&mut world, Team::Blue, 0, 4);
        let near = spawn_unit(&mut world, Team::Blue, 3, 4);
        let far = spawn_unit(&mut world, Team::Blue, 9, 4);
        let chain_id = factory::spawn_chain(&mut world, chain_of(sender, first, 2)).unwrap();

        time_step(&mut world); // delivery
        tick_durations(&mut world);
        time_step(&mut world); // bounce

        assert!(world.step_events().iter().any(|event| matches!(
            event,
            Event::ChainBounced { entity_id, receiver_id, .. }
                if *entity_id == chain_id && *receiver_id == near
        )));

        time_step(&mut world); // new link delivers

        assert_eq!(current_health(&world, near), FixedPoint::from_int(90));
        assert_eq!(current_health(&world, far), FixedPoint::from_int(100));
    }

    #[test]
    fn test_chain_number_three_bounces_twice() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -6);
        let first = spawn_unit(&mut world, Team::Blue, 0, 4);
        spawn_unit(&mut world, Team::Blue, 3, 4);
        spawn_unit(&mut world, Team::Blue, 6, 4);
        spawn_unit(&mut world, Team::Blue, 9, 4);
        factory::spawn_chain(&mut world, chain_of(sender, first, 3)).unwrap();

        let mut bounces = 0;
        for _ in 0..10 {
            time_step(&mut world);
            tick_durations(&mut world);
        }
        for event in world.step_events() {
            if matches!(event, Event::ChainBounced { .. }) {
                bounces += 1;
            }
        }

        assert_eq!(bounces, 2);
    }

    #[test]
    fn test_exhausted_chain_is_destroyed_without_bounce() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -4);
        let receiver = spawn_unit(&mut world, Team::Blue, 0, 4);
        spawn_unit(&mut world, Team::Blue, 3, 4);
        let chain_id = factory::spawn_chain(&mut world, chain_of(sender, receiver, 1)).unwrap();

        time_step(&mut world);
        tick_durations(&mut world);
        time_step(&mut world);

        let events = world.step_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::ChainDestroyed { entity_id } if *entity_id == chain_id)));
        assert!(!events.iter().any(|event| matches!(event, Event::ChainBounced { .. })));
    }

    #[test]
    fn test_max_bounce_distance_limits_candidates() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -6);
        let first = spawn_unit(&mut world, Team::Blue, 0, 4);
        let distant = spawn_unit(&mut world, Team::Blue, 8, 4);
        let mut data = chain_of(sender, first, 2);
        data.chain_bounce_max_distance_units = 3;
        let chain_id = factory::spawn_chain(&mut world, data).unwrap();

        time_step(&mut world);
        tick_durations(&mut world);
        time_step(&mut world);

        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::ChainDestroyed { entity_id } if *entity_id == chain_id)));
        assert_eq!(current_health(&world, distant), FixedPoint::from_int(100));
    }

    #[test]
    fn test_zero_delay_chain_bounces_immediately() {
        let mut world = World::new(BattleConfig::default());
        let sender = spawn_unit(&mut world, Team::Red, 0, -6);
        let first = spawn_unit(&mut world, Team::Blue, 0, 4);
        let second = spawn_unit(&mut world, Team::Blue, 3, 4);
        let mut data = chain_of(sender, first, 2);
        data.chain_delay_ms = 0;
        factory::spawn_chain(&mut world, data).unwrap();

        // Delivery emits the activation events and the deactivation
        // handler bounces without waiting a step
        time_step(&mut world);
        assert_eq!(current_health(&world, first), FixedPoint::from_int(90));
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::ChainBounced { .. })));

        time_step(&mut world); // the new link delivers
        assert_eq!(current_health(&world, second), FixedPoint::from_int(90));
    }
}
