//! Two-phase destruction. Every `*Destroyed` event only flags the entity;
//! this system's sweep turns flags into erasures, ticks lifetimes and
//! drives the dash lifecycle, which has no system of its own.

use crate::components::MovementType;
use crate::data::spawnables::DashData;
use crate::entity::EntityId;
use crate::event::Event;
use crate::systems::ability;
use crate::world::World;
use tracing::debug;

/// Flag the entity named by any destruction event.
pub fn on_event(world: &mut World, event: &Event) {
    let entity_id = match event {
        Event::ZoneDestroyed { entity_id }
        | Event::BeamDestroyed { entity_id }
        | Event::ChainDestroyed { entity_id }
        | Event::ProjectileDestroyed { entity_id }
        | Event::DashDestroyed { entity_id }
        | Event::MarkDestroyed { entity_id }
        | Event::AuraDestroyed { entity_id }
        | Event::SplashDestroyed { entity_id }
        | Event::ShieldDestroyed { entity_id, .. } => *entity_id,
        _ => return,
    };
    if let Some(entity) = world.get_mut(entity_id) {
        if let Some(destruction) = entity.components.deferred_destruction.as_mut() {
            destruction.mark();
        }
    }
}

/// Run the destruction sweep for one step.
pub fn time_step(world: &mut World) {
    sweep_dashes(world);
    tick_lifetimes(world);
    sweep_sender_deaths(world);
    erase_flagged(world);
}

/// Track each dash's sender: damage passed-over enemies, finish when the
/// sender lands.
fn sweep_dashes(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(dash) = entity.components.dash.clone() else {
            continue;
        };
        if entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction())
        {
            continue;
        }
        let data = &dash.data;

        let Some(sender) = world.get(data.sender_id).filter(|sender| sender.is_active()) else {
            clear_reservation(world, data.sender_id);
            world.emit_event(Event::DashDestroyed { entity_id: id });
            continue;
        };
        let Some(sender_position) = sender.components.position else {
            world.emit_event(Event::DashDestroyed { entity_id: id });
            continue;
        };
        let arrived = sender
            .components
            .movement
            .map_or(true, |movement| movement.movement_type == MovementType::None);

        // The dash entity follows the sender so its payload originates
        // from the right cell
        if let Some(dash_entity) = world.get_mut(id) {
            if let Some(position) = dash_entity.components.position.as_mut() {
                position.position = sender_position.position;
            }
        }

        if data.apply_to_all {
            let passed_over = overlapped_enemies(world, id, data, &sender_position);
            deliver(world, id, data, &passed_over);
        }

        if arrived {
            if !data.apply_to_all {
                let receiver_hittable = world.get(data.receiver_id).is_some_and(|receiver| {
                    receiver.is_active()
                        && receiver
                            .components
                            .combat_unit
                            .is_some_and(|unit| !unit.fainted)
                }) && world
                    .get(id)
                    .and_then(|dash_entity| dash_entity.components.filtering.as_ref())
                    .map_or(true, |filtering| filtering.can_hit(data.receiver_id));
                if receiver_hittable {
                    deliver(world, id, data, &[data.receiver_id]);
                }
            }
            clear_reservation(world, data.sender_id);
            debug!(entity_id = id, sender_id = data.sender_id, "dash landed");
            world.emit_event(Event::DashDestroyed { entity_id: id });
        }
    }
}

fn clear_reservation(world: &mut World, sender_id: EntityId) {
    if let Some(sender) = world.get_mut(sender_id) {
        if let Some(position) = sender.components.position.as_mut() {
            position.reserved_position = None;
        }
    }
}

fn deliver(world: &mut World, dash_id: EntityId, data: &DashData, receiver_ids: &[EntityId]) {
    if receiver_ids.is_empty() {
        return;
    }
    if let Some(entity) = world.get_mut(dash_id) {
        if let Some(filtering) = entity.components.filtering.as_mut() {
            for &receiver_id in receiver_ids {
                filtering.add_hit(receiver_id);
            }
        }
    }
    let combat_unit_sender_id = world.combat_unit_owner(dash_id).unwrap_or(data.sender_id);
    ability::activate_synthetic(world, dash_id, combat_unit_sender_id, receiver_ids, false);
}

fn overlapped_enemies(
    world: &World,
    dash_id: EntityId,
    data: &DashData,
    sender_position: &crate::components::PositionComponent,
) -> Vec<EntityId> {
    let team = world.get(dash_id).map(|entity| entity.team());
    let filtering = world
        .get(dash_id)
        .and_then(|entity| entity.components.filtering.clone());

    let mut hits: Vec<EntityId> = Vec::new();
    for candidate in world.entities() {
        if candidate.id() == data.sender_id
            || !candidate.is_active()
            || Some(candidate.team()) == team
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
        let distance = (candidate_position.position - sender_position.position).length();
        if distance <= sender_position.radius_units + candidate_position.radius_units {
            hits.push(candidate.id());
        }
    }
    hits
}

/// Tick every lifetime and emit the kind-specific destruction event on
/// expiry. Chain expiry is the chain system's cue to bounce, so chains
/// get no event here.
fn tick_lifetimes(world: &mut World) {
    for id in world.entity_ids() {
        let expired = {
            let Some(entity) = world.get_mut(id) else {
                continue;
            };
            if !entity.is_active() {
                continue;
            }
            let pending = entity
                .components
                .deferred_destruction
                .is_some_and(|destruction| destruction.is_pending_destruction());
            let Some(duration) = entity.components.duration.as_mut() else {
                continue;
            };
            duration.tick();
            duration.is_expired() && !pending
        };
        if !expired {
            continue;
        }
        if let Some(event) = expiry_event(world, id) {
            world.emit_event(event);
        }
    }
}

fn expiry_event(world: &World, id: EntityId) -> Option<Event> {
    let components = &world.get(id)?.components;
    let event = if components.zone.is_some() {
        Event::ZoneDestroyed { entity_id: id }
    } else if components.beam.is_some() {
        Event::BeamDestroyed { entity_id: id }
    } else if components.projectile.is_some() {
        Event::ProjectileDestroyed { entity_id: id }
    } else if components.dash.is_some() {
        Event::DashDestroyed { entity_id: id }
    } else if components.shield.is_some() {
        Event::ShieldDestroyed {
            entity_id: id,
            was_depleted: false,
        }
    } else if components.mark.is_some() {
        Event::MarkDestroyed { entity_id: id }
    } else if components.aura.is_some() {
        Event::AuraDestroyed { entity_id: id }
    } else if components.splash.is_some() {
        Event::SplashDestroyed { entity_id: id }
    } else {
        return None;
    };
    Some(event)
}

/// Destroy marks whose sender died, when they ask for it.
fn sweep_sender_deaths(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        if entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction())
        {
            continue;
        }
        let sender_id = match entity.components.mark.as_ref() {
            Some(mark) if mark.data.should_destroy_on_sender_death => mark.data.sender_id,
            _ => continue,
        };
        let sender_alive = world.get(sender_id).is_some_and(|sender| {
            sender.is_active()
                && sender
                    .components
                    .combat_unit
                    .map_or(true, |unit| !unit.fainted)
        });
        if !sender_alive {
            world.emit_event(Event::MarkDestroyed { entity_id: id });
        }
    }
}

/// Erase every flagged entity that is not mid-activation. An entity with
/// an ability still running gets to finish before it goes away.
fn erase_flagged(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        let pending = entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction());
        if !pending {
            continue;
        }
        let mid_activation = entity
            .components
            .abilities
            .as_ref()
            .is_some_and(|abilities| abilities.has_active_ability());
        if !mid_activation {
            world.schedule_erase(id);
        }
    }
}
