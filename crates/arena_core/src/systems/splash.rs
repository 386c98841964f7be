//! Splash bookkeeping. A splash entity only exists to attribute the
//! follow-up zone it spawns; once that zone is live the splash is done.

use crate::event::Event;
use crate::world::World;

/// Retire a splash as soon as its zone comes up.
pub fn on_event(world: &mut World, event: &Event) {
    let Event::ZoneCreated { sender_id, .. } = event else {
        return;
    };
    let is_splash = world
        .get(*sender_id)
        .is_some_and(|entity| entity.components.splash.is_some());
    if is_splash {
        world.emit_event(Event::SplashDestroyed {
            entity_id: *sender_id,
        });
    }
}

/// Retire any splash that never produced a zone, so a failed zone spawn
/// cannot leak the marker entity.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() || entity.components.splash.is_none() {
            continue;
        }
        if entity
            .components
            .deferred_destruction
            .is_some_and(|destruction| destruction.is_pending_destruction())
        {
            continue;
        }
        world.emit_event(Event::SplashDestroyed { entity_id: id });
    }
}
