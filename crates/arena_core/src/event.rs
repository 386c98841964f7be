//! Closed event catalogue and the synchronous event bus.
//!
//! Events fan out to handler functions registered at world construction,
//! in registration order. Dispatch is synchronous and re-entrant: a
//! handler may emit further events, which are fully processed depth-first
//! before the emitting call returns. Every emitted event is additionally
//! buffered for the current step so external drivers (tests,
//! visualization) can inspect what happened without subscribing.

use serde::{Deserialize, Serialize};

use crate::data::skills::EffectDamageType;
use crate::entity::EntityId;
use crate::fixed_point::FixedPoint;
use crate::hex::HexGridPosition;
use crate::world::World;

/// Everything that can happen during a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// The battle started. Emitted once, on the first time step.
    BattleStarted,
    /// A time step finished.
    TimeStepped {
        /// The step that just completed.
        time_step: i32,
    },
    /// A combat unit's health reached zero.
    Fainted {
        /// The unit that fainted.
        entity_id: EntityId,
        /// The combat unit that landed the killing effect.
        vanquisher_id: EntityId,
    },
    /// An ability activation started.
    AbilityActivated {
        /// The activating entity.
        sender_id: EntityId,
        /// Name of the ability, for logging.
        ability_name: String,
    },
    /// An ability activation finished.
    AbilityDeactivated {
        /// The entity whose activation ended.
        sender_id: EntityId,
        /// Name of the ability, for logging.
        ability_name: String,
    },
    /// A skill found no receivers to deploy at.
    SkillNoTargets {
        /// The entity whose skill fizzled.
        sender_id: EntityId,
        /// Name of the skill, for logging.
        skill_name: String,
    },
    /// An effect package effect landed on a receiver.
    EffectApplied {
        /// The combat unit credited with the effect.
        sender_id: EntityId,
        /// The entity the effect landed on.
        receiver_id: EntityId,
        /// Damage flavor.
        damage_type: EffectDamageType,
        /// Post-mitigation amount subtracted from health.
        amount: FixedPoint,
    },

    /// A zone entity was spawned.
    ZoneCreated {
        /// The zone.
        entity_id: EntityId,
        /// Its spawner.
        sender_id: EntityId,
        /// Spawn cell in axial units.
        position: HexGridPosition,
    },
    /// A zone activated and delivered its payload.
    ZoneActivated {
        /// The zone.
        entity_id: EntityId,
        /// Zero-based activation index.
        activation_index: i32,
        /// Receivers hit, in processing order.
        receiver_ids: Vec<EntityId>,
    },
    /// A zone asked to be torn down.
    ZoneDestroyed {
        /// The zone.
        entity_id: EntityId,
    },

    /// A beam entity was spawned.
    BeamCreated {
        /// The beam.
        entity_id: EntityId,
        /// Its spawner.
        sender_id: EntityId,
        /// The entity it is aimed at.
        receiver_id: EntityId,
    },
    /// A beam re-aimed or resized.
    BeamUpdated {
        /// The beam.
        entity_id: EntityId,
        /// New direction in degrees.
        direction_degrees: i32,
        /// New length in world sub-units.
        length_world_sub_units: i32,
    },
    /// A beam activated and delivered its payload.
    BeamActivated {
        /// The beam.
        entity_id: EntityId,
        /// Receivers hit, nearest first.
        receiver_ids: Vec<EntityId>,
    },
    /// A beam asked to be torn down.
    BeamDestroyed {
        /// The beam.
        entity_id: EntityId,
    },

    /// A chain segment was spawned.
    ChainCreated {
        /// The chain segment.
        entity_id: EntityId,
        /// Its spawner.
        sender_id: EntityId,
        /// The entity this segment hits.
        receiver_id: EntityId,
    },
    /// A chain segment spawned its successor.
    ChainBounced {
        /// The finished segment.
        entity_id: EntityId,
        /// The new segment.
        new_chain_id: EntityId,
        /// The new segment's receiver.
        receiver_id: EntityId,
    },
    /// A chain segment asked to be torn down.
    ChainDestroyed {
        /// The chain segment.
        entity_id: EntityId,
    },

    /// A projectile entity was spawned.
    ProjectileCreated {
        /// The projectile.
        entity_id: EntityId,
        /// Its spawner.
        sender_id: EntityId,
        /// The entity it flies at.
        receiver_id: EntityId,
    },
    /// A projectile hit an entity.
    ProjectileHit {
        /// The projectile.
        entity_id: EntityId,
        /// The entity that was hit.
        receiver_id: EntityId,
    },
    /// A projectile asked to be torn down.
    ProjectileDestroyed {
        /// The projectile.
        entity_id: EntityId,
    },

    /// A dash entity was spawned.
    DashCreated {
        /// The dash.
        entity_id: EntityId,
        /// The combat unit performing it.
        sender_id: EntityId,
        /// Reserved landing cell in axial units.
        destination: HexGridPosition,
    },
    /// A dash reached its destination and asked to be torn down.
    DashDestroyed {
        /// The dash.
        entity_id: EntityId,
    },

    /// A shield was attached to a receiver.
    ShieldCreated {
        /// The shield.
        entity_id: EntityId,
        /// The entity granting it.
        sender_id: EntityId,
        /// The entity it protects.
        receiver_id: EntityId,
        /// Absorption capacity.
        value: FixedPoint,
    },
    /// A shield broke or expired.
    ShieldDestroyed {
        /// The shield.
        entity_id: EntityId,
        /// Whether it was consumed by damage rather than expiring.
        was_depleted: bool,
    },

    /// A mark was attached to a receiver.
    MarkCreated {
        /// The mark.
        entity_id: EntityId,
        /// The entity placing it.
        sender_id: EntityId,
        /// The marked entity.
        receiver_id: EntityId,
    },
    /// A mark detached.
    MarkDestroyed {
        /// The mark.
        entity_id: EntityId,
    },

    /// An aura was attached to a receiver.
    AuraCreated {
        /// The aura.
        entity_id: EntityId,
        /// The entity projecting it.
        sender_id: EntityId,
        /// The entity it is attached to.
        receiver_id: EntityId,
    },
    /// An aura detached.
    AuraDestroyed {
        /// The aura.
        entity_id: EntityId,
    },

    /// A splash trigger was spawned.
    SplashCreated {
        /// The splash trigger.
        entity_id: EntityId,
        /// Its spawner.
        sender_id: EntityId,
    },
    /// A splash trigger finished (its follow-up zone exists).
    SplashDestroyed {
        /// The splash trigger.
        entity_id: EntityId,
    },
}

/// A subscribed handler. Handlers filter for the events they care about.
pub type EventHandler = fn(&mut World, &Event);

/// Handler registry plus the per-step buffer of emitted events.
///
/// The registry is closed once the world finishes construction; dispatch
/// itself lives on [`World::emit_event`] because handlers need the world
/// mutably.
#[derive(Debug, Default)]
pub struct EventBus {
    handlers: Vec<EventHandler>,
    step_events: Vec<Event>,
}

impl EventBus {
    /// Empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run in registration order.
    pub fn subscribe(&mut self, handler: EventHandler) {
        self.handlers.push(handler);
    }

    /// Snapshot of the handler list for one dispatch. Function pointers
    /// are copied so a handler emitting further events never aliases the
    /// registry.
    #[must_use]
    pub fn handlers(&self) -> Vec<EventHandler> {
        self.handlers.clone()
    }

    /// Record an emitted event in the step buffer.
    pub fn record(&mut self, event: Event) {
        self.step_events.push(event);
    }

    /// Events emitted since the last drain, in emission order.
    #[must_use]
    pub fn step_events(&self) -> &[Event] {
        &self.step_events
    }

    /// Clear the step buffer, returning its contents.
    pub fn drain_step_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.step_events)
    }
}
