//! The entity store and the time-stepped battle loop.
//!
//! One `World` is one battle instance: it owns every entity, the event
//! bus, the seeded random stream and the step counter. A driver advances
//! the battle by calling [`World::time_step`] until
//! [`World::is_battle_finished`], then reads [`World::battle_result`].
//! Nothing here touches wall-clock time, threads or floats, so two worlds
//! built from the same config and inputs stay byte-identical forever.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::skills::{EffectDamageType, EffectPackage};
use crate::data::spawnables::SplashData;
use crate::data::stats::{StatType, StatsData};
use crate::entity::{Entity, EntityId, Team, INVALID_ENTITY_ID};
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventBus};
use crate::expression::{ExpressionDataSourceType, ExpressionStatsSource};
use crate::factory;
use crate::fixed_point::FixedPoint;
use crate::grid::{GridConfig, ObstacleMap};
use crate::systems;

/// Static configuration of one battle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Seed of the battle's random stream.
    pub random_seed: u64,
    /// Board geometry.
    pub grid_config: GridConfig,
    /// Half-width of the neutral strip between team sides, in rows.
    /// Initial placement may not overlap it.
    pub middle_line_width: i32,
    /// Sort combat units by id before the battle starts; ascending for
    /// even seeds, descending for odd ones. Varies processing order
    /// between battles without breaking per-battle determinism.
    pub sort_by_unique_id: bool,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            random_seed: 0,
            grid_config: GridConfig::default(),
            middle_line_width: 0,
            sort_by_unique_id: false,
        }
    }
}

/// Per-unit end state reported in the battle result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEndState {
    /// The combat unit.
    pub entity_id: EntityId,
    /// Its team.
    pub team: Team,
    /// Health at battle end.
    pub current_health: FixedPoint,
    /// Whether it fainted.
    pub fainted: bool,
}

/// Outcome of a finished battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// The team with survivors, or `None` for a draw.
    pub winning_team: Option<Team>,
    /// Battle length in time steps.
    pub duration_time_steps: i32,
    /// End state of every combat unit, in entity-store order.
    pub units: Vec<UnitEndState>,
}

/// Serializable portion of the world. The event bus holds function
/// pointers and is rebuilt on load instead of being persisted.
#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    config: BattleConfig,
    next_entity_id: EntityId,
    time_step_count: i32,
    battle_started: bool,
    rng_state: u64,
    entities: Vec<Entity>,
}

/// One battle instance.
#[derive(Debug)]
pub struct World {
    config: BattleConfig,
    entities: Vec<Entity>,
    id_to_index: BTreeMap<EntityId, usize>,
    next_entity_id: EntityId,
    time_step_count: i32,
    battle_started: bool,
    rng_state: u64,
    pending_erase: Vec<EntityId>,
    event_bus: EventBus,
}

impl World {
    /// Create an empty world and register the system event handlers.
    #[must_use]
    pub fn new(config: BattleConfig) -> Self {
        let mut world = Self {
            config,
            entities: Vec::new(),
            id_to_index: BTreeMap::new(),
            next_entity_id: 0,
            time_step_count: 0,
            battle_started: false,
            rng_state: seed_to_state(config.random_seed),
            pending_erase: Vec::new(),
            event_bus: EventBus::new(),
        };
        world.register_system_handlers();
        world
    }

    fn register_system_handlers(&mut self) {
        // Registration order is handler invocation order
        self.event_bus.subscribe(systems::splash::on_event);
        self.event_bus.subscribe(systems::chain::on_event);
        self.event_bus.subscribe(systems::destruction::on_event);
    }

    /// The battle configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// The board geometry.
    #[must_use]
    pub const fn grid_config(&self) -> GridConfig {
        self.config.grid_config
    }

    /// Steps advanced so far.
    #[must_use]
    pub const fn time_step_count(&self) -> i32 {
        self.time_step_count
    }

    /// Whether the first time step has run.
    #[must_use]
    pub const fn has_battle_started(&self) -> bool {
        self.battle_started
    }

    // ---- entity storage ----

    /// Create a new entity. The returned id is unique for the battle.
    pub fn add_entity(&mut self, team: Team, parent_id: EntityId) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.id_to_index.insert(id, self.entities.len());
        self.entities.push(Entity::new(id, team, parent_id));
        id
    }

    /// Whether an entity with this id is resident.
    #[must_use]
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Resolve an id to the entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.id_to_index.get(&id).map(|&index| &self.entities[index])
    }

    /// Resolve an id to the entity, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.id_to_index.get(&id) {
            Some(&index) => Some(&mut self.entities[index]),
            None => None,
        }
    }

    /// Resolve an id or fail with [`SimError::EntityNotFound`].
    pub fn get_or_err(&self, id: EntityId) -> SimResult<&Entity> {
        self.get(id).ok_or(SimError::EntityNotFound(id))
    }

    /// Live entities in insertion order. Iteration order is part of the
    /// determinism contract.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Snapshot of the resident entity ids, in insertion order. Systems
    /// walk this snapshot so entities spawned mid-step are not stepped
    /// until the next step.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(Entity::id).collect()
    }

    /// Remove an entity at the start of the next step.
    pub fn schedule_erase(&mut self, id: EntityId) {
        if !self.pending_erase.contains(&id) {
            self.pending_erase.push(id);
        }
    }

    fn apply_pending_erases(&mut self) {
        if self.pending_erase.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending_erase);
        for entity in &mut self.entities {
            if let Some(attached) = entity.components.attached_entities.as_mut() {
                attached.attached.retain(|id| !pending.contains(id));
            }
        }
        self.entities.retain(|entity| !pending.contains(&entity.id()));
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.id_to_index.clear();
        for (index, entity) in self.entities.iter().enumerate() {
            self.id_to_index.insert(entity.id(), index);
        }
    }

    /// Walk the parent chain up to the owning combat unit.
    #[must_use]
    pub fn combat_unit_owner(&self, id: EntityId) -> Option<EntityId> {
        let mut current = id;
        loop {
            let entity = self.get(current)?;
            if entity.is_combat_unit() {
                return Some(current);
            }
            if entity.parent_id() == INVALID_ENTITY_ID {
                return None;
            }
            current = entity.parent_id();
        }
    }

    // ---- events ----

    /// Emit an event: record it in the step buffer, then dispatch it to
    /// every handler in registration order. Re-entrant.
    pub fn emit_event(&mut self, event: Event) {
        self.event_bus.record(event.clone());
        let handlers = self.event_bus.handlers();
        for handler in handlers {
            handler(self, &event);
        }
    }

    /// Events emitted since the last drain.
    #[must_use]
    pub fn step_events(&self) -> &[Event] {
        self.event_bus.step_events()
    }

    /// Clear and return the buffered events.
    pub fn drain_step_events(&mut self) -> Vec<Event> {
        self.event_bus.drain_step_events()
    }

    // ---- random stream ----

    /// Next value of the battle's random stream, in `0..range`.
    /// Consumption order is part of the determinism contract.
    pub fn random_range(&mut self, range: u64) -> u64 {
        // xorshift64*
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        if range == 0 {
            return 0;
        }
        x.wrapping_mul(0x2545_F491_4F6C_DD1D) % range
    }

    /// Roll against a percentage chance.
    pub fn roll_chance(&mut self, chance_percentage: FixedPoint) -> bool {
        let roll = self.random_range(100) as i64;
        roll < chance_percentage.to_int()
    }

    // ---- grid ----

    /// Whether `center` with `radius_units` fits on the board, and, for
    /// space-taking placement, does not overlap another space-taking
    /// entity or the neutral middle strip before battle start.
    #[must_use]
    pub fn is_valid_hexagon_position(
        &self,
        center: crate::hex::HexGridPosition,
        radius_units: i32,
        is_taking_space: bool,
    ) -> bool {
        let grid = self.grid_config();
        if !grid.is_hexagon_in_grid_limits(center, radius_units, 0, 0) {
            return false;
        }
        if !is_taking_space {
            return true;
        }
        if !self.battle_started
            && crate::grid::does_hexagon_overlap_middle_line(
                center,
                radius_units,
                self.config.middle_line_width,
            )
        {
            return false;
        }
        for entity in &self.entities {
            if !entity.is_active() {
                continue;
            }
            let Some(position) = &entity.components.position else {
                continue;
            };
            if !position.taking_space {
                continue;
            }
            if crate::grid::do_hexagons_intersect(
                position.position,
                position.radius_units,
                center,
                radius_units,
            ) {
                return false;
            }
        }
        true
    }

    /// Obstacle map of every space-taking entity except `source_id`,
    /// inflated by `radius_needed` so searches can treat the source as a
    /// point. Reserved cells count as obstacles too.
    #[must_use]
    pub fn build_obstacles(&self, source_id: EntityId, radius_needed: i32) -> ObstacleMap {
        let mut obstacles = ObstacleMap::new(self.grid_config());
        for entity in &self.entities {
            if entity.id() == source_id || !entity.is_active() {
                continue;
            }
            let Some(position) = &entity.components.position else {
                continue;
            };
            if position.taking_space {
                obstacles.set_hexagon_obstacle(
                    position.position,
                    position.radius_units + radius_needed,
                    true,
                );
            }
            if let Some(reserved) = position.reserved_position {
                obstacles.set_hexagon_obstacle(reserved, position.radius_units + radius_needed, true);
            }
        }
        obstacles
    }

    // ---- expressions ----

    /// Build the stat snapshots an expression evaluates against: the
    /// sender, the receiver and the sender's current focus.
    #[must_use]
    pub fn expression_stats_source(
        &self,
        sender_id: EntityId,
        receiver_id: EntityId,
    ) -> ExpressionStatsSource {
        let mut source = ExpressionStatsSource::new();
        if let Some(stats) = self.entity_stats(sender_id) {
            source.set(ExpressionDataSourceType::Sender, stats);
        }
        if let Some(stats) = self.entity_stats(receiver_id) {
            source.set(ExpressionDataSourceType::Receiver, stats);
        }
        if let Some(focus_id) = self.entity_focus(sender_id) {
            if let Some(stats) = self.entity_stats(focus_id) {
                source.set(ExpressionDataSourceType::SenderFocus, stats);
            }
        }
        source
    }

    fn entity_stats(&self, id: EntityId) -> Option<crate::data::stats::FullStatsData> {
        self.get(id)?.components.stats.map(|stats| stats.stats)
    }

    fn entity_focus(&self, id: EntityId) -> Option<EntityId> {
        let focus = self.get(id)?.components.focus?;
        focus.is_focus_set().then_some(focus.focus_id)
    }

    // ---- effect application ----

    /// Apply an effect package from a sender to one receiver: evaluate
    /// each effect's expression, amplify crits, mitigate by the receiver's
    /// resists, drain shields, subtract health and handle fainting. A
    /// splash-attributed package additionally spawns a follow-up zone
    /// around the receiver.
    pub fn apply_effect_package(
        &mut self,
        combat_unit_sender_id: EntityId,
        sender_id: EntityId,
        receiver_id: EntityId,
        effect_package: &EffectPackage,
        is_critical: bool,
    ) {
        let Some(receiver) = self.get(receiver_id) else {
            return;
        };
        if !receiver.is_active() {
            return;
        }

        let stats_source = self.expression_stats_source(sender_id, receiver_id);
        let sender_stats = stats_source.get(ExpressionDataSourceType::Sender).live;

        let effects = effect_package.effects.clone();
        for effect in &effects {
            let mut amount = effect.expression.evaluate(&stats_source);
            if is_critical {
                let crit_amplification = sender_stats.get(StatType::CritAmplificationPercentage);
                if crit_amplification > FixedPoint::ZERO {
                    amount = crit_amplification.as_percentage_of(amount);
                }
            }
            let damage = mitigate_damage(amount, effect.damage_type, &self.receiver_live_stats(receiver_id));
            if damage <= FixedPoint::ZERO {
                continue;
            }
            let remaining = self.drain_shields(receiver_id, damage);
            self.subtract_health(combat_unit_sender_id, receiver_id, remaining);
            self.emit_event(Event::EffectApplied {
                sender_id: combat_unit_sender_id,
                receiver_id,
                damage_type: effect.damage_type,
                amount: damage,
            });
        }

        if effect_package.attributes.splash {
            let splash_data = SplashData {
                sender_id,
                is_critical,
                ignore_first_propagation_receiver: effect_package
                    .attributes
                    .ignore_first_propagation_receiver,
                splash_radius_units: effect_package.attributes.splash_radius_units,
                ..SplashData::default()
            };
            if let Err(err) = factory::spawn_splash(self, splash_data, receiver_id) {
                warn!(?err, receiver_id, "splash spawn failed");
            }
        }
    }

    fn receiver_live_stats(&self, receiver_id: EntityId) -> StatsData {
        self.entity_stats(receiver_id)
            .map(|stats| stats.live)
            .unwrap_or_default()
    }

    /// Route damage through the receiver's attached shields, oldest first.
    /// Returns the amount left for health.
    fn drain_shields(&mut self, receiver_id: EntityId, mut damage: FixedPoint) -> FixedPoint {
        let shield_ids: Vec<EntityId> = self
            .get(receiver_id)
            .and_then(|entity| entity.components.attached_entities.as_ref())
            .map(|attached| attached.attached.clone())
            .unwrap_or_default();

        for shield_id in shield_ids {
            if damage <= FixedPoint::ZERO {
                break;
            }
            let Some(shield_entity) = self.get_mut(shield_id) else {
                continue;
            };
            if !shield_entity.is_active() {
                continue;
            }
            let Some(shield) = shield_entity.components.shield.as_mut() else {
                continue;
            };
            let absorbed = shield.remaining.min(damage);
            shield.remaining -= absorbed;
            damage -= absorbed;
            if shield.remaining <= FixedPoint::ZERO {
                self.emit_event(Event::ShieldDestroyed {
                    entity_id: shield_id,
                    was_depleted: true,
                });
            }
        }
        damage
    }

    fn subtract_health(
        &mut self,
        combat_unit_sender_id: EntityId,
        receiver_id: EntityId,
        damage: FixedPoint,
    ) {
        if damage <= FixedPoint::ZERO {
            return;
        }
        let Some(receiver) = self.get_mut(receiver_id) else {
            return;
        };
        let Some(stats) = receiver.components.stats.as_mut() else {
            return;
        };
        let health = stats.stats.live.get(StatType::CurrentHealth);
        let new_health = (health - damage).max(FixedPoint::ZERO);
        stats.stats.live.set(StatType::CurrentHealth, new_health);

        if new_health == FixedPoint::ZERO {
            self.faint(receiver_id, combat_unit_sender_id);
        }
    }

    fn faint(&mut self, entity_id: EntityId, vanquisher_id: EntityId) {
        let Some(entity) = self.get_mut(entity_id) else {
            return;
        };
        if let Some(combat_unit) = entity.components.combat_unit.as_mut() {
            if combat_unit.fainted {
                return;
            }
            combat_unit.fainted = true;
        }
        entity.deactivate();
        if let Some(position) = entity.components.position.as_mut() {
            position.taking_space = false;
        }
        debug!(entity_id, vanquisher_id, "combat unit fainted");
        self.emit_event(Event::Fainted {
            entity_id,
            vanquisher_id,
        });
    }

    // ---- battle loop ----

    fn battle_start(&mut self) {
        if self.config.sort_by_unique_id {
            // Even seeds walk units in ascending id order, odd seeds in
            // descending order
            if self.config.random_seed % 2 == 0 {
                self.entities.sort_by_key(Entity::id);
            } else {
                self.entities.sort_by_key(|entity| std::cmp::Reverse(entity.id()));
            }
            self.rebuild_index();
        }
        self.battle_started = true;
        debug!(entities = self.entities.len(), "battle started");
        self.emit_event(Event::BattleStarted);
    }

    /// Advance the battle by one step: apply pending erases, run every
    /// system in fixed order over a snapshot of the entity set, then emit
    /// [`Event::TimeStepped`].
    pub fn time_step(&mut self) {
        if !self.battle_started {
            self.battle_start();
        }
        self.apply_pending_erases();

        let current_step = self.time_step_count;
        systems::ability::time_step(self);
        systems::focus::time_step(self);
        systems::movement::time_step(self);
        systems::zone::time_step(self);
        systems::beam::time_step(self);
        systems::projectile::time_step(self);
        systems::chain::time_step(self);
        systems::splash::time_step(self);
        systems::destruction::time_step(self);

        self.time_step_count += 1;
        self.emit_event(Event::TimeStepped {
            time_step: current_step,
        });
    }

    fn living_units(&self, team: Team) -> usize {
        self.entities
            .iter()
            .filter(|entity| {
                entity.team() == team
                    && entity
                        .components
                        .combat_unit
                        .is_some_and(|unit| !unit.fainted)
            })
            .count()
    }

    /// Whether at most one team still has living combat units.
    #[must_use]
    pub fn is_battle_finished(&self) -> bool {
        if !self.battle_started {
            return false;
        }
        self.living_units(Team::Red) == 0 || self.living_units(Team::Blue) == 0
    }

    /// The battle outcome, available once the battle is finished.
    #[must_use]
    pub fn battle_result(&self) -> Option<BattleResult> {
        if !self.is_battle_finished() {
            return None;
        }
        let red_alive = self.living_units(Team::Red);
        let blue_alive = self.living_units(Team::Blue);
        let winning_team = match (red_alive, blue_alive) {
            (0, 0) => None,
            (_, 0) => Some(Team::Red),
            (0, _) => Some(Team::Blue),
            _ => unreachable!("battle reported finished with both teams alive"),
        };
        let units = self
            .entities
            .iter()
            .filter_map(|entity| {
                let combat_unit = entity.components.combat_unit?;
                let stats = entity.components.stats?;
                Some(UnitEndState {
                    entity_id: entity.id(),
                    team: entity.team(),
                    current_health: stats.stats.live.get(StatType::CurrentHealth),
                    fainted: combat_unit.fainted,
                })
            })
            .collect();
        Some(BattleResult {
            winning_team,
            duration_time_steps: self.time_step_count,
            units,
        })
    }

    // ---- snapshots ----

    /// Serialize the battle state.
    pub fn serialize(&self) -> SimResult<Vec<u8>> {
        let snapshot = WorldSnapshot {
            config: self.config,
            next_entity_id: self.next_entity_id,
            time_step_count: self.time_step_count,
            battle_started: self.battle_started,
            rng_state: self.rng_state,
            entities: self.entities.clone(),
        };
        bincode::serialize(&snapshot).map_err(|err| SimError::DeserializationFailed(err.to_string()))
    }

    /// Rebuild a world from a snapshot. System handlers are re-registered;
    /// pending erases and the step event buffer do not survive a snapshot
    /// boundary (snapshots are taken between steps).
    pub fn deserialize(bytes: &[u8]) -> SimResult<Self> {
        let snapshot: WorldSnapshot =
            bincode::deserialize(bytes).map_err(|err| SimError::DeserializationFailed(err.to_string()))?;
        let mut world = Self {
            config: snapshot.config,
            entities: snapshot.entities,
            id_to_index: BTreeMap::new(),
            next_entity_id: snapshot.next_entity_id,
            time_step_count: snapshot.time_step_count,
            battle_started: snapshot.battle_started,
            rng_state: snapshot.rng_state,
            pending_erase: Vec::new(),
            event_bus: EventBus::new(),
        };
        world.rebuild_index();
        world.register_system_handlers();
        Ok(world)
    }

    /// FNV-1a hash of the full battle state, for desync checks between
    /// runs that should be identical.
    pub fn state_hash(&self) -> SimResult<u64> {
        let bytes = self.serialize()?;
        let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
        for byte in bytes {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        }
        Ok(hash)
    }
}

const fn seed_to_state(seed: u64) -> u64 {
    // xorshift state must be non-zero; splitmix-style scramble keeps
    // nearby seeds from producing nearby streams
    let z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    let z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    let z = z ^ (z >> 31);
    if z == 0 {
        0x9E37_79B9_7F4A_7C15
    } else {
        z
    }
}

/// Resist-based mitigation: flat grit/resolve reduction first, then the
/// `100 / (100 + resist)` curve. Pure damage skips mitigation entirely.
fn mitigate_damage(amount: FixedPoint, damage_type: EffectDamageType, receiver: &StatsData) -> FixedPoint {
    let (flat_reduction, resist) = match damage_type {
        EffectDamageType::Physical => (
            receiver.get(StatType::Grit),
            receiver.get(StatType::PhysicalResist),
        ),
        EffectDamageType::Energy => (
            receiver.get(StatType::Resolve),
            receiver.get(StatType::EnergyResist),
        ),
        EffectDamageType::Pure => return amount.max(FixedPoint::ZERO),
    };
    let reduced = (amount - flat_reduction).max(FixedPoint::ZERO);
    let hundred = FixedPoint::from_int(100);
    reduced * hundred / (hundred + resist)
}
