//! Entity factory: turns spawn-request records into fully wired entities.
//!
//! Every spawn follows the same template: validate the sender chain (and
//! the receiver where one is required), create the entity, attach the
//! kind-specific component plus the common scaffolding, synthesize the
//! single-use attack ability that carries the payload, and emit the
//! kind's `*Created` event. Validation failures return an error before
//! any entity is created, so a failed spawn never leaves partial state
//! in the world.

use tracing::debug;

use crate::components::{
    AbilitiesComponent, AuraComponent, BeamComponent, ChainComponent, CombatUnitComponent,
    DashComponent, DeferredDestructionComponent, DurationComponent, FilteringComponent,
    FocusComponent, MarkComponent, MovementComponent, MovementType, PositionComponent,
    ProjectileComponent, RefocusType, ShieldComponent, SplashComponent, StatsComponent,
    ZoneComponent,
};
use crate::data::skills::{AbilitiesData, AbilityData, EffectPackage, SkillData, SkillDeploymentType};
use crate::data::spawnables::{
    AuraData, BeamData, ChainData, DashData, MarkData, PredefinedGridPosition, ProjectileData,
    ShieldData, SplashData, ZoneData,
};
use crate::data::stats::{FullStatsData, StatsData};
use crate::entity::{EntityId, Team, INVALID_ENTITY_ID};
use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::grid::time::ms_to_time_steps;
use crate::grid::GridConfig;
use crate::hex::HexGridPosition;
use crate::math;
use crate::world::World;

/// Validate a spawn sender: it must exist, and the combat unit that owns
/// it (itself, or an ancestor through the parent chain) must be alive.
/// Returns the owning combat unit's id and the sender's team.
pub fn validate_spawn_sender(world: &World, sender_id: EntityId) -> SimResult<(EntityId, Team)> {
    let sender = world.get_or_err(sender_id)?;
    let team = sender.team();
    let owner_id = world
        .combat_unit_owner(sender_id)
        .ok_or_else(|| SimError::InvalidSpawnRequest {
            sender: sender_id,
            message: "sender has no owning combat unit".into(),
        })?;
    let owner = world.get_or_err(owner_id)?;
    let fainted = owner
        .components
        .combat_unit
        .is_some_and(|unit| unit.fainted);
    if fainted || !owner.is_active() {
        return Err(SimError::InvalidSpawnRequest {
            sender: sender_id,
            message: "owning combat unit is no longer alive".into(),
        });
    }
    Ok((owner_id, team))
}

/// Validate a spawn receiver: it must exist and still be active.
pub fn validate_spawn_receiver(world: &World, sender_id: EntityId, receiver_id: EntityId) -> SimResult<()> {
    let receiver = world
        .get(receiver_id)
        .ok_or_else(|| SimError::InvalidSpawnRequest {
            sender: sender_id,
            message: format!("receiver {receiver_id} does not exist"),
        })?;
    if !receiver.is_active() {
        return Err(SimError::InvalidSpawnRequest {
            sender: sender_id,
            message: format!("receiver {receiver_id} is no longer active"),
        });
    }
    Ok(())
}

fn sender_stats_snapshot(world: &World, sender_id: EntityId) -> StatsComponent {
    let live = world
        .get(sender_id)
        .and_then(|entity| entity.components.stats)
        .map(|stats| stats.stats.live)
        .unwrap_or_default();
    StatsComponent {
        stats: FullStatsData { base: live, live },
    }
}

fn sender_position(world: &World, sender_id: EntityId) -> SimResult<HexGridPosition> {
    world
        .get_or_err(sender_id)?
        .components
        .position
        .map(|position| position.position)
        .ok_or(SimError::MissingComponent {
            entity: sender_id,
            component: "Position",
        })
}

/// The synthetic one-skill attack ability every payload carrier gets, so
/// all spawnable kinds deliver through the same ability path.
fn synthetic_attack_ability(name: &str, skill: SkillData) -> AbilitiesComponent {
    AbilitiesComponent {
        abilities: AbilitiesData {
            abilities: vec![AbilityData::with_single_skill(name, 0, skill)],
            selection_type: Default::default(),
        },
        ..AbilitiesComponent::default()
    }
}

fn direct_delivery_skill(name: &str, effect_package: EffectPackage) -> SkillData {
    let mut skill = SkillData {
        name: name.into(),
        effect_package,
        ..SkillData::default()
    };
    skill.deployment.deployment_type = SkillDeploymentType::Direct;
    skill
}

/// Spawn a combat unit before or during a battle. The position must be on
/// the board and free of other space-taking entities (and clear of the
/// neutral middle strip before battle start).
pub fn spawn_combat_unit(
    world: &mut World,
    team: Team,
    position: HexGridPosition,
    radius_units: i32,
    stats: StatsData,
    attack_abilities: AbilitiesData,
) -> SimResult<EntityId> {
    if !world.is_valid_hexagon_position(position, radius_units, true) {
        return Err(SimError::InvalidGridPosition(format!(
            "combat unit cannot be placed at {position}"
        )));
    }

    let id = world.add_entity(team, INVALID_ENTITY_ID);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position,
        radius_units,
        taking_space: true,
        reserved_position: None,
    });
    entity.components.stats = Some(StatsComponent {
        stats: FullStatsData {
            base: stats,
            live: stats,
        },
    });
    entity.components.combat_unit = Some(CombatUnitComponent::default());
    entity.components.focus = Some(FocusComponent::default());
    entity.components.abilities = Some(AbilitiesComponent {
        abilities: attack_abilities,
        ..AbilitiesComponent::default()
    });
    entity.components.attached_entities = Some(Default::default());
    entity.components.movement = Some(MovementComponent::default());
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());

    debug!(entity_id = id, ?team, %position, "spawned combat unit");
    Ok(id)
}

/// Spawn a zone at `spawn_position`.
///
/// The spawn direction defaults to the sender→focus angle when the zone
/// spawns on its sender (falling back to the previous focus if the
/// current one is gone), and to the sender→zone angle otherwise. A
/// growing zone with no authored growth rate derives one from the radius
/// gap and the lifetime.
pub fn spawn_zone(
    world: &mut World,
    mut data: ZoneData,
    spawn_position: HexGridPosition,
) -> SimResult<EntityId> {
    let (owner_id, team) = validate_spawn_sender(world, data.sender_id)?;
    let sender_pos = sender_position(world, data.sender_id)?;
    let grid = world.grid_config();

    let spawn_direction = if spawn_position == sender_pos {
        zone_self_spawn_direction(world, data.sender_id, sender_pos)
    } else {
        grid.angle_360_between(sender_pos, spawn_position)
    };
    data.spawn_direction_degrees = spawn_direction;
    data.direction_degrees = math::angle_limit_to_360(data.direction_degrees + spawn_direction);

    if data.max_radius_sub_units > data.radius_sub_units
        && data.growth_rate_sub_units_per_time_step == 0
    {
        let steps = ms_to_time_steps(data.duration_ms).max(1);
        data.growth_rate_sub_units_per_time_step =
            (data.max_radius_sub_units - data.radius_sub_units) / steps;
    }
    if data.original_sender_id == INVALID_ENTITY_ID {
        data.original_sender_id = owner_id;
    }

    let movement = zone_movement(grid, team, &data);
    let stats = sender_stats_snapshot(world, data.sender_id);
    let skill = data.skill_data.clone();
    let sender_id = data.sender_id;
    let duration_ms = data.duration_ms;
    let apply_once = data.apply_once;

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position: spawn_position,
        radius_units: math::sub_units_to_units(data.radius_sub_units),
        taking_space: false,
        reserved_position: None,
    });
    entity.components.stats = Some(stats);
    entity.components.focus = Some(FocusComponent {
        focus_id: data.attach_to_entity,
        previous_focus_id: INVALID_ENTITY_ID,
        refocus_type: RefocusType::Never,
    });
    entity.components.filtering = Some(FilteringComponent {
        only_new_targets: apply_once,
        ..FilteringComponent::default()
    });
    entity.components.duration = Some(DurationComponent::from_ms(duration_ms));
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.movement = movement;
    entity.components.abilities = Some(synthetic_attack_ability(
        "zone payload",
        direct_delivery_skill("zone payload", skill.effect_package.clone()),
    ));
    entity.components.zone = Some(ZoneComponent {
        data,
        time_step_count: 0,
        activation_count: 0,
    });

    debug!(entity_id = id, sender_id, %spawn_position, "spawned zone");
    world.emit_event(Event::ZoneCreated {
        entity_id: id,
        sender_id,
        position: spawn_position,
    });
    Ok(id)
}

fn zone_self_spawn_direction(world: &World, sender_id: EntityId, sender_pos: HexGridPosition) -> i32 {
    let Some(focus) = world.get(sender_id).and_then(|entity| entity.components.focus) else {
        return 0;
    };
    let aim_id = if focus.is_focus_set() {
        focus.focus_id
    } else {
        focus.previous_focus_id
    };
    let Some(aim_pos) = world
        .get(aim_id)
        .and_then(|entity| entity.components.position)
    else {
        return 0;
    };
    world.grid_config().angle_360_between(sender_pos, aim_pos.position)
}

fn zone_movement(grid: GridConfig, team: Team, data: &ZoneData) -> Option<MovementComponent> {
    if data.attach_to_entity != INVALID_ENTITY_ID {
        return Some(MovementComponent {
            movement_type: MovementType::Snap {
                target_id: data.attach_to_entity,
            },
            ..MovementComponent::default()
        });
    }
    if data.movement_speed_sub_units_per_time_step > 0 {
        let target = resolve_predefined_position(
            grid,
            data.skill_data.zone.predefined_target_position,
            team,
        )
        .unwrap_or_else(|| resolve_border_center(grid, team.opposite()));
        return Some(MovementComponent {
            movement_type: MovementType::DirectPosition { target },
            speed_sub_units_per_time_step: data.movement_speed_sub_units_per_time_step,
            ..MovementComponent::default()
        });
    }
    None
}

/// Resolve an authored border position relative to the spawning team.
#[must_use]
pub fn resolve_predefined_position(
    grid: GridConfig,
    predefined: PredefinedGridPosition,
    team: Team,
) -> Option<HexGridPosition> {
    match predefined {
        PredefinedGridPosition::None => None,
        PredefinedGridPosition::AllyBorderCenter => Some(resolve_border_center(grid, team)),
        PredefinedGridPosition::EnemyBorderCenter => Some(resolve_border_center(grid, team.opposite())),
    }
}

fn resolve_border_center(grid: GridConfig, team: Team) -> HexGridPosition {
    let column = grid.width() / 2;
    let row = match team {
        Team::Red => 0,
        Team::Blue => grid.height() - 1,
    };
    let index = (row * grid.width() + column) as usize;
    grid.coordinates(index)
}

/// Spawn a beam from the sender toward the receiver. The initial
/// direction and world-space length are derived from the two positions.
pub fn spawn_beam(world: &mut World, mut data: BeamData) -> SimResult<EntityId> {
    let (_, team) = validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.receiver_id)?;
    let sender_pos = sender_position(world, data.sender_id)?;
    let receiver_pos = sender_position(world, data.receiver_id)?;
    let grid = world.grid_config();

    data.direction_degrees = grid.angle_360_between(sender_pos, receiver_pos);
    let distance_units = (receiver_pos - sender_pos).length();
    data.length_world_sub_units = grid.to_world_scalar(math::units_to_sub_units(distance_units));

    let stats = sender_stats_snapshot(world, data.sender_id);
    let sender_id = data.sender_id;
    let receiver_id = data.receiver_id;
    let apply_once = data.apply_once;
    let skill = data.skill_data.clone();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position: sender_pos,
        radius_units: 0,
        taking_space: false,
        reserved_position: None,
    });
    entity.components.stats = Some(stats);
    entity.components.focus = Some(FocusComponent {
        focus_id: receiver_id,
        previous_focus_id: INVALID_ENTITY_ID,
        refocus_type: RefocusType::Never,
    });
    entity.components.filtering = Some(FilteringComponent {
        only_new_targets: apply_once,
        ..FilteringComponent::default()
    });
    entity.components.duration = Some(DurationComponent::default());
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.abilities = Some(synthetic_attack_ability(
        "beam payload",
        direct_delivery_skill("beam payload", skill.effect_package.clone()),
    ));
    entity.components.beam = Some(BeamComponent {
        data,
        time_step_count: 0,
        activation_count: 0,
        is_interrupted: false,
    });

    debug!(entity_id = id, sender_id, receiver_id, "spawned beam");
    world.emit_event(Event::BeamCreated {
        entity_id: id,
        sender_id,
        receiver_id,
    });
    Ok(id)
}

/// Spawn a chain segment on its receiver. The segment delivers its
/// propagation package to the receiver, waits out the chain delay, then
/// bounces if any charge is left.
pub fn spawn_chain(world: &mut World, mut data: ChainData) -> SimResult<EntityId> {
    let (owner_id, team) = validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.first_propagation_receiver_id)?;
    let receiver_pos = sender_position(world, data.first_propagation_receiver_id)?;

    if data.combat_unit_sender_id == INVALID_ENTITY_ID {
        data.combat_unit_sender_id = owner_id;
    }

    let stats = sender_stats_snapshot(world, data.sender_id);
    let sender_id = data.sender_id;
    let receiver_id = data.first_propagation_receiver_id;
    let delay_ms = data.chain_delay_ms;
    let package = data.propagation_effect_package.clone();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position: receiver_pos,
        radius_units: 0,
        taking_space: false,
        reserved_position: None,
    });
    entity.components.stats = Some(stats);
    entity.components.focus = Some(FocusComponent {
        focus_id: receiver_id,
        previous_focus_id: INVALID_ENTITY_ID,
        refocus_type: RefocusType::Never,
    });
    entity.components.filtering = Some(FilteringComponent::default());
    entity.components.duration = Some(DurationComponent::from_ms(delay_ms));
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.abilities = Some(synthetic_attack_ability(
        "chain payload",
        direct_delivery_skill("chain payload", package),
    ));
    entity.components.chain = Some(ChainComponent {
        data,
        has_delivered: false,
        has_bounced: false,
    });

    debug!(entity_id = id, sender_id, receiver_id, "spawned chain");
    world.emit_event(Event::ChainCreated {
        entity_id: id,
        sender_id,
        receiver_id,
    });
    Ok(id)
}

/// Spawn a projectile flying from the sender to the receiver.
/// `speed_sub_units_per_time_step` comes from the skill's authored
/// per-second speed, already converted by the deployment path.
pub fn spawn_projectile(
    world: &mut World,
    data: ProjectileData,
    speed_sub_units_per_time_step: i32,
) -> SimResult<EntityId> {
    let (_, team) = validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.receiver_id)?;
    let sender_pos = sender_position(world, data.sender_id)?;
    let receiver_pos = sender_position(world, data.receiver_id)?;

    let stats = sender_stats_snapshot(world, data.sender_id);
    let sender_id = data.sender_id;
    let receiver_id = data.receiver_id;
    let radius_units = data.radius_units;
    let skill = data.skill_data.clone();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position: sender_pos,
        radius_units,
        taking_space: false,
        reserved_position: None,
    });
    entity.components.stats = Some(stats);
    entity.components.focus = Some(FocusComponent {
        focus_id: receiver_id,
        previous_focus_id: INVALID_ENTITY_ID,
        refocus_type: RefocusType::Never,
    });
    entity.components.filtering = Some(FilteringComponent {
        only_new_targets: true,
        ..FilteringComponent::default()
    });
    entity.components.duration = Some(DurationComponent::default());
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.movement = Some(MovementComponent {
        movement_type: MovementType::DirectPosition {
            target: receiver_pos,
        },
        speed_sub_units_per_time_step,
        ..MovementComponent::default()
    });
    entity.components.abilities = Some(synthetic_attack_ability(
        "projectile payload",
        direct_delivery_skill("projectile payload", skill.effect_package.clone()),
    ));
    entity.components.projectile = Some(ProjectileComponent {
        data,
        reached_target: false,
    });

    debug!(entity_id = id, sender_id, receiver_id, "spawned projectile");
    world.emit_event(Event::ProjectileCreated {
        entity_id: id,
        sender_id,
        receiver_id,
    });
    Ok(id)
}

/// Spawn a dash: reserve a landing cell near (or behind) the receiver and
/// start moving the sender toward it. Reserving up front prevents two
/// simultaneous dashes from racing to the same free cell.
pub fn spawn_dash(
    world: &mut World,
    data: DashData,
    speed_sub_units_per_time_step: i32,
) -> SimResult<EntityId> {
    let (_, team) = validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.receiver_id)?;
    let sender_pos = sender_position(world, data.sender_id)?;
    let receiver_pos = sender_position(world, data.receiver_id)?;
    let sender_radius = world
        .get_or_err(data.sender_id)?
        .components
        .position
        .map_or(0, |position| position.radius_units);

    let obstacles = world.build_obstacles(data.sender_id, sender_radius);
    let destination = if data.land_behind {
        obstacles.open_position_behind(sender_pos, receiver_pos, sender_radius, 1)
    } else {
        obstacles.open_position_nearby_with_preferred_position(receiver_pos, sender_pos, sender_radius, 1)
    };
    if destination == crate::hex::INVALID_HEX_POSITION {
        return Err(SimError::InvalidSpawnRequest {
            sender: data.sender_id,
            message: "no open landing position for dash".into(),
        });
    }

    let stats = sender_stats_snapshot(world, data.sender_id);
    let sender_id = data.sender_id;
    let receiver_id = data.receiver_id;
    let skill = data.skill_data.clone();

    // Reserve the landing cell and start the sender moving
    if let Some(sender) = world.get_mut(sender_id) {
        if let Some(position) = sender.components.position.as_mut() {
            position.reserved_position = Some(destination);
        }
        if let Some(movement) = sender.components.movement.as_mut() {
            movement.movement_type = MovementType::DirectPosition {
                target: destination,
            };
            movement.speed_sub_units_per_time_step = speed_sub_units_per_time_step;
        }
    }

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position: sender_pos,
        radius_units: 0,
        taking_space: false,
        reserved_position: None,
    });
    entity.components.stats = Some(stats);
    entity.components.focus = Some(FocusComponent {
        focus_id: receiver_id,
        previous_focus_id: INVALID_ENTITY_ID,
        refocus_type: RefocusType::Never,
    });
    entity.components.filtering = Some(FilteringComponent {
        only_new_targets: true,
        ..FilteringComponent::default()
    });
    entity.components.duration = Some(DurationComponent::default());
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.abilities = Some(synthetic_attack_ability(
        "dash payload",
        direct_delivery_skill("dash payload", skill.effect_package.clone()),
    ));
    entity.components.dash = Some(DashComponent { data, destination });

    debug!(entity_id = id, sender_id, receiver_id, %destination, "spawned dash");
    world.emit_event(Event::DashCreated {
        entity_id: id,
        sender_id,
        destination,
    });
    Ok(id)
}

/// Spawn a shield and attach it to the receiver.
pub fn spawn_shield_and_attach(world: &mut World, data: ShieldData) -> SimResult<EntityId> {
    validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.receiver_id)?;

    let sender_id = data.sender_id;
    let receiver_id = data.receiver_id;
    let value = data.value;
    let duration_ms = data.duration_ms;
    let team = world.get_or_err(receiver_id)?.team();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.duration = Some(DurationComponent::from_ms(duration_ms));
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.shield = Some(ShieldComponent {
        data,
        remaining: value,
    });
    attach_to_receiver(world, receiver_id, id);

    debug!(entity_id = id, sender_id, receiver_id, %value, "spawned shield");
    world.emit_event(Event::ShieldCreated {
        entity_id: id,
        sender_id,
        receiver_id,
        value,
    });
    Ok(id)
}

/// Spawn a mark and attach it to the receiver.
pub fn spawn_mark_and_attach(world: &mut World, data: MarkData) -> SimResult<EntityId> {
    validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.receiver_id)?;

    let sender_id = data.sender_id;
    let receiver_id = data.receiver_id;
    let duration_ms = data.duration_ms;
    let team = world.get_or_err(receiver_id)?.team();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.duration = Some(DurationComponent::from_ms(duration_ms));
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.mark = Some(MarkComponent { data });
    attach_to_receiver(world, receiver_id, id);

    debug!(entity_id = id, sender_id, receiver_id, "spawned mark");
    world.emit_event(Event::MarkCreated {
        entity_id: id,
        sender_id,
        receiver_id,
    });
    Ok(id)
}

/// Spawn an aura and attach it to the receiver.
pub fn spawn_aura_and_attach(world: &mut World, data: AuraData) -> SimResult<EntityId> {
    validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, data.receiver_id)?;

    let sender_id = data.sender_id;
    let receiver_id = data.receiver_id;
    let duration_ms = data.duration_ms;
    let team = world.get_or_err(receiver_id)?.team();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.duration = Some(DurationComponent::from_ms(duration_ms));
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.aura = Some(AuraComponent { data });
    attach_to_receiver(world, receiver_id, id);

    debug!(entity_id = id, sender_id, receiver_id, "spawned aura");
    world.emit_event(Event::AuraCreated {
        entity_id: id,
        sender_id,
        receiver_id,
    });
    Ok(id)
}

fn attach_to_receiver(world: &mut World, receiver_id: EntityId, attached_id: EntityId) {
    if let Some(receiver) = world.get_mut(receiver_id) {
        receiver
            .components
            .attached_entities
            .get_or_insert_with(Default::default)
            .add(attached_id);
    }
}

/// Spawn a splash trigger at the receiver and immediately spawn its
/// follow-up zone. The splash entity itself tears down as soon as the
/// zone exists.
pub fn spawn_splash(world: &mut World, data: SplashData, receiver_id: EntityId) -> SimResult<EntityId> {
    let (owner_id, team) = validate_spawn_sender(world, data.sender_id)?;
    validate_spawn_receiver(world, data.sender_id, receiver_id)?;
    let receiver_pos = sender_position(world, receiver_id)?;

    let sender_id = data.sender_id;
    let radius_units = data.splash_radius_units;
    let is_critical = data.is_critical;
    let ignore_receiver = data.ignore_first_propagation_receiver;
    let package = data.propagation_effect_package.clone();

    let id = world.add_entity(team, sender_id);
    let entity = world
        .get_mut(id)
        .ok_or(SimError::EntityNotFound(id))?;
    entity.components.position = Some(PositionComponent {
        position: receiver_pos,
        radius_units: 0,
        taking_space: false,
        reserved_position: None,
    });
    entity.components.deferred_destruction = Some(DeferredDestructionComponent::default());
    entity.components.splash = Some(SplashComponent { data });

    world.emit_event(Event::SplashCreated {
        entity_id: id,
        sender_id,
    });

    let mut skill = SkillData {
        name: "splash zone".into(),
        effect_package: package,
        ..SkillData::default()
    };
    skill.set_propagation_skill_splash_defaults(radius_units);

    let zone_data = ZoneData {
        skill_data: skill.clone(),
        sender_id: id,
        original_sender_id: owner_id,
        shape: skill.zone.shape,
        radius_sub_units: math::units_to_sub_units(radius_units),
        duration_ms: skill.zone.duration_ms,
        frequency_ms: skill.zone.frequency_ms,
        apply_once: skill.zone.apply_once,
        is_critical,
        ..ZoneData::default()
    };
    let zone_id = spawn_zone(world, zone_data, receiver_pos)?;
    if ignore_receiver {
        if let Some(zone_entity) = world.get_mut(zone_id) {
            if let Some(filtering) = zone_entity.components.filtering.as_mut() {
                filtering.ignored_entities.insert(receiver_id);
            }
        }
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::FixedPoint;
    use crate::world::BattleConfig;

    fn world_with_unit(health: i64) -> (World, EntityId) {
        let mut world = World::new(BattleConfig::default());
        let stats = StatsData::new()
            .with(crate::data::stats::StatType::MaxHealth, FixedPoint::from_int(health))
            .with(
                crate::data::stats::StatType::CurrentHealth,
                FixedPoint::from_int(health),
            );
        let id = spawn_combat_unit(
            &mut world,
            Team::Red,
            HexGridPosition::new(0, -10),
            1,
            stats,
            AbilitiesData::default(),
        )
        .unwrap();
        (world, id)
    }

    #[test]
    fn test_spawn_combat_unit_rejects_occupied_position() {
        let (mut world, _unit) = world_with_unit(100);
        let result = spawn_combat_unit(
            &mut world,
            Team::Blue,
            HexGridPosition::new(0, -10),
            1,
            StatsData::new(),
            AbilitiesData::default(),
        );
        assert!(matches!(result, Err(SimError::InvalidGridPosition(_))));
        // Failed spawn leaves no entity behind
        assert_eq!(world.entities().count(), 1);
    }

    #[test]
    fn test_spawn_zone_validates_sender() {
        let mut world = World::new(BattleConfig::default());
        let data = ZoneData {
            sender_id: 42,
            ..ZoneData::default()
        };
        let result = spawn_zone(&mut world, data, HexGridPosition::new(0, 0));
        assert!(matches!(result, Err(SimError::EntityNotFound(42))));
    }

    #[test]
    fn test_spawn_zone_wires_scaffolding_and_emits_event() {
        let (mut world, unit) = world_with_unit(100);
        let data = ZoneData {
            sender_id: unit,
            radius_sub_units: 3000,
            duration_ms: 500,
            frequency_ms: 100,
            apply_once: true,
            ..ZoneData::default()
        };
        let zone_id = spawn_zone(&mut world, data, HexGridPosition::new(0, -10)).unwrap();

        let zone = world.get(zone_id).unwrap();
        assert!(zone.components.zone.is_some());
        assert!(zone.components.filtering.as_ref().unwrap().only_new_targets);
        assert_eq!(zone.components.duration.unwrap().total_time_steps, 5);
        assert_eq!(zone.components.focus.unwrap().refocus_type, RefocusType::Never);
        assert_eq!(zone.parent_id(), unit);
        assert!(world
            .step_events()
            .iter()
            .any(|event| matches!(event, Event::ZoneCreated { entity_id, .. } if *entity_id == zone_id)));
    }

    #[test]
    fn test_zone_growth_rate_derived_from_duration() {
        let (mut world, unit) = world_with_unit(100);
        let data = ZoneData {
            sender_id: unit,
            radius_sub_units: 20_000,
            max_radius_sub_units: 21_000,
            duration_ms: 1000,
            frequency_ms: 100,
            ..ZoneData::default()
        };
        let zone_id = spawn_zone(&mut world, data, HexGridPosition::new(0, -10)).unwrap();
        let zone = world.get(zone_id).unwrap().components.zone.as_ref().unwrap();
        assert_eq!(zone.data.growth_rate_sub_units_per_time_step, 100);
    }

    #[test]
    fn test_spawn_chain_positions_on_receiver() {
        let (mut world, unit) = world_with_unit(100);
        let receiver = spawn_combat_unit(
            &mut world,
            Team::Blue,
            HexGridPosition::new(0, 10),
            1,
            StatsData::new(),
            AbilitiesData::default(),
        )
        .unwrap();

        let data = ChainData {
            sender_id: unit,
            first_propagation_receiver_id: receiver,
            chain_number: 3,
            ..ChainData::default()
        };
        let chain_id = spawn_chain(&mut world, data).unwrap();
        let chain = world.get(chain_id).unwrap();
        assert_eq!(
            chain.components.position.unwrap().position,
            HexGridPosition::new(0, 10)
        );
        assert_eq!(chain.components.chain.as_ref().unwrap().data.combat_unit_sender_id, unit);
    }

    #[test]
    fn test_spawn_dash_reserves_destination() {
        let (mut world, unit) = world_with_unit(100);
        let receiver = spawn_combat_unit(
            &mut world,
            Team::Blue,
            HexGridPosition::new(0, 10),
            1,
            StatsData::new(),
            AbilitiesData::default(),
        )
        .unwrap();

        let data = DashData {
            sender_id: unit,
            receiver_id: receiver,
            ..DashData::default()
        };
        let dash_id = spawn_dash(&mut world, data, 5000).unwrap();

        let sender = world.get(unit).unwrap();
        let reserved = sender.components.position.unwrap().reserved_position;
        let destination = world.get(dash_id).unwrap().components.dash.as_ref().unwrap().destination;
        assert_eq!(reserved, Some(destination));
        // Landing behind puts the destination on the far side of the receiver
        assert!(destination.r > 10);
    }

    #[test]
    fn test_spawn_shield_attaches_to_receiver() {
        let (mut world, unit) = world_with_unit(100);
        let data = ShieldData {
            sender_id: unit,
            receiver_id: unit,
            value: FixedPoint::from_int(50),
            ..ShieldData::default()
        };
        let shield_id = spawn_shield_and_attach(&mut world, data).unwrap();

        let attached = &world.get(unit).unwrap().components.attached_entities;
        assert!(attached.as_ref().unwrap().attached.contains(&shield_id));
        assert_eq!(
            world.get(shield_id).unwrap().components.shield.as_ref().unwrap().remaining,
            FixedPoint::from_int(50)
        );
    }

    #[test]
    fn test_spawn_from_fainted_sender_fails() {
        let (mut world, unit) = world_with_unit(100);
        world
            .get_mut(unit)
            .unwrap()
            .components
            .combat_unit
            .as_mut()
            .unwrap()
            .fainted = true;

        let data = ZoneData {
            sender_id: unit,
            ..ZoneData::default()
        };
        let result = spawn_zone(&mut world, data, HexGridPosition::new(0, 0));
        assert!(matches!(result, Err(SimError::InvalidSpawnRequest { .. })));
    }
}
