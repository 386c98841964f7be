//! Straight-line movement over the hex grid.
//!
//! Positions split into whole units plus a sub-unit remainder so slow
//! movers accumulate progress across steps without drift.

use crate::components::MovementType;
use crate::grid;
use crate::hex::HexGridPosition;
use crate::math::PRECISION_FACTOR;
use crate::world::World;

/// Advance every active mover by one step.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let (Some(movement), Some(position)) =
            (entity.components.movement, entity.components.position)
        else {
            continue;
        };

        if movement.paused_time_steps > 0 {
            if let Some(entity) = world.get_mut(id) {
                if let Some(movement) = entity.components.movement.as_mut() {
                    movement.paused_time_steps -= 1;
                }
            }
            continue;
        }

        let update = match movement.movement_type {
            MovementType::None => continue,
            MovementType::Snap { target_id } => snap_to_target(world, target_id),
            MovementType::DirectPosition { target } => Some(step_toward(
                position.position,
                movement.sub_units_remainder,
                target,
                movement.speed_sub_units_per_time_step,
            )),
            MovementType::DirectVector { direction } => Some(step_along(
                position.position,
                movement.sub_units_remainder,
                direction,
                movement.speed_sub_units_per_time_step,
            )),
        };
        let Some(update) = update else {
            continue;
        };

        if let Some(entity) = world.get_mut(id) {
            if let Some(position) = entity.components.position.as_mut() {
                position.position = update.position;
            }
            if let Some(movement) = entity.components.movement.as_mut() {
                movement.sub_units_remainder = update.sub_units_remainder;
                if update.arrived {
                    movement.movement_type = MovementType::None;
                }
            }
        }
    }
}

struct MovementUpdate {
    position: HexGridPosition,
    sub_units_remainder: HexGridPosition,
    arrived: bool,
}

/// Copy the target's cell. A vanished target ends the snap.
fn snap_to_target(world: &World, target_id: crate::entity::EntityId) -> Option<MovementUpdate> {
    let target = world.get(target_id)?;
    let target_position = target.components.position?;
    Some(MovementUpdate {
        position: target_position.position,
        sub_units_remainder: HexGridPosition::new(0, 0),
        arrived: false,
    })
}

fn step_toward(
    position: HexGridPosition,
    remainder: HexGridPosition,
    target: HexGridPosition,
    speed_sub_units: i32,
) -> MovementUpdate {
    let delta_sub_units = grid::sub_units_vector_between(position, target) - remainder;
    let distance_sub_units = delta_sub_units.length();
    if speed_sub_units >= distance_sub_units {
        return MovementUpdate {
            position: target,
            sub_units_remainder: HexGridPosition::new(0, 0),
            arrived: true,
        };
    }

    let step = delta_sub_units.to_normalized_and_scaled() * speed_sub_units / PRECISION_FACTOR;
    let mut new_position = position;
    let mut new_remainder = remainder;
    grid::add_sub_units_position_with_alternative_rounding(
        step,
        &mut new_position,
        &mut new_remainder,
    );
    MovementUpdate {
        position: new_position,
        sub_units_remainder: new_remainder,
        arrived: false,
    }
}

fn step_along(
    position: HexGridPosition,
    remainder: HexGridPosition,
    direction: HexGridPosition,
    speed_sub_units: i32,
) -> MovementUpdate {
    let step = direction * speed_sub_units / PRECISION_FACTOR;
    let mut new_position = position;
    let mut new_remainder = remainder;
    grid::add_sub_units_position_to_position(step, &mut new_position, &mut new_remainder);
    MovementUpdate {
        position: new_position,
        sub_units_remainder: new_remainder,
        arrived: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MovementComponent, PositionComponent};
    use crate::entity::{EntityId, Team, INVALID_ENTITY_ID};
    use crate::world::BattleConfig;

    fn add_mover(
        world: &mut World,
        q: i32,
        r: i32,
        movement_type: MovementType,
        speed: i32,
    ) -> EntityId {
        let id = world.add_entity(Team::Red, INVALID_ENTITY_ID);
        let entity = world.get_mut(id).unwrap();
        entity.components.position = Some(PositionComponent {
            position: HexGridPosition::new(q, r),
            radius_units: 1,
            taking_space: false,
            reserved_position: None,
        });
        entity.components.movement = Some(MovementComponent {
            movement_type,
            speed_sub_units_per_time_step: speed,
            ..MovementComponent::default()
        });
        id
    }

    #[test]
    fn test_moves_toward_target_and_arrives() {
        let mut world = World::new(BattleConfig::default());
        let target = HexGridPosition::new(0, 5);
        let id = add_mover(
            &mut world,
            0,
            0,
            MovementType::DirectPosition { target },
            2000,
        );

        time_step(&mut world);
        assert_eq!(
            world.get(id).unwrap().components.position.unwrap().position,
            HexGridPosition::new(0, 2)
        );
        time_step(&mut world);
        assert_eq!(
            world.get(id).unwrap().components.position.unwrap().position,
            HexGridPosition::new(0, 4)
        );

        // Remaining distance is below speed, the entity lands exactly.
        time_step(&mut world);
        let entity = world.get(id).unwrap();
        assert_eq!(entity.components.position.unwrap().position, target);
        assert_eq!(
            entity.components.movement.unwrap().movement_type,
            MovementType::None
        );
    }

    #[test]
    fn test_pause_delays_movement() {
        let mut world = World::new(BattleConfig::default());
        let target = HexGridPosition::new(0, 10);
        let id = add_mover(
            &mut world,
            0,
            0,
            MovementType::DirectPosition { target },
            1000,
        );
        world
            .get_mut(id)
            .unwrap()
            .components
            .movement
            .as_mut()
            .unwrap()
            .paused_time_steps = 1;

        time_step(&mut world);
        assert_eq!(
            world.get(id).unwrap().components.position.unwrap().position,
            HexGridPosition::new(0, 0)
        );
        time_step(&mut world);
        assert_eq!(
            world.get(id).unwrap().components.position.unwrap().position,
            HexGridPosition::new(0, 1)
        );
    }

    #[test]
    fn test_snap_follows_target() {
        let mut world = World::new(BattleConfig::default());
        let carrier = add_mover(&mut world, 3, 3, MovementType::None, 0);
        let follower = add_mover(
            &mut world,
            0,
            0,
            MovementType::Snap { target_id: carrier },
            0,
        );

        time_step(&mut world);
        assert_eq!(
            world
                .get(follower)
                .unwrap()
                .components
                .position
                .unwrap()
                .position,
            HexGridPosition::new(3, 3)
        );

        world
            .get_mut(carrier)
            .unwrap()
            .components
            .position
            .as_mut()
            .unwrap()
            .position = HexGridPosition::new(5, 2);
        time_step(&mut world);
        assert_eq!(
            world
                .get(follower)
                .unwrap()
                .components
                .position
                .unwrap()
                .position,
            HexGridPosition::new(5, 2)
        );
    }

    #[test]
    fn test_direct_vector_accumulates_sub_units() {
        let mut world = World::new(BattleConfig::default());
        let direction = HexGridPosition::new(1000, 0);
        let id = add_mover(&mut world, 0, 0, MovementType::DirectVector { direction }, 400);

        // 5 steps of 400 sub-units cover exactly 2 whole units.
        for _ in 0..5 {
            time_step(&mut world);
        }
        let entity = world.get(id).unwrap();
        assert_eq!(
            entity.components.position.unwrap().position,
            HexGridPosition::new(2, 0)
        );
        assert_eq!(
            entity.components.movement.unwrap().sub_units_remainder,
            HexGridPosition::new(0, 0)
        );
    }
}
