//! Focus acquisition: closest living enemy, stable tie-break.

use crate::entity::{EntityId, Team};
use crate::world::World;

/// Re-acquire focus for every entity whose focus died or was never set.
/// Entities with a never-refocus policy keep whatever they have.
pub fn time_step(world: &mut World) {
    for id in world.entity_ids() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(focus) = entity.components.focus else {
            continue;
        };
        if focus.refocus_type == crate::components::RefocusType::Never {
            continue;
        }
        if focus.is_focus_set() && is_alive_combat_unit(world, focus.focus_id) {
            continue;
        }

        let team = entity.team();
        let position = entity.components.position.map(|p| p.position);
        let new_focus = closest_living_enemy(world, team, position, id);
        if let Some(entity) = world.get_mut(id) {
            if let Some(focus) = entity.components.focus.as_mut() {
                match new_focus {
                    Some(target) => focus.set_focus(target),
                    None => focus.reset_focus(),
                }
            }
        }
    }
}

fn is_alive_combat_unit(world: &World, id: EntityId) -> bool {
    world.get(id).is_some_and(|entity| {
        entity.is_active()
            && entity
                .components
                .combat_unit
                .is_some_and(|unit| !unit.fainted)
    })
}

/// The closest living enemy combat unit by hex distance; equal distances
/// resolve to the lower id so repeated scans always agree.
fn closest_living_enemy(
    world: &World,
    team: Team,
    position: Option<crate::hex::HexGridPosition>,
    self_id: EntityId,
) -> Option<EntityId> {
    let mut best: Option<(i32, EntityId)> = None;
    for candidate in world.entities() {
        if candidate.id() == self_id
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
        let distance = match position {
            Some(own) => (candidate_position.position - own).length(),
            None => 0,
        };
        let key = (distance, candidate.id());
        if best.map_or(true, |current| key < current) {
            best = Some(key);
        }
    }
    best.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CombatUnitComponent, FocusComponent, PositionComponent};
    use crate::entity::INVALID_ENTITY_ID;
    use crate::hex::HexGridPosition;
    use crate::world::BattleConfig;

    fn add_unit(world: &mut World, team: Team, q: i32, r: i32) -> EntityId {
        let id = world.add_entity(team, INVALID_ENTITY_ID);
        let entity = world.get_mut(id).unwrap();
        entity.components.combat_unit = Some(CombatUnitComponent::default());
        entity.components.focus = Some(FocusComponent::default());
        entity.components.position = Some(PositionComponent {
            position: HexGridPosition::new(q, r),
            radius_units: 1,
            taking_space: true,
            reserved_position: None,
        });
        id
    }

    #[test]
    fn test_acquires_closest_enemy() {
        let mut world = World::new(BattleConfig::default());
        let red = add_unit(&mut world, Team::Red, 0, -5);
        let _far_blue = add_unit(&mut world, Team::Blue, 0, 10);
        let near_blue = add_unit(&mut world, Team::Blue, 0, 2);

        time_step(&mut world);
        let focus = world.get(red).unwrap().components.focus.unwrap();
        assert_eq!(focus.focus_id, near_blue);
    }

    #[test]
    fn test_equal_distance_prefers_lower_id() {
        let mut world = World::new(BattleConfig::default());
        let red = add_unit(&mut world, Team::Red, 0, 0);
        let blue_a = add_unit(&mut world, Team::Blue, 0, 4);
        let _blue_b = add_unit(&mut world, Team::Blue, 4, 0);

        time_step(&mut world);
        let focus = world.get(red).unwrap().components.focus.unwrap();
        assert_eq!(focus.focus_id, blue_a);
    }

    #[test]
    fn test_refocuses_when_focus_faints() {
        let mut world = World::new(BattleConfig::default());
        let red = add_unit(&mut world, Team::Red, 0, 0);
        let blue_a = add_unit(&mut world, Team::Blue, 0, 4);
        let blue_b = add_unit(&mut world, Team::Blue, 0, 8);

        time_step(&mut world);
        assert_eq!(world.get(red).unwrap().components.focus.unwrap().focus_id, blue_a);

        world
            .get_mut(blue_a)
            .unwrap()
            .components
            .combat_unit
            .as_mut()
            .unwrap()
            .fainted = true;
        time_step(&mut world);
        let focus = world.get(red).unwrap().components.focus.unwrap();
        assert_eq!(focus.focus_id, blue_b);
        assert_eq!(focus.previous_focus_id, blue_a);
    }

    #[test]
    fn test_no_enemies_resets_focus() {
        let mut world = World::new(BattleConfig::default());
        let red = add_unit(&mut world, Team::Red, 0, 0);
        time_step(&mut world);
        assert!(!world.get(red).unwrap().components.focus.unwrap().is_focus_set());
    }
}
