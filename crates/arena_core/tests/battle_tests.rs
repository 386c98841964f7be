//! End-to-end battle scenarios through the public API.

use arena_core::entity::Team;
use arena_core::world::World;
use arena_test_utils::fixtures;

#[test]
fn test_duel_finishes_with_a_winner() {
    let mut world = fixtures::duel_world(0);
    let result = fixtures::run_battle(&mut world, 1000).expect("duel should finish");

    assert!(result.winning_team.is_some());
    assert!(result.duration_time_steps < 1000);
    // Equal units, zero crit chance: the first spawn attacks first each
    // step, so red lands the killing blow
    assert_eq!(result.winning_team, Some(Team::Red));
}

#[test]
fn test_result_reports_fainted_units() {
    let mut world = fixtures::duel_world(0);
    let result = fixtures::run_battle(&mut world, 1000).expect("duel should finish");
    let winner = result.winning_team.expect("duel has a winner");

    assert!(result
        .units
        .iter()
        .any(|unit| unit.team != winner && unit.fainted));
    assert!(result
        .units
        .iter()
        .any(|unit| unit.team == winner && !unit.fainted));
}

#[test]
fn test_snapshot_round_trip_resumes_identically() {
    let mut original = fixtures::lineup_world(9, 4);
    for _ in 0..50 {
        original.time_step();
    }

    let bytes = original.serialize().expect("serialize mid-battle");
    let mut restored = World::deserialize(&bytes).expect("deserialize snapshot");
    assert_eq!(
        original.state_hash().unwrap(),
        restored.state_hash().unwrap()
    );

    for _ in 0..50 {
        original.time_step();
        restored.time_step();
    }
    assert_eq!(
        original.state_hash().unwrap(),
        restored.state_hash().unwrap()
    );
}

#[test]
fn test_battle_result_json_is_reproducible() {
    let run = || {
        let mut world = fixtures::lineup_world(17, 3);
        let result = fixtures::run_battle(&mut world, 3000).expect("battle should finish");
        serde_json::to_string(&result).expect("battle result serializes")
    };

    // Identical inputs must yield a byte-identical result record
    assert_eq!(run(), run());
}

#[test]
fn test_larger_lineup_still_resolves() {
    let mut world = fixtures::lineup_world(5, 5);
    let result = fixtures::run_battle(&mut world, 3000).expect("lineup should finish");
    assert!(result.winning_team.is_some());
    assert_eq!(result.units.len(), 10);
}
