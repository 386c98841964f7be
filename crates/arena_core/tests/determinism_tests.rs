//! Whole-battle determinism checks.
//!
//! Every battle must be exactly reproducible from its config and seed.
//! These tests run full battles through the public API only.

use arena_core::world::World;
use arena_test_utils::determinism::{
    find_first_divergence, verify_battle_determinism, verify_determinism, verify_parallel_battles,
};
use arena_test_utils::fixtures;
use arena_test_utils::proptest::prelude::*;

#[test]
fn test_duel_runs_identically() {
    assert!(verify_battle_determinism(|| fixtures::duel_world(42), 200));
}

#[test]
fn test_lineup_has_no_step_divergence() {
    let divergence = find_first_divergence(|| fixtures::lineup_world(7, 5), 300);
    assert_eq!(divergence, None);
}

#[test]
fn test_repeated_runs_hash_identically() {
    let result = verify_determinism(
        4,
        150,
        || fixtures::lineup_world(11, 3),
        World::time_step,
        |world| world.state_hash().unwrap(),
    );
    result.assert_deterministic();
    assert_eq!(result.unique_hashes().len(), 1);
}

#[test]
fn test_parallel_battles_match() {
    verify_parallel_battles(|| fixtures::lineup_world(3, 3), 4, 200);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn test_any_seed_is_deterministic(seed in arena_test_utils::strategies::arb_seed()) {
        prop_assert!(verify_battle_determinism(|| fixtures::duel_world(seed), 100));
    }
}
