//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Battles must be 100% reproducible from a config and a seed. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`arena_core::fixed_point::FixedPoint`]
//!   throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in entity insertion order over sorted ids.
//!
//! - **System randomness**: No calls to `rand()` without explicit seeds.
//!   All "random" behavior flows through the world's seeded PRNG.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, zones, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battle scenarios are reproducible
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::thread;

use arena_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error
    /// message.
    ///
    /// # Panics
    ///
    /// Panics if the battle produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a battle multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the battle
/// * `steps` - Number of steps to simulate per run
/// * `setup` - Function to create the initial world
/// * `step` - Function to advance the world by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use arena_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 steps each
///     || duel_world(42),
///     |world| world.time_step(),
///     |world| world.state_hash().unwrap(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Simplified determinism verification for [`World`].
///
/// Runs the battle twice with identical setup and verifies the final state
/// hashes match exactly.
pub fn verify_battle_determinism<F>(setup_fn: F, num_steps: u64) -> bool
where
    F: Fn() -> World,
{
    let result = verify_determinism(
        2,
        num_steps,
        &setup_fn,
        World::time_step,
        |world| world.state_hash().unwrap(),
    );
    result.is_deterministic
}

/// Run N battles in parallel and assert the final hashes all match.
///
/// This is useful for catching non-determinism that only manifests under
/// thread scheduling variations or memory layout differences.
///
/// # Panics
///
/// Panics if any two battles produced different hashes.
pub fn verify_parallel_battles<F>(setup_fn: F, num_battles: usize, num_steps: u64)
where
    F: Fn() -> World + Sync,
{
    let hashes: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                scope.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_steps {
                        world.time_step();
                    }
                    world.state_hash().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let matched = hashes.windows(2).all(|w| w[0] == w[1]);
    assert!(
        matched,
        "Parallel battles diverged!\nBattles: {num_battles}\nSteps: {num_steps}\nHashes: {hashes:?}"
    );
}

/// Compare two battle runs step-by-step and return the first step whose
/// state hashes differ, if any. Useful for pinning down exactly when two
/// runs start to diverge.
pub fn find_first_divergence<F>(setup_fn: F, max_steps: u64) -> Option<u64>
where
    F: Fn() -> World,
{
    let mut left = setup_fn();
    let mut right = setup_fn();

    for step in 0..max_steps {
        left.time_step();
        right.time_step();
        let left_hash = left.state_hash().unwrap();
        let right_hash = right.state_hash().unwrap();
        if left_hash != right_hash {
            return Some(step);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_deterministic() {
        let result = verify_determinism(
            3,
            10,
            || 0u64,
            |counter| *counter += 1,
            |counter| *counter,
        );
        result.assert_deterministic();
        assert_eq!(result.hashes, vec![10, 10, 10]);
    }

    #[test]
    fn test_unique_hashes_collapse() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![3, 1, 3, 2],
            steps: 0,
        };
        assert_eq!(result.unique_hashes(), vec![1, 2, 3]);
    }
}
