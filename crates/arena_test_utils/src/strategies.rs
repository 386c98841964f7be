//! Property-based testing strategies.
//!
//! Proptest generators for battle inputs: seeds, spawn positions and stat
//! tables bounded to values the simulation actually sees.

use arena_core::data::stats::{StatType, StatsData};
use arena_core::fixed_point::FixedPoint;
use arena_core::hex::HexGridPosition;
use proptest::prelude::*;

/// Any PRNG seed.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// An axial position within `half_extent` units of the origin on both
/// axes. Combine with a fixed `r` offset to keep units off the middle
/// line.
pub fn arb_position(half_extent: i32) -> impl Strategy<Value = HexGridPosition> {
    (-half_extent..=half_extent, -half_extent..=half_extent)
        .prop_map(|(q, r)| HexGridPosition::new(q, r))
}

/// A plausible combat stat table: positive health, bounded damage and
/// resists, percentages in range.
pub fn arb_combat_stats() -> impl Strategy<Value = StatsData> {
    (
        1i64..=10_000,  // health
        0i64..=500,     // attack damage
        50i64..=300,    // attack speed
        1i64..=30,      // attack range
        0i64..=100,     // crit chance
        100i64..=250,   // crit amplification
        0i64..=100,     // resists
    )
        .prop_map(
            |(health, damage, speed, range, crit_chance, crit_amp, resist)| {
                StatsData::new()
                    .with(StatType::MaxHealth, FixedPoint::from_int(health))
                    .with(StatType::CurrentHealth, FixedPoint::from_int(health))
                    .with(StatType::AttackDamage, FixedPoint::from_int(damage))
                    .with(StatType::AttackSpeed, FixedPoint::from_int(speed))
                    .with(StatType::AttackRangeUnits, FixedPoint::from_int(range))
                    .with(StatType::MoveSpeedSubUnits, FixedPoint::from_int(2000))
                    .with(StatType::CritChancePercentage, FixedPoint::from_int(crit_chance))
                    .with(
                        StatType::CritAmplificationPercentage,
                        FixedPoint::from_int(crit_amp),
                    )
                    .with(StatType::PhysicalResist, FixedPoint::from_int(resist))
                    .with(StatType::EnergyResist, FixedPoint::from_int(resist))
            },
        )
}

/// A fixed-point value in `[low, high]` whole numbers.
pub fn arb_fixed(low: i64, high: i64) -> impl Strategy<Value = FixedPoint> {
    (low..=high).prop_map(FixedPoint::from_int)
}
