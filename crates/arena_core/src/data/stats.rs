//! Combat stat catalogue and stat snapshots.
//!
//! Stats live in dense per-entity tables indexed by [`StatType`]; a missing
//! entry reads as zero. Every spawned entity carries a snapshot of its
//! sender's live stats taken at spawn time so later buffs on the sender do
//! not retroactively change a payload already in flight.

use serde::{Deserialize, Serialize};

use crate::fixed_point::FixedPoint;

/// Catalogue of combat stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatType {
    /// Flat damage dealt by attack abilities.
    AttackDamage,
    /// Attacks per second, as a percentage (100 = one attack per second).
    AttackSpeed,
    /// Health cap.
    MaxHealth,
    /// Current health. Metered against [`StatType::MaxHealth`].
    CurrentHealth,
    /// Omega ability power, percentage-typed.
    OmegaPowerPercentage,
    /// Chance for an attack to crit, percentage-typed.
    CritChancePercentage,
    /// Crit damage multiplier, percentage-typed.
    CritAmplificationPercentage,
    /// Chance for an attack to hit, percentage-typed.
    HitChancePercentage,
    /// Attack range in grid units.
    AttackRangeUnits,
    /// Movement speed in sub-units per time step.
    MoveSpeedSubUnits,
    /// Physical damage resistance.
    PhysicalResist,
    /// Energy damage resistance.
    EnergyResist,
    /// Flat physical damage reduction.
    Grit,
    /// Flat energy damage reduction.
    Resolve,
}

impl StatType {
    /// All stat types in catalogue order.
    pub const ALL: [Self; 14] = [
        Self::AttackDamage,
        Self::AttackSpeed,
        Self::MaxHealth,
        Self::CurrentHealth,
        Self::OmegaPowerPercentage,
        Self::CritChancePercentage,
        Self::CritAmplificationPercentage,
        Self::HitChancePercentage,
        Self::AttackRangeUnits,
        Self::MoveSpeedSubUnits,
        Self::PhysicalResist,
        Self::EnergyResist,
        Self::Grit,
        Self::Resolve,
    ];

    /// Number of stat types.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of this stat in the catalogue.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether this stat is a percentage combat stat.
    ///
    /// This classification drives the asymmetric multiply normalization in
    /// expression evaluation: multiplying two percentage stats divides by
    /// 100 twice, a percentage stat times a plain value only once.
    #[must_use]
    pub const fn is_percentage_type(self) -> bool {
        matches!(
            self,
            Self::OmegaPowerPercentage
                | Self::CritChancePercentage
                | Self::CritAmplificationPercentage
                | Self::HitChancePercentage
        )
    }

    /// Stats treated as percentages inside expressions, a superset of
    /// [`Self::is_percentage_type`].
    #[must_use]
    pub const fn is_percentage_type_for_expression(self) -> bool {
        self.is_percentage_type()
            || matches!(self, Self::AttackSpeed | Self::PhysicalResist | Self::EnergyResist)
    }

    /// For a metered stat, the stat holding its cap.
    #[must_use]
    pub const fn metered_stat_corresponding_max(self) -> Option<Self> {
        match self {
            Self::CurrentHealth => Some(Self::MaxHealth),
            _ => None,
        }
    }
}

/// Which view of a stat an expression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatEvaluationType {
    /// Current value including all modifications.
    #[default]
    Live,
    /// Authored value before any modification.
    Base,
    /// Live minus base.
    Bonus,
}

/// Dense stat table. Unset stats read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsData {
    values: [FixedPoint; StatType::COUNT],
}

impl StatsData {
    /// Empty stat table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [FixedPoint::ZERO; StatType::COUNT],
        }
    }

    /// Read a stat.
    #[must_use]
    pub const fn get(&self, stat: StatType) -> FixedPoint {
        self.values[stat.index()]
    }

    /// Write a stat.
    pub fn set(&mut self, stat: StatType, value: FixedPoint) {
        self.values[stat.index()] = value;
    }

    /// Builder-style write, used by fixtures and spawn snapshots.
    #[must_use]
    pub fn with(mut self, stat: StatType, value: FixedPoint) -> Self {
        self.set(stat, value);
        self
    }

    /// For a metered stat, the live value of its cap stat.
    #[must_use]
    pub fn metered_stat_corresponding_max_value(&self, stat: StatType) -> FixedPoint {
        match stat.metered_stat_corresponding_max() {
            Some(max_stat) => self.get(max_stat),
            None => FixedPoint::ZERO,
        }
    }
}

/// Base and live stat tables for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FullStatsData {
    /// Authored values.
    pub base: StatsData,
    /// Current values.
    pub live: StatsData,
}

impl FullStatsData {
    /// Read a stat under the given evaluation type.
    #[must_use]
    pub fn get(&self, stat: StatType, evaluation_type: StatEvaluationType) -> FixedPoint {
        match evaluation_type {
            StatEvaluationType::Live => self.live.get(stat),
            StatEvaluationType::Base => self.base.get(stat),
            StatEvaluationType::Bonus => self.live.get(stat) - self.base.get(stat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_stats_read_as_zero() {
        let stats = StatsData::new();
        for stat in StatType::ALL {
            assert_eq!(stats.get(stat), FixedPoint::ZERO);
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut stats = StatsData::new();
        stats.set(StatType::MaxHealth, FixedPoint::from_int(105));
        assert_eq!(stats.get(StatType::MaxHealth), FixedPoint::from_int(105));
        assert_eq!(stats.get(StatType::AttackDamage), FixedPoint::ZERO);
    }

    #[test]
    fn test_percentage_classification() {
        assert!(StatType::OmegaPowerPercentage.is_percentage_type());
        assert!(StatType::CritChancePercentage.is_percentage_type());
        assert!(!StatType::MaxHealth.is_percentage_type());
        assert!(!StatType::AttackSpeed.is_percentage_type());
        assert!(StatType::AttackSpeed.is_percentage_type_for_expression());
    }

    #[test]
    fn test_bonus_is_live_minus_base() {
        let full = FullStatsData {
            base: StatsData::new().with(StatType::AttackDamage, FixedPoint::from_int(100)),
            live: StatsData::new().with(StatType::AttackDamage, FixedPoint::from_int(130)),
        };
        assert_eq!(
            full.get(StatType::AttackDamage, StatEvaluationType::Bonus),
            FixedPoint::from_int(30)
        );
    }

    #[test]
    fn test_metered_max_lookup() {
        let stats = StatsData::new().with(StatType::MaxHealth, FixedPoint::from_int(200));
        assert_eq!(
            stats.metered_stat_corresponding_max_value(StatType::CurrentHealth),
            FixedPoint::from_int(200)
        );
        assert_eq!(
            stats.metered_stat_corresponding_max_value(StatType::AttackDamage),
            FixedPoint::ZERO
        );
    }
}
