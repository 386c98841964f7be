//! Effect expression trees and their fixed-point evaluator.
//!
//! An expression is either a leaf value or an operation over child
//! expressions, evaluated against stat snapshots of the sender, receiver
//! and sender's focus. Evaluation is integer-exact and independent of the
//! host platform.
//!
//! The multiply operation carries asymmetric percentage bookkeeping:
//! multiplying by a percentage-typed stat normalizes by 100 once per
//! percentage operand, so `50% * 250%` yields `1.25` rather than `125`.
//! That behavior is load-bearing for authored content and must not be
//! simplified.

use serde::{Deserialize, Serialize};

use crate::data::stats::{FullStatsData, StatEvaluationType, StatType};
use crate::fixed_point::FixedPoint;

/// Which entity's stat snapshot a leaf reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpressionDataSourceType {
    /// The entity applying the effect.
    #[default]
    Sender,
    /// The entity the effect is applied to.
    Receiver,
    /// The current focus of the sender.
    SenderFocus,
}

impl ExpressionDataSourceType {
    const COUNT: usize = 3;

    const fn index(self) -> usize {
        self as usize
    }
}

/// Stat snapshots for each data source an expression can read.
///
/// Snapshots are taken before evaluation; a leaf referencing a source that
/// was never set evaluates against empty stats (everything reads zero).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionStatsSource {
    sources: [FullStatsData; ExpressionDataSourceType::COUNT],
}

impl ExpressionStatsSource {
    /// Empty stats source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot for one data source.
    pub fn set(&mut self, source: ExpressionDataSourceType, stats: FullStatsData) {
        self.sources[source.index()] = stats;
    }

    /// Builder-style [`Self::set`].
    #[must_use]
    pub fn with(mut self, source: ExpressionDataSourceType, stats: FullStatsData) -> Self {
        self.set(source, stats);
        self
    }

    /// Read the snapshot for one data source.
    #[must_use]
    pub fn get(&self, source: ExpressionDataSourceType) -> &FullStatsData {
        &self.sources[source.index()]
    }
}

/// Leaf value of an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectValue {
    /// A literal fixed-point value.
    Value(FixedPoint),
    /// A stat read from a snapshot.
    Stat {
        /// Which stat.
        stat: StatType,
        /// Live, base or bonus view.
        stat_evaluation_type: StatEvaluationType,
        /// Whose snapshot.
        data_source_type: ExpressionDataSourceType,
    },
    /// `percentage% of stat`.
    StatPercentage {
        /// The percentage applied to the stat.
        percentage: FixedPoint,
        /// Which stat.
        stat: StatType,
        /// Live, base or bonus view.
        stat_evaluation_type: StatEvaluationType,
        /// Whose snapshot.
        data_source_type: ExpressionDataSourceType,
    },
    /// `percentage% of stat` at 1/100th percent precision.
    StatHighPrecisionPercentage {
        /// The high-precision percentage applied to the stat.
        percentage: FixedPoint,
        /// Which stat.
        stat: StatType,
        /// Live, base or bonus view.
        stat_evaluation_type: StatEvaluationType,
        /// Whose snapshot.
        data_source_type: ExpressionDataSourceType,
    },
    /// A metered stat as a percentage of its cap (e.g. current health as a
    /// percentage of max health).
    MeteredStatPercentage {
        /// Which metered stat.
        stat: StatType,
        /// Live, base or bonus view.
        stat_evaluation_type: StatEvaluationType,
        /// Whose snapshot.
        data_source_type: ExpressionDataSourceType,
    },
}

impl Default for EffectValue {
    fn default() -> Self {
        Self::Value(FixedPoint::ZERO)
    }
}

impl EffectValue {
    /// Evaluate this leaf against the snapshots.
    #[must_use]
    pub fn evaluate(&self, stats_source: &ExpressionStatsSource) -> FixedPoint {
        match *self {
            Self::Value(value) => value,
            Self::Stat {
                stat,
                stat_evaluation_type,
                data_source_type,
            } => stats_source.get(data_source_type).get(stat, stat_evaluation_type),
            Self::StatPercentage {
                percentage,
                stat,
                stat_evaluation_type,
                data_source_type,
            } => {
                let stat_value = stats_source.get(data_source_type).get(stat, stat_evaluation_type);
                percentage.as_percentage_of(stat_value)
            }
            Self::StatHighPrecisionPercentage {
                percentage,
                stat,
                stat_evaluation_type,
                data_source_type,
            } => {
                let stat_value = stats_source.get(data_source_type).get(stat, stat_evaluation_type);
                percentage.as_high_precision_percentage_of(stat_value)
            }
            Self::MeteredStatPercentage {
                stat,
                stat_evaluation_type,
                data_source_type,
            } => {
                let full_stats = stats_source.get(data_source_type);
                let corresponding_max = full_stats.live.metered_stat_corresponding_max_value(stat);
                if corresponding_max == FixedPoint::ZERO {
                    return FixedPoint::ZERO;
                }
                let stat_value = full_stats.get(stat, stat_evaluation_type);
                stat_value * FixedPoint::MAX_PERCENTAGE / corresponding_max
            }
        }
    }

    /// Whether this leaf reads a percentage-typed stat.
    #[must_use]
    pub const fn is_stat_a_percentage_type(&self) -> bool {
        match self {
            Self::Stat { stat, .. } => stat.is_percentage_type_for_expression(),
            _ => false,
        }
    }

    /// Divide the numeric part of this leaf. Plain stat reads have no
    /// numeric part and are left untouched.
    fn divide_base_value(&mut self, divisor: FixedPoint) {
        match self {
            Self::Value(value) => *value /= divisor,
            Self::StatPercentage { percentage, .. }
            | Self::StatHighPrecisionPercentage { percentage, .. } => *percentage /= divisor,
            Self::Stat { .. } | Self::MeteredStatPercentage { .. } => {}
        }
    }
}

/// Operations over expression operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectOperationType {
    /// Sum of operands.
    Add,
    /// First operand minus the rest.
    Subtract,
    /// Product of operands with percentage normalization.
    Multiply,
    /// First operand divided by the rest (guarded against zero).
    Divide,
    /// Division floored toward negative infinity.
    IntegralDivision,
    /// `a.as_percentage_of(b)` folded left.
    PercentageOf,
    /// `a.as_high_precision_percentage_of(b)` folded left.
    HighPrecisionPercentageOf,
    /// Minimum of operands.
    Min,
    /// Maximum of operands.
    Max,
}

/// An effect expression: a leaf value or an operation over children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectExpression {
    /// A leaf.
    Leaf(EffectValue),
    /// An operation node.
    Operation {
        /// The operation folded over the operands.
        operation_type: EffectOperationType,
        /// Child expressions, evaluated left to right.
        operands: Vec<EffectExpression>,
    },
}

impl Default for EffectExpression {
    fn default() -> Self {
        Self::Leaf(EffectValue::default())
    }
}

impl EffectExpression {
    /// A literal value leaf.
    #[must_use]
    pub const fn from_value(value: FixedPoint) -> Self {
        Self::Leaf(EffectValue::Value(value))
    }

    /// A stat reference leaf.
    #[must_use]
    pub const fn from_stat(
        stat: StatType,
        stat_evaluation_type: StatEvaluationType,
        data_source_type: ExpressionDataSourceType,
    ) -> Self {
        Self::Leaf(EffectValue::Stat {
            stat,
            stat_evaluation_type,
            data_source_type,
        })
    }

    /// The sender's live value of a stat.
    #[must_use]
    pub const fn from_sender_live_stat(stat: StatType) -> Self {
        Self::from_stat(stat, StatEvaluationType::Live, ExpressionDataSourceType::Sender)
    }

    /// A `percentage% of stat` leaf.
    #[must_use]
    pub const fn from_stat_percentage(
        percentage: FixedPoint,
        stat: StatType,
        stat_evaluation_type: StatEvaluationType,
        data_source_type: ExpressionDataSourceType,
    ) -> Self {
        Self::Leaf(EffectValue::StatPercentage {
            percentage,
            stat,
            stat_evaluation_type,
            data_source_type,
        })
    }

    /// A high-precision `percentage% of stat` leaf.
    #[must_use]
    pub const fn from_stat_high_precision_percentage(
        percentage: FixedPoint,
        stat: StatType,
        stat_evaluation_type: StatEvaluationType,
        data_source_type: ExpressionDataSourceType,
    ) -> Self {
        Self::Leaf(EffectValue::StatHighPrecisionPercentage {
            percentage,
            stat,
            stat_evaluation_type,
            data_source_type,
        })
    }

    /// A metered-stat percentage leaf.
    #[must_use]
    pub const fn from_metered_stat_percentage(
        stat: StatType,
        stat_evaluation_type: StatEvaluationType,
        data_source_type: ExpressionDataSourceType,
    ) -> Self {
        Self::Leaf(EffectValue::MeteredStatPercentage {
            stat,
            stat_evaluation_type,
            data_source_type,
        })
    }

    /// An operation node.
    #[must_use]
    pub fn operation(operation_type: EffectOperationType, operands: Vec<Self>) -> Self {
        Self::Operation {
            operation_type,
            operands,
        }
    }

    /// Whether this node is a leaf reading a plain stat.
    #[must_use]
    pub const fn is_a_base_value_stat(&self) -> bool {
        matches!(self, Self::Leaf(EffectValue::Stat { .. }))
    }

    /// Whether this expression is empty (a zero literal or an operation
    /// with no operands).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaf(EffectValue::Value(value)) => *value == FixedPoint::ZERO,
            Self::Leaf(_) => false,
            Self::Operation { operands, .. } => operands.is_empty(),
        }
    }

    /// Divide the whole expression by a scalar.
    ///
    /// The divisor distributes recursively into every leaf's numeric value
    /// instead of wrapping the tree in a division node. The scaled tree can
    /// then be re-evaluated independently against different stat snapshots.
    /// Division by zero leaves the expression unchanged.
    pub fn divide_by_scalar(&mut self, divisor: FixedPoint) {
        if divisor == FixedPoint::ZERO {
            return;
        }
        match self {
            Self::Leaf(value) => value.divide_base_value(divisor),
            Self::Operation { operands, .. } => {
                for operand in operands {
                    operand.divide_by_scalar(divisor);
                }
            }
        }
    }

    /// Evaluate the expression against the snapshots.
    ///
    /// # Example
    ///
    /// ```
    /// use arena_core::expression::{
    ///     EffectExpression, EffectOperationType, ExpressionStatsSource,
    /// };
    /// use arena_core::fixed_point::FixedPoint;
    ///
    /// let expression = EffectExpression::operation(
    ///     EffectOperationType::Add,
    ///     vec![
    ///         EffectExpression::from_value(FixedPoint::from_int(10)),
    ///         EffectExpression::from_value(FixedPoint::from_int(5)),
    ///     ],
    /// );
    /// let stats = ExpressionStatsSource::new();
    /// assert_eq!(expression.evaluate(&stats), FixedPoint::from_int(15));
    /// ```
    #[must_use]
    pub fn evaluate(&self, stats_source: &ExpressionStatsSource) -> FixedPoint {
        let (operation_type, operands) = match self {
            Self::Leaf(value) => return value.evaluate(stats_source),
            Self::Operation {
                operation_type,
                operands,
            } => (*operation_type, operands),
        };

        // Multiply chains track whether a percentage-typed stat has already
        // paid its /100 normalization. A percentage operand on the right
        // consumes itself against the running value; a percentage FIRST
        // operand is consumed once against the next plain operand; if it is
        // never consumed the final value is normalized at the end.
        let mut is_first_value_a_percentage = false;
        let mut handled_first_value_percentage = false;
        let mut is_first_value_set = false;
        let mut final_value = FixedPoint::ZERO;

        for operand in operands {
            let operand_value = operand.evaluate(stats_source);

            if !is_first_value_set {
                if let Self::Leaf(leaf) = operand {
                    if leaf.is_stat_a_percentage_type() {
                        is_first_value_a_percentage = true;
                    }
                }
                final_value = operand_value;
                is_first_value_set = true;
                continue;
            }

            match operation_type {
                EffectOperationType::Add => final_value += operand_value,
                EffectOperationType::Subtract => final_value -= operand_value,
                EffectOperationType::Multiply => {
                    let operand_is_percentage_stat = match operand {
                        Self::Leaf(leaf) => leaf.is_stat_a_percentage_type(),
                        Self::Operation { .. } => false,
                    };
                    if operand_is_percentage_stat {
                        final_value = operand_value.as_percentage_of(final_value);
                    } else if is_first_value_a_percentage && !handled_first_value_percentage {
                        final_value = final_value.as_percentage_of(operand_value);
                        handled_first_value_percentage = true;
                    } else {
                        final_value *= operand_value;
                    }
                }
                EffectOperationType::Divide => final_value /= operand_value,
                EffectOperationType::IntegralDivision => {
                    final_value = (final_value / operand_value).floor();
                }
                EffectOperationType::PercentageOf => {
                    final_value = final_value.as_percentage_of(operand_value);
                }
                EffectOperationType::HighPrecisionPercentageOf => {
                    final_value = final_value.as_high_precision_percentage_of(operand_value);
                }
                EffectOperationType::Min => final_value = final_value.min(operand_value),
                EffectOperationType::Max => final_value = final_value.max(operand_value),
            }
        }

        // An all-percentage multiply chain never consumed the first
        // operand's normalization
        if operation_type == EffectOperationType::Multiply
            && is_first_value_a_percentage
            && !handled_first_value_percentage
        {
            final_value /= FixedPoint::MAX_PERCENTAGE;
        }

        final_value
    }
}
