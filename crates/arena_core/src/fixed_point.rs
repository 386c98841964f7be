//! Fixed-point arithmetic for deterministic simulation.
//!
//! All gameplay math uses a decimal scaled-integer type to ensure
//! deterministic behavior across platforms. Floating-point operations
//! can produce different results on different CPUs, so they are banned
//! from everything that affects battle outcomes.
//!
//! Stat precision is three decimal digits: `FixedPoint::from_int(42)` is
//! stored internally as `42000`. Percentages are plain numbers on the same
//! scale (`25%` is `from_int(25)`), which is why the percentage helpers
//! divide by 100 rather than converting to a ratio.

use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Number of decimal digits reserved for the fractional part.
pub const PRECISION_DIGITS: u32 = 3;

/// Multiplier applied to an integer to obtain its internal representation.
pub const PRECISION: i64 = 10_i64.pow(PRECISION_DIGITS);

/// Decimal fixed-point number used for every stat and expression result.
///
/// There are no implicit conversions from or to built-in integers; all
/// construction goes through [`FixedPoint::from_int`], [`FixedPoint::from_milli`]
/// or [`FixedPoint::try_parse`] so that scaling boundaries stay visible.
///
/// # Example
///
/// ```
/// use arena_core::fixed_point::FixedPoint;
///
/// let ten = FixedPoint::from_int(10);
/// let health = FixedPoint::from_int(105);
/// // 10% of 105 = 10.5
/// assert_eq!(ten.as_percentage_of(health), FixedPoint::from_milli(10_500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedPoint(i64);

impl FixedPoint {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One.
    pub const ONE: Self = Self(PRECISION);

    /// The maximum percentage value (100%).
    pub const MAX_PERCENTAGE: Self = Self(100 * PRECISION);

    /// Create a fixed-point value from a plain integer.
    #[must_use]
    pub const fn from_int(value: i64) -> Self {
        Self(value * PRECISION)
    }

    /// Create a fixed-point value from raw thousandths.
    ///
    /// `from_milli(10_500)` is `10.5`.
    #[must_use]
    pub const fn from_milli(value: i64) -> Self {
        Self(value)
    }

    /// The raw scaled representation (thousandths).
    #[must_use]
    pub const fn to_milli(self) -> i64 {
        self.0
    }

    /// Convert to a plain integer, dropping the fractional part.
    #[must_use]
    pub const fn to_int(self) -> i64 {
        self.0 / PRECISION
    }

    /// Round down to the nearest whole value, toward negative infinity.
    #[must_use]
    pub const fn floor(self) -> Self {
        Self(self.0.div_euclid(PRECISION) * PRECISION)
    }

    /// The fractional part as a non-negative number of thousandths.
    #[must_use]
    pub const fn fractional_part(self) -> i64 {
        let v = self.0 % PRECISION;
        if v < 0 {
            -v
        } else {
            v
        }
    }

    /// Absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        if self.0 < 0 {
            Self(-self.0)
        } else {
            Self(self.0)
        }
    }

    /// Whether the value is strictly negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// The smaller of two values.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// The larger of two values.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Treat `self` as a percentage and apply it to `arg`.
    ///
    /// `25.as_percentage_of(1000)` is `250`. The multiplication happens in
    /// fixed-point before the division by 100, so fractional results such
    /// as `10.as_percentage_of(105) == 10.5` are exact.
    #[must_use]
    pub fn as_percentage_of(self, arg: Self) -> Self {
        (self * arg) / Self::from_int(100)
    }

    /// High-precision percentage variant where `0.01%` is `1`.
    ///
    /// `625.as_high_precision_percentage_of(x)` is `6.25%` of `x`.
    #[must_use]
    pub fn as_high_precision_percentage_of(self, arg: Self) -> Self {
        (self * arg) / Self::from_int(10_000)
    }

    /// The proportional percentage of `self` relative to `max_value`.
    ///
    /// Returns [`Self::MAX_PERCENTAGE`] when the two are equal, zero when
    /// `max_value` is zero.
    #[must_use]
    pub fn as_proportional_percentage_of(self, max_value: Self) -> Self {
        if max_value.0 == 0 {
            return Self::ZERO;
        }
        Self(self.0 * 100 / max_value.0)
    }

    /// Parse a decimal literal such as `"123.456"`.
    ///
    /// Accepts at most one dot and at most [`PRECISION_DIGITS`] fractional
    /// digits. Returns `None` for anything else.
    #[must_use]
    pub fn try_parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }

        let (integral_text, fractional_text) = match text.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (text, None),
        };

        let mut integral: i64 = 0;
        for c in integral_text.chars() {
            let digit = c.to_digit(10)? as i64;
            integral = integral * 10 + digit;
        }

        let mut fractional: i64 = 0;
        if let Some(f) = fractional_text {
            // A second dot shows up here as a non-digit
            let mut m = PRECISION;
            for c in f.chars() {
                let digit = c.to_digit(10)? as i64;
                fractional = fractional * 10 + digit;
                m /= 10;
                if m <= 0 {
                    // More fractional digits than the type can hold
                    return None;
                }
            }
            fractional *= m;
        }

        Some(Self(integral * PRECISION + fractional))
    }
}

impl Add for FixedPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for FixedPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for FixedPoint {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul for FixedPoint {
    type Output = Self;

    /// Internal values carry one scale factor each, so the product of the
    /// raw representations is one factor too large and is divided back down.
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0 / PRECISION)
    }
}

impl MulAssign for FixedPoint {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Div for FixedPoint {
    type Output = Self;

    /// Scales the dividend up before the integer division (the mirror of
    /// [`Mul`]). Division by zero yields zero; expression denominators are
    /// frequently derived from stats that may legitimately be absent.
    fn div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            return Self::ZERO;
        }
        Self(self.0 * PRECISION / rhs.0)
    }
}

impl DivAssign for FixedPoint {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Neg for FixedPoint {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<i64> for FixedPoint {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for FixedPoint {
    type Output = Self;

    fn div(self, rhs: i64) -> Self {
        if rhs == 0 {
            return Self::ZERO;
        }
        Self(self.0 / rhs)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 && self.to_int() == 0 {
            // Sign would be lost by the truncated integer part
            write!(f, "-0")?;
        } else {
            write!(f, "{}", self.to_int())?;
        }

        let fractional = self.fractional_part();
        if fractional != 0 {
            write!(f, ".{fractional:03}")?;
        }
        Ok(())
    }
}
