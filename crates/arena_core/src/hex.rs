//! Axial hex-grid positions.
//!
//! Positions use the axial `(q, r)` system with pointy-topped hexes; the
//! third cube coordinate is derived as `s = -q - r`. The same struct is
//! reused at two scales: whole grid units and sub-units (1 unit = 1000
//! sub-units), with explicit conversions between the two.
//!
//! References: <https://www.redblobgames.com/grids/hexagons/>

use serde::{Deserialize, Serialize};

use crate::math::{self, PRECISION_FACTOR, SUB_UNITS_PER_UNIT};

/// A position on the hex grid (axial coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HexGridPosition {
    /// Axial q coordinate (column-ish).
    pub q: i32,
    /// Axial r coordinate (row).
    pub r: i32,
}

/// Reserved invalid position value.
pub const INVALID_POSITION: i32 = i32::MIN;

/// The invalid hex grid position sentinel.
pub const INVALID_HEX_POSITION: HexGridPosition = HexGridPosition {
    q: INVALID_POSITION,
    r: INVALID_POSITION,
};

/// Axial offsets between grid neighbours, counterclockwise from the right.
pub const NEIGHBOUR_OFFSETS: [HexGridPosition; 6] = [
    HexGridPosition { q: 1, r: 0 },
    HexGridPosition { q: 1, r: -1 },
    HexGridPosition { q: 0, r: -1 },
    HexGridPosition { q: -1, r: 0 },
    HexGridPosition { q: -1, r: 1 },
    HexGridPosition { q: 0, r: 1 },
];

impl HexGridPosition {
    /// Create a new axial position.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The derived cube `s` coordinate.
    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Hex distance from the origin: `(|q| + |r| + |s|) / 2`.
    #[must_use]
    pub const fn length(self) -> i32 {
        (self.q.abs() + self.r.abs() + self.s().abs()) / 2
    }

    /// Whether this is the null vector. `q = 0, r = 0` is still a valid
    /// position (the center of the grid).
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.q == 0 && self.r == 0
    }

    /// Reflect through the origin.
    #[must_use]
    pub const fn reflect(self) -> Self {
        Self::new(-self.q, -self.r)
    }

    /// This unit position as an absolute sub-unit position.
    #[must_use]
    pub const fn to_sub_units(self) -> Self {
        Self::new(self.q * SUB_UNITS_PER_UNIT, self.r * SUB_UNITS_PER_UNIT)
    }

    /// This absolute sub-unit position truncated to grid units.
    #[must_use]
    pub const fn to_units(self) -> Self {
        Self::new(self.q / SUB_UNITS_PER_UNIT, self.r / SUB_UNITS_PER_UNIT)
    }

    /// The remainder of the sub-unit → unit conversion.
    #[must_use]
    pub const fn to_sub_units_remainder(self) -> Self {
        Self::new(self.q % SUB_UNITS_PER_UNIT, self.r % SUB_UNITS_PER_UNIT)
    }

    /// Normalize and scale by [`PRECISION_FACTOR`].
    #[must_use]
    pub const fn to_normalized_and_scaled(self) -> Self {
        let length = self.length();
        if length == 0 {
            return Self::new(0, 0);
        }
        Self::new(
            self.q * PRECISION_FACTOR / length,
            self.r * PRECISION_FACTOR / length,
        )
    }

    /// Convert axial to offset coordinates in odd-r form.
    ///
    /// Returns `(col, row)`.
    #[must_use]
    pub const fn to_offset_odd_r(self) -> (i32, i32) {
        let col = self.q + (self.r - (self.r & 1)) / 2;
        let row = self.r;
        (col, row)
    }

    /// Convert offset coordinates in odd-r form to axial.
    #[must_use]
    pub const fn from_offset_odd_r(col: i32, row: i32) -> Self {
        let q = col - (row - (row & 1)) / 2;
        Self::new(q, row)
    }

    /// Round a scaled (sub-unit) position to the nearest hex.
    ///
    /// Returns `(units, sub_units_remainder)`.
    #[must_use]
    pub const fn round(scaled_position: Self) -> (Self, Self) {
        Self::round_extended(scaled_position, false)
    }

    /// Cube rounding with a configurable inclusive comparison.
    ///
    /// Rounds each cube coordinate and then fixes up the one with the
    /// largest rounding error so `q + r + s == 0` holds again.
    #[must_use]
    pub const fn round_extended(scaled_position: Self, round_inclusive: bool) -> (Self, Self) {
        let scaled_q = scaled_position.q;
        let scaled_r = scaled_position.r;
        let scaled_s = scaled_position.s();

        let mut q = math::fractional_round(scaled_q, PRECISION_FACTOR);
        let mut r = math::fractional_round(scaled_r, PRECISION_FACTOR);
        let s = math::fractional_round(scaled_s, PRECISION_FACTOR);

        let q_diff = q * PRECISION_FACTOR - scaled_q;
        let r_diff = r * PRECISION_FACTOR - scaled_r;
        let s_diff = s * PRECISION_FACTOR - scaled_s;

        let q_diff_abs = q_diff.abs();
        let r_diff_abs = r_diff.abs();
        let s_diff_abs = s_diff.abs();

        if round_inclusive {
            if q_diff_abs >= r_diff_abs && q_diff_abs >= s_diff_abs {
                q = -r - s;
            } else if r_diff_abs >= s_diff_abs {
                r = -q - s;
            }
        } else {
            if q_diff_abs > r_diff_abs && q_diff_abs > s_diff_abs {
                q = -r - s;
            } else if r_diff_abs > s_diff_abs {
                r = -q - s;
            }
        }

        (Self::new(q, r), Self::new(-q_diff, -r_diff))
    }

    // Minimum/maximum q, r for rectangle and hexagon map shapes.
    // References:
    // - https://www.redblobgames.com/grids/hexagons/implementation.html#shape-rectangle
    // - https://www.redblobgames.com/grids/hexagons/implementation.html#shape-hexagon

    /// Minimum r for a rectangle bounded by `top`.
    #[must_use]
    pub const fn rectangle_r_limit_min(top: i32) -> i32 {
        top
    }

    /// Maximum r for a rectangle bounded by `bottom`.
    #[must_use]
    pub const fn rectangle_r_limit_max(bottom: i32) -> i32 {
        bottom
    }

    /// Minimum q for a rectangle row `r` bounded by `left`.
    #[must_use]
    pub const fn rectangle_q_limit_min(left: i32, r: i32) -> i32 {
        left - (r >> 1)
    }

    /// Maximum q for a rectangle row `r` bounded by `right`.
    #[must_use]
    pub const fn rectangle_q_limit_max(right: i32, r: i32) -> i32 {
        right - (r >> 1)
    }

    /// q range covered by a hexagon of the given radius.
    #[must_use]
    pub const fn hexagon_q_limits(radius: i32) -> (i32, i32) {
        (-radius, radius)
    }

    /// r range covered by column `q` of a hexagon of the given radius.
    #[must_use]
    pub const fn hexagon_r_limits(radius: i32, q: i32) -> (i32, i32) {
        let min = if -radius > -q - radius { -radius } else { -q - radius };
        let max = if radius < -q + radius { radius } else { -q + radius };
        (min, max)
    }
}

impl std::ops::Add for HexGridPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl std::ops::AddAssign for HexGridPosition {
    fn add_assign(&mut self, rhs: Self) {
        self.q += rhs.q;
        self.r += rhs.r;
    }
}

impl std::ops::Sub for HexGridPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl std::ops::SubAssign for HexGridPosition {
    fn sub_assign(&mut self, rhs: Self) {
        self.q -= rhs.q;
        self.r -= rhs.r;
    }
}

impl std::ops::Mul<i32> for HexGridPosition {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self::new(self.q * rhs, self.r * rhs)
    }
}

impl std::ops::Div<i32> for HexGridPosition {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self::new(self.q / rhs, self.r / rhs)
    }
}

impl std::fmt::Display for HexGridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}
