//! Deterministic integer math for grid geometry.
//!
//! Angle and distance computations run on integers only: a scaled sine
//! table, a Newton integer square root, and a Q15 fixed-point arctangent.
//! Every function here must produce bit-identical results on every
//! platform, which is why none of them touch floating point.

use serde::{Deserialize, Serialize};

/// Scale factor for normalized/trigonometric values.
pub const PRECISION_FACTOR: i32 = 1000;

/// Number of sub-units per grid unit. Matches [`PRECISION_FACTOR`] so that
/// normalized vectors and sub-unit positions share a scale.
pub const SUB_UNITS_PER_UNIT: i32 = 1000;

/// `sqrt(3) * PRECISION_FACTOR`, used by the hex-to-world mapping.
pub const SQRT3_SCALED: i32 = 1732;

/// Full circle in radian turns (see [`atan2`]).
pub const MAX_RADIAN_TURNS: u16 = u16::MAX;

/// Radian turns per degree (1/360 of a turn).
pub const ONE_DEGREE_RADIAN_TURNS: u16 = MAX_RADIAN_TURNS / 360; // 182

/// Pre-calculated sine table for 0..=90 degrees, scaled by [`PRECISION_FACTOR`].
const SINE_TABLE: [i32; 91] = [
    0, 17, 34, 52, 69, 87, 104, 121, 139, 156, 173, 190, 207, 224, 241, 258, 275, 292, 309, 325,
    342, 358, 374, 390, 406, 422, 438, 453, 469, 484, 500, 515, 529, 544, 559, 573, 587, 601, 615,
    629, 642, 656, 669, 681, 694, 707, 719, 731, 743, 754, 766, 777, 788, 798, 809, 819, 829, 838,
    848, 857, 866, 874, 882, 891, 898, 906, 913, 920, 927, 933, 939, 945, 951, 956, 961, 965, 970,
    974, 978, 981, 984, 987, 990, 992, 994, 996, 997, 998, 999, 999, 1000,
];

/// Deterministic integer square root (Newton's method).
///
/// Not necessarily the exact floor square root for every input; what
/// matters is that the approximation is identical everywhere.
#[must_use]
pub const fn sqrt(n: i64) -> i64 {
    if n < 0 {
        // Cannot take a negative square root, treat as 0
        return 0;
    }

    let un = n as u64;
    let mut x0 = un >> 1;

    if x0 != 0 {
        let mut x1 = (x0 + un / x0) >> 1;
        while x1 < x0 {
            x0 = x1;
            x1 = (x0 + un / x0) >> 1;
        }
        return x0 as i64;
    }

    n
}

/// `25.percentage_of(1000) = 250` in plain integers.
#[must_use]
pub const fn percentage_of(percentage: i64, value: i64) -> i64 {
    percentage * value / 100
}

/// Divide while rounding up (away from zero toward positive infinity).
#[must_use]
pub const fn fractional_ceil(numerator: i32, denominator: i32) -> i32 {
    let extra = ((numerator < 0) != (denominator > 0)) && numerator % denominator != 0;
    numerator / denominator + extra as i32
}

/// Divide while rounding to the nearest integer.
#[must_use]
pub const fn fractional_round(numerator: i32, denominator: i32) -> i32 {
    if (numerator < 0) != (denominator < 0) {
        (numerator - denominator / 2) / denominator
    } else {
        (numerator + denominator / 2) / denominator
    }
}

/// Applies full turns until the angle falls within `[0, 360)`.
#[must_use]
pub const fn angle_limit_to_360(angle: i32) -> i32 {
    let mut new_angle = angle;
    while new_angle >= 360 {
        new_angle -= 360;
    }
    while new_angle < 0 {
        new_angle += 360;
    }
    new_angle
}

/// Difference between two angles in degrees, in the range `[-180, 180]`.
#[must_use]
pub const fn angle_difference_180(angle1: i32, angle2: i32) -> i32 {
    let mut difference = angle2 - angle1;
    while difference < -180 {
        difference += 360;
    }
    while difference > 180 {
        difference -= 360;
    }
    difference
}

/// `sin(angle) * PRECISION_FACTOR` for an angle in degrees.
#[must_use]
pub const fn sin_scaled(angle: i32) -> i32 {
    let index = angle_limit_to_360(angle);
    if index > 180 {
        return -sin_scaled(index - 180);
    }
    if index > 90 {
        return SINE_TABLE[(180 - index) as usize];
    }
    SINE_TABLE[index as usize]
}

/// `cos(angle) * PRECISION_FACTOR` for an angle in degrees.
#[must_use]
pub const fn cos_scaled(angle: i32) -> i32 {
    sin_scaled(90 - angle)
}

/// X coordinate of a point rotated counter-clockwise around the origin.
#[must_use]
pub const fn rotate_point_x(x: i32, y: i32, angle: i32) -> i32 {
    (cos_scaled(angle) * x - sin_scaled(angle) * y) / PRECISION_FACTOR
}

/// Y coordinate of a point rotated counter-clockwise around the origin.
#[must_use]
pub const fn rotate_point_y(x: i32, y: i32, angle: i32) -> i32 {
    (sin_scaled(angle) * x + cos_scaled(angle) * y) / PRECISION_FACTOR
}

/// Convert grid units to sub-units.
#[must_use]
pub const fn units_to_sub_units(units: i32) -> i32 {
    units * SUB_UNITS_PER_UNIT
}

/// Convert sub-units to grid units (truncating).
#[must_use]
pub const fn sub_units_to_units(sub_units: i32) -> i32 {
    sub_units / SUB_UNITS_PER_UNIT
}

// Q15 (1.0.15 fixed point) helpers for the arctangent below.

const fn s16_nabs(j: i16) -> i16 {
    if j < 0 {
        j
    } else {
        -j
    }
}

const fn q15_mul(j: i16, k: i16) -> i16 {
    let intermediate = j as i32 * k as i32;
    let rounding = if (intermediate & 0x7FFF) == 0x4000 {
        0
    } else {
        0x4000
    };
    ((intermediate + rounding) >> 15) as i16
}

const fn q15_div(numer: i16, denom: i16) -> i16 {
    (((numer as i32) << 15) / denom as i32) as i16
}

/// 16-bit fixed-point four-quadrant arctangent.
///
/// Returns the angle between the positive x axis and the ray to `(x, y)`
/// in units of 1/65536th of a turn, so `0x8000` is half a turn. The
/// magnitude of the inputs does not matter, only the ratio, which keeps
/// the approximation valid for any signed 16-bit vector.
#[must_use]
pub const fn atan2(y: i16, x: i16) -> u16 {
    const K1: i16 = 2847;
    const K2: i16 = 11039;

    if x == y {
        // y/x would be exactly 1, which Q15 cannot represent
        if y > 0 {
            return 8192; // 1/8 turn
        }
        if y < 0 {
            return 40960; // 5/8 turn
        }
        return 0;
    }

    let nabs_y = s16_nabs(y);
    let nabs_x = s16_nabs(x);
    if nabs_x < nabs_y {
        // octants 1, 4, 5, 8
        let y_over_x = q15_div(y, x);
        let correction = q15_mul(K1, s16_nabs(y_over_x));
        let unrotated = q15_mul(K2.wrapping_add(correction), y_over_x);
        if x > 0 {
            return unrotated as u16;
        }
        return 32768u16.wrapping_add(unrotated as u16);
    }

    // octants 2, 3, 6, 7
    let x_over_y = q15_div(x, y);
    let correction = q15_mul(K1, s16_nabs(x_over_y));
    let unrotated = q15_mul(K2.wrapping_add(correction), x_over_y);
    if y > 0 {
        return 16384u16.wrapping_sub(unrotated as u16);
    }
    49152u16.wrapping_sub(unrotated as u16)
}

/// Convert radian turns to degrees in the range `[0, 360)`.
#[must_use]
pub const fn radian_turns_to_degrees(radian_turns: u16) -> i32 {
    ((radian_turns / ONE_DEGREE_RADIAN_TURNS) % 360) as i32
}

/// Integer 2D vector in world space (sub-units).
///
/// Used wherever geometry leaves the axial hex system: beam frames,
/// rotated zone shapes, angle computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IVec2 {
    /// X coordinate in sub-units.
    pub x: i32,
    /// Y coordinate in sub-units.
    pub y: i32,
}

impl IVec2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Dot product.
    #[must_use]
    pub const fn dot(self, other: Self) -> i32 {
        self.x * other.x + self.y * other.y
    }

    /// Squared magnitude in 64 bits (safe for sub-unit scale inputs).
    #[must_use]
    pub const fn square_magnitude(self) -> i64 {
        self.x as i64 * self.x as i64 + self.y as i64 * self.y as i64
    }

    /// Magnitude via the deterministic integer square root.
    #[must_use]
    pub const fn length(self) -> i32 {
        sqrt(self.square_magnitude()) as i32
    }

    /// Whether this is the null vector.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// This vector with both coordinates scaled up to sub-units.
    #[must_use]
    pub const fn to_sub_units(self) -> Self {
        Self {
            x: self.x * SUB_UNITS_PER_UNIT,
            y: self.y * SUB_UNITS_PER_UNIT,
        }
    }

    /// Rotate counter-clockwise around the origin by integer degrees.
    #[must_use]
    pub const fn rotate(self, angle: i32) -> Self {
        Self {
            x: rotate_point_x(self.x, self.y, angle),
            y: rotate_point_y(self.x, self.y, angle),
        }
    }

    /// Angle from this position to `other`, counter-clockwise from the
    /// positive x axis, in degrees `[0, 360)`.
    #[must_use]
    pub fn angle_to_position(self, other: Self) -> i32 {
        let diff_x = other.x - self.x;
        let diff_y = other.y - self.y;
        radian_turns_to_degrees(atan2(diff_y as i16, diff_x as i16))
    }

    /// Vertices of an equilateral triangle with apex at this point, given
    /// the direction and length of the median through the apex.
    ///
    /// The half side length comes from `tan(30°) = BM / AM`.
    #[must_use]
    pub const fn triangle_vertices(self, direction_degrees: i32, median_length: i32) -> (Self, Self, Self) {
        let side_half_length = median_length * SQRT3_SCALED / (PRECISION_FACTOR * 3);

        let b = Self::new(median_length, -side_half_length).rotate(direction_degrees);
        let c = Self::new(median_length, side_half_length).rotate(direction_degrees);

        (
            self,
            Self::new(self.x + b.x, self.y + b.y),
            Self::new(self.x + c.x, self.y + c.y),
        )
    }

    /// Area of the triangle `(a, b, c)` from coordinates.
    #[must_use]
    pub const fn triangle_area(a: Self, b: Self, c: Self) -> i64 {
        let area = (a.x as i64 * (b.y - c.y) as i64
            + b.x as i64 * (c.y - a.y) as i64
            + c.x as i64 * (a.y - b.y) as i64)
            / 2;
        if area < 0 {
            -area
        } else {
            area
        }
    }
}

impl std::ops::Add for IVec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for IVec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<i32> for IVec2 {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Div<i32> for IVec2 {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_exact_squares() {
        assert_eq!(sqrt(0), 0);
        assert_eq!(sqrt(1), 1);
        assert_eq!(sqrt(4), 2);
        assert_eq!(sqrt(144), 12);
        assert_eq!(sqrt(1_000_000), 1000);
        assert_eq!(sqrt(-5), 0);
    }

    #[test]
    fn test_sqrt_rounds_down() {
        assert_eq!(sqrt(2), 1);
        assert_eq!(sqrt(99), 9);
    }

    #[test]
    fn test_sine_table_boundaries() {
        assert_eq!(sin_scaled(0), 0);
        assert_eq!(sin_scaled(30), 500);
        assert_eq!(sin_scaled(90), 1000);
        assert_eq!(sin_scaled(180), 0);
        assert_eq!(sin_scaled(270), -1000);
        assert_eq!(cos_scaled(0), 1000);
        assert_eq!(cos_scaled(60), 500);
        assert_eq!(cos_scaled(180), -1000);
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let v = IVec2::new(100, 0);
        let rotated = v.rotate(90);
        assert_eq!(rotated, IVec2::new(0, 100));
        let rotated = v.rotate(180);
        assert_eq!(rotated, IVec2::new(-100, 0));
    }

    #[test]
    fn test_atan2_cardinal_directions() {
        assert_eq!(radian_turns_to_degrees(atan2(0, 100)), 0);
        assert_eq!(radian_turns_to_degrees(atan2(100, 0)), 90);
        assert_eq!(radian_turns_to_degrees(atan2(0, -100)), 180);
        assert_eq!(radian_turns_to_degrees(atan2(-100, 0)), 270);
    }

    #[test]
    fn test_atan2_diagonals() {
        // x == y cases are special-cased because 1 is not representable in Q15
        assert_eq!(atan2(100, 100), 8192);
        assert_eq!(atan2(-100, -100), 40960);
        assert_eq!(atan2(0, 0), 0);
        assert_eq!(radian_turns_to_degrees(atan2(100, 100)), 45);
    }

    #[test]
    fn test_angle_helpers() {
        assert_eq!(angle_limit_to_360(720), 0);
        assert_eq!(angle_limit_to_360(-90), 270);
        assert_eq!(angle_difference_180(350, 10), 20);
        assert_eq!(angle_difference_180(10, 350), -20);
    }

    #[test]
    fn test_fractional_round() {
        assert_eq!(fractional_round(1499, 1000), 1);
        assert_eq!(fractional_round(1500, 1000), 2);
        assert_eq!(fractional_round(-1500, 1000), -2);
        assert_eq!(fractional_round(-1499, 1000), -1);
    }

    #[test]
    fn test_fractional_ceil() {
        assert_eq!(fractional_ceil(10, 3), 4);
        assert_eq!(fractional_ceil(9, 3), 3);
        assert_eq!(fractional_ceil(-10, 3), -3);
    }

    #[test]
    fn test_vector_length() {
        assert_eq!(IVec2::new(3, 4).length(), 5);
        assert_eq!(IVec2::new(-3, 4).length(), 5);
        assert_eq!(IVec2::ZERO.length(), 0);
    }

    #[test]
    fn test_angle_to_position() {
        let origin = IVec2::ZERO;
        assert_eq!(origin.angle_to_position(IVec2::new(100, 0)), 0);
        assert_eq!(origin.angle_to_position(IVec2::new(0, 100)), 90);
    }

    #[test]
    fn test_triangle_area() {
        let a = IVec2::new(0, 0);
        let b = IVec2::new(10, 0);
        let c = IVec2::new(0, 10);
        assert_eq!(IVec2::triangle_area(a, b, c), 50);
        // Winding order does not change the area
        assert_eq!(IVec2::triangle_area(c, b, a), 50);
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(25, 1000), 250);
        assert_eq!(percentage_of(50, 5), 2);
    }
}
