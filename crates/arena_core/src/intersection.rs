//! Shape intersection tests in world space.
//!
//! Zones and beams cover an area of the board; every activation scans
//! entities against that area. Hexagonal zones are tested directly in hex
//! space, rectangles in axial sub-units, triangles and beams in world space
//! with precomputed caches so a single activation only pays the rotation
//! setup once.

use crate::grid::GridConfig;
use crate::hex::HexGridPosition;
use crate::math::{self, IVec2};

/// Cached values for one triangle zone activation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriangleZoneIntersectionCache {
    triangle_a: IVec2,
    triangle_b: IVec2,
    triangle_c: IVec2,
    area_triangle_abc: i64,
}

/// Cached values for one beam activation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeamIntersectionCache {
    direction_degrees: i32,
    beam_center_rotated_sub_units: IVec2,
    world_length_sub_units_half: i32,
    world_width_sub_units_half: i32,
}

/// Does a hexagonal zone cover the entity position?
#[must_use]
pub const fn does_hex_zone_intersect_entity(
    zone_radius_units: i32,
    zone_position: HexGridPosition,
    other_entity_position: HexGridPosition,
) -> bool {
    let distance_vector =
        HexGridPosition::new(zone_position.q - other_entity_position.q, zone_position.r - other_entity_position.r);
    distance_vector.length() <= zone_radius_units
}

/// Does a rectangle zone (axis-aligned in axial sub-units, source at the
/// center) cover the entity position?
#[must_use]
pub const fn does_rectangle_zone_intersect_entity(
    zone_position_sub_units: HexGridPosition,
    other_entity_position_sub_units: HexGridPosition,
    zone_width_sub_units: i32,
    zone_height_sub_units: i32,
) -> bool {
    let distance_q = (other_entity_position_sub_units.q - zone_position_sub_units.q).abs();
    let distance_r = (other_entity_position_sub_units.r - zone_position_sub_units.r).abs();

    // Source in center, so check against half values
    distance_q <= zone_width_sub_units / 2 && distance_r <= zone_height_sub_units / 2
}

impl TriangleZoneIntersectionCache {
    /// Precompute the triangle vertices and area for a triangle zone with
    /// its apex at `zone_position_units`, pointing along `direction_degrees`.
    #[must_use]
    pub fn new(
        grid: GridConfig,
        zone_position_units: HexGridPosition,
        direction_degrees: i32,
        radius_units: i32,
    ) -> Self {
        let world_source_sub_units = grid
            .to_world_position(zone_position_units)
            .to_sub_units();
        let world_radius = grid.to_world_scalar(math::units_to_sub_units(radius_units));

        let (triangle_a, triangle_b, triangle_c) =
            world_source_sub_units.triangle_vertices(direction_degrees, world_radius);

        Self {
            triangle_a,
            triangle_b,
            triangle_c,
            area_triangle_abc: IVec2::triangle_area(triangle_a, triangle_b, triangle_c),
        }
    }

    /// Does the triangle cover the entity position?
    ///
    /// Point-in-triangle by the area method: P is inside ABC exactly when
    /// the areas of PBC, PAC and PAB sum to the area of ABC.
    #[must_use]
    pub fn intersects_entity(&self, grid: GridConfig, other_entity_position_units: HexGridPosition) -> bool {
        let point = grid
            .to_world_position(other_entity_position_units)
            .to_sub_units();

        let area_pbc = IVec2::triangle_area(point, self.triangle_b, self.triangle_c);
        let area_pac = IVec2::triangle_area(self.triangle_a, point, self.triangle_c);
        let area_pab = IVec2::triangle_area(self.triangle_a, self.triangle_b, point);

        self.area_triangle_abc == area_pbc + area_pac + area_pab
    }
}

/// Does a triangle zone cover the entity position? One-shot variant of
/// [`TriangleZoneIntersectionCache`].
#[must_use]
pub fn does_triangle_zone_intersect_entity(
    grid: GridConfig,
    zone_position_units: HexGridPosition,
    direction_degrees: i32,
    radius_units: i32,
    other_entity_position_units: HexGridPosition,
) -> bool {
    let cache =
        TriangleZoneIntersectionCache::new(grid, zone_position_units, direction_degrees, radius_units);
    cache.intersects_entity(grid, other_entity_position_units)
}

impl BeamIntersectionCache {
    /// Precompute the rotated beam frame.
    ///
    /// All values are in world space because the direction angle only
    /// exists there. The beam is modelled as a rectangle starting at the
    /// beam position, rotated into an axis-aligned frame.
    #[must_use]
    pub fn new(
        grid: GridConfig,
        beam_position_units: HexGridPosition,
        direction_degrees: i32,
        width_sub_units: i32,
        world_length_sub_units: i32,
    ) -> Self {
        let world_length_sub_units_half = world_length_sub_units / 2;
        let world_width_sub_units = grid.to_world_scalar(width_sub_units);
        let world_width_sub_units_half = world_width_sub_units / 2;

        let position_rotated_sub_units = grid
            .to_world_position(beam_position_units)
            .rotate(-direction_degrees)
            .to_sub_units();
        let beam_center_rotated_sub_units =
            position_rotated_sub_units + IVec2::new(world_length_sub_units_half, 0);

        Self {
            direction_degrees,
            beam_center_rotated_sub_units,
            world_length_sub_units_half,
            world_width_sub_units_half,
        }
    }

    /// Does the beam hit an entity of the given radius at the given position?
    #[must_use]
    pub fn intersects_entity(
        &self,
        grid: GridConfig,
        other_entity_position_units: HexGridPosition,
        other_entity_radius_units: i32,
    ) -> bool {
        // Rotate the point into the axis-aligned beam frame
        let other_position_rotated_sub_units = grid
            .to_world_position(other_entity_position_units)
            .rotate(-self.direction_degrees)
            .to_sub_units();
        let distance_rotated_sub_units =
            other_position_rotated_sub_units - self.beam_center_rotated_sub_units;

        // Consider the size of the entity
        let distance_from_center_sub_units = math::units_to_sub_units(other_entity_radius_units);

        let distance_x = distance_rotated_sub_units.x.abs() - distance_from_center_sub_units;
        let distance_y = distance_rotated_sub_units.y.abs() - distance_from_center_sub_units;

        distance_x <= self.world_length_sub_units_half && distance_y <= self.world_width_sub_units_half
    }
}

/// Does a beam hit the entity? One-shot variant of [`BeamIntersectionCache`].
#[must_use]
pub fn does_beam_intersect_entity(
    grid: GridConfig,
    beam_position_units: HexGridPosition,
    direction_degrees: i32,
    width_sub_units: i32,
    world_length_sub_units: i32,
    other_entity_position_units: HexGridPosition,
    other_entity_radius_units: i32,
) -> bool {
    let cache = BeamIntersectionCache::new(
        grid,
        beam_position_units,
        direction_degrees,
        width_sub_units,
        world_length_sub_units,
    );
    cache.intersects_entity(grid, other_entity_position_units, other_entity_radius_units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridConfig {
        GridConfig::default()
    }

    #[test]
    fn test_hex_zone_intersection_is_distance_check() {
        let zone = HexGridPosition::new(0, 0);
        assert!(does_hex_zone_intersect_entity(3, zone, HexGridPosition::new(3, 0)));
        assert!(does_hex_zone_intersect_entity(3, zone, HexGridPosition::new(0, -3)));
        assert!(!does_hex_zone_intersect_entity(3, zone, HexGridPosition::new(4, 0)));
    }

    #[test]
    fn test_rectangle_zone_intersection() {
        let zone = HexGridPosition::new(0, 0).to_sub_units();
        let inside = HexGridPosition::new(1, 1).to_sub_units();
        let outside = HexGridPosition::new(3, 0).to_sub_units();

        assert!(does_rectangle_zone_intersect_entity(zone, inside, 4000, 4000));
        assert!(!does_rectangle_zone_intersect_entity(zone, outside, 4000, 4000));
    }

    #[test]
    fn test_triangle_zone_contains_apex() {
        let apex = HexGridPosition::new(0, 0);
        assert!(does_triangle_zone_intersect_entity(grid(), apex, 0, 10, apex));
    }

    #[test]
    fn test_triangle_zone_points_along_direction() {
        let apex = HexGridPosition::new(0, 0);
        // Along the +q axis for direction 0, away from it otherwise
        assert!(does_triangle_zone_intersect_entity(grid(), apex, 0, 20, HexGridPosition::new(4, 0)));
        assert!(!does_triangle_zone_intersect_entity(
            grid(),
            apex,
            0,
            20,
            HexGridPosition::new(-4, 0)
        ));
    }

    #[test]
    fn test_beam_hits_entity_on_its_line() {
        let beam_position = HexGridPosition::new(0, 0);
        let width_sub_units = 2000;
        let length = grid().to_world_scalar(math::units_to_sub_units(10));

        // Entity straight ahead along the beam direction
        assert!(does_beam_intersect_entity(
            grid(),
            beam_position,
            0,
            width_sub_units,
            length,
            HexGridPosition::new(5, 0),
            1
        ));

        // Entity behind the beam start
        assert!(!does_beam_intersect_entity(
            grid(),
            beam_position,
            0,
            width_sub_units,
            length,
            HexGridPosition::new(-5, 0),
            1
        ));
    }

    #[test]
    fn test_beam_misses_entity_far_to_the_side() {
        let beam_position = HexGridPosition::new(0, 0);
        let width_sub_units = 1000;
        let length = grid().to_world_scalar(math::units_to_sub_units(10));

        // r steps move diagonally in world space, far enough to clear a
        // narrow beam
        assert!(!does_beam_intersect_entity(
            grid(),
            beam_position,
            0,
            width_sub_units,
            length,
            HexGridPosition::new(0, 8),
            0
        ));
    }
}
