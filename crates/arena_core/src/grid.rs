//! Hex grid configuration, world-space mapping and open-position searches.
//!
//! The battle board is a rectangle of hexes addressed in axial coordinates.
//! [`GridConfig`] holds the board dimensions and answers geometry queries;
//! [`ObstacleMap`] is a flat bitmap over the board used by spawn placement
//! and chain-bounce targeting. All searches are fully deterministic: ties
//! are broken by grid index so the same inputs always pick the same hex.

use serde::{Deserialize, Serialize};

use crate::hex::{HexGridPosition, INVALID_HEX_POSITION, NEIGHBOUR_OFFSETS};
use crate::math::{IVec2, PRECISION_FACTOR, SQRT3_SCALED};

/// Default board width in hexes.
pub const DEFAULT_GRID_WIDTH: i32 = 151;

/// Default board height in hexes.
pub const DEFAULT_GRID_HEIGHT: i32 = 151;

/// Default scale between axial space and world space.
pub const DEFAULT_GRID_SCALE: i32 = 10;

/// Obstacle bitmap flags.
pub mod obstacle {
    /// Cell blocked by another entity.
    pub const ENTITY: u8 = 0b0000_0001;
    /// Cell blocked because it is too close to the board border.
    pub const BORDER: u8 = 0b0000_0010;
    /// Cell blocked because it is on the enemy side of the board.
    pub const ENEMY_SIDE: u8 = 0b0000_0100;
    /// Matches any obstacle kind.
    pub const ANY_MASK: u8 = 0b1111_1111;
    /// No obstacle.
    pub const NONE: u8 = 0;
}

/// Hex grid configuration with cached board extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    width: i32,
    height: i32,
    scale: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_SCALE)
    }
}

impl GridConfig {
    /// Create a config for a `width` x `height` board.
    #[must_use]
    pub const fn new(width: i32, height: i32, scale: i32) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    /// Board width in hexes (the q-ish axis).
    #[must_use]
    pub const fn width(self) -> i32 {
        self.width
    }

    /// Board height in hexes (the r axis).
    #[must_use]
    pub const fn height(self) -> i32 {
        self.height
    }

    /// Scale between axial space and world space.
    #[must_use]
    pub const fn scale(self) -> i32 {
        self.scale
    }

    /// How far the board extends from the center column.
    #[must_use]
    pub const fn rectangle_width_extent(self) -> i32 {
        (self.width - 1) / 2
    }

    /// How far the board extends from the center row.
    #[must_use]
    pub const fn rectangle_height_extent(self) -> i32 {
        (self.height - 1) / 2
    }

    /// Total number of cells on the board.
    #[must_use]
    pub const fn grid_size(self) -> usize {
        (self.width * self.height) as usize
    }

    /// Minimum r on the board.
    #[must_use]
    pub const fn r_limit_min(self) -> i32 {
        HexGridPosition::rectangle_r_limit_min(-self.rectangle_height_extent())
    }

    /// Maximum r on the board.
    #[must_use]
    pub const fn r_limit_max(self) -> i32 {
        HexGridPosition::rectangle_r_limit_max(self.rectangle_height_extent())
    }

    /// Minimum q for row `r`.
    #[must_use]
    pub const fn q_limit_min(self, r: i32) -> i32 {
        HexGridPosition::rectangle_q_limit_min(-self.rectangle_width_extent(), r)
    }

    /// Maximum q for row `r`.
    #[must_use]
    pub const fn q_limit_max(self, r: i32) -> i32 {
        HexGridPosition::rectangle_q_limit_max(self.rectangle_width_extent(), r)
    }

    /// The position with the lowest possible q, r.
    #[must_use]
    pub const fn min_position(self) -> HexGridPosition {
        HexGridPosition::new(self.q_limit_min(self.r_limit_min()), self.r_limit_min())
    }

    /// The position with the highest possible q, r.
    #[must_use]
    pub const fn max_position(self) -> HexGridPosition {
        HexGridPosition::new(self.q_limit_max(self.r_limit_max()), self.r_limit_max())
    }

    /// Maximum hex distance possible on the board.
    #[must_use]
    pub const fn max_distance_units(self) -> i32 {
        let min = self.min_position();
        let max = self.max_position();
        HexGridPosition::new(max.q - min.q, max.r - min.r).length()
    }

    /// The four corner positions of the board.
    #[must_use]
    pub const fn corner_positions(self) -> [HexGridPosition; 4] {
        [
            self.min_position(),
            HexGridPosition::new(self.q_limit_max(self.r_limit_min()), self.r_limit_min()),
            self.max_position(),
            HexGridPosition::new(self.q_limit_min(self.r_limit_max()), self.r_limit_max()),
        ]
    }

    /// Farthest distance from `position` to any hex on the board.
    ///
    /// This amounts to the maximum distance to one of the four corners.
    #[must_use]
    pub fn distance_to_farthest_hex(self, position: HexGridPosition) -> i32 {
        self.corner_positions()
            .into_iter()
            .map(|corner| (position - corner).length())
            .max()
            .unwrap_or(0)
    }

    /// Whether the position is inside the board rectangle, with optional
    /// margins shrinking the valid area.
    #[must_use]
    pub const fn is_in_map_rectangle_limits(
        self,
        position: HexGridPosition,
        q_margin: i32,
        r_margin: i32,
    ) -> bool {
        let r = position.r;
        let q = position.q;

        r >= self.r_limit_min() + r_margin
            && r <= self.r_limit_max() - r_margin
            && q >= self.q_limit_min(r) + q_margin
            && q <= self.q_limit_max(r) - q_margin
    }

    /// Whether a hexagon of `radius_units` around `center` fits entirely in
    /// the board rectangle. Checks the center and the six edge positions.
    #[must_use]
    pub fn is_hexagon_in_grid_limits(
        self,
        center: HexGridPosition,
        radius_units: i32,
        q_margin: i32,
        r_margin: i32,
    ) -> bool {
        if !self.is_in_map_rectangle_limits(center, q_margin, r_margin) {
            return false;
        }

        if radius_units != 0 {
            for offset in NEIGHBOUR_OFFSETS {
                let edge_position = center + offset * radius_units;
                if !self.is_in_map_rectangle_limits(edge_position, q_margin, r_margin) {
                    return false;
                }
            }
        }

        true
    }

    /// Flat index of `position` into the obstacle bitmap.
    ///
    /// Returns `None` when the position is off the board.
    #[must_use]
    pub fn grid_index(self, position: HexGridPosition) -> Option<usize> {
        if !self.is_in_map_rectangle_limits(position, 0, 0) {
            return None;
        }
        Some(self.grid_index_unchecked(position))
    }

    /// Flat index of a position proven to be on the board.
    #[must_use]
    pub const fn grid_index_unchecked(self, position: HexGridPosition) -> usize {
        let (col, row) = position.to_offset_odd_r();

        // Shift by the extents so the index is always positive
        let column = col + self.rectangle_width_extent();
        let row = row + self.rectangle_height_extent();

        (row * self.width + column) as usize
    }

    /// Axial coordinates of a flat grid index.
    #[must_use]
    pub fn coordinates(self, index: usize) -> HexGridPosition {
        if index >= self.grid_size() {
            return INVALID_HEX_POSITION;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let index = index as i32;
        let row = index / self.width;
        let column = index % self.width;

        HexGridPosition::from_offset_odd_r(
            column - self.rectangle_width_extent(),
            row - self.rectangle_height_extent(),
        )
    }

    /// Maps an axial position to world space at the configured scale.
    #[must_use]
    pub const fn to_world_position(self, position: HexGridPosition) -> IVec2 {
        let scaled = to_scaled_2d(position);
        IVec2::new(
            scaled.x * self.scale / PRECISION_FACTOR,
            scaled.y * self.scale / PRECISION_FACTOR,
        )
    }

    /// Maps a scalar from axial space to world space.
    ///
    /// Same as `to_world_position((value, 0)).x`.
    #[must_use]
    pub const fn to_world_scalar(self, value: i32) -> i32 {
        (self.scale * (SQRT3_SCALED * value)) / PRECISION_FACTOR
    }

    /// Angle in `[0, 360)` degrees from `src` to `dst`, going counterclockwise
    /// from where x > 0 and y = 0. Computed in world space.
    #[must_use]
    pub fn angle_360_between(self, src: HexGridPosition, dst: HexGridPosition) -> i32 {
        let world_src = self.to_world_position(src);
        let world_dst = self.to_world_position(dst);
        world_src.angle_to_position(world_dst)
    }

    /// Positions of the ring at `radius` around `center`, filtered to the
    /// board rectangle. Order is deterministic: counterclockwise starting
    /// from the bottom-left corner of the ring.
    pub fn single_ring_positions(
        self,
        center: HexGridPosition,
        radius: i32,
        out_results: &mut Vec<HexGridPosition>,
    ) {
        // Reference: https://www.redblobgames.com/grids/hexagons/#rings
        out_results.reserve(NEIGHBOUR_OFFSETS.len() * radius.max(0) as usize);
        let mut hex = center + NEIGHBOUR_OFFSETS[4] * radius;
        for offset in NEIGHBOUR_OFFSETS {
            for _ in 0..radius {
                if self.is_in_map_rectangle_limits(hex, 0, 0) {
                    out_results.push(hex);
                }
                hex += offset;
            }
        }
    }

    /// All positions within `radius` of `center` (center first, then rings of
    /// increasing radius).
    #[must_use]
    pub fn spiral_rings_positions(self, center: HexGridPosition, radius: i32) -> Vec<HexGridPosition> {
        let mut results = vec![center];
        for k in 1..=radius {
            self.single_ring_positions(center, k, &mut results);
        }
        results
    }
}

/// Do two hexagons, each defined by a center and radius, intersect?
///
/// Hexagons behave like circles in hex space so this is a circle-circle test.
#[must_use]
pub const fn do_hexagons_intersect(
    center_a: HexGridPosition,
    radius_a: i32,
    center_b: HexGridPosition,
    radius_b: i32,
) -> bool {
    let distance_between_centers = HexGridPosition::new(center_a.q - center_b.q, center_a.r - center_b.r).length();
    distance_between_centers <= radius_a + radius_b
}

/// Does this hexagon overlap the line between the two team sides?
#[must_use]
pub const fn does_hexagon_overlap_middle_line(
    center: HexGridPosition,
    radius_units: i32,
    middle_line_width: i32,
) -> bool {
    center.r.abs() - radius_units <= middle_line_width
}

/// All grid positions intersecting both hexagons.
///
/// Reference: <https://www.redblobgames.com/grids/hexagons/#range-intersection>
#[must_use]
pub fn hexagons_intersect_positions(
    center_a: HexGridPosition,
    radius_a: i32,
    center_b: HexGridPosition,
    radius_b: i32,
) -> Vec<HexGridPosition> {
    let mut results = Vec::new();

    let q_min = (center_a.q - radius_a).max(center_b.q - radius_b);
    let r_min = (center_a.r - radius_a).max(center_b.r - radius_b);
    let s_min = (center_a.s() - radius_a).max(center_b.s() - radius_b);

    let q_max = (center_a.q + radius_a).min(center_b.q + radius_b);
    let r_max = (center_a.r + radius_a).min(center_b.r + radius_b);
    let s_max = (center_a.s() + radius_a).min(center_b.s() + radius_b);

    for q in q_min..=q_max {
        let r_loop_min = r_min.max(-q - s_max);
        let r_loop_max = r_max.min(-q - s_min);
        for r in r_loop_min..=r_loop_max {
            results.push(HexGridPosition::new(q, r));
        }
    }

    results
}

/// Maps an axial position to scaled 2D space (before world scaling).
///
/// Relationship between XY and QR is represented by the matrix
/// `[sqrt(3), 0, sqrt(3)/2, 3/2]` derived from the hex basis vectors.
/// Reference: <https://www.redblobgames.com/grids/hexagons/#hex-to-pixel-axial>
#[must_use]
pub const fn to_scaled_2d(position: HexGridPosition) -> IVec2 {
    let x = SQRT3_SCALED * position.q + (SQRT3_SCALED * position.r) / 2;
    let y = (3 * PRECISION_FACTOR * position.r) / 2;
    IVec2::new(x, y)
}

/// Sub-units vector from `src` to `dst`.
#[must_use]
pub const fn sub_units_vector_between(src: HexGridPosition, dst: HexGridPosition) -> HexGridPosition {
    let src_sub_units = src.to_sub_units();
    let dst_sub_units = dst.to_sub_units();
    HexGridPosition::new(dst_sub_units.q - src_sub_units.q, dst_sub_units.r - src_sub_units.r)
}

/// Shift whole units accumulated in `sub_units` over into `units`.
pub fn apply_excessive_sub_units_to_units(units: &mut HexGridPosition, sub_units: &mut HexGridPosition) {
    let total_sub_units = units.to_sub_units() + *sub_units;
    let (rounded_units, rounded_sub_units) = HexGridPosition::round(total_sub_units);
    *units = rounded_units;
    *sub_units = rounded_sub_units;
}

/// Adds an absolute sub-unit displacement to a split unit/sub-unit position.
pub fn add_sub_units_position_to_position(
    sub_units_position: HexGridPosition,
    out_unit_position: &mut HexGridPosition,
    out_sub_unit_position: &mut HexGridPosition,
) {
    *out_unit_position += sub_units_position.to_units();
    *out_sub_unit_position += sub_units_position.to_sub_units_remainder();

    apply_excessive_sub_units_to_units(out_unit_position, out_sub_unit_position);
}

/// Same as [`add_sub_units_position_to_position`] but with inclusive rounding,
/// used by movement so an entity that crosses a hex boundary lands on it.
pub fn add_sub_units_position_with_alternative_rounding(
    sub_units_position: HexGridPosition,
    out_unit_position: &mut HexGridPosition,
    out_sub_unit_position: &mut HexGridPosition,
) {
    *out_unit_position += sub_units_position.to_units();
    *out_sub_unit_position += sub_units_position.to_sub_units_remainder();

    let total_sub_units = out_unit_position.to_sub_units() + *out_sub_unit_position;
    let (units, sub_units) = HexGridPosition::round_extended(total_sub_units, true);
    *out_unit_position = units;
    *out_sub_unit_position = sub_units;
}

/// Flat obstacle bitmap over the board, used for spawn placement and
/// bounce targeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleMap {
    config: GridConfig,
    cells: Vec<u8>,
}

impl ObstacleMap {
    /// Create an empty obstacle map for the given board.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self {
            cells: vec![obstacle::NONE; config.grid_size()],
            config,
        }
    }

    /// The board config this map covers.
    #[must_use]
    pub const fn config(&self) -> GridConfig {
        self.config
    }

    /// Clear all marked obstacles.
    pub fn clear(&mut self) {
        self.cells.fill(obstacle::NONE);
    }

    /// Whether there is an obstacle matching `mask` at `position`.
    /// Off-board positions count as blocked.
    #[must_use]
    pub fn has_obstacle_at(&self, position: HexGridPosition, mask: u8) -> bool {
        match self.config.grid_index(position) {
            Some(index) => (self.cells[index] & mask) != 0,
            None => true,
        }
    }

    /// Whether there is any obstacle at `position`.
    #[must_use]
    pub fn is_blocked(&self, position: HexGridPosition) -> bool {
        self.has_obstacle_at(position, obstacle::ANY_MASK)
    }

    /// Set or clear the obstacle at `position`. Off-board positions are
    /// silently ignored.
    pub fn set_obstacle_at(&mut self, position: HexGridPosition, value: bool, kind: u8) {
        if let Some(index) = self.config.grid_index(position) {
            self.cells[index] = if value { kind } else { obstacle::NONE };
        }
    }

    /// Mark every cell of a hexagon as an obstacle.
    pub fn set_hexagon_obstacle(&mut self, center: HexGridPosition, radius_units: i32, value: bool) {
        let (q_min, q_max) = HexGridPosition::hexagon_q_limits(radius_units);
        for q in q_min..=q_max {
            let (r_min, r_max) = HexGridPosition::hexagon_r_limits(radius_units, q);
            for r in r_min..=r_max {
                let offset = HexGridPosition::new(q, r) + center;
                self.set_obstacle_at(offset, value, obstacle::ENTITY);
            }
        }
    }

    /// Candidate open positions at exactly `trial_distance` from `position`
    /// (plus the center itself), sorted by distance to `preferred_position`
    /// with grid index as the tiebreaker, truncated to `max_positions`.
    ///
    /// Reference: <https://www.redblobgames.com/grids/hexagons/#rings>
    #[must_use]
    pub fn possible_positions(
        &self,
        position: HexGridPosition,
        radius_units: i32,
        preferred_position: HexGridPosition,
        trial_distance: i32,
        max_positions: usize,
    ) -> Vec<HexGridPosition> {
        let mut candidates = Vec::new();

        // The center point is always a candidate if open
        if self.config.is_hexagon_in_grid_limits(position, radius_units, 0, 0)
            && !self.is_blocked(position)
        {
            candidates.push(position);
        }

        let mut ring = Vec::new();
        self.config.single_ring_positions(position, trial_distance, &mut ring);
        for test_position in ring {
            if self.config.is_hexagon_in_grid_limits(test_position, radius_units, 0, 0)
                && !self.is_blocked(test_position)
            {
                candidates.push(test_position);
            }
        }

        // Ties on distance MUST be broken deterministically, use grid index
        candidates.sort_by_key(|candidate| {
            (
                (*candidate - preferred_position).length(),
                self.config.grid_index(*candidate),
            )
        });
        candidates.truncate(max_positions);
        candidates
    }

    /// Closest open position to `target_position` where a hexagon of
    /// `radius_needed` fits, scanning rings outward from
    /// `minimum_trial_distance`.
    #[must_use]
    pub fn open_position_nearby(
        &self,
        target_position: HexGridPosition,
        radius_needed: i32,
        minimum_trial_distance: i32,
    ) -> HexGridPosition {
        self.open_position_nearby_with_preferred_position(
            target_position,
            target_position,
            radius_needed,
            minimum_trial_distance,
        )
    }

    /// Like [`Self::open_position_nearby`] but ranks candidates by distance
    /// to a separate preferred position.
    #[must_use]
    pub fn open_position_nearby_with_preferred_position(
        &self,
        target_position: HexGridPosition,
        preferred_position: HexGridPosition,
        radius_needed: i32,
        minimum_trial_distance: i32,
    ) -> HexGridPosition {
        let maximum_map_range = self
            .config
            .max_distance_units()
            .min(self.config.distance_to_farthest_hex(target_position));

        let mut trial_distance = minimum_trial_distance;
        loop {
            let results = self.possible_positions(
                target_position,
                radius_needed,
                preferred_position,
                trial_distance,
                1,
            );
            if let Some(&found) = results.first() {
                return found;
            }

            trial_distance += 1;
            if trial_distance > maximum_map_range {
                return INVALID_HEX_POSITION;
            }
        }
    }

    /// Open position behind the target, seen from the source: the preferred
    /// position is the source reflected through the target.
    #[must_use]
    pub fn open_position_behind(
        &self,
        source_position: HexGridPosition,
        target_position: HexGridPosition,
        radius_needed: i32,
        minimum_trial_distance: i32,
    ) -> HexGridPosition {
        let reference_position = source_position - target_position;
        let reflected_position = reference_position.reflect() + target_position;

        self.open_position_nearby_with_preferred_position(
            target_position,
            reflected_position,
            radius_needed,
            minimum_trial_distance,
        )
    }

    /// Open position near `target_position` preferring proximity to
    /// `source_position`, capped at `max_distance_units` from the target.
    #[must_use]
    pub fn open_position_near_location_on_path(
        &self,
        source_position: HexGridPosition,
        target_position: HexGridPosition,
        radius_needed: i32,
        max_distance_units: i32,
    ) -> HexGridPosition {
        let max_range_units = (self.config.max_position().q - target_position.q)
            .max(self.config.max_position().r - target_position.r);
        let limit = max_range_units.min(max_distance_units);

        let mut trial_distance = 1;
        while trial_distance < limit {
            let results = self.possible_positions(
                target_position,
                radius_needed,
                source_position,
                trial_distance,
                1,
            );
            if let Some(&found) = results.first() {
                return found;
            }

            trial_distance += 1;
        }

        INVALID_HEX_POSITION
    }

    /// Mark every cell within `border_width` of the board border as a
    /// border obstacle.
    pub fn mark_borders(&mut self, border_width_q: i32, border_width_r: i32) {
        let width = self.config.width() as usize;
        let height = self.config.height() as usize;
        let border_q = border_width_q.max(0) as usize;
        let border_r = border_width_r.max(0) as usize;

        for row_index in 0..height {
            let row = &mut self.cells[row_index * width..(row_index + 1) * width];
            if row_index < border_r || row_index >= height - border_r {
                row.fill(obstacle::BORDER);
            } else {
                let clamped_q = border_q.min(width);
                row[..clamped_q].fill(obstacle::BORDER);
                row[width - clamped_q..].fill(obstacle::BORDER);
            }
        }
    }
}

/// Time step and speed conversions, all in integer milliseconds.
pub mod time {
    /// Milliseconds per simulation time step.
    pub const MS_PER_TIME_STEP: i32 = 100;

    /// Milliseconds per second.
    pub const MS_PER_SECOND: i32 = 1000;

    /// Time steps per second.
    pub const TIME_STEPS_PER_SECOND: i32 = MS_PER_SECOND / MS_PER_TIME_STEP;

    /// Sentinel for infinite durations.
    pub const TIME_INFINITE: i32 = -1;

    /// Converts milliseconds into time steps.
    #[must_use]
    pub const fn ms_to_time_steps(time_ms: i32) -> i32 {
        if time_ms == TIME_INFINITE {
            return TIME_INFINITE;
        }
        TIME_STEPS_PER_SECOND * time_ms / MS_PER_SECOND
    }

    /// Converts time steps into milliseconds.
    #[must_use]
    pub const fn time_steps_to_ms(time_steps: i32) -> i32 {
        if time_steps == TIME_INFINITE {
            return TIME_INFINITE;
        }
        time_steps * MS_PER_TIME_STEP
    }

    /// Converts an attack speed percentage per second into time steps
    /// between attacks. 200% = 5 steps, 100% = 10 steps.
    #[must_use]
    pub const fn attack_speed_to_time_steps(attack_speed: i32) -> i32 {
        if attack_speed == 0 {
            return i32::MAX;
        }
        MS_PER_SECOND / attack_speed
    }

    /// Converts a travel time in milliseconds into sub-units per time step
    /// over a distance. A zero travel time completes the whole distance in
    /// one step.
    #[must_use]
    pub const fn ms_to_sub_units_per_time_step(distance_sub_units: i32, time_ms: i32) -> i32 {
        let time_steps = ms_to_time_steps(time_ms);
        if time_steps == 0 {
            return distance_sub_units;
        }
        distance_sub_units / time_steps
    }

    /// Converts a movement speed in sub-units per second into sub-units per
    /// time step.
    #[must_use]
    pub const fn sub_units_per_second_to_per_time_step(speed_sub_units: i32) -> i32 {
        speed_sub_units / TIME_STEPS_PER_SECOND
    }
}
