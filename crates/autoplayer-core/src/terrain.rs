//! Pure terrain queries against a [`WorldSnapshot`].
//!
//! Two questions are answered for a probe point `(landing_x, current_y)`:
//!
//! - [`would_hit_hazard`]: does a spike's danger band cover the probe?
//! - [`has_landable_ground`]: is there a solid tile with air above it in the
//!   scan window around the probe?
//!
//! Both functions are total and side-effect free. Missing or out-of-range
//! terrain data is never a fault: it degrades to "unsafe" for ground queries
//! and is simply skipped while scanning.

use crate::snapshot::{WorldSnapshot, TILE_SIZE};

/// Pixels above a spike's top edge that still count as dangerous.
pub const HAZARD_MARGIN_ABOVE: f32 = 16.0;

/// Pixels below a spike's bottom edge that still count as dangerous.
pub const HAZARD_MARGIN_BELOW: f32 = 8.0;

/// Tiles scanned above the probe row. Maneuvers arc upward before
/// descending, so the window is biased toward ground above the probe.
pub const GROUND_SCAN_TILES_UP: i64 = 12;

/// Tiles scanned below the probe row.
pub const GROUND_SCAN_TILES_DOWN: i64 = 8;

/// True when any spike horizontally spans `landing_x` and `current_y` falls
/// inside its vertical danger band `[top - 16, bottom + 8]`.
pub fn would_hit_hazard(landing_x: f32, current_y: f32, snapshot: &WorldSnapshot) -> bool {
    snapshot.spikes.iter().any(|spike| {
        let b = &spike.bounds;
        if !b.spans_x(landing_x) {
            return false;
        }
        let band_top = b.y - HAZARD_MARGIN_ABOVE;
        let band_bottom = b.bottom() + HAZARD_MARGIN_BELOW;
        let hit = current_y >= band_top && current_y <= band_bottom;
        if hit {
            tracing::trace!(
                landing_x,
                current_y,
                spike_x = b.x,
                spike_y = b.y,
                direction = ?spike.direction,
                "probe inside spike danger band"
            );
        }
        hit
    })
}

/// True when a landable surface exists near `(landing_x, current_y)`.
///
/// - Probes at or past the right edge of the level are treated as solid: the
///   player crosses into the next room, which this snapshot knows nothing
///   about. Level bounds with non-positive width are treated as unknown and
///   never trigger this shortcut.
/// - An empty solidity grid, or a non-finite probe, yields `false`.
/// - Otherwise rows `tile_y - 12 .. tile_y + 8` are scanned top to bottom in
///   column `tile_x`. A solid tile is landable when the tile directly above
///   it is empty; solid tiles in the first grid row are ceilings and never
///   landable.
pub fn has_landable_ground(landing_x: f32, current_y: f32, snapshot: &WorldSnapshot) -> bool {
    if !landing_x.is_finite() || !current_y.is_finite() {
        tracing::trace!(landing_x, current_y, "non-finite probe; no ground");
        return false;
    }

    let level = &snapshot.level_bounds;
    if level.w > 0.0 && landing_x >= level.right() {
        tracing::trace!(landing_x, level_right = level.right(), "probe crosses room edge");
        return true;
    }

    let grid = &snapshot.solidity_grid;
    if grid.is_empty() {
        return false;
    }

    let tile_x = (landing_x / TILE_SIZE).floor() as i64;
    let tile_y = (current_y / TILE_SIZE).floor() as i64;

    // The casts saturate for far-away probes; the window bounds must too.
    let first = tile_y.saturating_sub(GROUND_SCAN_TILES_UP);
    let last = tile_y.saturating_add(GROUND_SCAN_TILES_DOWN);
    for row in first..last {
        // Row 0 is the ceiling; a tile there has nothing above it to stand in.
        if row <= 0 {
            continue;
        }
        if grid.cell(tile_x, row) != Some(true) {
            continue;
        }
        if grid.cell(tile_x, row - 1) == Some(false) {
            tracing::trace!(tile_x, tile_y = row, "landable tile found");
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Bounds, SolidityGrid, Spike, SpikeDirection};

    /// A 40x30 tile room (320x240 px) with the given rows forced solid.
    fn room_with_solid_rows(rows: &[usize]) -> WorldSnapshot {
        let mut lines = Vec::new();
        for r in 0..30 {
            let c = if rows.contains(&r) { '1' } else { '0' };
            lines.push(std::iter::repeat(c).take(40).collect::<String>());
        }
        WorldSnapshot {
            level_bounds: Bounds::new(0.0, 0.0, 320.0, 240.0),
            solidity_grid: SolidityGrid::new(lines.join("\n")),
            ..Default::default()
        }
    }

    fn spike_at(x: f32, y: f32, w: f32, h: f32) -> Spike {
        Spike {
            bounds: Bounds::new(x, y, w, h),
            direction: SpikeDirection::Up,
        }
    }

    // -- 1. Hazard band ------------------------------------------------------

    #[test]
    fn no_spikes_is_safe() {
        let snap = WorldSnapshot::default();
        assert!(!would_hit_hazard(100.0, 100.0, &snap));
    }

    #[test]
    fn hazard_band_edges_are_inclusive() {
        let mut snap = WorldSnapshot::default();
        snap.spikes.push(spike_at(100.0, 100.0, 16.0, 8.0));

        // Horizontal edges.
        assert!(would_hit_hazard(100.0, 100.0, &snap));
        assert!(would_hit_hazard(116.0, 100.0, &snap));
        assert!(!would_hit_hazard(99.9, 100.0, &snap));
        assert!(!would_hit_hazard(116.1, 100.0, &snap));

        // Vertical band [84, 116].
        assert!(would_hit_hazard(108.0, 84.0, &snap));
        assert!(would_hit_hazard(108.0, 116.0, &snap));
        assert!(!would_hit_hazard(108.0, 83.9, &snap));
        assert!(!would_hit_hazard(108.0, 116.1, &snap));
    }

    #[test]
    fn any_spike_in_list_triggers() {
        let mut snap = WorldSnapshot::default();
        snap.spikes.push(spike_at(0.0, 0.0, 8.0, 8.0));
        snap.spikes.push(spike_at(200.0, 50.0, 8.0, 8.0));
        assert!(would_hit_hazard(204.0, 50.0, &snap));
    }

    // -- 2. Ground scan ------------------------------------------------------

    #[test]
    fn empty_grid_is_never_landable() {
        let snap = WorldSnapshot {
            level_bounds: Bounds::new(0.0, 0.0, 320.0, 240.0),
            ..Default::default()
        };
        assert!(!has_landable_ground(64.0, 80.0, &snap));
    }

    #[test]
    fn floor_below_probe_is_landable() {
        // Probe row 10, floor at row 17 (within 8 below).
        let snap = room_with_solid_rows(&[17]);
        assert!(has_landable_ground(64.0, 80.0, &snap));
    }

    #[test]
    fn floor_outside_window_is_not_found() {
        // Window for tile_y 10 is rows -2..18; row 18 is excluded.
        let snap = room_with_solid_rows(&[18]);
        assert!(!has_landable_ground(64.0, 80.0, &snap));
    }

    #[test]
    fn ledge_above_probe_is_landable() {
        // Window reaches 12 tiles up: row 10 - 12 = -2, so row 1 qualifies.
        let snap = room_with_solid_rows(&[1]);
        assert!(has_landable_ground(64.0, 80.0, &snap));
    }

    #[test]
    fn ceiling_row_is_never_landable() {
        let snap = room_with_solid_rows(&[0]);
        assert!(!has_landable_ground(64.0, 40.0, &snap));
    }

    #[test]
    fn solid_under_solid_is_not_landable() {
        // Rows 12..=29 solid: only row 12 has air above it.
        let rows: Vec<usize> = (12..30).collect();
        let snap = room_with_solid_rows(&rows);
        assert!(has_landable_ground(64.0, 80.0, &snap));

        // Probe deep inside the solid mass: window rows 13..33, all covered.
        assert!(!has_landable_ground(64.0, 200.0, &snap));
    }

    #[test]
    fn ragged_rows_are_skipped() {
        let grid = "00000000000\n0\n0\n0000000001\n00000000011";
        let snap = WorldSnapshot {
            level_bounds: Bounds::new(0.0, 0.0, 320.0, 240.0),
            solidity_grid: SolidityGrid::from(grid),
            ..Default::default()
        };
        // Column 9: row 3 solid, row 2 is ragged (no data) so not landable;
        // row 4 solid under solid. Nothing qualifies.
        assert!(!has_landable_ground(72.0, 16.0, &snap));
        // Column 10: row 4 solid, but row 3 is too short to say what is above.
        assert!(!has_landable_ground(80.0, 16.0, &snap));
    }

    #[test]
    fn probe_beyond_grid_width_is_no_data() {
        let mut snap = room_with_solid_rows(&[17]);
        // Widen the level so the room-edge shortcut does not apply.
        snap.level_bounds = Bounds::new(0.0, 0.0, 1000.0, 240.0);
        assert!(!has_landable_ground(8.0 * 45.0, 80.0, &snap));
    }

    // -- 3. Room-edge shortcut -----------------------------------------------

    #[test]
    fn probe_past_room_edge_is_solid() {
        let snap = room_with_solid_rows(&[]);
        assert!(has_landable_ground(320.0, 80.0, &snap));
        assert!(has_landable_ground(400.0, 80.0, &snap));
        assert!(!has_landable_ground(319.0, 80.0, &snap));
    }

    #[test]
    fn room_edge_shortcut_ignores_missing_grid() {
        let snap = WorldSnapshot {
            level_bounds: Bounds::new(100.0, 0.0, 50.0, 50.0),
            ..Default::default()
        };
        assert!(has_landable_ground(150.0, 0.0, &snap));
    }

    #[test]
    fn zero_width_level_bounds_are_unknown() {
        let snap = WorldSnapshot::default();
        assert!(!has_landable_ground(64.0, 0.0, &snap));
    }

    // -- 4. Extreme coordinates ----------------------------------------------

    #[test]
    fn far_away_points_do_not_overflow_the_window() {
        let snap = room_with_solid_rows(&[17]);
        assert!(!has_landable_ground(64.0, f32::MAX, &snap));
        assert!(!has_landable_ground(64.0, -1e30, &snap));
        assert!(!has_landable_ground(64.0, f32::MIN, &snap));
        assert!(!has_landable_ground(-1e30, 80.0, &snap));
        // Finite but past the right edge still takes the shortcut.
        assert!(has_landable_ground(f32::MAX, 80.0, &snap));
    }

    #[test]
    fn non_finite_points_have_no_ground() {
        let snap = room_with_solid_rows(&[17]);
        assert!(!has_landable_ground(f32::NAN, 80.0, &snap));
        assert!(!has_landable_ground(64.0, f32::NAN, &snap));
        assert!(!has_landable_ground(f32::INFINITY, 80.0, &snap));
        assert!(!has_landable_ground(64.0, f32::NEG_INFINITY, &snap));
    }

    #[test]
    fn non_finite_points_miss_every_spike() {
        let mut snap = WorldSnapshot::default();
        snap.spikes.push(spike_at(0.0, 0.0, 16.0, 8.0));
        assert!(!would_hit_hazard(f32::NAN, 0.0, &snap));
        assert!(!would_hit_hazard(8.0, f32::NAN, &snap));
    }
}
