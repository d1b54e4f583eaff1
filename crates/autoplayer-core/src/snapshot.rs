//! Immutable world snapshots with BLAKE3 fingerprinting.
//!
//! A [`WorldSnapshot`] is one observation of the game at a point in time:
//! player kinematics, level bounds, wind, and the terrain features the
//! decision policy looks at. Snapshots are produced wholesale by the snapshot
//! feed and never mutated afterwards; the core has no notion of identity
//! beyond "most recent".
//!
//! The serde encoding (camelCase) is also the request body sent to the remote
//! decision backend.
//!
//! # Usage
//!
//! ```
//! use autoplayer_core::snapshot::{Bounds, WorldSnapshot};
//!
//! let mut snapshot = WorldSnapshot::default();
//! snapshot.player.x = 40.0;
//! snapshot.player.on_ground = true;
//! snapshot.level_bounds = Bounds::new(0.0, 0.0, 320.0, 180.0);
//!
//! // The digest is a 64-char BLAKE3 hex string and depends only on content.
//! let digest = snapshot.digest();
//! assert_eq!(digest.len(), 64);
//! assert_eq!(digest, snapshot.clone().digest());
//! ```

use serde::{Deserialize, Serialize};

/// Side length of one solidity-grid tile, in world pixels.
pub const TILE_SIZE: f32 = 8.0;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2D vector in world pixels (or pixels per second for speeds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned rectangle in world pixel coordinates.
///
/// `y` grows downward, so `y` is the top edge and `y + h` the bottom edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (`x + w`).
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge (`y + h`).
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// True when `x` lies within `[x, x + w]` (both edges inclusive).
    pub fn spans_x(&self, x: f32) -> bool {
        x >= self.x && x <= self.right()
    }
}

/// The direction a spike points (the side that kills).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpikeDirection {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

/// A spike hazard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub bounds: Bounds,
    pub direction: SpikeDirection,
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// Player kinematics as reported by the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub subpixel_rem_x: f32,
    pub subpixel_rem_y: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub on_ground: bool,
    pub is_holding: bool,
    pub jump_timer: f32,
    pub auto_jump: bool,
}

// ---------------------------------------------------------------------------
// SolidityGrid
// ---------------------------------------------------------------------------

/// Text grid of 8x8-pixel tiles. `'0'` is empty, any other character solid.
///
/// Rows are separated by `\n`; a trailing `\r` on a row is ignored. Rows may
/// have ragged lengths, and indices outside a row mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolidityGrid(String);

impl SolidityGrid {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// True when the grid carries no terrain data at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over rows as byte slices.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.0
            .split('\n')
            .map(|row| row.strip_suffix('\r').unwrap_or(row).as_bytes())
    }

    /// Number of rows (0 for an empty grid).
    pub fn row_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.rows().count()
        }
    }

    /// Solidity of the tile at `(tile_x, tile_y)`.
    ///
    /// Returns `None` when the coordinate lies outside the grid or beyond the
    /// end of a ragged row.
    pub fn cell(&self, tile_x: i64, tile_y: i64) -> Option<bool> {
        if self.is_empty() {
            return None;
        }
        let x = usize::try_from(tile_x).ok()?;
        let y = usize::try_from(tile_y).ok()?;
        let row = self.rows().nth(y)?;
        row.get(x).map(|&c| c != b'0')
    }
}

impl From<&str> for SolidityGrid {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

// ---------------------------------------------------------------------------
// WorldSnapshot
// ---------------------------------------------------------------------------

/// One immutable observation of the world.
///
/// All terrain lists may be empty. An empty `solidity_grid` means "no terrain
/// data"; ground queries then conservatively report no safe ground.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldSnapshot {
    pub player: PlayerState,
    pub level_bounds: Bounds,
    pub wind: Vec2,
    pub state_name: String,
    pub chapter_time: String,
    pub room_name: String,
    pub solidity_grid: SolidityGrid,
    pub static_solids: Vec<Bounds>,
    pub spinners: Vec<Bounds>,
    pub lightning: Vec<Bounds>,
    pub spikes: Vec<Spike>,
    pub wind_triggers: Vec<Bounds>,
    pub jump_thrus: Vec<Bounds>,
}

impl WorldSnapshot {
    /// BLAKE3 hex digest (64 lowercase hex chars) of the canonical JSON
    /// encoding. Identical content always yields the identical digest.
    pub fn digest(&self) -> String {
        match serde_json::to_vec(self) {
            Ok(bytes) => blake3::hash(&bytes).to_hex().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot is not JSON-encodable; digesting debug form");
                blake3::hash(format!("{self:?}").as_bytes())
                    .to_hex()
                    .to_string()
            }
        }
    }

    /// Short prefix of [`digest`](Self::digest) for log lines.
    pub fn short_digest(&self) -> String {
        let mut digest = self.digest();
        digest.truncate(12);
        digest
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Grid access ------------------------------------------------------

    #[test]
    fn empty_grid_has_no_cells() {
        let grid = SolidityGrid::default();
        assert!(grid.is_empty());
        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.cell(0, 0), None);
    }

    #[test]
    fn cell_reads_solidity() {
        let grid = SolidityGrid::from("000\n010\n111");
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell(0, 0), Some(false));
        assert_eq!(grid.cell(1, 1), Some(true));
        assert_eq!(grid.cell(2, 2), Some(true));
    }

    #[test]
    fn ragged_rows_and_out_of_range_are_no_data() {
        let grid = SolidityGrid::from("0000\n1\n00");
        assert_eq!(grid.cell(3, 0), Some(false));
        assert_eq!(grid.cell(3, 1), None);
        assert_eq!(grid.cell(0, 3), None);
        assert_eq!(grid.cell(-1, 0), None);
        assert_eq!(grid.cell(0, -1), None);
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let grid = SolidityGrid::from("01\r\n10\r\n");
        assert_eq!(grid.cell(1, 0), Some(true));
        assert_eq!(grid.cell(2, 0), None);
        assert_eq!(grid.cell(0, 1), Some(true));
    }

    #[test]
    fn non_zero_characters_are_solid() {
        let grid = SolidityGrid::from("0a#");
        assert_eq!(grid.cell(1, 0), Some(true));
        assert_eq!(grid.cell(2, 0), Some(true));
    }

    // -- 2. Bounds -----------------------------------------------------------

    #[test]
    fn bounds_edges() {
        let b = Bounds::new(10.0, 20.0, 8.0, 4.0);
        assert_eq!(b.right(), 18.0);
        assert_eq!(b.bottom(), 24.0);
        assert!(b.spans_x(10.0));
        assert!(b.spans_x(18.0));
        assert!(!b.spans_x(18.5));
    }

    // -- 3. Serialization and digest -----------------------------------------

    #[test]
    fn serializes_camel_case() {
        let mut snap = WorldSnapshot::default();
        snap.player.on_ground = true;
        snap.room_name = "a-00".to_owned();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["player"]["onGround"], serde_json::json!(true));
        assert_eq!(json["roomName"], serde_json::json!("a-00"));
        assert!(json.get("solidityGrid").is_some());
    }

    #[test]
    fn missing_fields_default() {
        let snap: WorldSnapshot = serde_json::from_str(r#"{"player":{"x":3.0}}"#).unwrap();
        assert_eq!(snap.player.x, 3.0);
        assert!(snap.spikes.is_empty());
        assert!(snap.solidity_grid.is_empty());
    }

    #[test]
    fn digest_tracks_content() {
        let a = WorldSnapshot::default();
        let mut b = WorldSnapshot::default();
        assert_eq!(a.digest(), b.digest());
        b.player.x = 1.0;
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.short_digest().len(), 12);
    }
}
