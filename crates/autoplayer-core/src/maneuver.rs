//! Catalog of pre-timed maneuvers.
//!
//! A [`Maneuver`] is plain data: a [`ManeuverKind`] tag plus the ordered
//! [`InputFrame`]s to play back. The fixed catalog carries horizontal
//! displacements measured empirically on flat ground; the vertical
//! displacement of the combos is 0 on flat ground, or `min(0, -ledge_height)`
//! when landing on a ledge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::{Action, InputFrame};

/// Horizontal distance covered by [`ManeuverKind::RightShortMove`] (5 frames
/// at 1.4 px/frame).
pub const SHORT_MOVE_HORIZONTAL_DISTANCE: f32 = 7.0;

/// Horizontal distance covered by [`ManeuverKind::JumpDashCombo`].
pub const COMBO_HORIZONTAL_DISTANCE: f32 = 44.0;

/// Horizontal distance covered by [`ManeuverKind::LongJumpDashCombo`].
pub const LONG_COMBO_HORIZONTAL_DISTANCE: f32 = 64.0;

/// The held input during the dash leg of both combos.
pub const COMBO_DASH: Action = Action::DASH
    .union(Action::UP)
    .union(Action::RIGHT)
    .union(Action::JUMP);

const NO_OP_FRAMES: [InputFrame; 1] = [InputFrame::new(Action::NONE, 1)];
const JUMP_FRAMES: [InputFrame; 1] = [InputFrame::new(Action::JUMP, 1)];
const RIGHT_SHORT_MOVE_FRAMES: [InputFrame; 1] = [InputFrame::new(Action::RIGHT, 5)];
const JUMP_DASH_COMBO_FRAMES: [InputFrame; 2] = [
    InputFrame::new(Action::JUMP, 10),
    InputFrame::new(COMBO_DASH, 20),
];
const LONG_JUMP_DASH_COMBO_FRAMES: [InputFrame; 2] = [
    InputFrame::new(Action::JUMP, 5),
    InputFrame::new(COMBO_DASH, 40),
];

// ---------------------------------------------------------------------------
// ManeuverKind
// ---------------------------------------------------------------------------

/// Which catalog entry a maneuver came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManeuverKind {
    /// Hold nothing for one tick.
    NoOp,
    /// Press jump for a single tick.
    Jump,
    /// Walk right for 5 ticks.
    RightShortMove,
    /// Jump 10 ticks, then dash up-right while holding jump for 20.
    JumpDashCombo,
    /// Jump 5 ticks, then dash up-right while holding jump for 40.
    LongJumpDashCombo,
    /// An externally supplied plan (remote backend, CLI input).
    Scripted,
}

impl ManeuverKind {
    /// Calibrated horizontal displacement in pixels, when known.
    pub const fn horizontal_displacement(self) -> Option<f32> {
        match self {
            ManeuverKind::NoOp => Some(0.0),
            ManeuverKind::RightShortMove => Some(SHORT_MOVE_HORIZONTAL_DISTANCE),
            ManeuverKind::JumpDashCombo => Some(COMBO_HORIZONTAL_DISTANCE),
            ManeuverKind::LongJumpDashCombo => Some(LONG_COMBO_HORIZONTAL_DISTANCE),
            ManeuverKind::Jump | ManeuverKind::Scripted => None,
        }
    }
}

impl fmt::Display for ManeuverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManeuverKind::NoOp => "no-op",
            ManeuverKind::Jump => "jump",
            ManeuverKind::RightShortMove => "right-short-move",
            ManeuverKind::JumpDashCombo => "jump-dash-combo",
            ManeuverKind::LongJumpDashCombo => "long-jump-dash-combo",
            ManeuverKind::Scripted => "scripted",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Maneuver
// ---------------------------------------------------------------------------

/// A named, pre-timed sequence of input frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maneuver {
    kind: ManeuverKind,
    frames: Vec<InputFrame>,
}

impl Maneuver {
    pub fn no_op() -> Self {
        Self::catalog(ManeuverKind::NoOp, &NO_OP_FRAMES)
    }

    pub fn jump() -> Self {
        Self::catalog(ManeuverKind::Jump, &JUMP_FRAMES)
    }

    pub fn right_short_move() -> Self {
        Self::catalog(ManeuverKind::RightShortMove, &RIGHT_SHORT_MOVE_FRAMES)
    }

    pub fn jump_dash_combo() -> Self {
        Self::catalog(ManeuverKind::JumpDashCombo, &JUMP_DASH_COMBO_FRAMES)
    }

    pub fn long_jump_dash_combo() -> Self {
        Self::catalog(ManeuverKind::LongJumpDashCombo, &LONG_JUMP_DASH_COMBO_FRAMES)
    }

    /// Wrap an externally supplied plan.
    pub fn scripted(frames: Vec<InputFrame>) -> Self {
        Self {
            kind: ManeuverKind::Scripted,
            frames,
        }
    }

    fn catalog(kind: ManeuverKind, frames: &[InputFrame]) -> Self {
        Self {
            kind,
            frames: frames.to_vec(),
        }
    }

    pub fn kind(&self) -> ManeuverKind {
        self.kind
    }

    pub fn frames(&self) -> &[InputFrame] {
        &self.frames
    }

    /// Consume the maneuver, yielding its plan.
    pub fn into_frames(self) -> Vec<InputFrame> {
        self.frames
    }

    /// Total ticks the maneuver occupies.
    pub fn duration(&self) -> u64 {
        InputFrame::total_frames(&self.frames)
    }

    /// Calibrated horizontal displacement, when known.
    pub fn horizontal_displacement(&self) -> Option<f32> {
        self.kind.horizontal_displacement()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
