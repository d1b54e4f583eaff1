//! Primitive input vocabulary.
//!
//! An [`Action`] is a small bitset over the six primitive inputs the player
//! can hold on a given frame. An [`InputFrame`] pairs an action set with the
//! number of ticks it must be held; a plan is an ordered slice of frames.
//!
//! The bit values double as the wire encoding shared with the remote decision
//! backend, so they must never be renumbered:
//!
//! | flag  | bit  |
//! |-------|------|
//! | Left  | 1    |
//! | Right | 2    |
//! | Jump  | 4    |
//! | Dash  | 8    |
//! | Up    | 16   |
//! | Down  | 32   |
//!
//! # Example
//!
//! ```
//! use autoplayer_core::action::{Action, InputFrame};
//!
//! let combo = Action::DASH | Action::UP | Action::RIGHT | Action::JUMP;
//! assert!(combo.contains(Action::JUMP | Action::DASH));
//! assert_eq!(combo.to_string(), "Right|Jump|Dash|Up");
//!
//! let plan = [InputFrame::new(Action::JUMP, 10), InputFrame::new(combo, 20)];
//! assert_eq!(InputFrame::total_frames(&plan), 30);
//! ```

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::CoreError;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A set of primitive inputs held during one tick.
///
/// `Action::NONE` is the empty set. Sets combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(u8);

impl Action {
    /// The empty set: no input held.
    pub const NONE: Action = Action(0);
    /// Hold the stick left.
    pub const LEFT: Action = Action(1 << 0);
    /// Hold the stick right.
    pub const RIGHT: Action = Action(1 << 1);
    /// Hold the jump button.
    pub const JUMP: Action = Action(1 << 2);
    /// Hold the dash button.
    pub const DASH: Action = Action(1 << 3);
    /// Hold the stick up.
    pub const UP: Action = Action(1 << 4);
    /// Hold the stick down.
    pub const DOWN: Action = Action(1 << 5);

    /// Every defined flag, in bit order. Used for display and masking.
    const FLAGS: [(Action, &'static str); 6] = [
        (Action::LEFT, "Left"),
        (Action::RIGHT, "Right"),
        (Action::JUMP, "Jump"),
        (Action::DASH, "Dash"),
        (Action::UP, "Up"),
        (Action::DOWN, "Down"),
    ];

    const ALL_BITS: u8 = 0b0011_1111;

    /// Build an action from its wire encoding, dropping undefined bits.
    pub const fn from_bits(bits: u8) -> Self {
        Action(bits & Self::ALL_BITS)
    }

    /// Build an action from a wider wire integer (as sent by the remote
    /// backend). Values outside `u8` keep only their defined low bits.
    pub const fn from_wire(value: i64) -> Self {
        Action::from_bits((value & Self::ALL_BITS as i64) as u8)
    }

    /// The raw wire encoding.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when no flag is set.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Action) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set union.
    pub const fn union(self, other: Action) -> Action {
        Action(self.0 | other.0)
    }
}

impl BitOr for Action {
    type Output = Action;

    fn bitor(self, rhs: Action) -> Action {
        self.union(rhs)
    }
}

impl BitOrAssign for Action {
    fn bitor_assign(&mut self, rhs: Action) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("None");
        }
        let mut first = true;
        for (flag, name) in Self::FLAGS {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InputFrame
// ---------------------------------------------------------------------------

/// Hold `action` for exactly `frames` consecutive ticks.
///
/// `frames` is always at least 1. Use [`InputFrame::new`] for literals and
/// [`InputFrame::try_new`] for untrusted data (e.g. a remote response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInputFrame")]
pub struct InputFrame {
    action: Action,
    frames: u32,
}

/// Unvalidated serde shape of [`InputFrame`].
#[derive(Deserialize)]
struct RawInputFrame {
    action: Action,
    frames: u32,
}

impl TryFrom<RawInputFrame> for InputFrame {
    type Error = CoreError;

    fn try_from(raw: RawInputFrame) -> Result<Self, Self::Error> {
        InputFrame::try_new(raw.action, raw.frames)
    }
}

impl InputFrame {
    /// Create an input frame.
    ///
    /// # Panics
    ///
    /// Panics if `frames` is zero.
    pub const fn new(action: Action, frames: u32) -> Self {
        assert!(frames > 0, "input frame must be held for at least one tick");
        Self { action, frames }
    }

    /// Create an input frame, rejecting zero-length holds.
    pub fn try_new(action: Action, frames: u32) -> Result<Self, CoreError> {
        if frames == 0 {
            return Err(CoreError::EmptyInputFrame { action });
        }
        Ok(Self { action, frames })
    }

    /// The action set held during this frame.
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Number of ticks the action is held. Always `>= 1`.
    pub const fn frames(&self) -> u32 {
        self.frames
    }

    /// Sum of all hold durations in a plan.
    pub fn total_frames(plan: &[InputFrame]) -> u64 {
        plan.iter().map(|f| u64::from(f.frames)).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
