//! Autoplayer Core -- frame-accurate input playback for a 2D platformer.
//!
//! This crate holds everything that runs on the game's tick: the action
//! vocabulary, the maneuver catalog, the world snapshot model, terrain
//! queries, decision policies, and the [`Sequencer`](sequencer::Sequencer)
//! that plays plans back one tick at a time. It performs no I/O; snapshots
//! arrive through the [`SnapshotSource`](feed::SnapshotSource) boundary and
//! actions leave through an [`InputSink`](input::InputSink).
//!
//! # Quick Start
//!
//! ```
//! use autoplayer_core::prelude::*;
//!
//! let feed = SnapshotCell::new();
//! let mut seq = Sequencer::new(Box::new(GroundReflexPolicy::default()));
//! seq.start_dynamic();
//!
//! // Nothing to decide on yet: hold nothing.
//! assert_eq!(seq.tick(&feed), Action::NONE);
//!
//! let mut snapshot = WorldSnapshot::default();
//! snapshot.player.on_ground = true;
//! feed.publish(snapshot);
//!
//! let action = seq.tick(&feed);
//! assert_eq!(action, Action::JUMP);
//!
//! let mut pad = VirtualGamepad::new();
//! apply_action(action, &mut pad);
//! assert!(pad.pressed(Button::Jump));
//! ```

#![deny(unsafe_code)]

pub mod action;
pub mod feed;
pub mod input;
pub mod maneuver;
pub mod policy;
pub mod sequencer;
pub mod snapshot;
pub mod terrain;

use action::Action;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when building core values from untrusted input.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An input frame was declared with a duration of zero ticks.
    #[error("input frame for {action} must be held for at least one tick")]
    EmptyInputFrame {
        /// The action the frame would have held.
        action: Action,
    },
}

/// Errors a decision policy can report instead of a maneuver.
///
/// The sequencer logs these and emits no input for the tick; they never stop
/// playback.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The backend could not be reached or answered with an error.
    #[error("{backend} backend failed: {message}")]
    Backend {
        /// Name of the failing backend.
        backend: &'static str,
        /// Human-readable failure description.
        message: String,
    },

    /// The backend answered, but with a plan that cannot be played.
    #[error("malformed plan: {reason}")]
    MalformedPlan {
        /// What was wrong with the plan.
        reason: String,
    },

    /// The policy panicked while deciding. Raised by the sequencer, which
    /// catches the unwind at the tick boundary.
    #[error("{policy} policy panicked: {message}")]
    Panicked {
        /// Name of the policy that panicked.
        policy: &'static str,
        /// Panic payload, when it was a string.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common autoplayer usage.
pub mod prelude {
    pub use crate::action::{Action, InputFrame};
    pub use crate::feed::{
        FetchScheduler, FetchTrigger, SnapshotCell, SnapshotSource, DEFAULT_FETCH_INTERVAL_TICKS,
    };
    pub use crate::input::{apply_action, Button, InputSink, PadState, VirtualGamepad};
    pub use crate::maneuver::{Maneuver, ManeuverKind};
    pub use crate::policy::{
        DecisionPolicy, GroundReflexPolicy, TerrainAwarePolicy, DEFAULT_REFLEX_IDLE_THRESHOLD,
    };
    pub use crate::sequencer::{
        Decision, PlaybackMode, Sequencer, SequencerState, TickOutcome,
    };
    pub use crate::snapshot::{
        Bounds, PlayerState, SolidityGrid, Spike, SpikeDirection, Vec2, WorldSnapshot, TILE_SIZE,
    };
    pub use crate::terrain::{has_landable_ground, would_hit_hazard};
    pub use crate::{CoreError, PolicyError};
}
