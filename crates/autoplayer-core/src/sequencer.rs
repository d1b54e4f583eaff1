//! Frame-accurate playback of input plans.
//!
//! The [`Sequencer`] holds the active plan, advances it exactly one tick per
//! [`tick`](Sequencer::tick) call, and returns the [`Action`] to inject for
//! that tick. Playback runs in one of two modes:
//!
//! - **Scripted**: a fixed plan supplied by the caller. When the last frame
//!   has been held for its full duration the sequencer goes idle on its own.
//! - **Dynamic**: whenever the plan is exhausted and the feed reports a fresh
//!   snapshot, the [`DecisionPolicy`] is consulted and its maneuver replaces
//!   the plan. Without a fresh snapshot the sequencer emits `NONE` and waits;
//!   it never blocks.
//!
//! Each [`InputFrame`] is held for exactly its declared number of ticks and
//! transitions between frames happen inside a single `tick` call, so the
//! emitted action stream is fully determined by the plan and the tick count,
//! regardless of when snapshots arrive.
//!
//! # Example
//!
//! ```
//! use autoplayer_core::prelude::*;
//!
//! let feed = SnapshotCell::new();
//! let mut seq = Sequencer::new(Box::new(TerrainAwarePolicy::default()));
//! seq.start(vec![
//!     InputFrame::new(Action::JUMP, 2),
//!     InputFrame::new(Action::RIGHT, 1),
//! ]);
//!
//! assert_eq!(seq.tick(&feed), Action::JUMP);
//! assert_eq!(seq.tick(&feed), Action::JUMP);
//! assert_eq!(seq.tick(&feed), Action::RIGHT);
//! assert_eq!(seq.state(), SequencerState::Idle);
//! assert_eq!(seq.tick(&feed), Action::NONE);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::action::{Action, InputFrame};
use crate::feed::SnapshotSource;
use crate::maneuver::{Maneuver, ManeuverKind};
use crate::policy::DecisionPolicy;
use crate::PolicyError;

// ---------------------------------------------------------------------------
// Public state types
// ---------------------------------------------------------------------------

/// Where the next plan comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// A fixed, externally supplied plan.
    Scripted,
    /// Plans pulled from the decision policy on fresh snapshots.
    Dynamic,
}

/// Observable playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Not running.
    Idle,
    /// Inside frame `cursor`, which has been held for `held` ticks so far.
    Holding { cursor: usize, held: u32 },
    /// Running in dynamic mode with the plan used up, waiting for a fresh
    /// snapshot.
    Exhausted,
}

/// A plan accepted from the decision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Tick number (1-based count of `tick` calls) on which the plan was
    /// accepted. The plan's first frame is applied on this same tick.
    pub tick: u64,
    /// Name of the policy that produced the plan.
    pub policy: String,
    /// The accepted maneuver.
    pub maneuver: Maneuver,
    /// BLAKE3 digest of the snapshot the decision was made on, if any.
    pub snapshot_digest: Option<String>,
}

/// Full result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// The action to inject this tick.
    pub action: Action,
    /// Set when a new plan was accepted during this tick.
    pub decision: Option<Decision>,
}

impl TickOutcome {
    fn idle() -> Self {
        Self {
            action: Action::NONE,
            decision: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

/// Plays input plans back one tick at a time.
pub struct Sequencer {
    policy: Box<dyn DecisionPolicy>,
    queue: Vec<InputFrame>,
    active: Option<ManeuverKind>,
    cursor: usize,
    held: u32,
    running: bool,
    mode: PlaybackMode,
    tick_counter: u64,
    failed_decisions: u64,
}

impl Sequencer {
    /// Create an idle sequencer that consults `policy` in dynamic mode.
    pub fn new(policy: Box<dyn DecisionPolicy>) -> Self {
        Self {
            policy,
            queue: Vec::new(),
            active: None,
            cursor: 0,
            held: 0,
            running: false,
            mode: PlaybackMode::Scripted,
            tick_counter: 0,
            failed_decisions: 0,
        }
    }

    /// Replace the decision policy. Takes effect on the next consultation.
    pub fn set_policy(&mut self, policy: Box<dyn DecisionPolicy>) {
        tracing::info!(from = self.policy.name(), to = policy.name(), "decision policy swapped");
        self.policy = policy;
    }

    /// Start scripted playback of `plan`, replacing any current plan.
    pub fn start(&mut self, plan: Vec<InputFrame>) {
        tracing::info!(
            frames = plan.len(),
            total_ticks = InputFrame::total_frames(&plan),
            "scripted playback started"
        );
        self.mode = PlaybackMode::Scripted;
        self.active = Some(ManeuverKind::Scripted);
        self.load(plan);
        self.running = true;
    }

    /// Start dynamic playback: plans come from the decision policy.
    ///
    /// The policy's session state is reset and the queue starts empty, so the
    /// first action is emitted on the first tick that sees a fresh snapshot.
    pub fn start_dynamic(&mut self) {
        tracing::info!(policy = self.policy.name(), "dynamic playback started");
        self.policy.reset();
        self.mode = PlaybackMode::Dynamic;
        self.active = None;
        self.load(Vec::new());
        self.running = true;
    }

    /// Stop playback from any state. Safe at any tick boundary; nothing is
    /// left half-applied because actions are only produced inside `tick`.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!(tick = self.tick_counter, "playback stopped");
        }
        self.running = false;
        self.active = None;
        self.load(Vec::new());
    }

    /// Advance one tick and return the action to inject.
    pub fn tick(&mut self, feed: &dyn SnapshotSource) -> Action {
        self.step(feed).action
    }

    /// Advance one tick, also reporting any plan accepted on this tick.
    pub fn step(&mut self, feed: &dyn SnapshotSource) -> TickOutcome {
        self.tick_counter += 1;
        let tick = self.tick_counter;

        if !self.running {
            return TickOutcome::idle();
        }

        let mut decision = None;
        if self.cursor >= self.queue.len() {
            match self.mode {
                PlaybackMode::Scripted => {
                    // Only reachable for an empty scripted plan.
                    self.running = false;
                    tracing::info!(tick, "scripted plan complete");
                    return TickOutcome::idle();
                }
                PlaybackMode::Dynamic => {
                    if !feed.consume_fresh() {
                        tracing::trace!(tick, "plan exhausted; waiting for a fresh snapshot");
                        return TickOutcome::idle();
                    }
                    match self.consult(tick, feed) {
                        Some(accepted) => decision = Some(accepted),
                        None => return TickOutcome::idle(),
                    }
                }
            }
        }

        let Some(frame) = self.queue.get(self.cursor).copied() else {
            // The policy handed back an empty plan.
            return TickOutcome {
                action: Action::NONE,
                decision,
            };
        };

        self.held += 1;
        if self.held >= frame.frames() {
            tracing::trace!(tick, action = %frame.action(), frames = frame.frames(), "frame complete");
            self.cursor += 1;
            self.held = 0;
        }

        if self.mode == PlaybackMode::Scripted && self.cursor >= self.queue.len() {
            self.running = false;
            tracing::info!(tick, "scripted plan complete");
        }

        tracing::trace!(tick, action = %frame.action(), "tick");
        TickOutcome {
            action: frame.action(),
            decision,
        }
    }

    /// Ask the policy for a new plan. `None` means no decision this tick.
    ///
    /// A panicking policy is treated like one that returned an error, and is
    /// reset afterwards.
    fn consult(&mut self, tick: u64, feed: &dyn SnapshotSource) -> Option<Decision> {
        let snapshot = feed.latest();
        let policy = &mut self.policy;
        let result = panic::catch_unwind(AssertUnwindSafe(|| policy.decide(snapshot.as_deref())))
            .unwrap_or_else(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|m| (*m).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_owned());
                policy.reset();
                Err(PolicyError::Panicked {
                    policy: policy.name(),
                    message,
                })
            });
        match result {
            Ok(maneuver) => {
                let snapshot_digest = snapshot.as_deref().map(|s| s.digest());
                tracing::debug!(
                    tick,
                    policy = self.policy.name(),
                    maneuver = %maneuver.kind(),
                    ticks = maneuver.duration(),
                    digest = snapshot_digest.as_deref().and_then(|d| d.get(..12)),
                    "plan accepted"
                );
                self.active = Some(maneuver.kind());
                self.load(maneuver.frames().to_vec());
                Some(Decision {
                    tick,
                    policy: self.policy.name().to_owned(),
                    maneuver,
                    snapshot_digest,
                })
            }
            Err(e) => {
                self.failed_decisions += 1;
                tracing::warn!(
                    tick,
                    policy = self.policy.name(),
                    error = %e,
                    "decision failed; holding no input"
                );
                None
            }
        }
    }

    fn load(&mut self, plan: Vec<InputFrame>) {
        self.queue = plan;
        self.cursor = 0;
        self.held = 0;
    }

    // -- accessors ----------------------------------------------------------

    /// Current observable state.
    pub fn state(&self) -> SequencerState {
        if !self.running {
            SequencerState::Idle
        } else if self.cursor >= self.queue.len() {
            SequencerState::Exhausted
        } else {
            SequencerState::Holding {
                cursor: self.cursor,
                held: self.held,
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// The plan currently loaded (possibly fully played).
    pub fn queue(&self) -> &[InputFrame] {
        &self.queue
    }

    /// Catalog entry of the plan being played, if any.
    pub fn active_maneuver(&self) -> Option<ManeuverKind> {
        self.active
    }

    /// Ticks left in the current plan.
    pub fn remaining_ticks(&self) -> u64 {
        let rest = self.queue.get(self.cursor..).unwrap_or_default();
        InputFrame::total_frames(rest).saturating_sub(u64::from(self.held))
    }

    /// Number of `tick` calls so far, running or not.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Number of policy consultations that returned an error.
    pub fn failed_decisions(&self) -> u64 {
        self.failed_decisions
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("policy", &self.policy.name())
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("queue", &self.queue)
            .field("tick_counter", &self.tick_counter)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
