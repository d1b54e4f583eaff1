//! Playback recording and tape verification.
//!
//! A [`PlaybackRecorder`] observes every action the driver emits and
//! run-length encodes the session into a tape of [`InputFrame`]s, with a
//! [`DecisionRecord`] for each plan accepted along the way. The finished
//! [`PlaybackLog`] serializes to JSON.
//!
//! [`verify_tape`] plays a log's tape back through a fresh scripted
//! [`Sequencer`] and compares every tick against the tape, reporting the
//! first [`TapeDivergence`]. A recorded dynamic session thereby becomes a
//! deterministic scripted regression fixture.
//!
//! # Example
//!
//! ```
//! use autoplayer::recording::{verify_tape, PlaybackRecorder};
//! use autoplayer_core::action::Action;
//!
//! let mut recorder = PlaybackRecorder::new();
//! for tick in 1..=6 {
//!     let action = if tick <= 4 { Action::RIGHT } else { Action::JUMP };
//!     recorder.record(tick, action, None);
//! }
//! let log = recorder.finish();
//! assert_eq!(log.tape.len(), 2);
//!
//! let result = verify_tape(&log);
//! assert_eq!(result.ticks_replayed, 6);
//! assert!(result.first_divergence.is_none());
//! ```

use autoplayer_core::action::{Action, InputFrame};
use autoplayer_core::feed::SnapshotCell;
use autoplayer_core::maneuver::ManeuverKind;
use autoplayer_core::policy::TerrainAwarePolicy;
use autoplayer_core::sequencer::{Decision, Sequencer};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlaybackLog
// ---------------------------------------------------------------------------

/// A recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackLog {
    /// Number of ticks recorded.
    pub total_ticks: u64,
    /// Tick number of the first recorded tick.
    pub first_tick: Option<u64>,
    /// Run-length encoded actions, `NONE` runs included.
    pub tape: Vec<InputFrame>,
    /// Plans accepted during the session, in tick order.
    pub decisions: Vec<DecisionRecord>,
}

/// One accepted plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub tick: u64,
    pub policy: String,
    pub maneuver: ManeuverKind,
    pub snapshot_digest: Option<String>,
}

impl From<&Decision> for DecisionRecord {
    fn from(d: &Decision) -> Self {
        Self {
            tick: d.tick,
            policy: d.policy.clone(),
            maneuver: d.maneuver.kind(),
            snapshot_digest: d.snapshot_digest.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackRecorder
// ---------------------------------------------------------------------------

/// Builds a [`PlaybackLog`] one tick at a time.
///
/// Tick numbers must be strictly increasing across calls to
/// [`record`](Self::record).
#[derive(Debug, Default)]
pub struct PlaybackRecorder {
    log: PlaybackLog,
    run: Option<(Action, u32)>,
    last_tick: Option<u64>,
}

impl PlaybackRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the action emitted on `tick`, and the plan accepted on it if
    /// any.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not greater than the previously recorded tick.
    pub fn record(&mut self, tick: u64, action: Action, decision: Option<&Decision>) {
        if let Some(last) = self.last_tick {
            assert!(
                tick > last,
                "ticks must be recorded in increasing order (got {tick} after {last})"
            );
        }
        self.last_tick = Some(tick);
        self.log.first_tick.get_or_insert(tick);
        self.log.total_ticks += 1;

        if let Some(decision) = decision {
            self.log.decisions.push(DecisionRecord::from(decision));
        }

        self.run = match self.run.take() {
            Some((current, held)) if current == action && held < u32::MAX => {
                Some((current, held + 1))
            }
            Some((current, held)) => {
                self.log.tape.push(InputFrame::new(current, held));
                Some((action, 1))
            }
            None => Some((action, 1)),
        };
    }

    /// Ticks recorded so far.
    pub fn ticks(&self) -> u64 {
        self.log.total_ticks
    }

    /// Close the current run and return the log.
    pub fn finish(mut self) -> PlaybackLog {
        if let Some((action, held)) = self.run.take() {
            self.log.tape.push(InputFrame::new(action, held));
        }
        tracing::debug!(
            ticks = self.log.total_ticks,
            runs = self.log.tape.len(),
            decisions = self.log.decisions.len(),
            "recording finished"
        );
        self.log
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// First tick where playback disagreed with the tape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeDivergence {
    /// 1-based tick index within the tape.
    pub tick: u64,
    pub expected: Action,
    pub actual: Action,
}

/// Outcome of [`verify_tape`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub ticks_replayed: u64,
    pub first_divergence: Option<TapeDivergence>,
}

impl VerifyResult {
    pub fn is_ok(&self) -> bool {
        self.first_divergence.is_none()
    }
}

/// Play the tape back through a scripted sequencer and compare each tick.
///
/// Exactly `total_ticks` ticks are played. Ticks past the end of the tape
/// are expected to be `NONE`.
pub fn verify_tape(log: &PlaybackLog) -> VerifyResult {
    let feed = SnapshotCell::new();
    let mut sequencer = Sequencer::new(Box::new(TerrainAwarePolicy::default()));
    sequencer.start(log.tape.clone());

    let mut expected = log
        .tape
        .iter()
        .flat_map(|f| std::iter::repeat(f.action()).take(f.frames() as usize));

    for tick in 1..=log.total_ticks {
        let want = expected.next().unwrap_or(Action::NONE);
        let got = sequencer.tick(&feed);
        if got != want {
            tracing::warn!(tick, expected = %want, actual = %got, "tape divergence");
            return VerifyResult {
                ticks_replayed: tick,
                first_divergence: Some(TapeDivergence {
                    tick,
                    expected: want,
                    actual: got,
                }),
            };
        }
    }

    VerifyResult {
        ticks_replayed: log.total_ticks,
        first_divergence: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
