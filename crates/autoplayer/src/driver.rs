//! Per-frame driver.
//!
//! [`Autoplayer`] is what a host calls once per game frame. Each
//! [`tick`](Autoplayer::tick):
//!
//! 1. Advances the [`FetchScheduler`] and, when a fetch is due, asks the
//!    fetch trigger (typically a background poller) for a new snapshot.
//! 2. Advances the [`Sequencer`] one tick against the shared snapshot cell.
//! 3. While playback is running, writes the resulting action into the
//!    [`VirtualGamepad`] (previous state rolled forward first). On the first
//!    tick after playback ends or is stopped, one released frame is written
//!    so no button stays held. After that the pad is left alone so the
//!    player's own input passes through.
//! 4. Feeds the recorder, if one is attached, and stores
//!    [`TickDiagnostics`].
//!
//! # Example
//!
//! ```
//! use autoplayer::driver::{Autoplayer, OPENING_PLAN};
//! use autoplayer_core::prelude::*;
//!
//! let mut player = Autoplayer::new(Box::new(TerrainAwarePolicy::default()), 100);
//! player.start_scripted(OPENING_PLAN.to_vec());
//!
//! for _ in 0..15 {
//!     assert_eq!(player.tick(), Action::RIGHT);
//! }
//! assert_eq!(player.tick(), Action::JUMP);
//! assert!(player.gamepad().just_pressed(Button::Jump));
//! assert!(!player.is_running());
//!
//! // The next tick releases everything.
//! assert_eq!(player.tick(), Action::NONE);
//! assert!(!player.gamepad().pressed(Button::Jump));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use autoplayer_core::action::{Action, InputFrame};
use autoplayer_core::feed::{FetchScheduler, FetchTrigger, SnapshotCell};
use autoplayer_core::input::{apply_action, VirtualGamepad};
use autoplayer_core::policy::DecisionPolicy;
use autoplayer_core::sequencer::{Decision, Sequencer, SequencerState};
use autoplayer_remote::{GameStateClient, RemoteError, SnapshotPoller};

use crate::config::AutoplayConfig;
use crate::recording::{PlaybackLog, PlaybackRecorder};

/// Walk right for 15 ticks, then jump: the scripted opening used to check
/// that injection reaches the game.
pub const OPENING_PLAN: [InputFrame; 2] = [
    InputFrame::new(Action::RIGHT, 15),
    InputFrame::new(Action::JUMP, 1),
];

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// What happened during the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Sequencer tick number (1-based).
    pub tick: u64,
    /// Action emitted.
    pub action: Action,
    /// Whether the gamepad was written this tick (the played action, or the
    /// release frame after playback ended).
    pub injected: bool,
    /// Whether a snapshot fetch was requested and accepted.
    pub fetch_requested: bool,
    /// Plan accepted on this tick, if any.
    pub decision: Option<Decision>,
    /// Wall-clock time spent inside `tick`.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Autoplayer
// ---------------------------------------------------------------------------

/// The autoplayer as seen by the host's frame hook.
pub struct Autoplayer {
    sequencer: Sequencer,
    feed: Arc<SnapshotCell>,
    scheduler: FetchScheduler,
    trigger: Option<Box<dyn FetchTrigger + Send>>,
    gamepad: VirtualGamepad,
    /// Set while the pad may still hold input written by playback.
    pad_engaged: bool,
    recorder: Option<PlaybackRecorder>,
    diagnostics: TickDiagnostics,
}

impl Autoplayer {
    /// Create an idle autoplayer with no fetch trigger attached.
    ///
    /// # Panics
    ///
    /// Panics if `fetch_interval_ticks` is zero.
    pub fn new(policy: Box<dyn DecisionPolicy>, fetch_interval_ticks: u32) -> Self {
        Self {
            sequencer: Sequencer::new(policy),
            feed: Arc::new(SnapshotCell::new()),
            scheduler: FetchScheduler::new(fetch_interval_ticks),
            trigger: None,
            gamepad: VirtualGamepad::new(),
            pad_engaged: false,
            recorder: None,
            diagnostics: TickDiagnostics::default(),
        }
    }

    /// Build the configured policy and a background poller for the
    /// configured game-state endpoint.
    pub fn from_config(config: &AutoplayConfig) -> Result<Self, RemoteError> {
        let policy = config.build_policy()?;
        let mut player = Self::new(policy, config.fetch_interval_ticks);
        let client = GameStateClient::new(&config.game_state_url, config.http_timeout())?;
        let poller = SnapshotPoller::spawn(client, player.feed())?;
        player.set_trigger(Box::new(poller));
        tracing::info!(
            policy = player.sequencer.policy_name(),
            game_state_url = %config.game_state_url,
            fetch_interval = config.fetch_interval_ticks,
            "autoplayer ready"
        );
        Ok(player)
    }

    /// Attach the component that performs fetches when they are due.
    pub fn set_trigger(&mut self, trigger: Box<dyn FetchTrigger + Send>) {
        self.trigger = Some(trigger);
    }

    /// Shared snapshot cell the fetcher should publish into.
    pub fn feed(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.feed)
    }

    /// Run one game frame.
    pub fn tick(&mut self) -> Action {
        let started = Instant::now();

        let fetch_requested = self.scheduler.on_tick()
            && self
                .trigger
                .as_ref()
                .is_some_and(|trigger| trigger.request_fetch());

        let was_running = self.sequencer.is_running();
        let outcome = self.sequencer.step(self.feed.as_ref());
        let tick = self.sequencer.tick_count();

        let injected = if was_running {
            self.gamepad.begin_frame();
            apply_action(outcome.action, &mut self.gamepad);
            self.pad_engaged = true;
            true
        } else if self.pad_engaged {
            self.gamepad.begin_frame();
            apply_action(Action::NONE, &mut self.gamepad);
            self.pad_engaged = false;
            tracing::debug!(tick, "playback ended; gamepad released");
            true
        } else {
            false
        };

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(tick, outcome.action, outcome.decision.as_ref());
        }

        self.diagnostics = TickDiagnostics {
            tick,
            action: outcome.action,
            injected,
            fetch_requested,
            decision: outcome.decision,
            total_time: started.elapsed(),
        };
        outcome.action
    }

    /// Play `plan` verbatim.
    pub fn start_scripted(&mut self, plan: Vec<InputFrame>) {
        self.sequencer.start(plan);
    }

    /// Play plans chosen by the decision policy.
    pub fn start_dynamic(&mut self) {
        self.sequencer.start_dynamic();
    }

    pub fn stop(&mut self) {
        self.sequencer.stop();
    }

    /// Hotkey behaviour: stop when running, otherwise start dynamic playback.
    /// Returns whether playback is running afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.sequencer.is_running() {
            self.stop();
        } else {
            self.start_dynamic();
        }
        tracing::info!(running = self.sequencer.is_running(), "autoplayer toggled");
        self.sequencer.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.sequencer.is_running()
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn set_policy(&mut self, policy: Box<dyn DecisionPolicy>) {
        self.sequencer.set_policy(policy);
    }

    /// Enable or disable snapshot fetching.
    pub fn set_fetching(&mut self, enabled: bool) {
        self.scheduler.set_enabled(enabled);
    }

    pub fn gamepad(&self) -> &VirtualGamepad {
        &self.gamepad
    }

    pub fn diagnostics(&self) -> &TickDiagnostics {
        &self.diagnostics
    }

    /// Start recording emitted actions, discarding any recording in progress.
    pub fn start_recording(&mut self) {
        self.recorder = Some(PlaybackRecorder::new());
    }

    /// Stop recording and return what was captured.
    pub fn finish_recording(&mut self) -> Option<PlaybackLog> {
        self.recorder.take().map(PlaybackRecorder::finish)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
