//! Decision policies: snapshot in, maneuver out.
//!
//! Every backend implements [`DecisionPolicy`]. The sequencer depends only on
//! the trait, so a purely local heuristic and a remote service are swapped by
//! configuration without touching playback.
//!
//! Two local policies are provided:
//!
//! - [`GroundReflexPolicy`]: jump once per ground contact, guarded by a latch
//!   that self-clears after a bounded number of idle consultations.
//! - [`TerrainAwarePolicy`]: greedy one-step lookahead using the terrain
//!   queries. Stateless, so identical snapshots always yield identical
//!   maneuvers.
//!
//! # Example
//!
//! ```
//! use autoplayer_core::policy::{DecisionPolicy, TerrainAwarePolicy};
//! use autoplayer_core::maneuver::ManeuverKind;
//! use autoplayer_core::snapshot::WorldSnapshot;
//!
//! let mut policy = TerrainAwarePolicy::default();
//!
//! // No snapshot is a defined input: it yields the no-op maneuver.
//! let m = policy.decide(None).unwrap();
//! assert_eq!(m.kind(), ManeuverKind::NoOp);
//!
//! // No terrain data means no safe ground: retreat to the short move.
//! let m = policy.decide(Some(&WorldSnapshot::default())).unwrap();
//! assert_eq!(m.kind(), ManeuverKind::RightShortMove);
//! ```

use crate::maneuver::{Maneuver, LONG_COMBO_HORIZONTAL_DISTANCE};
use crate::snapshot::WorldSnapshot;
use crate::terrain::{has_landable_ground, would_hit_hazard};
use crate::PolicyError;

/// Default number of idle consultations after which the ground-reflex latch
/// re-arms. Tuned to a snapshot feed polling roughly every 100 frames.
pub const DEFAULT_REFLEX_IDLE_THRESHOLD: u32 = 2;

// ---------------------------------------------------------------------------
// DecisionPolicy
// ---------------------------------------------------------------------------

/// A backend that maps the latest snapshot to the next maneuver.
///
/// `decide` must be total for `None` (return the no-op maneuver). An `Err` is
/// treated by the caller as "no decision this time" and never aborts the tick
/// loop. Implementations should report failures as `Err`; a panic is caught
/// by the [`Sequencer`](crate::sequencer::Sequencer), counted as a failed
/// decision, and followed by [`reset`](Self::reset), since the policy's
/// state may be half-updated. Panics are only caught in builds that unwind.
pub trait DecisionPolicy: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Choose the next maneuver for `snapshot`.
    fn decide(&mut self, snapshot: Option<&WorldSnapshot>) -> Result<Maneuver, PolicyError>;

    /// Forget any per-session state. Called when dynamic playback starts.
    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
// GroundReflexPolicy
// ---------------------------------------------------------------------------

/// Jump once per ground contact.
///
/// The "already jumped" latch clears when the player is seen off the ground,
/// or, when `idle_threshold` is set, after more than that many consecutive
/// consultations since the jump. The timeout covers ground transitions the
/// poller never observed.
#[derive(Debug, Clone)]
pub struct GroundReflexPolicy {
    idle_threshold: Option<u32>,
    jumped: bool,
    consultations_since_jump: u32,
}

impl GroundReflexPolicy {
    /// Create a policy whose latch times out after `idle_threshold` idle
    /// consultations.
    pub fn new(idle_threshold: u32) -> Self {
        Self {
            idle_threshold: Some(idle_threshold),
            jumped: false,
            consultations_since_jump: 0,
        }
    }

    /// Create a policy whose latch only clears when the player leaves the
    /// ground.
    pub fn without_timeout() -> Self {
        Self {
            idle_threshold: None,
            jumped: false,
            consultations_since_jump: 0,
        }
    }

    /// Whether a jump has been issued for the current ground contact.
    pub fn is_latched(&self) -> bool {
        self.jumped
    }
}

impl Default for GroundReflexPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REFLEX_IDLE_THRESHOLD)
    }
}

impl DecisionPolicy for GroundReflexPolicy {
    fn name(&self) -> &'static str {
        "ground-reflex"
    }

    fn decide(&mut self, snapshot: Option<&WorldSnapshot>) -> Result<Maneuver, PolicyError> {
        self.consultations_since_jump = self.consultations_since_jump.saturating_add(1);

        let Some(snapshot) = snapshot else {
            tracing::debug!(policy = self.name(), "no snapshot; no-op");
            return Ok(Maneuver::no_op());
        };
        let on_ground = snapshot.player.on_ground;

        tracing::debug!(
            on_ground,
            latched = self.jumped,
            consultations = self.consultations_since_jump,
            y = snapshot.player.y,
            speed_y = snapshot.player.speed_y,
            "ground-reflex consulted"
        );

        if !on_ground {
            self.jumped = false;
        }

        if let Some(threshold) = self.idle_threshold {
            if self.jumped && self.consultations_since_jump > threshold {
                tracing::debug!(
                    consultations = self.consultations_since_jump,
                    "ground-reflex latch timed out"
                );
                self.jumped = false;
                self.consultations_since_jump = 0;
            }
        }

        if on_ground && !self.jumped {
            self.jumped = true;
            self.consultations_since_jump = 0;
            return Ok(Maneuver::jump());
        }

        Ok(Maneuver::no_op())
    }

    fn reset(&mut self) {
        self.jumped = false;
        self.consultations_since_jump = 0;
    }
}

// ---------------------------------------------------------------------------
// TerrainAwarePolicy
// ---------------------------------------------------------------------------

/// Greedy one-step lookahead over a single probe point.
///
/// The probe is `player.x + lookahead` at the player's current height. In
/// order, first match wins:
///
/// 1. probe inside a spike danger band -> short right move
/// 2. no landable ground near the probe -> short right move
/// 3. otherwise -> long jump-dash combo
///
/// Intermediate distances are never tried: an unsafe long combo always falls
/// back to the short move.
#[derive(Debug, Clone, Copy)]
pub struct TerrainAwarePolicy {
    lookahead: f32,
}

impl TerrainAwarePolicy {
    /// Probe `lookahead` pixels ahead of the player instead of the long
    /// combo's calibrated distance.
    pub fn with_lookahead(lookahead: f32) -> Self {
        Self { lookahead }
    }

    /// Pure decision for a present snapshot.
    pub fn choose(&self, snapshot: &WorldSnapshot) -> Maneuver {
        let landing_x = snapshot.player.x + self.lookahead;
        let current_y = snapshot.player.y;

        let hazard = would_hit_hazard(landing_x, current_y, snapshot);
        let ground = !hazard && has_landable_ground(landing_x, current_y, snapshot);
        let maneuver = if ground {
            Maneuver::long_jump_dash_combo()
        } else {
            Maneuver::right_short_move()
        };

        tracing::debug!(
            x = snapshot.player.x,
            y = current_y,
            landing_x,
            hazard,
            ground,
            maneuver = %maneuver.kind(),
            "terrain-aware decision"
        );
        maneuver
    }
}

impl Default for TerrainAwarePolicy {
    fn default() -> Self {
        Self {
            lookahead: LONG_COMBO_HORIZONTAL_DISTANCE,
        }
    }
}

impl DecisionPolicy for TerrainAwarePolicy {
    fn name(&self) -> &'static str {
        "terrain-aware"
    }

    fn decide(&mut self, snapshot: Option<&WorldSnapshot>) -> Result<Maneuver, PolicyError> {
        Ok(match snapshot {
            Some(snapshot) => self.choose(snapshot),
            None => Maneuver::no_op(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
