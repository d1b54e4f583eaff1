//! Snapshot feed boundary.
//!
//! Snapshots arrive on their own schedule (typically a network fetch that
//! completes some ticks after it was requested, or never). The core only ever
//! asks two non-blocking questions:
//!
//! - [`SnapshotSource::latest`]: the most recent snapshot, if any.
//! - [`SnapshotSource::consume_fresh`]: has a new one arrived since I last
//!   asked? True at most once per publish.
//!
//! [`SnapshotCell`] is the single-producer/single-consumer handoff between a
//! fetch worker and the tick loop: last value wins, and the fresh flag is a
//! separate atomic set only after the value is visible. [`FetchScheduler`]
//! decides on which ticks a fetch should be requested.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::snapshot::WorldSnapshot;

/// Default number of ticks between fetch requests.
pub const DEFAULT_FETCH_INTERVAL_TICKS: u32 = 100;

// ---------------------------------------------------------------------------
// SnapshotSource
// ---------------------------------------------------------------------------

/// Read side of the snapshot feed.
pub trait SnapshotSource {
    /// The most recently published snapshot, if any.
    fn latest(&self) -> Option<Arc<WorldSnapshot>>;

    /// Returns true, and clears the flag, if a snapshot was published since
    /// the previous call.
    fn consume_fresh(&self) -> bool;
}

/// Write side of the fetch cadence: something that can start a snapshot
/// fetch without blocking the caller.
pub trait FetchTrigger {
    /// Ask for a fetch. Returns false when the request was dropped, e.g.
    /// because one is already in flight.
    fn request_fetch(&self) -> bool;
}

// ---------------------------------------------------------------------------
// SnapshotCell
// ---------------------------------------------------------------------------

/// Last-value-wins snapshot slot with a consume-once freshness flag.
///
/// Share it between the writer and the tick loop with an `Arc`.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    latest: Mutex<Option<Arc<WorldSnapshot>>>,
    fresh: AtomicBool,
    published: AtomicU64,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot and raise the fresh flag.
    pub fn publish(&self, snapshot: WorldSnapshot) {
        let snapshot = Arc::new(snapshot);
        {
            let mut slot = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(snapshot);
        }
        // Raised after the store so a reader that sees the flag sees the value.
        self.fresh.store(true, Ordering::Release);
        let count = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(published = count, "snapshot published");
    }

    /// Drop the stored snapshot and any pending fresh flag.
    pub fn clear(&self) {
        let mut slot = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        self.fresh.store(false, Ordering::Release);
    }

    /// Whether a fresh snapshot is pending, without consuming it.
    pub fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    /// Total number of snapshots published since creation.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl SnapshotSource for SnapshotCell {
    fn latest(&self) -> Option<Arc<WorldSnapshot>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn consume_fresh(&self) -> bool {
        self.fresh.swap(false, Ordering::AcqRel)
    }
}

// ---------------------------------------------------------------------------
// FetchScheduler
// ---------------------------------------------------------------------------

/// Tick-counting fetch cadence.
///
/// The first tick after enabling is due immediately; afterwards a fetch is due
/// every `interval` ticks.
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    interval: u32,
    remaining: u32,
    enabled: bool,
}

impl FetchScheduler {
    /// Create an enabled scheduler.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn new(interval: u32) -> Self {
        assert!(interval > 0, "fetch interval must be at least one tick");
        Self {
            interval,
            remaining: 0,
            enabled: true,
        }
    }

    /// Advance one tick. Returns true when a fetch should be requested now.
    pub fn on_tick(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        if self.remaining == 0 {
            self.remaining = self.interval - 1;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }

    /// Enable or disable the cadence. Re-enabling makes the next tick due.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.remaining = 0;
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }
}

impl Default for FetchScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_INTERVAL_TICKS)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. SnapshotCell -----------------------------------------------------

    #[test]
    fn empty_cell_has_nothing() {
        let cell = SnapshotCell::new();
        assert!(cell.latest().is_none());
        assert!(!cell.consume_fresh());
        assert_eq!(cell.published_count(), 0);
    }

    #[test]
    fn fresh_flag_is_consumed_once() {
        let cell = SnapshotCell::new();
        cell.publish(WorldSnapshot::default());
        assert!(cell.is_fresh());
        assert!(cell.consume_fresh());
        assert!(!cell.consume_fresh());
        // The value itself stays available.
        assert!(cell.latest().is_some());
    }

    #[test]
    fn last_value_wins() {
        let cell = SnapshotCell::new();
        for x in 0..5 {
            let mut snap = WorldSnapshot::default();
            snap.player.x = x as f32;
            cell.publish(snap);
        }
        assert_eq!(cell.latest().unwrap().player.x, 4.0);
        assert!(cell.consume_fresh());
        assert!(!cell.consume_fresh());
        assert_eq!(cell.published_count(), 5);
    }

    #[test]
    fn clear_drops_value_and_flag() {
        let cell = SnapshotCell::new();
        cell.publish(WorldSnapshot::default());
        cell.clear();
        assert!(cell.latest().is_none());
        assert!(!cell.consume_fresh());
    }

    #[test]
    fn publish_from_another_thread() {
        let cell = Arc::new(SnapshotCell::new());
        let writer = Arc::clone(&cell);
        std::thread::spawn(move || {
            let mut snap = WorldSnapshot::default();
            snap.room_name = "b-02".to_owned();
            writer.publish(snap);
        })
        .join()
        .unwrap();
        assert!(cell.consume_fresh());
        assert_eq!(cell.latest().unwrap().room_name, "b-02");
    }

    // -- 2. FetchScheduler ---------------------------------------------------

    #[test]
    fn first_tick_is_due_then_every_interval() {
        let mut sched = FetchScheduler::new(3);
        let due: Vec<bool> = (0..7).map(|_| sched.on_tick()).collect();
        assert_eq!(due, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn interval_of_one_fires_every_tick() {
        let mut sched = FetchScheduler::new(1);
        assert!((0..10).all(|_| sched.on_tick()));
    }

    #[test]
    fn disabled_scheduler_never_fires_and_reenable_is_immediate() {
        let mut sched = FetchScheduler::new(5);
        assert!(sched.on_tick());
        sched.set_enabled(false);
        assert!(!(0..20).any(|_| sched.on_tick()));
        sched.set_enabled(true);
        assert!(sched.on_tick());
        assert!(!sched.on_tick());
    }

    #[test]
    #[should_panic(expected = "at least one tick")]
    fn zero_interval_panics() {
        let _ = FetchScheduler::new(0);
    }
}
