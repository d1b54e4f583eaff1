//! Game-state fetching.
//!
//! [`GameStateClient`] performs one blocking GET against the game-state
//! endpoint. [`SnapshotPoller`] runs that client on a dedicated worker thread:
//! the tick loop calls [`SnapshotPoller::request`] (never blocks), the worker
//! performs the fetch and publishes any snapshot into the shared
//! [`SnapshotCell`]. Requests are carried by a capacity-one channel, so at
//! most one fetch is queued behind the one in flight and extra requests are
//! dropped.
//!
//! Every failure (timeout, refused connection, bad status, malformed body) is
//! logged and swallowed inside the worker. The consumer only ever observes
//! "no fresh snapshot".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use autoplayer_core::feed::{FetchTrigger, SnapshotCell};
use autoplayer_core::snapshot::WorldSnapshot;
use crossbeam_channel::{Sender, TrySendError};
use reqwest::blocking::Client;

use crate::wire::parse_game_state;
use crate::RemoteError;

/// Game-state endpoint exposed by the in-game TAS tooling.
pub const DEFAULT_GAME_STATE_URL: &str = "http://localhost:32270/tas/game_state";

/// Fetches are expected to be local and fast; anything slower is dropped.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// GameStateClient
// ---------------------------------------------------------------------------

/// Blocking client for the game-state endpoint.
#[derive(Debug, Clone)]
pub struct GameStateClient {
    http: Client,
    url: String,
}

impl GameStateClient {
    /// Build a client for `url` with the given request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let url = url.into();
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("autoplayer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RemoteError::Http {
                url: url.clone(),
                source,
            })?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the current game state. `Ok(None)` means the endpoint is up but
    /// not ready (no level loaded).
    pub fn fetch(&self) -> Result<Option<WorldSnapshot>, RemoteError> {
        let http_err = |source| RemoteError::Http {
            url: self.url.clone(),
            source,
        };
        let resp = self.http.get(&self.url).send().map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().map_err(http_err)?;
        tracing::trace!(bytes = body.len(), "game state received");
        parse_game_state(&body)
    }
}

// ---------------------------------------------------------------------------
// SnapshotPoller
// ---------------------------------------------------------------------------

/// Outcome counters of the poller's fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Fetches that published a snapshot.
    pub published: u64,
    /// Fetches answered with an empty or `null` body.
    pub not_ready: u64,
    /// Fetches that failed and were discarded.
    pub failed: u64,
    /// Requests dropped because one was already pending.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    not_ready: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Background worker that turns fetch requests into published snapshots.
///
/// Dropping the poller closes the request channel and joins the worker after
/// its current fetch (bounded by the client timeout) finishes.
#[derive(Debug)]
pub struct SnapshotPoller {
    requests: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl SnapshotPoller {
    /// Start the worker thread. Snapshots are published into `cell`.
    pub fn spawn(client: GameStateClient, cell: Arc<SnapshotCell>) -> Result<Self, RemoteError> {
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);

        let worker = std::thread::Builder::new()
            .name("autoplayer-fetch".to_owned())
            .spawn(move || {
                tracing::debug!(url = client.url(), "fetch worker started");
                for () in rx.iter() {
                    match client.fetch() {
                        Ok(Some(snapshot)) => {
                            tracing::debug!(
                                room = %snapshot.room_name,
                                x = snapshot.player.x,
                                y = snapshot.player.y,
                                on_ground = snapshot.player.on_ground,
                                "snapshot fetched"
                            );
                            cell.publish(snapshot);
                            worker_counters.published.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(None) => {
                            tracing::debug!("game state endpoint not ready");
                            worker_counters.not_ready.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "game state fetch failed");
                            worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                tracing::debug!("fetch worker stopped");
            })?;

        Ok(Self {
            requests: Some(tx),
            worker: Some(worker),
            counters,
        })
    }

    /// Ask the worker for a fetch. Never blocks; returns false if the request
    /// was dropped because one is already pending.
    pub fn request(&self) -> bool {
        let Some(tx) = &self.requests else {
            return false;
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                tracing::trace!("fetch already pending; request dropped");
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(())) => {
                tracing::warn!("fetch worker has exited; request dropped");
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            published: self.counters.published.load(Ordering::Relaxed),
            not_ready: self.counters.not_ready.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl FetchTrigger for SnapshotPoller {
    fn request_fetch(&self) -> bool {
        self.request()
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        // Closing the channel ends the worker's receive loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("fetch worker panicked");
            }
        }
    }
}
