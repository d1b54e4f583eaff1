//! Autoplayer Remote -- HTTP plumbing for the snapshot feed and the remote
//! decision backend.
//!
//! # Architecture
//!
//! - **`wire`**: the game-state endpoint's PascalCase JSON schema and its
//!   total conversion into [`WorldSnapshot`](autoplayer_core::snapshot::WorldSnapshot),
//!   plus the decision service's response shape.
//! - **`fetch`**: [`GameStateClient`] (one blocking GET) and
//!   [`SnapshotPoller`], a background worker that performs fetches on request
//!   and publishes results into a shared
//!   [`SnapshotCell`](autoplayer_core::feed::SnapshotCell). Failures never
//!   leave the worker.
//! - **`decision`**: [`RemotePolicy`], a
//!   [`DecisionPolicy`](autoplayer_core::policy::DecisionPolicy) that asks an
//!   HTTP decision service for the next plan.
//!
//! All HTTP is blocking `reqwest` with short timeouts. Nothing here runs on
//! the game's tick except [`SnapshotPoller::request`], which never blocks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use autoplayer_core::prelude::*;
//! use autoplayer_remote::{GameStateClient, SnapshotPoller, DEFAULT_GAME_STATE_URL};
//!
//! let cell = Arc::new(SnapshotCell::new());
//! let client = GameStateClient::new(DEFAULT_GAME_STATE_URL, Duration::from_millis(100)).unwrap();
//! let poller = SnapshotPoller::spawn(client, Arc::clone(&cell)).unwrap();
//!
//! poller.request();
//! // ... later, on some tick:
//! if cell.consume_fresh() {
//!     let snapshot = cell.latest();
//! }
//! ```

#![deny(unsafe_code)]

pub mod decision;
pub mod fetch;
pub mod wire;

pub use decision::{RemotePolicy, DEFAULT_DECISION_URL};
pub use fetch::{FetchStats, GameStateClient, SnapshotPoller, DEFAULT_GAME_STATE_URL};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The request could not be sent or timed out.
    #[error("request to {url} failed: {source}")]
    Http {
        /// The requested URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} answered with status {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not the expected JSON.
    #[error("could not decode {what}: {source}")]
    Decode {
        /// Which payload failed to decode.
        what: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The decision service returned a plan that cannot be played.
    #[error("malformed decision: {reason}")]
    Malformed {
        /// What was wrong with the plan.
        reason: String,
    },

    /// The health endpoint answered, but not with `healthy`.
    #[error("decision service reports status '{status}'")]
    Unhealthy {
        /// The reported status string.
        status: String,
    },

    /// The background fetch worker could not be started.
    #[error("failed to spawn fetch worker: {0}")]
    Worker(#[from] std::io::Error),
}
