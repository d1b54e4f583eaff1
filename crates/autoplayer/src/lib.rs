//! Autoplayer -- configuration, driver, recording and CLI glue.
//!
//! This crate wires [`autoplayer_core`] and [`autoplayer_remote`] into
//! something a host can call once per frame:
//!
//! - **`config`**: [`AutoplayConfig`](config::AutoplayConfig), layered from
//!   defaults, a JSON file and `AUTOPLAYER_*` environment variables.
//! - **`logging`**: `tracing-subscriber` setup with an optional debug log
//!   file.
//! - **`driver`**: [`Autoplayer`](driver::Autoplayer), the per-frame entry
//!   point (fetch cadence, sequencer, gamepad injection).
//! - **`recording`**: run-length recording of emitted actions and tape
//!   verification.
//!
//! The `autoplayer` binary exposes the same pieces as a headless CLI.

#![deny(unsafe_code)]

pub mod config;
pub mod driver;
pub mod logging;
pub mod recording;

/// Re-export the core crate for convenience.
pub use autoplayer_core;

/// Re-export the remote crate for convenience.
pub use autoplayer_remote;

/// Convenience re-exports for common autoplayer usage.
pub mod prelude {
    pub use autoplayer_core::prelude::*;

    pub use crate::config::{AutoplayConfig, ConfigError, PolicyChoice};
    pub use crate::driver::{Autoplayer, TickDiagnostics, OPENING_PLAN};
    pub use crate::recording::{
        verify_tape, DecisionRecord, PlaybackLog, PlaybackRecorder, TapeDivergence, VerifyResult,
    };
    pub use autoplayer_remote::{RemoteError, RemotePolicy, SnapshotPoller};
}
