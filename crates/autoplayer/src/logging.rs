//! Subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured filter is used, and an
//! unparseable filter falls back to `warn`. With a debug log path configured,
//! output goes to that file (appended, no ANSI colours) instead of stderr. A
//! file that cannot be opened is reported and stderr is used instead.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` first, then `fallback`, then `warn`.
pub fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init(filter: &str, debug_log: Option<&Path>) -> bool {
    let Some(path) = debug_log else {
        return tracing_subscriber::fmt()
            .with_env_filter(build_filter(filter))
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok();
    };

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let installed = tracing_subscriber::fmt()
                .with_env_filter(build_filter(filter))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .is_ok();
            if installed {
                tracing::info!(path = %path.display(), "debug log opened");
            }
            installed
        }
        Err(e) => {
            let installed = tracing_subscriber::fmt()
                .with_env_filter(build_filter(filter))
                .with_writer(std::io::stderr)
                .try_init()
                .is_ok();
            tracing::warn!(path = %path.display(), error = %e, "could not open debug log; logging to stderr");
            installed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_falls_back() {
        // Must not panic whatever RUST_LOG holds.
        let _ = build_filter("[[[not a filter");
        let _ = build_filter("autoplayer_core=trace");
    }

    #[test]
    fn writes_to_debug_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoplayer.log");
        if init("info", Some(&path)) {
            tracing::error!("hello from the test");
            let text = std::fs::read_to_string(&path).unwrap();
            if std::env::var_os("RUST_LOG").is_none() {
                assert!(text.contains("hello from the test"));
            }
            assert!(!text.contains('\u{1b}'), "no ANSI escapes in the file");
        }
    }
}
