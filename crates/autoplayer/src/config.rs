//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `AUTOPLAYER_*` environment variables. An environment variable that does
//! not parse is logged and ignored, keeping the previous layer's value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use autoplayer_core::feed::DEFAULT_FETCH_INTERVAL_TICKS;
use autoplayer_core::policy::{
    DecisionPolicy, GroundReflexPolicy, TerrainAwarePolicy, DEFAULT_REFLEX_IDLE_THRESHOLD,
};
use autoplayer_remote::{RemoteError, RemotePolicy, DEFAULT_DECISION_URL, DEFAULT_GAME_STATE_URL};
use serde::{Deserialize, Serialize};

pub const ENV_POLICY: &str = "AUTOPLAYER_POLICY";
pub const ENV_GAME_STATE_URL: &str = "AUTOPLAYER_GAME_STATE_URL";
pub const ENV_DECISION_URL: &str = "AUTOPLAYER_DECISION_URL";
pub const ENV_FETCH_INTERVAL: &str = "AUTOPLAYER_FETCH_INTERVAL";
pub const ENV_HTTP_TIMEOUT_MS: &str = "AUTOPLAYER_HTTP_TIMEOUT_MS";
pub const ENV_REFLEX_IDLE_THRESHOLD: &str = "AUTOPLAYER_REFLEX_IDLE_THRESHOLD";
pub const ENV_LOG: &str = "AUTOPLAYER_LOG";
pub const ENV_DEBUG_LOG: &str = "AUTOPLAYER_DEBUG_LOG";

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 100;
const DEFAULT_LOG_FILTER: &str = "warn";

// ---------------------------------------------------------------------------
// PolicyChoice
// ---------------------------------------------------------------------------

/// Which decision backend drives dynamic playback.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PolicyChoice {
    /// Local greedy lookahead over the terrain grid.
    Terrain,
    /// Local jump-once-per-ground-contact reflex.
    Reflex,
    /// HTTP decision service.
    #[default]
    Remote,
}

impl fmt::Display for PolicyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyChoice::Terrain => "terrain",
            PolicyChoice::Reflex => "reflex",
            PolicyChoice::Remote => "remote",
        })
    }
}

impl FromStr for PolicyChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terrain" => Ok(PolicyChoice::Terrain),
            "reflex" => Ok(PolicyChoice::Reflex),
            "remote" => Ok(PolicyChoice::Remote),
            other => Err(format!("unknown policy '{other}' (expected terrain, reflex or remote)")),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// AutoplayConfig
// ---------------------------------------------------------------------------

/// Complete autoplayer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    pub policy: PolicyChoice,
    pub game_state_url: String,
    pub decision_url: String,
    /// Host ticks between snapshot fetches.
    pub fetch_interval_ticks: u32,
    pub http_timeout_ms: u64,
    /// Idle consultations before the ground-reflex latch re-arms.
    pub reflex_idle_threshold: u32,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// When set, logs go to this file instead of stderr.
    pub debug_log_path: Option<PathBuf>,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            policy: PolicyChoice::default(),
            game_state_url: DEFAULT_GAME_STATE_URL.to_owned(),
            decision_url: DEFAULT_DECISION_URL.to_owned(),
            fetch_interval_ticks: DEFAULT_FETCH_INTERVAL_TICKS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            reflex_idle_threshold: DEFAULT_REFLEX_IDLE_THRESHOLD,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            debug_log_path: None,
        }
    }
}

impl AutoplayConfig {
    /// Defaults, overlaid with `path` (if any), overlaid with the process
    /// environment, then validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing keys take their default values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Overlay `AUTOPLAYER_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Overlay variables obtained through `lookup`.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(policy) = read_env_parsed(&lookup, ENV_POLICY) {
            self.policy = policy;
        }
        if let Some(url) = read_env_string(&lookup, ENV_GAME_STATE_URL) {
            self.game_state_url = url;
        }
        if let Some(url) = read_env_string(&lookup, ENV_DECISION_URL) {
            self.decision_url = url;
        }
        if let Some(interval) = read_env_parsed(&lookup, ENV_FETCH_INTERVAL) {
            self.fetch_interval_ticks = interval;
        }
        if let Some(timeout) = read_env_parsed(&lookup, ENV_HTTP_TIMEOUT_MS) {
            self.http_timeout_ms = timeout;
        }
        if let Some(threshold) = read_env_parsed(&lookup, ENV_REFLEX_IDLE_THRESHOLD) {
            self.reflex_idle_threshold = threshold;
        }
        if let Some(filter) = read_env_string(&lookup, ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(path) = read_env_string(&lookup, ENV_DEBUG_LOG) {
            self.debug_log_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_interval_ticks == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch_interval_ticks",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "http_timeout_ms",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Instantiate the configured decision policy.
    pub fn build_policy(&self) -> Result<Box<dyn DecisionPolicy>, RemoteError> {
        Ok(match self.policy {
            PolicyChoice::Terrain => Box::new(TerrainAwarePolicy::default()),
            PolicyChoice::Reflex => Box::new(GroundReflexPolicy::new(self.reflex_idle_threshold)),
            PolicyChoice::Remote => {
                Box::new(RemotePolicy::new(&self.decision_url, self.http_timeout())?)
            }
        })
    }
}

fn read_env_string(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn read_env_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = read_env_string(lookup, name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "ignoring unparseable environment variable");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
