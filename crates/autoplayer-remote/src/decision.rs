//! Remote decision backend.
//!
//! [`RemotePolicy`] posts the current snapshot to a decision service and
//! plays back whatever plan it answers with. It implements the same
//! [`DecisionPolicy`] trait as the local heuristics, so the sequencer cannot
//! tell them apart.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `POST /api/decision/decide`: body is a flat camelCase
//!   [`DecisionRequest`] built from the snapshot; answer is `{"sequence":[{"action":<bits>,"frames":<n>}, ...]}`.
//! - `GET /api/decision/health`: answer is `{"status":"healthy"}`.

use std::time::Duration;

use autoplayer_core::maneuver::Maneuver;
use autoplayer_core::policy::DecisionPolicy;
use autoplayer_core::snapshot::WorldSnapshot;
use autoplayer_core::PolicyError;
use reqwest::blocking::{Client, Response};

use crate::wire::{DecisionRequest, DecisionResponse, HealthResponse};
use crate::RemoteError;

/// Base URL of a locally running decision service.
pub const DEFAULT_DECISION_URL: &str = "http://localhost:5001";

/// Decision policy backed by an HTTP service.
#[derive(Debug, Clone)]
pub struct RemotePolicy {
    http: Client,
    base_url: String,
}

impl RemotePolicy {
    /// Build a policy talking to `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("autoplayer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RemoteError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn decide_url(&self) -> String {
        format!("{}/api/decision/decide", self.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/api/decision/health", self.base_url)
    }

    /// Ask the service for a plan for `snapshot`.
    pub fn request(&self, snapshot: &WorldSnapshot) -> Result<Maneuver, RemoteError> {
        let url = self.decide_url();
        let resp = self
            .http
            .post(&url)
            .json(&DecisionRequest::from(snapshot))
            .send()
            .map_err(|source| RemoteError::Http {
                url: url.clone(),
                source,
            })?;
        let body = success_body(&url, resp)?;
        let decision: DecisionResponse =
            serde_json::from_str(&body).map_err(|source| RemoteError::Decode {
                what: "decision response",
                source,
            })?;
        decision.into_maneuver()
    }

    /// Check that the service is up and reports itself healthy.
    pub fn health(&self) -> Result<(), RemoteError> {
        let url = self.health_url();
        let resp = self.http.get(&url).send().map_err(|source| RemoteError::Http {
            url: url.clone(),
            source,
        })?;
        let body = success_body(&url, resp)?;
        let health: HealthResponse =
            serde_json::from_str(&body).map_err(|source| RemoteError::Decode {
                what: "health response",
                source,
            })?;
        if health.status.eq_ignore_ascii_case("healthy") {
            Ok(())
        } else {
            Err(RemoteError::Unhealthy {
                status: health.status,
            })
        }
    }
}

fn success_body(url: &str, resp: Response) -> Result<String, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(RemoteError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        });
    }
    resp.text().map_err(|source| RemoteError::Http {
        url: url.to_owned(),
        source,
    })
}

impl DecisionPolicy for RemotePolicy {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn decide(&mut self, snapshot: Option<&WorldSnapshot>) -> Result<Maneuver, PolicyError> {
        let Some(snapshot) = snapshot else {
            return Ok(Maneuver::no_op());
        };
        tracing::debug!(
            on_ground = snapshot.player.on_ground,
            y = snapshot.player.y,
            speed_y = snapshot.player.speed_y,
            "querying decision service"
        );
        self.request(snapshot).map_err(|e| match e {
            RemoteError::Malformed { reason } => PolicyError::MalformedPlan { reason },
            other => PolicyError::Backend {
                backend: "remote",
                message: other.to_string(),
            },
        })
    }
}
