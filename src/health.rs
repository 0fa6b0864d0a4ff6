//! Health prober.
//!
//! Issues one authenticated GET against the liveness endpoint and folds every
//! possible result into a [`HealthVerdict`]. Local invariants are checked
//! before any I/O, so a missing API key never costs a round trip.

use serde::Serialize;
use tracing::{debug, warn};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Ok => write!(f, "ok"),
            HealthStatus::Error => write!(f, "error"),
        }
    }
}

/// Outcome of a liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthVerdict {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Probe `settings.health_url` with `client`.
///
/// Checks run in this order, and the first failure decides the verdict:
/// 1. settings present
/// 2. client present
/// 3. non-empty API key (no request is sent otherwise)
/// 4. request construction
/// 5. transport
/// 6. 2xx status
///
/// # Panics
/// This function never panics.
pub async fn probe(settings: Option<&Settings>, client: Option<&reqwest::Client>) -> HealthVerdict {
    let Some(settings) = settings else {
        warn!("health check failed: settings are not initialized");
        return HealthVerdict::error("settings not initialized");
    };

    let Some(client) = client else {
        warn!("health check failed: HTTP client is not initialized");
        return HealthVerdict::error("client not initialized");
    };

    let Some(api_key) = settings.api_key() else {
        warn!("health check failed: missing API key");
        return HealthVerdict::error("missing API key");
    };

    let url = settings.health_url.as_str();
    let request = match client.get(url).bearer_auth(api_key).build() {
        Ok(req) => req,
        Err(e) => {
            warn!(url = %url, error = %e, "health check request could not be built");
            return HealthVerdict::error(format!("failed to create health check request: {e}"));
        }
    };

    let resp = match client.execute(request).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(url = %url, error = %e, "health check request failed");
            return HealthVerdict::error(format!("request error: {e}"));
        }
    };

    let status = resp.status();
    let verdict = verdict_for_status(status);
    if verdict.is_ok() {
        debug!(url = %url, status = status.as_u16(), "health check passed");
    } else {
        warn!(url = %url, status = status.as_u16(), "health check got non-2xx response");
    }
    verdict
}

/// Only 200..=299 is healthy.
pub fn verdict_for_status(status: reqwest::StatusCode) -> HealthVerdict {
    if status.is_success() {
        HealthVerdict::ok("healthy")
    } else {
        HealthVerdict::error(format!("unexpected response: {status}"))
    }
}
