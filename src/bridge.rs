//! The bridge instance and its three host entry points.
//!
//! A [`MetricsBridge`] owns one [`Settings`] and one [`reqwest::Client`] for
//! its whole life. Both are read-only after [`MetricsBridgeBuilder::build`],
//! so the bridge is `Send + Sync` and its entry points take `&self`. Wrap it
//! in an `Arc` to call from several tasks at once.
//!
//! Dropping a future returned by [`MetricsBridge::check_health`] or
//! [`MetricsBridge::query_data`] aborts its in-flight request.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{error, info};

use crate::error::BridgeError;
use crate::health::{self, HealthVerdict};
use crate::metrics::BridgeMetrics;
use crate::query::{self, DataQuery, ResponseEnvelope};
use crate::settings::{load_settings, Settings};
use crate::transport::{build_client, TransportOptions};

pub struct MetricsBridge {
    uid: String,
    settings: Settings,
    client: reqwest::Client,
    metrics: Option<BridgeMetrics>,
}

impl MetricsBridge {
    pub fn builder() -> MetricsBridgeBuilder {
        MetricsBridgeBuilder::default()
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metrics(&self) -> Option<&BridgeMetrics> {
        self.metrics.as_ref()
    }

    /// Probe the liveness endpoint.
    ///
    /// # Panics
    /// This function never panics.
    pub async fn check_health(&self) -> HealthVerdict {
        let start = Instant::now();
        let verdict = health::probe(Some(&self.settings), Some(&self.client)).await;
        if let Some(m) = &self.metrics {
            m.record_health_check(start.elapsed());
        }
        verdict
    }

    /// Execute a query batch.
    ///
    /// # Errors
    /// [`BridgeError::Validation`] when the batch names no metric or holds an
    /// undecodable payload. Scrape failures are reported per query inside
    /// the returned envelope.
    pub async fn query_data(&self, queries: &[DataQuery]) -> Result<ResponseEnvelope, BridgeError> {
        query::execute(&self.client, &self.settings, queries, self.metrics.as_ref()).await
    }
}

impl std::fmt::Debug for MetricsBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsBridge")
            .field("uid", &self.uid)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MetricsBridge`].
///
/// # Example
/// ```rust,ignore
/// let bridge = MetricsBridge::builder()
///     .instance_uid("homelab")
///     .configuration(br#"{"metricsUrl":"http://127.0.0.1:2112/metrics"}"#.to_vec())
///     .secret("apiKey", api_key)
///     .build()?;
/// ```
#[derive(Default)]
pub struct MetricsBridgeBuilder {
    uid: String,
    configuration: Vec<u8>,
    secrets: HashMap<String, String>,
    transport: TransportOptions,
    metrics: Option<BridgeMetrics>,
}

impl MetricsBridgeBuilder {
    /// Host-assigned instance identifier. **Required**.
    pub fn instance_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Raw JSON configuration blob.
    pub fn configuration(mut self, blob: impl Into<Vec<u8>>) -> Self {
        self.configuration = blob.into();
        self
    }

    /// Replace the decrypted secret map.
    pub fn secrets(mut self, secrets: HashMap<String, String>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Add one decrypted secret.
    pub fn secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    pub fn transport(mut self, options: TransportOptions) -> Self {
        self.transport = options;
        self
    }

    /// Attach the collectors outcomes are reported into.
    pub fn metrics(mut self, metrics: BridgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume the builder.
    ///
    /// # Errors
    /// [`BridgeError::Configuration`] for an empty instance uid, unusable
    /// settings or secrets, or transport options the client rejects.
    pub fn build(self) -> Result<MetricsBridge, BridgeError> {
        info!("initializing metrics bridge");

        if self.uid.trim().is_empty() {
            error!("instance settings are missing a uid");
            return Err(BridgeError::configuration("instance uid must not be empty"));
        }

        let settings = load_settings(&self.configuration, &self.secrets).map_err(|e| {
            error!(uid = %self.uid, error = %e, "failed to load settings");
            e
        })?;

        let client = build_client(&self.transport).map_err(|e| {
            error!(uid = %self.uid, error = %e, "failed to build HTTP client");
            e
        })?;

        info!(
            uid = %self.uid,
            health_url = %settings.health_url,
            metrics_url = %settings.metrics_url,
            "metrics bridge initialized"
        );

        Ok(MetricsBridge {
            uid: self.uid,
            settings,
            client,
            metrics: self.metrics,
        })
    }
}
