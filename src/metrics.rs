//! Outcome counters for the bridge.
//!
//! [`BridgeMetrics`] registers its collectors against a caller-owned
//! [`prometheus::Registry`] and is handed to the bridge at construction.
//! Nothing here is process-global, so two bridges in one process can report
//! into separate registries.
//!
//! # Metrics
//! - `metrics_bridge_queries_total{outcome}` - query batches by outcome
//! - `metrics_bridge_health_checks_total` - health check calls
//! - `metrics_bridge_health_check_duration_seconds` - health check latency

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::BridgeError;

const NAMESPACE: &str = "metrics_bridge";

/// How a query batch ended, used as the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Found,
    NotFound,
    MalformedValue,
    TransportError,
    ValidationError,
}

impl QueryOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            QueryOutcome::Found => "found",
            QueryOutcome::NotFound => "not_found",
            QueryOutcome::MalformedValue => "malformed_value",
            QueryOutcome::TransportError => "transport_error",
            QueryOutcome::ValidationError => "validation_error",
        }
    }
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Prometheus collectors the bridge reports into.
#[derive(Clone)]
pub struct BridgeMetrics {
    registry: Registry,
    queries_total: IntCounterVec,
    health_checks_total: IntCounter,
    health_check_duration: Histogram,
}

impl BridgeMetrics {
    /// Create the collectors and register them with `registry`.
    ///
    /// # Errors
    /// [`BridgeError::Configuration`] if a collector with the same name is
    /// already registered.
    pub fn register(registry: &Registry) -> Result<Self, BridgeError> {
        let queries_total = IntCounterVec::new(
            Opts::new("queries_total", "Total number of query batches by outcome.").namespace(NAMESPACE),
            &["outcome"],
        )
        .map_err(prometheus_error)?;
        let health_checks_total = IntCounter::with_opts(
            Opts::new("health_checks_total", "Total number of health check calls.").namespace(NAMESPACE),
        )
        .map_err(prometheus_error)?;
        let health_check_duration = Histogram::with_opts(
            HistogramOpts::new("health_check_duration_seconds", "Duration of health check requests.")
                .namespace(NAMESPACE),
        )
        .map_err(prometheus_error)?;

        registry.register(Box::new(queries_total.clone())).map_err(prometheus_error)?;
        registry.register(Box::new(health_checks_total.clone())).map_err(prometheus_error)?;
        registry.register(Box::new(health_check_duration.clone())).map_err(prometheus_error)?;

        Ok(Self {
            registry: registry.clone(),
            queries_total,
            health_checks_total,
            health_check_duration,
        })
    }

    /// Collectors backed by a fresh private registry.
    pub fn standalone() -> Result<Self, BridgeError> {
        Self::register(&Registry::new())
    }

    pub fn record_query(&self, outcome: QueryOutcome) {
        self.queries_total.with_label_values(&[outcome.as_label()]).inc();
    }

    pub fn record_health_check(&self, elapsed: Duration) {
        self.health_checks_total.inc();
        self.health_check_duration.observe(elapsed.as_secs_f64());
    }

    pub fn queries(&self, outcome: QueryOutcome) -> u64 {
        self.queries_total.with_label_values(&[outcome.as_label()]).get()
    }

    pub fn health_checks(&self) -> u64 {
        self.health_checks_total.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, BridgeError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(prometheus_error)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for BridgeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeMetrics")
            .field("health_checks", &self.health_checks())
            .finish_non_exhaustive()
    }
}

fn prometheus_error(e: prometheus::Error) -> BridgeError {
    BridgeError::configuration(format!("metrics registry: {e}"))
}
