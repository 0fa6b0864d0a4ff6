//! Query executor.
//!
//! ## Responsibility
//! Decode a batch of [`DataQuery`] payloads, pick the batch metric, scrape
//! once, and fan the single outcome out into one [`DataResponse`] per query
//! id.
//!
//! ## Batch policy
//! - An undecodable payload rejects the whole batch.
//! - The first non-empty `metric` in submission order names the batch
//!   metric; later names are ignored.
//! - A batch that names no metric is rejected before any request is sent.
//! - Scrape failures and lookup misses become per-query error entries, not
//!   batch errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::metrics::{BridgeMetrics, QueryOutcome};
use crate::scrape::{scrape_metric, ScrapeOutcome};
use crate::settings::Settings;

/// One query as submitted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuery {
    pub ref_id: String,
    /// JSON object of the shape `{"metric": "<name>"}`.
    pub payload: Vec<u8>,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            ref_id: ref_id.into(),
            payload: payload.into(),
        }
    }

    /// Build a query whose payload names `metric`.
    pub fn for_metric(ref_id: impl Into<String>, metric: &str) -> Self {
        let payload = serde_json::json!({ "metric": metric }).to_string();
        Self::new(ref_id, payload)
    }
}

/// Decoded query payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub metric: String,
}

impl Query {
    /// # Errors
    /// [`BridgeError::Validation`] when `payload` is not a JSON object with
    /// an optional string `metric` field.
    pub fn decode(payload: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice(payload)
            .map_err(|e| BridgeError::validation(format!("failed to unmarshal query JSON: {e}")))
    }
}

/// The one-row record returned for a located metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFrame {
    pub metric_name: String,
    pub metric_value: f64,
}

/// Per-query result: exactly one of a frame or an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataResponse {
    Frame(MetricFrame),
    Error(String),
}

impl DataResponse {
    pub fn frame(&self) -> Option<&MetricFrame> {
        match self {
            DataResponse::Frame(f) => Some(f),
            DataResponse::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DataResponse::Frame(_) => None,
            DataResponse::Error(e) => Some(e),
        }
    }
}

/// Query id → response, one entry per submitted query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub responses: BTreeMap<String, DataResponse>,
}

impl ResponseEnvelope {
    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.responses.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Pick the batch metric.
///
/// # Errors
/// [`BridgeError::Validation`] when a payload cannot be decoded or no query
/// names a metric.
pub fn resolve_metric(queries: &[DataQuery]) -> Result<String, BridgeError> {
    for query in queries {
        let decoded = Query::decode(&query.payload)?;
        if !decoded.metric.is_empty() {
            return Ok(decoded.metric);
        }
    }
    Err(BridgeError::validation("no metric specified in the query"))
}

/// Fan one scrape result out to every query id.
pub fn build_envelope(
    queries: &[DataQuery],
    metric: &str,
    scraped: &Result<ScrapeOutcome, BridgeError>,
) -> ResponseEnvelope {
    let response = match scraped {
        Ok(ScrapeOutcome::Found(sample)) => DataResponse::Frame(MetricFrame {
            metric_name: sample.name.clone(),
            metric_value: sample.value,
        }),
        Ok(ScrapeOutcome::NotFound) => DataResponse::Error(format!("metric {metric} not found")),
        Ok(ScrapeOutcome::MalformedValue { token }) => {
            DataResponse::Error(format!("metric {metric} has malformed value '{token}'"))
        }
        Err(e) => DataResponse::Error(e.to_string()),
    };

    ResponseEnvelope {
        responses: queries
            .iter()
            .map(|q| (q.ref_id.clone(), response.clone()))
            .collect(),
    }
}

fn outcome_of(scraped: &Result<ScrapeOutcome, BridgeError>) -> QueryOutcome {
    match scraped {
        Ok(ScrapeOutcome::Found(_)) => QueryOutcome::Found,
        Ok(ScrapeOutcome::NotFound) => QueryOutcome::NotFound,
        Ok(ScrapeOutcome::MalformedValue { .. }) => QueryOutcome::MalformedValue,
        Err(_) => QueryOutcome::TransportError,
    }
}

/// Run a query batch against `settings.metrics_url`.
///
/// # Errors
/// [`BridgeError::Validation`] for the batch-level rejections described in
/// the module docs. Everything else is reported inside the envelope.
pub async fn execute(
    client: &reqwest::Client,
    settings: &Settings,
    queries: &[DataQuery],
    metrics: Option<&BridgeMetrics>,
) -> Result<ResponseEnvelope, BridgeError> {
    let metric = match resolve_metric(queries) {
        Ok(m) => m,
        Err(e) => {
            if let Some(m) = metrics {
                m.record_query(QueryOutcome::ValidationError);
            }
            warn!(error = %e, queries = queries.len(), "query batch rejected");
            return Err(e);
        }
    };

    let scraped = scrape_metric(client, &settings.metrics_url, &metric).await;
    let outcome = outcome_of(&scraped);
    if let Some(m) = metrics {
        m.record_query(outcome);
    }

    match &scraped {
        Err(e) => warn!(metric = %metric, error = %e, "metrics scrape failed"),
        Ok(_) => debug!(metric = %metric, outcome = %outcome, queries = queries.len(), "query batch resolved"),
    }

    Ok(build_envelope(queries, &metric, &scraped))
}
