//! # metrics-bridge
//!
//! Turns a host-supplied configuration blob and decrypted secrets into an
//! authenticated HTTP client, then uses it to
//!
//! 1. prove liveness of a monitored endpoint ([`MetricsBridge::check_health`]), and
//! 2. scrape a plain-text metrics document and return one named metric as a
//!    typed record ([`MetricsBridge::query_data`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let bridge = MetricsBridge::builder()
//!     .instance_uid("homelab")
//!     .configuration(br#"{"metricsUrl":"http://127.0.0.1:2112/metrics"}"#.to_vec())
//!     .secret("apiKey", api_key)
//!     .metrics(BridgeMetrics::register(&registry)?)
//!     .build()?;
//!
//! let verdict = bridge.check_health().await;
//! let envelope = bridge.query_data(&[DataQuery::for_metric("A", "up")]).await?;
//! ```

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod query;
pub mod scrape;
pub mod settings;
pub mod transport;

pub use bridge::{MetricsBridge, MetricsBridgeBuilder};
pub use error::BridgeError;
pub use health::{HealthStatus, HealthVerdict};
pub use metrics::{BridgeMetrics, QueryOutcome};
pub use query::{DataQuery, DataResponse, MetricFrame, Query, ResponseEnvelope};
pub use scrape::{find_metric, MetricSample, ScrapeOutcome};
pub use settings::{load_settings, SecretBundle, Settings};
pub use transport::{build_client, TransportOptions};
