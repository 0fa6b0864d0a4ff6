//! Crate-level error type.
//!
//! Every fallible bridge operation returns [`BridgeError`]. The variants map
//! onto four categories the host cares about:
//!
//! | Variant                      | Category      | Retried?                  |
//! |------------------------------|---------------|---------------------------|
//! | [`BridgeError::Configuration`] | configuration | never, fatal to construction |
//! | [`BridgeError::Validation`]    | validation    | never                     |
//! | [`BridgeError::Transport`]     | transport     | at the caller's discretion |
//! | [`BridgeError::Http`]          | transport     | at the caller's discretion |
//!
//! A requested metric being absent from a scrape is not an error; see
//! [`crate::scrape::ScrapeOutcome`].

use thiserror::Error;

/// Errors produced while constructing or driving a [`crate::MetricsBridge`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// Bad or missing settings, secrets, or transport options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input, rejected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request could not be completed (connect, timeout, DNS, body read).
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    /// The remote server replied with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
}

impl BridgeError {
    /// Whether the error belongs to the transport category.
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::Transport { .. } | BridgeError::Http { .. })
    }

    pub(crate) fn configuration(detail: impl Into<String>) -> Self {
        BridgeError::Configuration(detail.into())
    }

    pub(crate) fn validation(detail: impl Into<String>) -> Self {
        BridgeError::Validation(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_configuration() {
        let err = BridgeError::configuration("apiKey is missing or empty");
        assert_eq!(err.to_string(), "configuration error: apiKey is missing or empty");
    }

    #[test]
    fn display_validation() {
        let err = BridgeError::validation("no metric specified in the query");
        assert!(err.to_string().contains("no metric specified"));
    }

    #[test]
    fn display_transport_carries_url_and_detail() {
        let err = BridgeError::Transport {
            url: "http://localhost:2112/metrics".to_string(),
            detail: "connection refused".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("http://localhost:2112/metrics"), "url in display: {s}");
        assert!(s.contains("connection refused"), "detail in display: {s}");
    }

    #[test]
    fn display_http_carries_status() {
        let err = BridgeError::Http {
            status: 503,
            url: "http://localhost:2112/metrics".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn transport_category() {
        assert!(BridgeError::Http { status: 500, url: "x".into() }.is_transport());
        assert!(BridgeError::Transport { url: "x".into(), detail: "y".into() }.is_transport());
        assert!(!BridgeError::configuration("x").is_transport());
        assert!(!BridgeError::validation("x").is_transport());
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&BridgeError::configuration("x"));
    }
}
