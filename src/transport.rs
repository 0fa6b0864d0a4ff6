//! Transport factory.
//!
//! Builds the single [`reqwest::Client`] a bridge shares across every probe
//! and scrape. The client is immutable once built and cheap to use from many
//! tasks at once. No retries happen here.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::BridgeError;

/// Connection options supplied by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    /// Whole-request timeout, including body read.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Proxy URL applied to every scheme (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,
    /// Accept invalid TLS certificates. Only for self-signed lab setups.
    pub tls_skip_verify: bool,
    /// Extra root CA, PEM encoded.
    pub root_ca_pem: Option<Vec<u8>>,
    /// Headers attached to every request.
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
}

impl Default for TransportOptions {
    /// - request_timeout: 10 s
    /// - connect_timeout: 3 s
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
            proxy: None,
            tls_skip_verify: false,
            root_ca_pem: None,
            headers: BTreeMap::new(),
            user_agent: concat!("metrics-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportOptions {
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Build a client honoring `options`.
///
/// # Errors
/// [`BridgeError::Configuration`] for an unusable proxy URL, an unparsable
/// root CA, an invalid header name or value, or a TLS backend that fails to
/// initialize.
pub fn build_client(options: &TransportOptions) -> Result<reqwest::Client, BridgeError> {
    let mut builder = reqwest::Client::builder()
        .timeout(options.request_timeout)
        .connect_timeout(options.connect_timeout)
        .user_agent(options.user_agent.as_str())
        .default_headers(default_headers(&options.headers)?);

    if let Some(proxy_url) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy_url.as_str())
            .map_err(|e| BridgeError::configuration(format!("invalid proxy '{proxy_url}': {e}")))?;
        builder = builder.proxy(proxy);
    }

    if let Some(pem) = &options.root_ca_pem {
        let cert = reqwest::Certificate::from_pem(pem)
            .map_err(|e| BridgeError::configuration(format!("invalid root CA: {e}")))?;
        builder = builder.add_root_certificate(cert);
    }

    if options.tls_skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| BridgeError::configuration(format!("could not build HTTP client: {e}")))
}

fn default_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, BridgeError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| BridgeError::configuration(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| BridgeError::configuration(format!("invalid value for header '{name}': {e}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = TransportOptions::default();
        assert_eq!(opts.request_timeout, Duration::from_secs(10));
        assert_eq!(opts.connect_timeout, Duration::from_secs(3));
        assert!(opts.proxy.is_none());
        assert!(!opts.tls_skip_verify);
        assert!(opts.user_agent.starts_with("metrics-bridge/"));
    }

    #[test]
    fn setters_apply() {
        let opts = TransportOptions::default()
            .request_timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(7))
            .proxy("http://proxy.local:3128")
            .header("X-Org", "1");
        assert_eq!(opts.request_timeout, Duration::from_secs(20));
        assert_eq!(opts.connect_timeout, Duration::from_secs(7));
        assert_eq!(opts.proxy.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(opts.headers.get("X-Org").map(String::as_str), Some("1"));
    }

    #[test]
    fn builds_with_defaults() {
        assert!(build_client(&TransportOptions::default()).is_ok());
    }

    #[test]
    fn builds_with_http_proxy_and_headers() {
        let opts = TransportOptions::default()
            .proxy("http://proxy.local:3128")
            .header("X-Scope-OrgID", "homelab");
        assert!(build_client(&opts).is_ok());
    }

    #[test]
    fn builds_with_tls_skip_verify() {
        let opts = TransportOptions {
            tls_skip_verify: true,
            ..Default::default()
        };
        assert!(build_client(&opts).is_ok());
    }

    #[test]
    fn unsupported_proxy_scheme_is_configuration_error() {
        let opts = TransportOptions::default().proxy("ftp://proxy.local:21");
        let err = build_client(&opts).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)), "got {err:?}");
    }

    #[test]
    fn invalid_header_name_is_configuration_error() {
        let opts = TransportOptions::default().header("bad header", "v");
        let err = build_client(&opts).unwrap_err();
        assert!(err.to_string().contains("invalid header name"), "got {err}");
    }

    #[test]
    fn invalid_header_value_is_configuration_error() {
        let opts = TransportOptions::default().header("X-Ok", "line\nbreak");
        let err = build_client(&opts).unwrap_err();
        assert!(err.to_string().contains("invalid value for header"), "got {err}");
    }
}
