//! Settings loader.
//!
//! Turns the host's raw configuration blob and its separately decrypted
//! secret map into an immutable [`Settings`]. Loading fails closed: a missing
//! or empty `apiKey` secret never yields a half-built value.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::BridgeError;

/// Secret map key holding the API key.
pub const API_KEY_SECRET: &str = "apiKey";

pub const DEFAULT_HEALTH_URL: &str = "http://localhost:3000/api/health";
pub const DEFAULT_METRICS_URL: &str = "http://localhost:2112/metrics";

/// Decrypted secrets. Has no `Serialize` impl and redacts itself in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBundle {
    api_key: String,
}

impl SecretBundle {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBundle")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Non-secret fields of the configuration blob, as the configuration form
/// writes them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    path: String,
    #[serde(default)]
    health_url: Option<String>,
    #[serde(default)]
    metrics_url: Option<String>,
}

/// Validated bridge settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// User-entered path from the configuration form, carried verbatim.
    pub path: String,
    /// Liveness endpoint probed by health checks.
    pub health_url: String,
    /// Plain-text scrape endpoint.
    pub metrics_url: String,
    secrets: Option<SecretBundle>,
}

impl Settings {
    pub fn secrets(&self) -> Option<&SecretBundle> {
        self.secrets.as_ref()
    }

    /// The API key, if one is present and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.secrets
            .as_ref()
            .map(SecretBundle::api_key)
            .filter(|k| !k.is_empty())
    }

    /// Replace the secret bundle. Only used to exercise the prober's
    /// fail-fast path.
    #[cfg(test)]
    pub(crate) fn without_secrets(mut self) -> Self {
        self.secrets = None;
        self
    }
}

/// Parse `blob` and `secrets` into [`Settings`].
///
/// An empty (or whitespace-only) blob is treated as `{}`.
///
/// # Errors
/// - [`BridgeError::Configuration`] when the blob is not a JSON object of the
///   expected shape.
/// - [`BridgeError::Configuration`] when `apiKey` is absent or empty.
pub fn load_settings(blob: &[u8], secrets: &HashMap<String, String>) -> Result<Settings, BridgeError> {
    let raw: RawSettings = if blob.iter().all(u8::is_ascii_whitespace) {
        RawSettings::default()
    } else {
        serde_json::from_slice(blob).map_err(|e| {
            BridgeError::configuration(format!("could not parse settings json: {e}"))
        })?
    };

    let bundle = load_secrets(secrets)?;

    Ok(Settings {
        path: raw.path,
        health_url: non_empty_or(raw.health_url, DEFAULT_HEALTH_URL),
        metrics_url: non_empty_or(raw.metrics_url, DEFAULT_METRICS_URL),
        secrets: Some(bundle),
    })
}

fn load_secrets(secrets: &HashMap<String, String>) -> Result<SecretBundle, BridgeError> {
    match secrets.get(API_KEY_SECRET) {
        Some(key) if !key.is_empty() => Ok(SecretBundle { api_key: key.clone() }),
        _ => Err(BridgeError::configuration("apiKey is missing or empty")),
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(key: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(API_KEY_SECRET.to_string(), key.to_string());
        map
    }

    #[test]
    fn loads_path_and_key() {
        let s = load_settings(br#"{"path":"/srv/metrics"}"#, &secrets("k-123")).unwrap();
        assert_eq!(s.path, "/srv/metrics");
        assert_eq!(s.api_key(), Some("k-123"));
    }

    #[test]
    fn endpoints_default_when_absent() {
        let s = load_settings(b"{}", &secrets("k")).unwrap();
        assert_eq!(s.health_url, DEFAULT_HEALTH_URL);
        assert_eq!(s.metrics_url, DEFAULT_METRICS_URL);
    }

    #[test]
    fn endpoints_default_when_blank() {
        let s = load_settings(br#"{"healthUrl":"  ","metricsUrl":""}"#, &secrets("k")).unwrap();
        assert_eq!(s.health_url, DEFAULT_HEALTH_URL);
        assert_eq!(s.metrics_url, DEFAULT_METRICS_URL);
    }

    #[test]
    fn endpoints_taken_from_blob() {
        let blob = br#"{"healthUrl":"http://h/api/health","metricsUrl":"http://m/metrics"}"#;
        let s = load_settings(blob, &secrets("k")).unwrap();
        assert_eq!(s.health_url, "http://h/api/health");
        assert_eq!(s.metrics_url, "http://m/metrics");
    }

    #[test]
    fn empty_blob_is_empty_object() {
        let s = load_settings(b"", &secrets("k")).unwrap();
        assert_eq!(s.path, "");
    }

    #[test]
    fn unknown_blob_fields_ignored() {
        assert!(load_settings(br#"{"path":"p","extra":1}"#, &secrets("k")).is_ok());
    }

    #[test]
    fn malformed_blob_is_configuration_error() {
        let err = load_settings(b"{not json", &secrets("k")).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = load_settings(b"{}", &HashMap::new()).unwrap_err();
        assert_eq!(err, BridgeError::Configuration("apiKey is missing or empty".into()));
    }

    #[test]
    fn empty_key_is_configuration_error() {
        let err = load_settings(b"{}", &secrets("")).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let s = load_settings(b"{}", &secrets("super-secret")).unwrap();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("super-secret"), "key leaked: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn without_secrets_has_no_key() {
        let s = load_settings(b"{}", &secrets("k")).unwrap().without_secrets();
        assert!(s.secrets().is_none());
        assert!(s.api_key().is_none());
    }
}
