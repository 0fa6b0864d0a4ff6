//! TOML configuration for the command-line host.
//!
//! Stands in for the dashboard host: it supplies the instance uid, the JSON
//! settings blob, the decrypted secrets and the connection options that the
//! library receives as opaque inputs.
//!
//! ```toml
//! [datasource]
//! uid = "homelab"
//! settings = { path = "/srv", metricsUrl = "http://127.0.0.1:2112/metrics" }
//!
//! [datasource.secrets]
//! apiKey = "..."
//!
//! [transport]
//! timeout_secs = 10
//! connect_timeout_secs = 3
//! proxy = "http://proxy.local:3128"
//! tls_skip_verify = false
//! ca_cert_path = "/etc/ssl/homelab-ca.pem"
//! headers = { "X-Scope-OrgID" = "homelab" }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::bridge::{MetricsBridge, MetricsBridgeBuilder};
use crate::error::BridgeError;
use crate::transport::TransportOptions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub datasource: DatasourceSection,
    #[serde(default)]
    pub transport: TransportSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasourceSection {
    pub uid: String,
    /// Re-encoded as the JSON configuration blob.
    #[serde(default)]
    pub settings: toml::Table,
    #[serde(default)]
    pub secrets: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSection {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub proxy: Option<String>,
    pub tls_skip_verify: bool,
    pub ca_cert_path: Option<PathBuf>,
    pub headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
}

impl Default for TransportSection {
    fn default() -> Self {
        let defaults = TransportOptions::default();
        Self {
            timeout_secs: defaults.request_timeout.as_secs(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            proxy: None,
            tls_skip_verify: false,
            ca_cert_path: None,
            headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

impl TransportSection {
    /// Resolve into [`TransportOptions`], reading the CA file if one is set.
    ///
    /// # Errors
    /// [`BridgeError::Configuration`] when the CA file cannot be read.
    pub fn to_options(&self) -> Result<TransportOptions, BridgeError> {
        let root_ca_pem = match &self.ca_cert_path {
            Some(path) => Some(std::fs::read(path).map_err(|e| {
                BridgeError::configuration(format!("cannot read CA file {}: {e}", path.display()))
            })?),
            None => None,
        };

        let mut options = TransportOptions {
            request_timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            proxy: self.proxy.clone(),
            tls_skip_verify: self.tls_skip_verify,
            root_ca_pem,
            headers: self.headers.clone(),
            ..TransportOptions::default()
        };
        if let Some(ua) = &self.user_agent {
            options.user_agent = ua.clone();
        }
        Ok(options)
    }
}

impl BridgeConfig {
    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// [`BridgeError::Configuration`] when the file is unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        toml::from_str(text).map_err(|e| BridgeError::configuration(format!("invalid config: {e}")))
    }

    /// The settings table re-encoded as a JSON blob.
    pub fn settings_blob(&self) -> Result<Vec<u8>, BridgeError> {
        serde_json::to_vec(&self.datasource.settings)
            .map_err(|e| BridgeError::configuration(format!("cannot encode settings: {e}")))
    }

    /// A builder primed with everything in this config.
    pub fn builder(&self) -> Result<MetricsBridgeBuilder, BridgeError> {
        Ok(MetricsBridge::builder()
            .instance_uid(self.datasource.uid.clone())
            .configuration(self.settings_blob()?)
            .secrets(self.datasource.secrets.clone())
            .transport(self.transport.to_options()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[datasource]
uid = "homelab"
settings = { path = "/srv", metricsUrl = "http://127.0.0.1:2112/metrics" }

[datasource.secrets]
apiKey = "k"

[transport]
timeout_secs = 4
connect_timeout_secs = 1
proxy = "http://proxy.local:3128"
headers = { "X-Scope-OrgID" = "homelab" }
user_agent = "probe/1"
"#;

    #[test]
    fn parses_full_config() {
        let cfg = BridgeConfig::parse(FULL).unwrap();
        assert_eq!(cfg.datasource.uid, "homelab");
        assert_eq!(cfg.datasource.secrets.get("apiKey").map(String::as_str), Some("k"));
        let opts = cfg.transport.to_options().unwrap();
        assert_eq!(opts.request_timeout, Duration::from_secs(4));
        assert_eq!(opts.connect_timeout, Duration::from_secs(1));
        assert_eq!(opts.proxy.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(opts.user_agent, "probe/1");
        assert_eq!(opts.headers.len(), 1);
    }

    #[test]
    fn settings_blob_is_json() {
        let cfg = BridgeConfig::parse(FULL).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&cfg.settings_blob().unwrap()).unwrap();
        assert_eq!(v["path"], "/srv");
        assert_eq!(v["metricsUrl"], "http://127.0.0.1:2112/metrics");
    }

    #[test]
    fn transport_section_defaults() {
        let cfg = BridgeConfig::parse("[datasource]\nuid = \"x\"\n").unwrap();
        let opts = cfg.transport.to_options().unwrap();
        assert_eq!(opts, TransportOptions::default());
    }

    #[test]
    fn builder_from_config_builds() {
        let cfg = BridgeConfig::parse(FULL).unwrap();
        let bridge = cfg.builder().unwrap().build().unwrap();
        assert_eq!(bridge.settings().metrics_url, "http://127.0.0.1:2112/metrics");
    }

    #[test]
    fn unknown_field_rejected() {
        let err = BridgeConfig::parse("[datasource]\nuid = \"x\"\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn missing_ca_file_is_configuration_error() {
        let cfg = BridgeConfig::parse(
            "[datasource]\nuid = \"x\"\n[transport]\nca_cert_path = \"/nonexistent/ca.pem\"\n",
        )
        .unwrap();
        assert!(matches!(cfg.transport.to_options(), Err(BridgeError::Configuration(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, FULL).unwrap();
        let cfg = BridgeConfig::load(&path).unwrap();
        assert_eq!(cfg.datasource.uid, "homelab");
    }

    #[test]
    fn load_missing_file_is_configuration_error() {
        let err = BridgeConfig::load(Path::new("/nonexistent/bridge.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
