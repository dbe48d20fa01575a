//! Configuration management for Quotaguard.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::ratelimit::QuotaConfig;

/// Main configuration for the Quotaguard service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Quota configurations registered at startup. An entry with id
    /// "hubspot" overrides the built-in HubSpot defaults.
    #[serde(default)]
    pub integrations: Vec<QuotaConfig>,

    /// HubSpot connection settings
    #[serde(default)]
    pub hubspot: HubSpotConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    ([127, 0, 0, 1], 3003).into()
}

/// HubSpot connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSpotConfig {
    /// Private-app access token. Falls back to the HUBSPOT_ACCESS_TOKEN
    /// environment variable when unset.
    #[serde(default)]
    pub access_token: Option<String>,

    /// API base URL, overridable for testing against a stub server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    crate::hubspot::DEFAULT_BASE_URL.to_string()
}

impl ServiceConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve the HubSpot access token from config or environment.
    pub fn hubspot_access_token(&self) -> Option<String> {
        self.hubspot
            .access_token
            .clone()
            .or_else(|| std::env::var("HUBSPOT_ACCESS_TOKEN").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.listen_addr.port(), 3003);
        assert!(config.integrations.is_empty());
        assert_eq!(config.hubspot.base_url, crate::hubspot::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  listen_addr: 0.0.0.0:8080
integrations:
  - integration_id: hubspot
    max_requests_per_second: 5
    max_requests_per_day: 100000
    backoff_strategy: exponential
    backoff_multiplier: 2
hubspot:
  access_token: pat-na1-test
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.integrations.len(), 1);
        assert_eq!(config.integrations[0].max_requests_per_second, 5);
        assert_eq!(config.hubspot.access_token.as_deref(), Some("pat-na1-test"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ServiceConfig::from_yaml("server:\n  listen_addr: 127.0.0.1:9000\n").unwrap();
        assert_eq!(config.server.listen_addr.port(), 9000);
        assert!(config.hubspot.access_token.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let err = ServiceConfig::from_yaml("server: [not, a, map]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
