//! Configuration Management
//!
//! [`ClientConfig`] is the resolved configuration the probers run with.
//! [`Config`] is the small set of CLI defaults persisted between runs.

use crate::aws::auth::{self, AwsCredentials};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-east-1";

/// LocalStack edge endpoint
pub const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Resolved AWS client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    /// Custom endpoint (LocalStack, a mock server); `None` means real AWS
    pub endpoint: Option<String>,
    /// `None` means every signed request fails with `MissingCredentials`
    pub credentials: Option<AwsCredentials>,
    /// Address buckets as `{endpoint}/{bucket}` instead of `{bucket}.{host}`
    pub force_path_style: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl ClientConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            credentials: None,
            force_path_style: false,
        }
    }

    /// Preset for a LocalStack instance on the default edge port
    pub fn localstack() -> Self {
        Self::new(DEFAULT_REGION)
            .with_endpoint(LOCALSTACK_ENDPOINT)
            .with_static_credentials("test", "test")
    }

    /// Use a custom endpoint; buckets are then addressed path-style
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self.force_path_style = true;
        self
    }

    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sign with a fixed key pair instead of the default provider chain
    pub fn with_static_credentials(
        self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.with_credentials(AwsCredentials::from_static(
            access_key_id,
            secret_access_key,
            None,
        ))
    }

    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Shared credentials profile
    #[serde(default)]
    pub profile: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudprobe").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config file {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective region (CLI > config > AWS chain > default)
    pub fn effective_region(&self, cli: Option<&str>, discovered: Option<String>) -> String {
        cli.map(|r| r.to_string())
            .or_else(|| self.region.clone())
            .or(discovered)
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Build the client configuration, resolving region and credentials
    /// through the AWS default chain on the way
    pub async fn resolve(
        &self,
        region: Option<&str>,
        endpoint: Option<&str>,
        profile: Option<&str>,
    ) -> ClientConfig {
        let profile = profile.or(self.profile.as_deref());
        let (discovered_region, credentials) = auth::discover(profile).await;

        let mut config = ClientConfig::new(self.effective_region(region, discovered_region));

        if let Some(endpoint) = endpoint.map(|e| e.to_string()).or_else(|| self.endpoint.clone()) {
            config = config.with_endpoint(endpoint);
        }

        config.credentials = credentials;
        if config.credentials.is_none() {
            tracing::warn!("No AWS credentials provider found; signed requests will fail");
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_localstack_preset() {
        let config = ClientConfig::localstack();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert!(config.force_path_style);

        let creds = config.credentials.unwrap().get().await.unwrap();
        assert_eq!(creds.access_key_id(), "test");
        assert_eq!(creds.secret_access_key(), "test");
    }

    #[test]
    fn test_cli_region_wins() {
        let config = Config {
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };
        let discovered = || Some("us-west-2".to_string());
        assert_eq!(config.effective_region(Some("ap-south-1"), discovered()), "ap-south-1");
        assert_eq!(config.effective_region(None, discovered()), "eu-west-1");
    }

    #[test]
    fn test_discovered_region_then_default() {
        let config = Config::default();
        assert_eq!(
            config.effective_region(None, Some("us-west-2".to_string())),
            "us-west-2"
        );
        assert_eq!(config.effective_region(None, None), DEFAULT_REGION);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            region: Some("us-west-2".to_string()),
            endpoint: Some("http://localhost:4566".to_string()),
            profile: None,
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_missing_or_invalid_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }
}
