//! Application configuration management.
//!
//! This module handles loading the application configuration,
//! which includes the API address, the application origin, and which
//! backend persists the session credential.
//!
//! Configuration is stored at `~/.config/gatekeep/config.json` and can be
//! overridden field by field through environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "gatekeep";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Path prefix used for the API when no explicit API URL is configured.
const DEFAULT_API_PREFIX: &str = "/api";

/// Origin the application is served from when none is configured.
const DEFAULT_ORIGIN: &str = "http://localhost:8080";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_API_URL: &str = "API_URL";
const ENV_ORIGIN: &str = "APP_ORIGIN";
const ENV_ROOT_API: &str = "ROOT_API";
const ENV_STORAGE: &str = "GATEKEEP_STORAGE";
const ENV_TIMEOUT: &str = "GATEKEEP_TIMEOUT_SECS";

/// Where the session credential is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// JSON file in the cache directory
    File,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            "file" => Ok(StorageBackend::File),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute base URL of the authenticated API. Falls back to
    /// `<origin>/api` when unset.
    pub api_url: Option<String>,
    /// Origin the application is served from. Login is resolved against it.
    pub origin: String,
    /// Base address for account registration. Falls back to the origin.
    pub root_api: Option<String>,
    pub storage: StorageBackend,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            origin: DEFAULT_ORIGIN.to_string(),
            root_api: None,
            storage: StorageBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from environment-style lookups. Empty values are
    /// treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_url) = get(ENV_API_URL) {
            self.api_url = Some(api_url);
        }
        if let Some(origin) = get(ENV_ORIGIN) {
            self.origin = origin;
        }
        if let Some(root_api) = get(ENV_ROOT_API) {
            self.root_api = Some(root_api);
        }
        if let Some(storage) = get(ENV_STORAGE) {
            match storage.parse::<StorageBackend>() {
                Ok(backend) => self.storage = backend,
                Err(e) => tracing::warn!(error = %e, "Ignoring storage override, keeping {:?}", self.storage),
            }
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => tracing::warn!(value = %timeout, "Invalid request timeout, ignoring"),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base address of the authenticated API: the configured API URL if set,
    /// else the `/api` prefix under the origin.
    pub fn api_base(&self) -> Result<Url, url::ParseError> {
        match self.api_url {
            Some(ref api_url) => directory_url(api_url),
            None => {
                let origin = self.origin_url()?;
                directory_url(origin.join(DEFAULT_API_PREFIX)?.as_str())
            }
        }
    }

    pub fn origin_url(&self) -> Result<Url, url::ParseError> {
        directory_url(&self.origin)
    }

    pub fn root_api_url(&self) -> Result<Url, url::ParseError> {
        match self.root_api {
            Some(ref root) => directory_url(root),
            None => self.origin_url(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

/// Parse a base URL and make sure it ends in `/` so relative paths join
/// beneath it instead of replacing its last segment.
pub(crate) fn directory_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_api_base_defaults_to_api_prefix() {
        let config = Config::default();
        assert_eq!(config.api_base().unwrap().as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn test_api_base_uses_configured_url() {
        let mut config = Config::default();
        config.apply_env(env(&[("API_URL", "https://api.example.com/v2")]));
        assert_eq!(config.api_base().unwrap().as_str(), "https://api.example.com/v2/");
    }

    #[test]
    fn test_api_base_follows_origin() {
        let mut config = Config::default();
        config.apply_env(env(&[("APP_ORIGIN", "https://app.example.com")]));
        assert_eq!(config.api_base().unwrap().as_str(), "https://app.example.com/api/");
        assert_eq!(config.root_api_url().unwrap().as_str(), "https://app.example.com/");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("API_URL", ""), ("GATEKEEP_TIMEOUT_SECS", "  ")]));
        assert!(config.api_url.is_none());
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides_storage_and_timeout() {
        let mut config = Config::default();
        config.apply_env(env(&[("GATEKEEP_STORAGE", "File"), ("GATEKEEP_TIMEOUT_SECS", "5")]));
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));

        config.apply_env(env(&[("GATEKEEP_STORAGE", "floppy"), ("GATEKEEP_TIMEOUT_SECS", "0")]));
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(" Keychain ".parse::<StorageBackend>(), Ok(StorageBackend::Keyring));
        assert_eq!("file".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert!("floppy".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"storage":"file"}"#).unwrap();
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.origin, DEFAULT_ORIGIN);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_directory_url_keeps_existing_slash() {
        assert_eq!(directory_url("http://h/x/").unwrap().as_str(), "http://h/x/");
        assert_eq!(directory_url("http://h").unwrap().as_str(), "http://h/");
    }
}
