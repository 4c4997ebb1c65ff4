use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{coordinator::RefreshPolicy, provider::ProviderId, weather::DEFAULT_WEATHER_API_URL};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 12;

/// Settings for a single place provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override of the provider endpoint, e.g. a self-hosted Nominatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the weather backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_url: Option<String>,

    /// Timeout for every provider and weather request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Example TOML:
    /// [providers.google]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub refresh: RefreshPolicy,
}

impl Config {
    pub fn weather_api_url(&self) -> &str {
        self.weather_api_url.as_deref().unwrap_or(DEFAULT_WEATHER_API_URL)
    }

    pub fn set_weather_api_url(&mut self, url: impl Into<String>) {
        self.weather_api_url = Some(url.into());
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Returns API key for a provider, if present and non-empty.
    pub fn provider_api_key(&self, id: ProviderId) -> Option<&str> {
        self.provider_config(id)
            .and_then(|cfg| cfg.api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn provider_base_url(&self, id: ProviderId) -> Option<&str> {
        self.provider_config(id).and_then(|cfg| cfg.base_url.as_deref())
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, id: ProviderId, api_key: String) {
        self.providers.entry(id.as_str().to_string()).or_default().api_key = Some(api_key);
    }

    pub fn is_provider_configured(&self, id: ProviderId) -> bool {
        self.provider_api_key(id).is_some()
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "foretrip", "foretrip")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::default();

        assert_eq!(cfg.weather_api_url(), DEFAULT_WEATHER_API_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(12));
        assert!(!cfg.is_provider_configured(ProviderId::GooglePlaces));
    }

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::GooglePlaces, "GOOGLE_KEY".into());

        assert_eq!(cfg.provider_api_key(ProviderId::GooglePlaces), Some("GOOGLE_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::GooglePlaces));
        assert!(!cfg.is_provider_configured(ProviderId::Nominatim));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::GooglePlaces, "   ".into());

        assert_eq!(cfg.provider_api_key(ProviderId::GooglePlaces), None);
    }

    #[test]
    fn upsert_keeps_base_url() {
        let mut cfg = Config::default();
        cfg.providers.insert(
            "google".into(),
            ProviderConfig { api_key: None, base_url: Some("http://proxy".into()) },
        );

        cfg.upsert_provider_api_key(ProviderId::GooglePlaces, "KEY".into());

        assert_eq!(cfg.provider_base_url(ProviderId::GooglePlaces), Some("http://proxy"));
        assert_eq!(cfg.provider_api_key(ProviderId::GooglePlaces), Some("KEY"));
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            weather_api_url = "https://weather.example"

            [providers.nominatim]
            base_url = "https://nominatim.example"

            [refresh]
            min_refresh_interval_ms = 20000
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.weather_api_url(), "https://weather.example");
        assert_eq!(cfg.provider_base_url(ProviderId::Nominatim), Some("https://nominatim.example"));
        assert_eq!(cfg.refresh.min_refresh_interval(), Duration::from_secs(20));
        assert_eq!(cfg.refresh.noise_floor_meters, RefreshPolicy::default().noise_floor_meters);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::GooglePlaces, "KEY".into());
        cfg.set_weather_api_url("http://weather.local");
        cfg.save_to(&path).expect("saves");

        let loaded = Config::load_from(&path).expect("loads");
        assert_eq!(loaded.provider_api_key(ProviderId::GooglePlaces), Some("KEY"));
        assert_eq!(loaded.weather_api_url(), "http://weather.local");
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("loads");

        assert!(cfg.providers.is_empty());
    }
}
