use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    cache::DEFAULT_TTL_MINUTES,
    llm::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL},
    provider::{
        RetryPolicy,
        open_meteo::{FORECAST_URL, GEOCODING_URL},
    },
};

/// Environment variable that overrides the stored Gemini key.
pub const API_KEY_ENV: &str = "GEMINI_API_SECRET";

/// Gemini access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Forecast provider endpoints, cache lifetime and retry behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timezone: String,
    pub cache_ttl_minutes: i64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
            timezone: "America/New_York".to_string(),
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
            timeout_secs: 30,
            max_retries: 5,
            backoff_factor: 0.2,
        }
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Negative values disable caching; values past chrono's range never expire.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.cache_ttl_minutes.max(0))
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_retries: self.max_retries, backoff_factor: self.backoff_factor }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub assistant_name: String,
    pub max_tool_round_trips: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { assistant_name: "Skye".to_string(), max_tool_round_trips: 5 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [gemini]
/// api_key = "..."
/// model = "gemini-2.5-flash"
///
/// [weather]
/// timezone = "America/New_York"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiSettings,
    pub weather: WeatherSettings,
    pub chat: ChatSettings,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skye", "skye-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.gemini.api_key = Some(api_key);
    }

    /// Gemini key from `GEMINI_API_SECRET`, falling back to the stored one.
    pub fn gemini_api_key(&self) -> Result<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.gemini.api_key.clone().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No Gemini API key configured.\n\
                     Hint: run `skye configure` or set {API_KEY_ENV}."
                )
            })
    }
}
