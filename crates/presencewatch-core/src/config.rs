//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the guild to watch, the proxy mirrors to route through, and the timing
//! knobs of the sync engine. Every field has a default, so a missing or
//! partial file still yields a working configuration.
//!
//! Configuration is stored at `~/.config/presencewatch/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ProxyList;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "presencewatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Placeholder substituted with the guild id in `endpoint_template`
const GUILD_PLACEHOLDER: &str = "{guild_id}";

fn default_guild_id() -> String {
    "1350840224028164096".to_string()
}

fn default_endpoint_template() -> String {
    format!("https://discord.com/api/guilds/{}/widget.json", GUILD_PLACEHOLDER)
}

fn default_proxies() -> Vec<String> {
    vec![
        "https://api.codetabs.com/v1/proxy?quest=".to_string(),
        "https://corsproxy.io/?".to_string(),
        "https://api.allorigins.win/get?url=".to_string(),
        "direct".to_string(),
    ]
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_freshness_window_secs() -> u64 {
    60
}

fn default_visible_interval_secs() -> u64 {
    10
}

fn default_hidden_interval_secs() -> u64 {
    20
}

fn default_initial_fetch_delay_ms() -> u64 {
    100
}

fn default_cache_key() -> String {
    "presence".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_guild_id")]
    pub guild_id: String,
    #[serde(default = "default_endpoint_template")]
    pub endpoint_template: String,
    #[serde(default = "default_proxies")]
    pub proxies: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,
    #[serde(default = "default_visible_interval_secs")]
    pub visible_interval_secs: u64,
    #[serde(default = "default_hidden_interval_secs")]
    pub hidden_interval_secs: u64,
    #[serde(default = "default_initial_fetch_delay_ms")]
    pub initial_fetch_delay_ms: u64,
    #[serde(default = "default_cache_key")]
    pub cache_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            guild_id: default_guild_id(),
            endpoint_template: default_endpoint_template(),
            proxies: default_proxies(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            freshness_window_secs: default_freshness_window_secs(),
            visible_interval_secs: default_visible_interval_secs(),
            hidden_interval_secs: default_hidden_interval_secs(),
            initial_fetch_delay_ms: default_initial_fetch_delay_ms(),
            cache_key: default_cache_key(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(&self.guild_id))
    }

    /// The widget URL for the configured guild.
    pub fn endpoint_url(&self) -> String {
        self.endpoint_template.replace(GUILD_PLACEHOLDER, &self.guild_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.guild_id.trim().is_empty() {
            bail!("guild_id must not be empty");
        }
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.proxies.is_empty() {
            bail!("proxies must list at least one route (use \"direct\" for none)");
        }
        if self.visible_interval_secs == 0 {
            bail!("visible_interval_secs must be at least 1");
        }
        if self.hidden_interval_secs < self.visible_interval_secs {
            bail!(
                "hidden_interval_secs ({}) must not be shorter than visible_interval_secs ({})",
                self.hidden_interval_secs,
                self.visible_interval_secs
            );
        }
        Ok(())
    }

    /// Validate and convert into the runtime settings of the sync engine.
    pub fn sync_config(&self) -> Result<SyncConfig> {
        self.validate()?;
        Ok(SyncConfig {
            endpoint: self.endpoint_url(),
            proxies: ProxyList::from_strings(&self.proxies)?,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            freshness_window: Duration::from_secs(self.freshness_window_secs),
            visible_interval: Duration::from_secs(self.visible_interval_secs),
            hidden_interval: Duration::from_secs(self.hidden_interval_secs),
            initial_fetch_delay: Duration::from_millis(self.initial_fetch_delay_ms),
            cache_key: self.cache_key.clone(),
        })
    }
}

/// Runtime settings of [`crate::sync::LiveDataSync`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub endpoint: String,
    pub proxies: ProxyList,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    /// Base of the linear backoff: attempt `n` waits `n × retry_delay`.
    pub retry_delay: Duration,
    pub freshness_window: Duration,
    pub visible_interval: Duration,
    pub hidden_interval: Duration,
    pub initial_fetch_delay: Duration,
    pub cache_key: String,
}

impl SyncConfig {
    /// Cached data older than this forces a periodic refresh past the
    /// freshness check.
    pub fn stale_after(&self) -> Duration {
        self.hidden_interval * 2
    }
}
