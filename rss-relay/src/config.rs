//! Bot configuration: a JSON file or the process environment, read once at
//! startup.

use crate::types::{RelayError, Result};
use crate::utils::url::is_valid_feed_url;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECK_INTERVAL: u64 = 300;
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// One monitored feed and where its posts go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub chat_ids: Vec<String>,
    /// Seconds between polls.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default)]
    pub enable_emojis: bool,
    #[serde(default)]
    pub custom_hashtags: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_link_preview: bool,
    #[serde(default = "default_true")]
    pub enable_media: bool,
    #[serde(default = "default_true")]
    pub show_author: bool,
    #[serde(default = "default_true")]
    pub ai_enhance: bool,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>, name: impl Into<String>, chat_ids: Vec<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            chat_ids,
            check_interval: DEFAULT_CHECK_INTERVAL,
            enable_emojis: false,
            custom_hashtags: Vec::new(),
            enable_link_preview: true,
            enable_media: true,
            show_author: true,
            ai_enhance: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default = "default_check_interval")]
    pub default_check_interval: u64,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    /// Mark entries present at startup as seen without posting them.
    #[serde(default = "default_true")]
    pub skip_existing_on_start: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL
}

fn default_true() -> bool {
    true
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_telegram_api_url() -> String {
    DEFAULT_TELEGRAM_API_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            openai_api_key: String::new(),
            feeds: Vec::new(),
            default_check_interval: DEFAULT_CHECK_INTERVAL,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            telegram_api_url: default_telegram_api_url(),
            skip_existing_on_start: true,
            log_level: default_log_level(),
        }
    }
}

impl BotConfig {
    pub fn from_json_str(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading configuration from {}", path.display());
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Build from environment variables through a lookup function, so tests
    /// don't have to touch the real process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let feeds = match lookup("RSS_FEEDS") {
            Some(raw) => match serde_json::from_str::<Vec<FeedConfig>>(&raw) {
                Ok(feeds) => feeds,
                Err(e) => {
                    warn!("RSS_FEEDS is not a valid feed list, ignoring it: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let default_check_interval = match lookup("DEFAULT_CHECK_INTERVAL") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("DEFAULT_CHECK_INTERVAL={} is not a number, using {}", raw, DEFAULT_CHECK_INTERVAL);
                DEFAULT_CHECK_INTERVAL
            }),
            None => DEFAULT_CHECK_INTERVAL,
        };

        Self {
            telegram_bot_token: lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            openai_api_key: lookup("OPENAI_API_KEY").unwrap_or_default(),
            feeds,
            default_check_interval,
            openai_model: lookup("OPENAI_MODEL").unwrap_or_else(default_openai_model),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(default_openai_base_url),
            telegram_api_url: lookup("TELEGRAM_API_URL").unwrap_or_else(default_telegram_api_url),
            skip_existing_on_start: true,
            log_level: lookup("RSS_RELAY_LOG").unwrap_or_else(default_log_level),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Copy with the API secrets masked, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.telegram_bot_token = redact(&copy.telegram_bot_token);
        copy.openai_api_key = redact(&copy.openai_api_key);
        copy
    }

    /// Sleep between full passes: the shortest feed interval, or the default
    /// when no feeds are configured.
    pub fn poll_interval_secs(&self) -> u64 {
        self.feeds
            .iter()
            .map(|f| f.check_interval)
            .min()
            .unwrap_or(self.default_check_interval)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(RelayError::Config(
                "telegram_bot_token is missing (set it in the config file or TELEGRAM_BOT_TOKEN)".to_string(),
            ));
        }

        if self.feeds.iter().any(|f| f.ai_enhance) && self.openai_api_key.trim().is_empty() {
            return Err(RelayError::Config(
                "openai_api_key is required when a feed has ai_enhance enabled".to_string(),
            ));
        }

        for feed in &self.feeds {
            if !is_valid_feed_url(&feed.url) {
                return Err(RelayError::Config(format!(
                    "feed '{}' has an invalid URL: {}",
                    feed.name, feed.url
                )));
            }
            if feed.check_interval == 0 {
                return Err(RelayError::Config(format!(
                    "feed '{}' has check_interval 0",
                    feed.name
                )));
            }
            if feed.chat_ids.is_empty() {
                warn!("Feed '{}' has no chat_ids, new entries will only be logged", feed.name);
            }
        }

        if self.feeds.is_empty() {
            warn!("No feeds configured");
        }

        Ok(())
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}***", visible)
}

/// Resolve configuration: the given path, else `./config.json`, else the
/// environment.
pub fn load_config(config_file: Option<&Path>) -> Result<BotConfig> {
    if let Some(path) = config_file {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            return BotConfig::from_json_file(path);
        }
        warn!("Config file {} not found, falling back", path.display());
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
        return BotConfig::from_json_file(default_path);
    }

    info!("Loading configuration from environment");
    Ok(BotConfig::from_env())
}
