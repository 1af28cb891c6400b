//! Configuration management for the Fitness Coach client
//!
//! Configuration is loaded hierarchically:
//! 1. Default values (in code)
//! 2. TOML config files (config/development.toml or config/production.toml)
//! 3. Environment variables (prefix: FC__)

use crate::error::ClientResult;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub probe: ProbeConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub user: UserConfig,
}

/// Backend REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

/// Health probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub health_path: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

/// Durable cache location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

/// Which queue entries a sync pass removes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Only entries whose target was replayed successfully
    #[default]
    ReplayedOnly,
    /// Every entry, whatever the outcome
    All,
}

/// Synchronization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub clear_policy: ClearPolicy,
}

/// Conversational service used by the chat bridge
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    #[default]
    Backend,
    N8n,
    Deepseek,
}

/// Chat/AI configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub provider: ChatProvider,
    pub webhook_url: String,
    pub deepseek_url: String,
    pub deepseek_model: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    pub user_name: String,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatProvider::Backend,
            webhook_url: "http://localhost:5678/webhook/chat".to_string(),
            deepseek_url: "https://api.deepseek.com".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            api_key: None,
            user_name: "Usuario".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Demo user configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: i64,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: fitness_coach_shared::DEMO_USER_ID,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:5000".to_string(),
                request_timeout_secs: 10,
            },
            probe: ProbeConfig {
                health_path: "/api".to_string(),
                interval_secs: 30,
                timeout_secs: 3,
            },
            storage: StorageConfig {
                dir: PathBuf::from(".fitness-coach"),
            },
            sync: SyncConfig::default(),
            chat: ChatConfig::default(),
            user: UserConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Loading order (later sources override earlier):
    /// 1. Default values
    /// 2. Config file based on RUST_ENV (development.toml or production.toml)
    /// 3. Environment variables with FC__ prefix
    pub fn load() -> ClientResult<Self> {
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let config_file = format!("config/{}.toml", env);
        let defaults = AppConfig::default();

        // SecretString is not Serialize, so defaults are seeded key by key
        let config = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.request_timeout_secs", defaults.api.request_timeout_secs)?
            .set_default("probe.health_path", defaults.probe.health_path)?
            .set_default("probe.interval_secs", defaults.probe.interval_secs)?
            .set_default("probe.timeout_secs", defaults.probe.timeout_secs)?
            .set_default("storage.dir", defaults.storage.dir.to_string_lossy().to_string())?
            .set_default("sync.clear_policy", "replayed_only")?
            .set_default("chat.provider", "backend")?
            .set_default("chat.webhook_url", defaults.chat.webhook_url)?
            .set_default("chat.deepseek_url", defaults.chat.deepseek_url)?
            .set_default("chat.deepseek_model", defaults.chat.deepseek_model)?
            .set_default("chat.user_name", defaults.chat.user_name)?
            .set_default("chat.timeout_secs", defaults.chat.timeout_secs)?
            .set_default("user.id", defaults.user.id)?
            // Load from environment-specific config file
            .add_source(config::File::with_name(&config_file).required(false))
            // Override with environment variables (FC__ prefix)
            // e.g., FC__API__BASE_URL=http://api:5000 sets api.base_url
            .add_source(config::Environment::with_prefix("FC").separator("__"))
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the probe cannot run with
    pub fn validate(&self) -> ClientResult<()> {
        if self.probe.interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "probe.interval_secs must be at least 1".to_string(),
            )
            .into());
        }
        if self.probe.timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "probe.timeout_secs must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Check if running in production mode
    pub fn is_production() -> bool {
        env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }

    /// Full URL of the health endpoint
    pub fn health_url(&self) -> String {
        format!(
            "{}{}",
            self.api.base_url.trim_end_matches('/'),
            self.probe.health_path
        )
    }
}
