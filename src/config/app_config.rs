use std::time::Duration;

use serde::Deserialize;

use crate::domain::{DomainError, KeyLifetime};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub directory: DirectoryConfig,
    pub storage: StorageConfig,
    pub keys: KeysConfig,
    pub provisioning: ProvisioningConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix for the key endpoints
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Upstream credential directory (LiteLLM proxy)
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub base_url: String,
    /// Bearer token; requests are sent unauthenticated when empty
    pub master_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

/// Key lifecycle policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Budget ceiling for standard keys, also the budget of provisioned users
    pub default_budget: f64,
    /// Ceiling on live directory keys per user
    pub max_active_keys: usize,
    /// Ceiling on active long-term keys per user
    pub long_term_key_limit: usize,
    pub long_term_key_budget: f64,
    pub long_term_key_lifetime: KeyLifetime,
    /// Standard keys never expire when unset
    pub standard_key_lifetime: Option<KeyLifetime>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// How long a confirmed user is trusted without asking the directory; 0 disables caching
    pub cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            prefix: "/api".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://litellm:4000".to_string(),
            master_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("base_url", &self.base_url)
            .field("master_key", &if self.master_key.is_empty() { "" } else { "***" })
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: 5,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            default_budget: 1.0,
            max_active_keys: 10,
            long_term_key_limit: 1,
            long_term_key_budget: 20.0,
            long_term_key_lifetime: KeyLifetime::LONG_TERM_DEFAULT,
            standard_key_lifetime: None,
        }
    }
}

impl ProvisioningConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.directory.base_url.trim().is_empty() {
            return Err(DomainError::configuration("directory.base_url is required"));
        }

        if self.directory.timeout_secs == 0 {
            return Err(DomainError::configuration(
                "directory.timeout_secs must be greater than zero",
            ));
        }

        let budgets = [self.keys.default_budget, self.keys.long_term_key_budget];
        if budgets.iter().any(|b| b.is_nan() || *b < 0.0) {
            return Err(DomainError::configuration("key budgets cannot be negative"));
        }

        if self.storage.backend == StorageBackend::Postgres && self.storage.database_url.is_none()
        {
            return Err(DomainError::configuration(
                "storage.database_url is required for the postgres backend",
            ));
        }

        Ok(())
    }
}
