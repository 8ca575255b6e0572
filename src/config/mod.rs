//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, DirectoryConfig, KeysConfig, LogFormat, LoggingConfig, ProvisioningConfig,
    ServerConfig, StorageBackend, StorageConfig,
};
