//! PMP Key Broker
//!
//! Issues, tracks and revokes LiteLLM virtual keys on behalf of users:
//! - Local shadow records reconciled against the directory listing
//! - Per-class budget ceilings and active key limits
//! - Just-in-time provisioning of directory users

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use api::state::AppState;
use config::{StorageBackend, StorageConfig};
use domain::{CredentialDirectory, ShadowKeyRepository};
use infrastructure::directory::LiteLlmDirectory;
use infrastructure::migrations::run_migrations;
use infrastructure::services::{KeyService, ProvisioningService};
use infrastructure::shadow_key::{InMemoryShadowKeyRepository, PostgresShadowKeyRepository};

/// Fully wired services, shared by the HTTP server and the CLI commands
pub struct AppServices {
    pub key_service: Arc<KeyService>,
    pub provisioning_service: Arc<ProvisioningService>,
}

impl AppServices {
    pub fn into_state(self) -> AppState {
        AppState::new(self.key_service, self.provisioning_service)
    }
}

/// Build every service from configuration
pub async fn create_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    config.validate()?;

    if config.directory.master_key.is_empty() {
        warn!("directory.master_key is empty, directory requests will be unauthenticated");
    }

    let directory: Arc<dyn CredentialDirectory> =
        Arc::new(LiteLlmDirectory::from_config(&config.directory)?);
    let store = create_store(&config.storage).await?;

    let key_service = Arc::new(KeyService::new(
        store,
        directory.clone(),
        config.keys.clone(),
    ));
    let provisioning_service = Arc::new(ProvisioningService::new(
        directory,
        config.keys.default_budget,
        config.provisioning.cache_ttl(),
    ));

    info!(
        directory = %config.directory.base_url,
        storage = ?config.storage.backend,
        "Services initialized"
    );

    Ok(AppServices {
        key_service,
        provisioning_service,
    })
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    Ok(create_services(config).await?.into_state())
}

async fn create_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ShadowKeyRepository>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory shadow key store");
            Ok(Arc::new(InMemoryShadowKeyRepository::new()))
        }
        StorageBackend::Postgres => {
            let pool = connect_postgres(config).await?;
            let applied = run_migrations(&pool).await?;
            info!(applied, "Using PostgreSQL shadow key store");
            Ok(Arc::new(PostgresShadowKeyRepository::new(pool)))
        }
    }
}

/// Open a connection pool for the configured database
pub async fn connect_postgres(config: &StorageConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("storage.database_url is required for the postgres backend")?;

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("PostgreSQL connection established");

    Ok(pool)
}
