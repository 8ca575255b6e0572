//! Migrate command - applies the shadow key schema

use tracing::info;

use crate::config::StorageBackend;
use crate::infrastructure::migrations::{run_migrations, PostgresMigrator};

pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    if config.storage.backend != StorageBackend::Postgres {
        anyhow::bail!("migrate requires storage.backend = postgres");
    }

    let pool = crate::connect_postgres(&config.storage).await?;
    let applied = run_migrations(&pool).await?;
    let version = PostgresMigrator::new(pool).current_version().await?;

    info!(applied, ?version, "Migrations complete");
    println!(
        "applied {} migration(s), schema version {}",
        applied,
        version.map_or_else(|| "none".to_string(), |v| v.to_string())
    );

    Ok(())
}
