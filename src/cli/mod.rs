//! CLI module for PMP Key Broker
//!
//! - `serve`: HTTP API
//! - `reconcile`: one reconciliation pass for a user, printed as JSON
//! - `migrate`: apply PostgreSQL migrations

pub mod migrate;
pub mod reconcile;
pub mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP Key Broker - LiteLLM keys on behalf of users
#[derive(Parser)]
#[command(name = "pmp-key-broker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Reconcile one user's keys against the directory
    Reconcile(reconcile::ReconcileArgs),

    /// Apply pending database migrations
    Migrate,
}

/// Load `.env` and configuration, then start logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    Ok(config)
}
