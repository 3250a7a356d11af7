//! Subcommand implementations.

pub mod probe;
pub mod seed;

use servicehub_storefront::appwrite::{AppwriteClient, AppwriteError};
use servicehub_storefront::config::{AppwriteConfig, ConfigError};
use servicehub_storefront::services::persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] AppwriteError),

    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    /// Seeding writes with the server key.
    #[error("APPWRITE_API_KEY is required for seeding")]
    MissingApiKey,

    #[error("APPWRITE_DATABASE_ID is required for seeding")]
    MissingDatabase,

    #[error("Probe failed: {0}")]
    Probe(String),
}

/// Load backend configuration from the environment (and `.env`).
fn backend() -> Result<(AppwriteConfig, AppwriteClient), CliError> {
    dotenvy::dotenv().ok();
    let config = AppwriteConfig::from_env()?;
    let client = AppwriteClient::new(&config)?;
    Ok((config, client))
}
