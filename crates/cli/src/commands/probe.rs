//! Backend connectivity probe.
//!
//! 1. `GET /health/version` must answer.
//! 2. `GET /account` without a session must answer 401: the project id was
//!    accepted and there is simply no signed-in user. A 404 means the project
//!    id is wrong.

use tracing::{info, warn};

use super::{CliError, backend};

/// Run both checks and report what was found.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached or rejects the project.
pub async fn run() -> Result<(), CliError> {
    let (config, client) = backend()?;

    info!(endpoint = %client.endpoint(), project = %client.project_id(), "Probing backend");

    let health = client.health_version().await.map_err(|e| {
        CliError::Probe(format!("{} is not reachable: {e}", client.endpoint()))
    })?;
    info!(version = %health.version, "Backend is reachable");

    match client.probe_account().await {
        Err(e) if e.is_unauthorized() => {
            info!(kind = %e.kind(), "Project accepted (401 without a session is expected)");
            if e.kind() == "general_unauthorized_scope" {
                warn!(
                    "Sign-in may be blocked: add this site's host to the project's platforms \
                     (Auth -> Platforms)"
                );
            }
        }
        Err(e) if e.is_not_found() => {
            return Err(CliError::Probe(format!(
                "project {} was not found: {e}",
                client.project_id()
            )));
        }
        Err(e) => return Err(e.into()),
        Ok(account) => warn!(account = %account.id, "Unexpected account without a session"),
    }

    match &config.database_id {
        Some(database_id) => info!(
            database = %database_id,
            items = %config.collections.items,
            purchases = %config.collections.purchases,
            users = %config.collections.users,
            appointments = %config.collections.appointments,
            "Persistence configured"
        ),
        None => warn!("APPWRITE_DATABASE_ID is not set; checkout and bookings will be disabled"),
    }
    if !client.has_api_key() {
        warn!("APPWRITE_API_KEY is not set; seeding and sign-up bookkeeping are unavailable");
    }

    info!("Probe complete");
    Ok(())
}
