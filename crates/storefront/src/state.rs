//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;

use crate::appwrite::{AppwriteClient, AppwriteError, Databases};
use crate::config::StorefrontConfig;
use crate::services::auth::{AuthService, UsersMirror};
use crate::services::email::{EmailError, Mailer};
use crate::services::persistence::PersistenceError;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Appwrite(#[from] AppwriteError),
    #[error("email transport: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client, mailer and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    appwrite: AppwriteClient,
    mailer: Mailer,
}

impl AppState {
    /// Create a new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client or an email transport cannot
    /// be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let appwrite = AppwriteClient::new(&config.appwrite)?;
        let mailer = Mailer::from_config(&config.email)?;
        Ok(Self::from_parts(config, appwrite, mailer))
    }

    /// State from prebuilt parts; tests swap in a fake mailer this way.
    #[must_use]
    pub fn from_parts(config: StorefrontConfig, appwrite: AppwriteClient, mailer: Mailer) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                appwrite,
                mailer,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the hosted backend client.
    #[must_use]
    pub fn appwrite(&self) -> &AppwriteClient {
        &self.inner.appwrite
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    /// Auth service bound to this deployment's base URL.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.appwrite, &self.inner.config.base_url)
    }

    /// Where signup writes the users mirror, if a database is configured.
    #[must_use]
    pub fn users_mirror(&self) -> Option<UsersMirror<'_>> {
        let appwrite = &self.inner.config.appwrite;
        appwrite.database_id.as_deref().map(|database_id| UsersMirror {
            database_id,
            collection: &appwrite.collections.users,
        })
    }

    /// Document store for the configured database, acting as `session` when
    /// given and with the server key otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotConfigured`] if no database id is set.
    pub fn documents(&self, session: Option<SecretString>) -> Result<Databases, PersistenceError> {
        let database_id = self
            .inner
            .config
            .appwrite
            .database_id
            .as_deref()
            .ok_or(PersistenceError::NotConfigured)?;
        Ok(self.inner.appwrite.databases(database_id, session))
    }
}
