//! Session middleware configuration.
//!
//! Sessions live in process memory (`tower-sessions` `MemoryStore`); they only
//! carry the cart, flash messages and the backend session secret, all of which
//! can be rebuilt by signing in again after a restart.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::models::{Flash, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sh_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Queue a message for the next rendered page.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the queued message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

/// Whether the visitor has accepted the cookie banner.
pub async fn has_cookie_consent(session: &Session) -> bool {
    session
        .get::<bool>(session_keys::COOKIE_CONSENT)
        .await
        .ok()
        .flatten()
        .unwrap_or(false)
}

/// Remember that the visitor accepted the cookie banner.
pub async fn record_cookie_consent(session: &Session) {
    if let Err(e) = session.insert(session_keys::COOKIE_CONSENT, true).await {
        tracing::warn!(error = %e, "Failed to store cookie consent");
    }
}
