//! Session-related types.
//!
//! Types stored in the session for authentication state and page feedback.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use servicehub_core::AccountId;

use crate::appwrite::Account;

/// Session-stored user identity.
///
/// Holds the backend session secret so requests can be made on the
/// customer's behalf; `Debug` redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account id issued by the backend.
    pub id: AccountId,
    /// Account email as stored by the backend.
    pub email: String,
    /// Display name (may be empty).
    pub name: String,
    pub email_verified: bool,
    session_secret: String,
}

impl CurrentUser {
    #[must_use]
    pub fn new(account: &Account, session_secret: &str) -> Self {
        Self {
            id: AccountId::new(account.id.clone()),
            email: account.email.clone(),
            name: account.name.clone(),
            email_verified: account.email_verification,
            session_secret: session_secret.to_string(),
        }
    }

    /// Refresh the profile fields from a fresh account read.
    pub fn update_from(&mut self, account: &Account) {
        self.email.clone_from(&account.email);
        self.name.clone_from(&account.name);
        self.email_verified = account.email_verification;
    }

    #[must_use]
    pub fn session_secret(&self) -> SecretString {
        SecretString::from(self.session_secret.clone())
    }

    /// Name if set, else the local part of the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.split('@').next().unwrap_or_default()
        } else {
            name
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("email_verified", &self.email_verified)
            .field("session_secret", &"[REDACTED]")
            .finish()
    }
}

/// Flash message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

/// One-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            text: text.into(),
        }
    }

    /// CSS modifier used by the templates.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "flash-success",
            FlashKind::Error => "flash-error",
            FlashKind::Info => "flash-info",
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the session cart.
    pub const CART: &str = "cart";

    /// Key for messages queued for the next page.
    pub const FLASH: &str = "flash";

    /// Set once the visitor accepts the cookie banner.
    pub const COOKIE_CONSENT: &str = "cookie_consent";
}
