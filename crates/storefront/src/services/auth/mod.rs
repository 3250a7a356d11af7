//! Authentication service.
//!
//! Accounts and sessions live in the hosted backend. This service drives the
//! account endpoints and turns a session secret into the [`CurrentUser`]
//! kept in the server-side session.

mod error;

pub use error::AuthError;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use servicehub_core::{AccountId, Email};

use crate::appwrite::{Account, AppwriteClient, NewSession, OAuthProvider};
use crate::models::CurrentUser;
use crate::services::users::{MirrorOutcome, ensure_user_document};

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound on the session check done when the profile page loads.
pub const SESSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub const VERIFY_EMAIL_PATH: &str = "/auth/verify-email";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
pub const OAUTH_CALLBACK_PATH: &str = "/auth/oauth/callback";
pub const OAUTH_FAILURE_PATH: &str = "/auth/signin?error=oauth";

/// Where the users-collection mirror is written at signup.
#[derive(Debug, Clone, Copy)]
pub struct UsersMirror<'a> {
    pub database_id: &'a str,
    pub collection: &'a str,
}

/// Result of a successful signup.
#[derive(Debug, Clone)]
pub struct Signup {
    pub account: Account,
    pub verification_sent: bool,
    /// `None` when no database is configured or the mirror write failed.
    pub mirror: Option<MirrorOutcome>,
}

/// Authentication service.
///
/// Handles signup, signin, verification, recovery and OAuth against the
/// hosted backend's account API.
pub struct AuthService<'a> {
    client: &'a AppwriteClient,
    base_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// `base_url` is the storefront origin used to build emailed links.
    #[must_use]
    pub const fn new(client: &'a AppwriteClient, base_url: &'a str) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Create an account and send the verification email.
    ///
    /// A temporary session is opened to request verification and write the
    /// users mirror, then closed again: the customer signs in after
    /// verifying. Verification and mirror failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountExists` if the email is already registered,
    /// or a validation error for a bad email or short password.
    #[instrument(skip(self, password, mirror), fields(email = %email))]
    pub async fn signup(
        &self,
        email: &str,
        password: &SecretString,
        name: Option<&str>,
        mirror: Option<UsersMirror<'_>>,
    ) -> Result<Signup, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let account = self
            .client
            .create_account(email.as_str(), password, name)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    AuthError::AccountExists
                } else {
                    AuthError::remote(e, "Failed to create account")
                }
            })?;
        info!(user_id = %account.id, "Account created");

        let NewSession { secret, .. } = self
            .client
            .create_email_session(email.as_str(), password)
            .await
            .map_err(|e| AuthError::remote(e, "Failed to create account"))?;

        let verification_sent = match self
            .client
            .create_verification(&secret, &self.url(VERIFY_EMAIL_PATH))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Verification email not sent");
                false
            }
        };

        let mirror = match mirror {
            Some(target) => {
                let store = self.client.databases(target.database_id, Some(secret.clone()));
                match ensure_user_document(
                    &store,
                    target.collection,
                    &AccountId::new(account.id.as_str()),
                    email.as_str(),
                    name,
                )
                .await
                {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!(error = %e, "Users mirror not written");
                        None
                    }
                }
            }
            None => {
                warn!("Database ID not configured; users mirror skipped");
                None
            }
        };

        if let Err(e) = self.client.delete_current_session(&secret).await {
            warn!(error = %e, "Temporary signup session not deleted");
        }

        Ok(Signup {
            account,
            verification_sent,
            mirror,
        })
    }

    /// Sign in with email and password.
    ///
    /// Unverified accounts are let in with a warning.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signin(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;

        let session = self
            .client
            .create_email_session(email.as_str(), password)
            .await
            .map_err(|e| AuthError::credentials(e, "Invalid email or password"))?;

        self.load_user(&session.secret, "Invalid email or password")
            .await
    }

    /// End the backend session. Failures are logged; the caller clears the
    /// local session regardless.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn signout(&self, user: &CurrentUser) {
        if let Err(e) = self
            .client
            .delete_current_session(&user.session_secret())
            .await
        {
            warn!(error = %e, "Backend session not deleted");
        }
    }

    // =========================================================================
    // Verification and Recovery
    // =========================================================================

    /// Confirm an email address from the emailed link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` if the link is incomplete.
    #[instrument(skip(self, secret))]
    pub async fn verify_email(&self, user_id: &str, secret: &str) -> Result<(), AuthError> {
        let (user_id, secret) = link_params(user_id, secret)?;
        self.client
            .update_verification(user_id, secret)
            .await
            .map_err(|e| AuthError::remote(e, "Failed to verify email. The link may have expired."))?;
        info!(user_id, "Email verified");
        Ok(())
    }

    /// Send another verification email. Needs the password because only a
    /// session can request verification.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn resend_verification(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let fallback = "Failed to resend verification email";

        let NewSession { secret, .. } = self
            .client
            .create_email_session(email.as_str(), password)
            .await
            .map_err(|e| AuthError::credentials(e, fallback))?;

        let result = self
            .client
            .create_verification(&secret, &self.url(VERIFY_EMAIL_PATH))
            .await
            .map_err(|e| AuthError::remote(e, fallback));

        if let Err(e) = self.client.delete_current_session(&secret).await {
            warn!(error = %e, "Temporary session not deleted");
        }
        result
    }

    /// Email a password recovery link.
    ///
    /// # Errors
    ///
    /// Returns error if the email is invalid or the backend refuses.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn request_recovery(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        self.client
            .create_recovery(email.as_str(), &self.url(RESET_PASSWORD_PATH))
            .await
            .map_err(|e| AuthError::remote(e, "Failed to send password reset email"))
    }

    /// Set a new password from the recovery link.
    ///
    /// # Errors
    ///
    /// Returns error if the link is incomplete, the passwords differ or are
    /// too short, or the backend rejects the secret.
    #[instrument(skip(self, secret, password, confirm))]
    pub async fn complete_recovery(
        &self,
        user_id: &str,
        secret: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<(), AuthError> {
        let (user_id, secret) = link_params(user_id, secret)?;
        if password.expose_secret() != confirm.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password.expose_secret())?;

        self.client
            .update_recovery(user_id, secret, password)
            .await
            .map_err(|e| AuthError::remote(e, "Failed to reset password. The link may have expired."))?;
        info!(user_id, "Password reset");
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Change the display name and refresh `user` from the backend.
    ///
    /// # Errors
    ///
    /// Returns error if the session is no longer valid.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn update_name(&self, user: &mut CurrentUser, name: &str) -> Result<(), AuthError> {
        let secret = user.session_secret();
        self.client
            .update_name(&secret, name.trim())
            .await
            .map_err(|e| AuthError::remote(e, "Failed to update profile"))?;
        let account = self
            .client
            .get_account(&secret)
            .await
            .map_err(|e| AuthError::remote(e, "Failed to update profile"))?;
        user.update_from(&account);
        Ok(())
    }

    /// Re-read the account behind `user`'s session, bounded by
    /// [`SESSION_CHECK_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Timeout` if the backend is slow, or an error if
    /// the session is no longer valid.
    pub async fn check_session(&self, user: &CurrentUser) -> Result<Account, AuthError> {
        let secret = user.session_secret();
        tokio::time::timeout(SESSION_CHECK_TIMEOUT, self.client.get_account(&secret))
            .await
            .map_err(|_| AuthError::Timeout)?
            .map_err(|e| AuthError::remote(e, "Your session has expired"))
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    /// Provider URL that starts the OAuth token flow.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownProvider` for anything but google/facebook.
    pub fn oauth_url(&self, provider: &str) -> Result<String, AuthError> {
        let provider = OAuthProvider::parse(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;
        Ok(self.client.oauth2_token_url(
            provider,
            &self.url(OAUTH_CALLBACK_PATH),
            &self.url(OAUTH_FAILURE_PATH),
        ))
    }

    /// Exchange the callback's `userId` and `secret` for a session.
    ///
    /// # Errors
    ///
    /// Returns error if the token is missing, invalid or expired.
    #[instrument(skip(self, secret))]
    pub async fn complete_oauth(&self, user_id: &str, secret: &str) -> Result<CurrentUser, AuthError> {
        let (user_id, secret) = link_params(user_id, secret)?;
        let session = self
            .client
            .create_token_session(user_id, secret)
            .await
            .map_err(|e| AuthError::remote(e, "Sign-in with the provider failed"))?;
        self.load_user(&session.secret, "Sign-in with the provider failed")
            .await
    }

    async fn load_user(&self, secret: &SecretString, fallback: &str) -> Result<CurrentUser, AuthError> {
        let account = self
            .client
            .get_account(secret)
            .await
            .map_err(|e| AuthError::remote(e, fallback))?;

        if !account.email_verification {
            warn!(user_id = %account.id, "Signed in with unverified email");
        }
        info!(user_id = %account.id, "Signed in");
        Ok(CurrentUser::new(&account, secret.expose_secret()))
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

fn link_params<'s>(user_id: &'s str, secret: &'s str) -> Result<(&'s str, &'s str), AuthError> {
    let user_id = user_id.trim();
    let secret = secret.trim();
    if user_id.is_empty() || secret.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok((user_id, secret))
}
