//! Authentication error types.

use thiserror::Error;

use crate::appwrite::AppwriteError;

/// Errors that can occur during authentication operations.
///
/// Display strings are shown to the customer as flash messages.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("Please enter a valid email address ({0})")]
    InvalidEmail(#[from] servicehub_core::EmailError),

    /// Password too short.
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email already registered.
    #[error("An account with this email already exists")]
    AccountExists,

    /// The backend does not accept requests from this origin.
    #[error("Platform not configured. Please add localhost to your Appwrite platforms (Auth → Platforms).")]
    PlatformNotConfigured,

    /// Verification or recovery link without `userId`/`secret`.
    #[error("Invalid or incomplete link. Please request a new one.")]
    MissingToken,

    /// OAuth provider not supported.
    #[error("Unsupported sign-in provider: {0}")]
    UnknownProvider(String),

    /// The backend did not answer the session check in time.
    #[error("Session check timed out")]
    Timeout,

    /// Any other backend failure, with the message to show.
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: AppwriteError,
    },
}

impl AuthError {
    /// Map a backend error, showing its message or `fallback` when it has
    /// none.
    pub(crate) fn remote(err: AppwriteError, fallback: &str) -> Self {
        if err.kind() == "general_unauthorized_scope" {
            return Self::PlatformNotConfigured;
        }
        let message = match &err {
            AppwriteError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        };
        Self::Remote {
            message,
            source: err,
        }
    }

    /// Like [`AuthError::remote`], but a 401 means wrong credentials.
    pub(crate) fn credentials(err: AppwriteError, fallback: &str) -> Self {
        if err.kind() != "general_unauthorized_scope" && err.is_unauthorized() {
            Self::InvalidCredentials
        } else {
            Self::remote(err, fallback)
        }
    }

    /// Whether the customer can fix this by changing their input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::WeakPassword(_)
                | Self::PasswordMismatch
                | Self::InvalidCredentials
                | Self::AccountExists
                | Self::MissingToken
                | Self::UnknownProvider(_)
        )
    }
}
