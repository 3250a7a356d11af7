//! Transactional email: booking and order confirmations.
//!
//! Messages are rendered from Askama templates (plain text + HTML) and
//! handed to a [`MailTransport`]. [`Mailer`] picks the transport:
//!
//! 1. Resend, when `RESEND_API_KEY` is set;
//! 2. SMTP, when Resend reports the sender domain as unverified, or when
//!    SMTP is the only transport configured;
//! 3. otherwise [`EmailError::NotConfigured`].
//!
//! Email is always a side channel: callers report a failed send next to the
//! saved booking or order, never instead of it.

mod resend;
mod smtp;
mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use resend::ResendTransport;
pub use smtp::SmtpTransport;
pub use templates::{BookingConfirmation, OrderConfirmation, OrderLine};

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Neither Resend nor SMTP is configured.
    #[error("Email not configured.")]
    NotConfigured,

    /// Resend refused the sender domain and there is no SMTP fallback.
    #[error(
        "Email domain not verified. Use onboarding@resend.dev for testing or verify your domain."
    )]
    DomainNotVerified(String),

    /// Resend answered with an error.
    #[error("Email provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Resend could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl EmailError {
    /// Operator-side problems that are answered with 501 by the API.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::DomainNotVerified(_))
    }
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// A delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Provider message id.
    pub id: String,
    /// Name of the transport that delivered it.
    pub transport: &'static str,
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name for logs, e.g. `"resend"`.
    fn name(&self) -> &'static str;

    /// Deliver the message and return the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError>;
}

/// Transport selection with domain-verification fallback.
#[derive(Clone, Default)]
pub struct Mailer {
    primary: Option<Arc<dyn MailTransport>>,
    fallback: Option<Arc<dyn MailTransport>>,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("primary", &self.primary.as_ref().map(|t| t.name()))
            .field("fallback", &self.fallback.as_ref().map(|t| t.name()))
            .finish()
    }
}

impl Mailer {
    /// Mailer from explicit transports.
    #[must_use]
    pub fn new(
        primary: Option<Arc<dyn MailTransport>>,
        fallback: Option<Arc<dyn MailTransport>>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Resend as primary, SMTP as fallback, each only if configured.
    ///
    /// # Errors
    ///
    /// Returns error if the Resend client or SMTP relay cannot be built.
    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let primary = config
            .resend
            .as_ref()
            .map(ResendTransport::new)
            .transpose()?
            .map(|t| Arc::new(t) as Arc<dyn MailTransport>);
        let fallback = config
            .smtp
            .as_ref()
            .map(SmtpTransport::new)
            .transpose()?
            .map(|t| Arc::new(t) as Arc<dyn MailTransport>);

        Ok(Self::new(primary, fallback))
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }

    /// Send through the selected transport.
    ///
    /// # Errors
    ///
    /// - [`EmailError::NotConfigured`] if there is no transport
    /// - [`EmailError::DomainNotVerified`] if Resend refused the sender and
    ///   there is no SMTP fallback
    /// - any transport error otherwise
    #[instrument(skip(self, email), fields(subject = %email.subject))]
    pub async fn send(&self, email: &OutgoingEmail) -> Result<Sent, EmailError> {
        let (transport, result) = match (&self.primary, &self.fallback) {
            (Some(primary), fallback) => match primary.send(email).await {
                Err(EmailError::DomainNotVerified(detail)) => {
                    let Some(fallback) = fallback else {
                        warn!(detail = %detail, "Sender domain not verified and no SMTP fallback");
                        return Err(EmailError::DomainNotVerified(detail));
                    };
                    warn!(detail = %detail, "Sender domain not verified; falling back to SMTP");
                    (fallback, fallback.send(email).await)
                }
                result => (primary, result),
            },
            (None, Some(fallback)) => (fallback, fallback.send(email).await),
            (None, None) => return Err(EmailError::NotConfigured),
        };

        let id = result?;
        info!(transport = transport.name(), message_id = %id, "Email sent");
        Ok(Sent {
            id,
            transport: transport.name(),
        })
    }

    /// Render and send a booking confirmation.
    ///
    /// # Errors
    ///
    /// See [`Mailer::send`]; also fails if the template does not render.
    pub async fn send_booking_confirmation(
        &self,
        confirmation: &BookingConfirmation,
    ) -> Result<Sent, EmailError> {
        self.send(&confirmation.render()?).await
    }

    /// Render and send an order confirmation.
    ///
    /// # Errors
    ///
    /// See [`Mailer::send`]; also fails if the template does not render.
    pub async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<Sent, EmailError> {
        self.send(&confirmation.render()?).await
    }
}
