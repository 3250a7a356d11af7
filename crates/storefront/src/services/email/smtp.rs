//! SMTP relay transport.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;
use uuid::Uuid;

use super::{EmailError, MailTransport, OutgoingEmail};
use crate::config::SmtpConfig;

/// Sends through an authenticated SMTP relay.
///
/// Port 465 (or `SMTP_SECURE=true`) uses implicit TLS; anything else
/// upgrades with STARTTLS.
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpTransport {
    /// Create a new SMTP transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let mailer = builder.port(config.port).credentials(credentials).build();

        Ok(Self {
            mailer,
            from_address: config.from.clone(),
        })
    }

    fn build_message(&self, email: &OutgoingEmail, message_id: &str) -> Result<Message, EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(&email.subject)
            .message_id(Some(message_id.to_string()))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;
        Ok(message)
    }
}

/// `<uuid@domain>` using the sender's domain.
fn new_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map_or("localhost", |(_, d)| d.trim_end_matches('>'));
    format!("<{}@{domain}>", Uuid::new_v4())
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let message_id = new_message_id(&self.from_address);
        let message = self.build_message(email, &message_id)?;
        self.mailer.send(message).await?;
        Ok(message_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    // Building the pooled transport needs a runtime.
    fn transport(from: &str) -> SmtpTransport {
        SmtpTransport::new(&SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "mailer".into(),
            password: SecretString::from("app-password"),
            implicit_tls: false,
            from: from.into(),
        })
        .unwrap()
    }

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.into(),
            subject: "Order confirmation (test mode)".into(),
            text: "Thanks".into(),
            html: "<p>Thanks</p>".into(),
        }
    }

    #[test]
    fn test_message_id_uses_sender_domain() {
        let id = new_message_id("ServiceHub <noreply@mail.example.com>");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@mail.example.com>"));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let t = transport("noreply@example.com");
        let err = t.build_message(&email("not-an-address"), "<x@example.com>").unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(a) if a == "not-an-address"));
    }

    #[tokio::test]
    async fn test_builds_multipart_message() {
        let t = transport("noreply@example.com");
        let message = t.build_message(&email("jo@example.com"), "<x@example.com>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Message-ID: <x@example.com>"));
        assert!(raw.contains("multipart/alternative"));
    }
}
