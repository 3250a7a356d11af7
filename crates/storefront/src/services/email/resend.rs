//! Resend HTTP API transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{EmailError, MailTransport, OutgoingEmail};
use crate::config::ResendConfig;

/// Sends through `POST {api_base}/emails`.
#[derive(Clone)]
pub struct ResendTransport {
    client: reqwest::Client,
    api_base: String,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

impl ResendTransport {
    /// Create a new Resend transport.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ResendConfig) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| EmailError::Provider {
                status: 0,
                message: format!("Invalid API key format: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for ResendTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let body = SendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text));
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.id)
    }
}

/// Map a Resend error body to an [`EmailError`].
fn classify_error(status: u16, body: &str) -> EmailError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if message.to_lowercase().contains("not verified") {
        EmailError::DomainNotVerified(message)
    } else {
        EmailError::Provider { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unverified_domain_detected() {
        let err = classify_error(
            403,
            r#"{"statusCode":403,"message":"The example.com domain is not verified. Please, add and verify your domain on https://resend.com/domains","name":"validation_error"}"#,
        );
        assert!(matches!(err, EmailError::DomainNotVerified(m) if m.starts_with("The example.com")));
    }

    #[test]
    fn test_other_errors_keep_status() {
        let err = classify_error(422, r#"{"message":"Invalid `to` field."}"#);
        assert!(matches!(err, EmailError::Provider { status: 422, message } if message == "Invalid `to` field."));

        let err = classify_error(502, "Bad Gateway");
        assert!(matches!(err, EmailError::Provider { status: 502, message } if message == "Bad Gateway"));
    }

    #[test]
    fn test_request_shape() {
        let body = SendRequest {
            from: "noreply@example.com",
            to: ["jo@example.com"],
            subject: "s",
            text: "t",
            html: "h",
        };
        let value = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(value["to"], serde_json::json!(["jo@example.com"]));
    }
}
