//! Hosted backend (Appwrite REST API) client.
//!
//! # Architecture
//!
//! - The backend owns accounts, sessions and every persisted document; there
//!   is no local copy and no cache.
//! - [`AppwriteClient`] speaks the account endpoints directly and hands out
//!   [`Databases`] handles scoped to one database and one set of credentials.
//! - [`DocumentStore`] is the seam the checkout and booking services are
//!   written against, so they can run against an in-memory fake in tests.
//!
//! # Credentials
//!
//! Requests carry `X-Appwrite-Project` always, plus either the customer's
//! session secret (`X-Appwrite-Session`) or the server API key
//! (`X-Appwrite-Key`). A session always wins over the key so that document
//! permissions are evaluated as the signed-in customer.
//!
//! # Example
//!
//! ```rust,ignore
//! use servicehub_storefront::appwrite::{AppwriteClient, DocumentId, DocumentStore};
//!
//! let client = AppwriteClient::new(&config.appwrite)?;
//! let db = client.databases("servicehub-db", Some(session_secret));
//! let doc = db
//!     .create_document("appointments", &DocumentId::Unique, &payload, &[])
//!     .await?;
//! ```

mod client;
mod databases;
pub mod types;

pub use client::{AppwriteClient, Credentials, HealthVersion, NewSession};
pub use databases::{Databases, DocumentStore};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum AppwriteError {
    /// HTTP request failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error body.
    #[error("{message}")]
    Api {
        /// HTTP status code echoed in the body.
        code: u16,
        /// Machine-readable error type, e.g. `document_invalid_structure`.
        kind: String,
        /// Human-readable message; the schema classification reads this.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A credential could not be encoded as a header value.
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl AppwriteError {
    /// Shorthand for an API error, mostly useful to fakes.
    #[must_use]
    pub fn api(code: u16, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// HTTP status code, when the backend answered.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Backend error type string (empty if none).
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Api { kind, .. } => kind,
            _ => "",
        }
    }

    fn message_lower(&self) -> String {
        match self {
            Self::Api { message, .. } => message.to_lowercase(),
            _ => String::new(),
        }
    }

    /// The payload or query used an attribute the collection does not have.
    ///
    /// This is the only error class the candidate-payload retry absorbs.
    /// Range violations on `itemID` also mention the document structure;
    /// callers check [`Self::is_item_id_range`] first.
    #[must_use]
    pub fn is_schema_mismatch(&self) -> bool {
        let msg = self.message_lower();
        msg.contains("unknown attribute")
            || msg.contains("invalid document structure")
            || msg.contains("attribute not found in schema")
    }

    /// The items collection restricts `itemID` to a range the catalog ids
    /// do not fit.
    #[must_use]
    pub fn is_item_id_range(&self) -> bool {
        let msg = self.message_lower();
        msg.contains("attribute \"itemid\"") && msg.contains("valid range")
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.code() == Some(409)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some(401)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(404)
    }

    /// Attribute names quoted in the error message, in order.
    ///
    /// `Invalid document structure: Unknown attribute: "userId"` yields
    /// `["userId"]`.
    #[must_use]
    pub fn quoted_attributes(&self) -> Vec<&str> {
        let Self::Api { message, .. } = self else {
            return Vec::new();
        };
        message
            .split('"')
            .skip(1)
            .step_by(2)
            .filter(|s| !s.is_empty())
            .collect()
    }
}
