//! Schema-tolerant document writes.
//!
//! Collections are configured by hand in the backend console and drift:
//! an attribute may be missing, renamed or spelled differently. Writes are
//! therefore expressed as an ordered list of candidate payloads, most
//! complete first, and [`first_accepted`] tries them in order:
//!
//! - a schema mismatch (unknown attribute, invalid structure) moves on to the
//!   next candidate;
//! - an `itemID` range violation stops immediately as a configuration error;
//! - anything else (network, permission, auth, conflict) stops immediately
//!   and is returned unmodified;
//! - running out of candidates is [`PersistenceError::SchemaExhausted`].

use std::future::Future;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::appwrite::{AppwriteError, Document, Payload};

/// Remediation text for an `itemID` range restriction.
pub const ITEM_ID_RANGE_HINT: &str = "Items.itemID is restricted by your Appwrite schema, but the \
    catalog ids don't fit that range. Update the items collection → Attributes → itemID to allow \
    your product ids (e.g. 1–6), then retry checkout.";

/// Errors from the checkout and booking layers.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// No database id configured.
    #[error("Database not configured (APPWRITE_DATABASE_ID)")]
    NotConfigured,

    /// The remote schema or configuration needs fixing by an operator.
    #[error("{0}")]
    InvalidConfiguration(String),

    /// Every candidate payload was rejected as a schema mismatch.
    #[error("Could not save to {collection}: {hint}")]
    SchemaExhausted { collection: String, hint: String },

    /// Caller input failed validation before any write.
    #[error("{0}")]
    Validation(String),

    /// The document does not exist or is not owned by the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// Any other backend failure, unmodified.
    #[error(transparent)]
    Remote(#[from] AppwriteError),
}

impl PersistenceError {
    /// Whether this is an operator-side problem rather than a customer one.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured | Self::InvalidConfiguration(_) | Self::SchemaExhausted { .. }
        )
    }
}

/// Why the candidate loop stopped without a document.
#[derive(Debug)]
pub enum CandidateError {
    /// A non-schema error; never retried.
    Rejected(AppwriteError),
    /// `itemID` range restriction; never retried.
    ItemIdRange(AppwriteError),
    /// Every candidate was a schema mismatch; carries the last error.
    Exhausted(AppwriteError),
    /// The candidate list was empty.
    Empty,
}

impl CandidateError {
    /// Convert into a [`PersistenceError`] for `collection` with `hint`
    /// attached on exhaustion.
    #[must_use]
    pub fn into_persistence(self, collection: &str, hint: &str) -> PersistenceError {
        match self {
            Self::Rejected(e) => PersistenceError::Remote(e),
            Self::ItemIdRange(_) => {
                PersistenceError::InvalidConfiguration(ITEM_ID_RANGE_HINT.to_string())
            }
            Self::Exhausted(last) => PersistenceError::SchemaExhausted {
                collection: collection.to_string(),
                hint: format!("{hint} (last error: {last})"),
            },
            Self::Empty => PersistenceError::SchemaExhausted {
                collection: collection.to_string(),
                hint: hint.to_string(),
            },
        }
    }
}

/// The accepted candidate.
#[derive(Debug)]
pub struct Accepted {
    pub document: Document,
    /// Index of the accepted candidate in the list.
    pub index: usize,
}

/// Ordered, de-duplicated candidate payloads.
#[derive(Debug, Clone, Default)]
pub struct Candidates(Vec<Payload>);

impl Candidates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate unless it is empty or equal to an earlier one.
    pub fn push(&mut self, payload: Payload) {
        if !payload.is_empty() && !self.0.contains(&payload) {
            self.0.push(payload);
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Payload] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Payload> for Candidates {
    fn from_iter<I: IntoIterator<Item = Payload>>(iter: I) -> Self {
        let mut candidates = Self::new();
        for payload in iter {
            candidates.push(payload);
        }
        candidates
    }
}

/// Try `write` with each candidate in order until one is accepted.
///
/// # Errors
///
/// See the module docs for which errors stop the loop.
pub async fn first_accepted<'a, F, Fut>(
    candidates: &'a Candidates,
    mut write: F,
) -> Result<Accepted, CandidateError>
where
    F: FnMut(&'a Payload) -> Fut,
    Fut: Future<Output = Result<Document, AppwriteError>>,
{
    let mut last = None;

    for (index, payload) in candidates.as_slice().iter().enumerate() {
        match write(payload).await {
            Ok(document) => return Ok(Accepted { document, index }),
            Err(e) if e.is_item_id_range() => return Err(CandidateError::ItemIdRange(e)),
            Err(e) if e.is_schema_mismatch() => {
                debug!(
                    candidate = index,
                    keys = ?payload.keys().collect::<Vec<_>>(),
                    error = %e,
                    "Candidate payload rejected by schema"
                );
                last = Some(e);
            }
            Err(e) => return Err(CandidateError::Rejected(e)),
        }
    }

    Err(last.map_or(CandidateError::Empty, CandidateError::Exhausted))
}

/// Build a payload from `(key, value)` pairs, skipping `None` values.
#[must_use]
pub fn payload<const N: usize>(fields: [(&str, Option<Value>); N]) -> Payload {
    fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}

/// Truncate to at most `max` characters.
#[must_use]
pub fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn doc(id: &str) -> Document {
        serde_json::from_value(json!({ "$id": id })).unwrap()
    }

    fn unknown(attr: &str) -> AppwriteError {
        AppwriteError::api(
            400,
            "document_invalid_structure",
            format!("Invalid document structure: Unknown attribute: \"{attr}\""),
        )
    }

    fn three() -> Candidates {
        [
            payload([("a", Some(json!(1))), ("b", Some(json!(2)))]),
            payload([("a", Some(json!(1)))]),
            payload([("c", Some(json!(3)))]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_candidates_collapse_duplicates_and_empties() {
        let candidates: Candidates = [
            payload([("a", Some(json!(1))), ("b", None)]),
            payload([("a", Some(json!(1)))]),
            payload([("b", None)]),
        ]
        .into_iter()
        .collect();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 50), "short");
    }

    #[tokio::test]
    async fn test_schema_errors_advance() {
        let candidates = three();
        let calls = AtomicUsize::new(0);
        let accepted = first_accepted(&candidates, |p| {
            calls.fetch_add(1, Ordering::SeqCst);
            let has_b = p.contains_key("b");
            async move {
                if has_b {
                    Err(unknown("b"))
                } else {
                    Ok(doc("ok"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(accepted.index, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_stop_immediately() {
        let candidates = three();
        let calls = AtomicUsize::new(0);
        let err = first_accepted(&candidates, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppwriteError::api(401, "user_unauthorized", "not allowed")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CandidateError::Rejected(e) if e.is_unauthorized()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_item_id_range_is_never_retried() {
        let candidates = three();
        let calls = AtomicUsize::new(0);
        let err = first_accepted(&candidates, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AppwriteError::api(
                    400,
                    "document_invalid_structure",
                    "Invalid document structure: Attribute \"itemID\" has invalid format. Value must be a valid range between 3 and 5",
                ))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CandidateError::ItemIdRange(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err.into_persistence("sh-items", "hint"),
            PersistenceError::InvalidConfiguration(msg) if msg == ITEM_ID_RANGE_HINT
        ));
    }

    #[tokio::test]
    async fn test_exhaustion_carries_hint() {
        let candidates = three();
        let err = first_accepted(&candidates, |_| async { Err(unknown("x")) })
            .await
            .unwrap_err();

        let err = err.into_persistence("sh-purchases", "Add purchaseDate, purchaseType and item");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("sh-purchases"));
        assert!(err.to_string().contains("Add purchaseDate"));
    }
}
