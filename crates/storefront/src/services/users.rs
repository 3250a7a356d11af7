//! Users-collection mirror documents.
//!
//! Accounts live in the backend's auth service; some deployments also keep
//! a plain document per customer in a users collection. The document id is
//! derived from the account id, so creating it twice is a 409.

use serde_json::json;
use servicehub_core::AccountId;
use tracing::{debug, instrument};

use crate::appwrite::{DocumentId, DocumentStore, Permission};
use crate::services::persistence::{
    CandidateError, Candidates, PersistenceError, first_accepted, payload,
};

/// Placeholder stored in the `Pass` attribute some users schemas require.
/// Real credentials never leave the auth service.
const PASS_PLACEHOLDER: &str = "TESTPASS";

const SCHEMA_HINT: &str = "add Name, Email and Pass attributes to the users collection";

/// Result of [`ensure_user_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Created,
    AlreadyExists,
}

/// Document id of the mirror for `id`.
#[must_use]
pub fn user_document_id(id: &AccountId) -> String {
    format!("user_{}", id.sanitized())
}

/// Create the mirror document for an account if it does not exist yet.
///
/// `name` falls back to the email's local part.
///
/// # Errors
///
/// Returns [`PersistenceError`] if every payload shape is rejected or the
/// backend fails for a reason other than the document already existing.
#[instrument(skip(store, email, name), fields(user_id = %id))]
pub async fn ensure_user_document(
    store: &dyn DocumentStore,
    collection: &str,
    id: &AccountId,
    email: &str,
    name: Option<&str>,
) -> Result<MirrorOutcome, PersistenceError> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default())
        .trim();

    let candidates = mirror_candidates(name, email);
    let document_id = DocumentId::Custom(user_document_id(id));
    let permissions = Permission::owner(id);

    match first_accepted(&candidates, |data| {
        store.create_document(collection, &document_id, data, &permissions)
    })
    .await
    {
        Ok(accepted) => {
            debug!(candidate = accepted.index, "User document created");
            Ok(MirrorOutcome::Created)
        }
        Err(CandidateError::Rejected(e)) if e.is_conflict() => {
            Ok(MirrorOutcome::AlreadyExists)
        }
        Err(e) => Err(e.into_persistence(collection, SCHEMA_HINT)),
    }
}

fn mirror_candidates(name: &str, email: &str) -> Candidates {
    let pass = || Some(json!(PASS_PLACEHOLDER));
    let name = Some(json!(name));
    let email = Some(json!(email));

    [
        payload([("Name", name.clone()), ("Email", email.clone()), ("Pass", pass())]),
        payload([
            ("Name", name.clone()),
            ("Email", email.clone()),
            ("UserEmail", email.clone()),
            ("Pass", pass()),
        ]),
        payload([("name", name), ("userEmail", email.clone()), ("Pass", pass())]),
        payload([("Email", email.clone()), ("Pass", pass())]),
        payload([("UserEmail", email.clone()), ("Pass", pass())]),
        payload([("userEmail", email), ("Pass", pass())]),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_sanitized() {
        assert_eq!(user_document_id(&AccountId::new("a.b-c")), "user_a_b_c");
    }

    #[test]
    fn test_candidate_order() {
        let candidates = mirror_candidates("jo", "jo@example.com");
        assert_eq!(candidates.len(), 6);
        let first: Vec<_> = candidates.as_slice()[0].keys().cloned().collect();
        assert!(first.contains(&"Name".to_string()));
        assert!(first.contains(&"Pass".to_string()));
        assert_eq!(
            candidates.as_slice()[5].get("userEmail"),
            Some(&json!("jo@example.com"))
        );
    }
}
