//! Document storage.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::instrument;

use super::client::{AppwriteClient, Credentials};
use super::types::{Document, DocumentId, DocumentList, Payload, Permission, Query};
use super::AppwriteError;

/// Document operations on one database.
///
/// Collections are passed per call; ids and payloads are exactly what the
/// REST API takes. Errors are returned unclassified so callers can decide
/// which ones to absorb.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document.
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &DocumentId,
        data: &Payload,
        permissions: &[Permission],
    ) -> Result<Document, AppwriteError>;

    /// Fetch one document by id.
    async fn get_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Document, AppwriteError>;

    /// List documents matching all `queries`.
    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, AppwriteError>;

    /// Patch the given attributes of a document.
    async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: &Payload,
    ) -> Result<Document, AppwriteError>;

    /// Delete a document.
    async fn delete_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), AppwriteError>;
}

/// [`DocumentStore`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct Databases {
    client: AppwriteClient,
    database_id: String,
    session: Option<SecretString>,
}

impl Databases {
    pub(crate) fn new(
        client: AppwriteClient,
        database_id: &str,
        session: Option<SecretString>,
    ) -> Self {
        Self {
            client,
            database_id: database_id.to_string(),
            session,
        }
    }

    #[must_use]
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn credentials(&self) -> Credentials<'_> {
        self.session
            .as_ref()
            .map_or(Credentials::Server, Credentials::Session)
    }

    fn collection_path(&self, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            urlencoding::encode(&self.database_id),
            urlencoding::encode(collection_id)
        )
    }

    fn document_path(&self, collection_id: &str, document_id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_path(collection_id),
            urlencoding::encode(document_id)
        )
    }
}

#[async_trait]
impl DocumentStore for Databases {
    #[instrument(skip(self, data, permissions), fields(database = %self.database_id))]
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &DocumentId,
        data: &Payload,
        permissions: &[Permission],
    ) -> Result<Document, AppwriteError> {
        let mut body = json!({
            "documentId": document_id.as_str(),
            "data": Value::Object(data.clone()),
        });
        if !permissions.is_empty() {
            body["permissions"] = json!(permissions);
        }

        self.client
            .call(
                Method::POST,
                &self.collection_path(collection_id),
                &[],
                Some(&body),
                self.credentials(),
            )
            .await
    }

    #[instrument(skip(self), fields(database = %self.database_id))]
    async fn get_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Document, AppwriteError> {
        self.client
            .call(
                Method::GET,
                &self.document_path(collection_id, document_id),
                &[],
                None,
                self.credentials(),
            )
            .await
    }

    #[instrument(skip(self, queries), fields(database = %self.database_id))]
    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, AppwriteError> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|q| ("queries[]", q.to_param()))
            .collect();

        self.client
            .call(
                Method::GET,
                &self.collection_path(collection_id),
                &params,
                None,
                self.credentials(),
            )
            .await
    }

    #[instrument(skip(self, data), fields(database = %self.database_id))]
    async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: &Payload,
    ) -> Result<Document, AppwriteError> {
        let body = json!({ "data": Value::Object(data.clone()) });

        self.client
            .call(
                Method::PATCH,
                &self.document_path(collection_id, document_id),
                &[],
                Some(&body),
                self.credentials(),
            )
            .await
    }

    #[instrument(skip(self), fields(database = %self.database_id))]
    async fn delete_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), AppwriteError> {
        self.client
            .send(
                Method::DELETE,
                &self.document_path(collection_id, document_id),
                &[],
                None,
                self.credentials(),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{AppwriteConfig, CollectionIds, DEFAULT_APPWRITE_ENDPOINT};

    fn databases(session: Option<SecretString>) -> Databases {
        let client = AppwriteClient::new(&AppwriteConfig {
            endpoint: DEFAULT_APPWRITE_ENDPOINT.to_string(),
            project_id: "servicehub".to_string(),
            api_key: None,
            database_id: Some("main".to_string()),
            collections: CollectionIds::default(),
        })
        .unwrap();
        client.databases("main", session)
    }

    #[test]
    fn test_paths() {
        let db = databases(None);
        assert_eq!(
            db.collection_path("appointments"),
            "/databases/main/collections/appointments/documents"
        );
        assert_eq!(
            db.document_path("appointments", "doc 1"),
            "/databases/main/collections/appointments/documents/doc%201"
        );
    }

    #[test]
    fn test_session_wins_over_server_key() {
        assert!(matches!(databases(None).credentials(), Credentials::Server));
        let with_session = databases(Some(SecretString::from("abc")));
        assert!(matches!(
            with_session.credentials(),
            Credentials::Session(_)
        ));
    }
}
