//! Shared fakes for storefront integration tests.
//!
//! [`FakeStore`] is an in-memory document database that enforces a
//! per-collection attribute list the way a hand-configured backend schema
//! does, and records every accepted write.

#![allow(dead_code, clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::Value;
use servicehub_storefront::appwrite::{
    Account, AppwriteClient, AppwriteError, Document, DocumentId, DocumentList, DocumentStore,
    Payload, Permission, Query,
};
use servicehub_storefront::config::{AppwriteConfig, CollectionIds, EmailConfig, StorefrontConfig};
use servicehub_storefront::models::CurrentUser;
use servicehub_storefront::services::email::{EmailError, MailTransport, Mailer, OutgoingEmail};
use servicehub_storefront::state::AppState;

// =============================================================================
// Document store
// =============================================================================

/// An accepted create or update.
#[derive(Debug, Clone)]
pub struct Write {
    pub collection: String,
    pub document_id: String,
    pub data: Payload,
}

/// In-memory, schema-enforcing [`DocumentStore`].
#[derive(Default)]
pub struct FakeStore {
    /// Allowed attributes per collection; collections without an entry
    /// accept anything.
    schemas: DashMap<String, Vec<String>>,
    documents: DashMap<String, Document>,
    creates: Mutex<Vec<Write>>,
    updates: Mutex<Vec<Write>>,
    /// Inclusive range `itemID` must fall in, if restricted.
    item_id_range: Mutex<Option<(i64, i64)>>,
    deny_writes: AtomicBool,
    /// Collections that answer writes with a 401.
    denied: DashMap<String, ()>,
    attempts: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `collection` to exactly `attributes`.
    pub fn with_schema(self, collection: &str, attributes: &[&str]) -> Self {
        self.schemas.insert(
            collection.to_string(),
            attributes.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_item_id_range(self, min: i64, max: i64) -> Self {
        *self.item_id_range.lock().unwrap() = Some((min, max));
        self
    }

    /// Answer every write with a 401.
    pub fn deny_writes(self) -> Self {
        self.deny_writes.store(true, Ordering::SeqCst);
        self
    }

    /// Answer writes to `collection` with a 401.
    pub fn deny_writes_to(self, collection: &str) -> Self {
        self.denied.insert(collection.to_string(), ());
        self
    }

    /// Store a document directly, bypassing the schema.
    pub fn insert(&self, collection: &str, id: &str, data: Payload) {
        self.documents
            .insert(id.to_string(), document(collection, id, data));
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.get(id).map(|d| d.value().clone())
    }

    pub fn creates_in(&self, collection: &str) -> Vec<Write> {
        self.creates
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.collection == collection)
            .cloned()
            .collect()
    }

    pub fn updates(&self) -> Vec<Write> {
        self.updates.lock().unwrap().clone()
    }

    /// Write calls made, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn check_write(&self, collection: &str, data: &Payload) -> Result<(), AppwriteError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.deny_writes.load(Ordering::SeqCst) || self.denied.contains_key(collection) {
            return Err(AppwriteError::api(
                401,
                "user_unauthorized",
                "The current user is not authorized to perform the requested action.",
            ));
        }

        if let Some(schema) = self.schemas.get(collection) {
            if let Some(unknown) = data.keys().find(|key| !schema.contains(key)) {
                return Err(AppwriteError::api(
                    400,
                    "document_invalid_structure",
                    format!("Invalid document structure: Unknown attribute: \"{unknown}\""),
                ));
            }
        }

        if let (Some((min, max)), Some(item_id)) = (
            *self.item_id_range.lock().unwrap(),
            data.get("itemID").and_then(Value::as_i64),
        ) {
            if !(min..=max).contains(&item_id) {
                return Err(AppwriteError::api(
                    400,
                    "document_invalid_structure",
                    format!(
                        "Invalid document structure: Attribute \"itemID\" has invalid format. \
                         Value must be a valid range between {min} and {max}"
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn document(collection: &str, id: &str, data: Payload) -> Document {
    let now = Utc::now().to_rfc3339();
    Document {
        id: id.to_string(),
        collection_id: collection.to_string(),
        created_at: Some(now.clone()),
        updated_at: Some(now),
        permissions: Vec::new(),
        data,
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &DocumentId,
        data: &Payload,
        permissions: &[Permission],
    ) -> Result<Document, AppwriteError> {
        self.check_write(collection_id, data)?;

        let id = match document_id {
            DocumentId::Unique => format!("doc{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            DocumentId::Custom(id) => {
                if self.documents.contains_key(id) {
                    return Err(AppwriteError::api(
                        409,
                        "document_already_exists",
                        "Document with the requested ID already exists.",
                    ));
                }
                id.clone()
            }
        };

        let mut doc = document(collection_id, &id, data.clone());
        doc.permissions = permissions.iter().map(|p| p.as_str().to_string()).collect();
        self.documents.insert(id.clone(), doc.clone());
        self.creates.lock().unwrap().push(Write {
            collection: collection_id.to_string(),
            document_id: id,
            data: data.clone(),
        });
        Ok(doc)
    }

    async fn get_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Document, AppwriteError> {
        self.documents
            .get(document_id)
            .filter(|d| d.collection_id == collection_id)
            .map(|d| d.value().clone())
            .ok_or_else(|| {
                AppwriteError::api(
                    404,
                    "document_not_found",
                    "Document with the requested ID could not be found.",
                )
            })
    }

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, AppwriteError> {
        let filters: Vec<(&str, &Value)> = queries
            .iter()
            .filter(|q| q.method == "equal")
            .filter_map(|q| Some((q.attribute.as_deref()?, q.values.first()?)))
            .collect();

        if let Some(schema) = self.schemas.get(collection_id) {
            if let Some((attribute, _)) = filters
                .iter()
                .find(|(a, _)| !schema.iter().any(|s| s.as_str() == *a))
            {
                return Err(AppwriteError::api(
                    400,
                    "general_query_invalid",
                    format!("Invalid query: Attribute not found in schema: {attribute}"),
                ));
            }
        }

        let documents: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| d.collection_id == collection_id)
            .filter(|d| filters.iter().all(|(a, v)| d.data.get(*a) == Some(*v)))
            .map(|d| d.value().clone())
            .collect();

        Ok(DocumentList {
            total: documents.len() as u64,
            documents,
        })
    }

    async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: &Payload,
    ) -> Result<Document, AppwriteError> {
        self.check_write(collection_id, data)?;

        let mut doc = self.get_document(collection_id, document_id).await?;
        for (key, value) in data {
            doc.data.insert(key.clone(), value.clone());
        }
        self.documents.insert(document_id.to_string(), doc.clone());
        self.updates.lock().unwrap().push(Write {
            collection: collection_id.to_string(),
            document_id: document_id.to_string(),
            data: data.clone(),
        });
        Ok(doc)
    }

    async fn delete_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), AppwriteError> {
        self.get_document(collection_id, document_id).await?;
        self.documents.remove(document_id);
        Ok(())
    }
}

// =============================================================================
// Mail transports
// =============================================================================

/// How a [`FakeTransport`] answers.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Accept,
    Unverified,
    Fail,
}

/// A transport that records what it was asked to send.
pub struct FakeTransport {
    name: &'static str,
    reply: Reply,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl FakeTransport {
    pub fn new(name: &'static str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        match self.reply {
            Reply::Accept => {
                let mut sent = self.sent.lock().unwrap();
                sent.push(email.clone());
                Ok(format!("{}-{}", self.name, sent.len()))
            }
            Reply::Unverified => Err(EmailError::DomainNotVerified(
                "The servicehub.test domain is not verified".to_string(),
            )),
            Reply::Fail => Err(EmailError::Provider {
                status: 500,
                message: "Internal server error".to_string(),
            }),
        }
    }
}

/// Mailer over optional fake transports.
pub fn mailer(
    primary: Option<Arc<FakeTransport>>,
    fallback: Option<Arc<FakeTransport>>,
) -> Mailer {
    Mailer::new(
        primary.map(|t| t as Arc<dyn MailTransport>),
        fallback.map(|t| t as Arc<dyn MailTransport>),
    )
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn collections() -> CollectionIds {
    CollectionIds::default()
}

pub fn user() -> CurrentUser {
    CurrentUser::new(
        &Account {
            id: "u1".to_string(),
            name: "Jo Tester".to_string(),
            email: "jo@example.com".to_string(),
            email_verification: true,
        },
        "session-secret",
    )
}

pub fn other_user() -> CurrentUser {
    CurrentUser::new(
        &Account {
            id: "u2".to_string(),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            email_verification: true,
        },
        "other-secret",
    )
}

/// Configuration pointing at an unroutable backend.
pub fn config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        appwrite: AppwriteConfig {
            endpoint: "http://127.0.0.1:9/v1".to_string(),
            project_id: "servicehub-test".to_string(),
            api_key: None,
            database_id: Some("servicehub".to_string()),
            collections: collections(),
        },
        email: EmailConfig::default(),
        tax_rate_percent: Decimal::TEN,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Application state with the given mailer.
pub fn state(mailer: Mailer) -> AppState {
    let config = config();
    let appwrite = AppwriteClient::new(&config.appwrite).unwrap();
    AppState::from_parts(config, appwrite, mailer)
}
