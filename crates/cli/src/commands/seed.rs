//! Seed backend collections.
//!
//! Writes use the server API key. Seeding is idempotent: documents have
//! deterministic ids and a conflict counts as "already there".

use serde_json::json;
use servicehub_core::AccountId;
use servicehub_storefront::appwrite::{Databases, DocumentId, DocumentStore};
use servicehub_storefront::catalog::{self, Product};
use servicehub_storefront::config::AppwriteConfig;
use servicehub_storefront::services::persistence::{
    CandidateError, Candidates, first_accepted, payload,
};
use servicehub_storefront::services::users::{MirrorOutcome, ensure_user_document};
use tracing::{error, info};

use super::{CliError, backend};

const ITEMS_HINT: &str = "add itemName, itemID and itemType attributes to the items collection";

/// Counts from a seeding run.
#[derive(Debug, Default)]
struct SeedSummary {
    inserted: usize,
    skipped: usize,
}

fn seed_store() -> Result<(Databases, AppwriteConfig), CliError> {
    let (config, client) = backend()?;
    if !client.has_api_key() {
        return Err(CliError::MissingApiKey);
    }
    let database_id = config
        .database_id
        .clone()
        .ok_or(CliError::MissingDatabase)?;
    Ok((client.databases(&database_id, None), config))
}

/// Document id of a seeded product.
fn product_document_id(product: &Product) -> String {
    format!("product_{}", product.id)
}

fn product_candidates(product: &Product) -> Candidates {
    let name = Some(json!(product.name));
    let id = Some(json!(product.id.as_i32()));
    let kind = Some(json!(product.category));

    [
        payload([
            ("itemName", name.clone()),
            ("itemID", id.clone()),
            ("itemType", kind.clone()),
            ("itemPrice", Some(json!(product.price.to_f64()))),
            ("itemDescription", Some(json!(product.description))),
        ]),
        payload([("itemName", name), ("itemID", id), ("itemType", kind)]),
    ]
    .into_iter()
    .collect()
}

/// Write every catalog product into the items collection.
///
/// # Errors
///
/// Returns an error if configuration is missing or a product is rejected for
/// a reason other than already existing.
pub async fn products() -> Result<(), CliError> {
    let (store, config) = seed_store()?;
    let collection = &config.collections.items;
    let mut summary = SeedSummary::default();

    info!(collection = %collection, count = catalog::products().len(), "Seeding products");

    for product in catalog::products() {
        let document_id = DocumentId::Custom(product_document_id(product));
        let candidates = product_candidates(product);

        match first_accepted(&candidates, |data| {
            store.create_document(collection, &document_id, data, &[])
        })
        .await
        {
            Ok(_) => {
                info!(product = product.name, "Inserted");
                summary.inserted += 1;
            }
            Err(CandidateError::Rejected(e)) if e.is_conflict() => {
                info!(product = product.name, "Already exists");
                summary.skipped += 1;
            }
            Err(e) => {
                let err = e.into_persistence(collection, ITEMS_HINT);
                error!(product = product.name, error = %err, "Seeding stopped");
                return Err(err.into());
            }
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {}", summary.inserted);
    info!("  Products skipped (already exist): {}", summary.skipped);
    Ok(())
}

/// Create the users-collection document for an existing account.
///
/// # Errors
///
/// Returns an error if configuration is missing or every payload shape is
/// rejected.
pub async fn user(id: &str, email: &str, name: Option<&str>) -> Result<(), CliError> {
    let (store, config) = seed_store()?;
    let account = AccountId::new(id);

    match ensure_user_document(&store, &config.collections.users, &account, email, name).await? {
        MirrorOutcome::Created => info!(user_id = %account, "User document created"),
        MirrorOutcome::AlreadyExists => info!(user_id = %account, "User document already exists"),
    }
    Ok(())
}
