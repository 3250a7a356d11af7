//! Cart checkout.
//!
//! Checkout is a test-mode purchase record: no payment is taken. Every unit
//! of every cart line becomes one item-detail document followed by one
//! purchase document, written sequentially. A failed write aborts the
//! checkout; documents already written stay.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use servicehub_core::{AccountId, Cart, CartItem, CartTotals};
use tracing::{info, instrument, warn};

use crate::appwrite::{DocumentId, DocumentStore, Permission};
use crate::config::CollectionIds;
use crate::services::email::{OrderConfirmation, OrderLine};
use crate::services::persistence::{
    Candidates, PersistenceError, first_accepted, payload, truncate,
};
use crate::services::users::ensure_user_document;

const ITEM_NAME_MAX: usize = 100;
const ITEM_TYPE_MAX: usize = 100;
const PURCHASE_ITEM_MAX: usize = 50;
const PURCHASE_TYPE_MAX: usize = 50;

const ITEMS_HINT: &str = "add itemName, itemID and itemType attributes to the items collection";
const PURCHASES_HINT: &str =
    "add purchaseDate, purchaseType and item attributes to the purchases collection";

/// Who is checking out. Both fields are optional; absent values are left
/// out of every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Buyer<'a> {
    pub id: Option<&'a AccountId>,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Shared by every document written for this checkout.
    pub purchased_at: DateTime<Utc>,
    /// Item-detail plus purchase pairs written; equals the cart's unit count.
    pub units: u32,
}

impl Receipt {
    /// `purchaseDate` as written, e.g. `2026-10-18T09:00:00.000Z`.
    #[must_use]
    pub fn purchase_date(&self) -> String {
        iso(self.purchased_at)
    }
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write the purchase records for `cart`.
///
/// # Errors
///
/// - [`PersistenceError::Validation`] for an empty cart
/// - [`PersistenceError::InvalidConfiguration`] if `itemID` is range-restricted
/// - [`PersistenceError::SchemaExhausted`] if no payload shape fits a collection
/// - [`PersistenceError::Remote`] for anything else the backend returns
#[instrument(skip_all, fields(lines = cart.items().len(), units = cart.unit_count()))]
pub async fn checkout(
    store: &dyn DocumentStore,
    collections: &CollectionIds,
    cart: &Cart,
    buyer: Buyer<'_>,
) -> Result<Receipt, PersistenceError> {
    if cart.is_empty() {
        return Err(PersistenceError::Validation("Your cart is empty".to_string()));
    }

    if let (Some(id), Some(email)) = (buyer.id, buyer.email) {
        if let Err(e) =
            ensure_user_document(store, &collections.users, id, email, buyer.name).await
        {
            warn!(error = %e, "Could not ensure users document; continuing checkout");
        }
    }

    let purchased_at = Utc::now();
    let purchase_date = iso(purchased_at);
    let permissions = buyer.id.map(Permission::owner).unwrap_or_default();
    let unique = DocumentId::Unique;
    let mut units = 0;

    for item in cart.items() {
        let item_candidates = item_candidates(item, buyer, &purchase_date);
        let purchase_candidates = purchase_candidates(item, buyer, &purchase_date);

        for _ in 0..item.quantity {
            first_accepted(&item_candidates, |data| {
                store.create_document(&collections.items, &unique, data, &permissions)
            })
            .await
            .map_err(|e| e.into_persistence(&collections.items, ITEMS_HINT))?;

            first_accepted(&purchase_candidates, |data| {
                store.create_document(&collections.purchases, &unique, data, &permissions)
            })
            .await
            .map_err(|e| e.into_persistence(&collections.purchases, PURCHASES_HINT))?;

            units += 1;
        }
    }

    info!(units, purchase_date = %purchase_date, "Checkout saved");
    Ok(Receipt {
        purchased_at,
        units,
    })
}

/// Confirmation email for a completed checkout of `cart`.
#[must_use]
pub fn order_confirmation(
    cart: &Cart,
    totals: &CartTotals,
    receipt: &Receipt,
    to: &str,
    user_name: Option<&str>,
) -> OrderConfirmation {
    OrderConfirmation {
        to: to.to_string(),
        user_name: user_name.map(String::from),
        lines: cart
            .items()
            .iter()
            .map(|item| OrderLine {
                item: item.name.clone(),
                purchase_type: item.category.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        subtotal: totals.subtotal,
        total: totals.total,
        purchase_date_iso: receipt.purchase_date(),
    }
}

/// Item-detail payloads, most complete first.
fn item_candidates(item: &CartItem, buyer: Buyer<'_>, purchase_date: &str) -> Candidates {
    let name = Some(json!(truncate(&item.name, ITEM_NAME_MAX)));
    let id = Some(json!(item.product_id.as_i32()));
    let kind = Some(json!(truncate(&item.category, ITEM_TYPE_MAX)));
    let email = buyer.email.map(|e| json!(e));
    let user_id = buyer.id.map(|id| json!(id.as_str()));

    [
        payload([
            ("itemName", name.clone()),
            ("itemID", id.clone()),
            ("itemType", kind.clone()),
            ("userEmail", email.clone()),
            ("userId", user_id),
            ("purchaseDate", Some(json!(purchase_date))),
        ]),
        payload([
            ("itemName", name.clone()),
            ("itemID", id.clone()),
            ("itemType", kind.clone()),
            ("userEmail", email),
        ]),
        payload([("itemName", name), ("itemID", id), ("itemType", kind)]),
    ]
    .into_iter()
    .collect()
}

/// Purchase payloads, most complete first.
fn purchase_candidates(item: &CartItem, buyer: Buyer<'_>, purchase_date: &str) -> Candidates {
    let date = Some(json!(purchase_date));
    let kind = Some(json!(truncate(&item.category, PURCHASE_TYPE_MAX)));
    let name = Some(json!(truncate(&item.name, PURCHASE_ITEM_MAX)));
    let email = buyer.email.map(|e| json!(e));
    let user_id = buyer.id.map(|id| json!(id.as_str()));

    [
        payload([
            ("purchaseDate", date.clone()),
            ("purchaseType", kind.clone()),
            ("item", name.clone()),
            ("userEmail", email.clone()),
            ("userId", user_id),
        ]),
        payload([
            ("purchaseDate", date.clone()),
            ("purchaseType", kind.clone()),
            ("item", name.clone()),
            ("userEmail", email),
        ]),
        payload([("purchaseDate", date), ("purchaseType", kind), ("item", name)]),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use servicehub_core::{Price, ProductId};

    use super::*;

    fn line(name: &str, category: &str) -> CartItem {
        CartItem {
            product_id: ProductId::new(4),
            name: name.to_string(),
            category: category.to_string(),
            unit_price: Price::from_cents(4999),
            quantity: 1,
        }
    }

    #[test]
    fn test_anonymous_candidates_collapse() {
        let candidates = item_candidates(&line("Yoga Mat", "Fitness"), Buyer::default(), "d");
        // Without email or id the second and third shapes are identical.
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates.as_slice()[1].len(), 3);
    }

    #[test]
    fn test_purchase_fields_truncated_to_fifty() {
        let long = "x".repeat(80);
        let candidates = purchase_candidates(&line(&long, &long), Buyer::default(), "d");
        let first = &candidates.as_slice()[0];
        assert_eq!(first["item"].as_str().map(str::len), Some(50));
        assert_eq!(first["purchaseType"].as_str().map(str::len), Some(50));

        let items = item_candidates(&line(&long, &long), Buyer::default(), "d");
        assert_eq!(items.as_slice()[0]["itemName"].as_str().map(str::len), Some(80));
    }

    #[test]
    fn test_full_candidate_carries_owner() {
        let id = AccountId::new("u1");
        let buyer = Buyer {
            id: Some(&id),
            email: Some("jo@example.com"),
            name: None,
        };
        let candidates = purchase_candidates(&line("Yoga Mat", "Fitness"), buyer, "d");
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates.as_slice()[0]["userId"], json!("u1"));
        assert!(!candidates.as_slice()[1].contains_key("userId"));
    }
}
