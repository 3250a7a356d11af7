//! Users-collection mirror documents.

#![allow(clippy::unwrap_used)]

mod common;

use common::{FakeStore, collections, user};
use serde_json::json;
use servicehub_core::{Cart, Price, ProductId};
use servicehub_storefront::services::checkout::{Buyer, checkout};
use servicehub_storefront::services::users::{
    MirrorOutcome, ensure_user_document, user_document_id,
};

#[tokio::test]
async fn test_second_ensure_reports_existing() {
    let store = FakeStore::new();
    let collections = collections();
    let user = user();

    let first = ensure_user_document(
        &store,
        &collections.users,
        &user.id,
        &user.email,
        Some("Jo Tester"),
    )
    .await
    .unwrap();
    let second = ensure_user_document(
        &store,
        &collections.users,
        &user.id,
        &user.email,
        Some("Jo Tester"),
    )
    .await
    .unwrap();

    assert_eq!(first, MirrorOutcome::Created);
    assert_eq!(second, MirrorOutcome::AlreadyExists);
    assert_eq!(store.creates_in(&collections.users).len(), 1);

    let doc = store.get(&user_document_id(&user.id)).unwrap();
    assert_eq!(doc.data.get("Name"), Some(&json!("Jo Tester")));
    assert_eq!(doc.data.get("Email"), Some(&json!("jo@example.com")));
}

#[tokio::test]
async fn test_narrow_schema_uses_last_shape() {
    let collections = collections();
    let store = FakeStore::new().with_schema(&collections.users, &["userEmail", "Pass"]);
    let user = user();

    let outcome = ensure_user_document(&store, &collections.users, &user.id, &user.email, None)
        .await
        .unwrap();

    assert_eq!(outcome, MirrorOutcome::Created);
    assert_eq!(store.attempts(), 6);
    let creates = store.creates_in(&collections.users);
    assert_eq!(creates.len(), 1);
    let data = &creates[0].data;
    assert_eq!(data.len(), 2);
    assert_eq!(data.get("userEmail"), Some(&json!("jo@example.com")));
    assert!(data.contains_key("Pass"));
}

#[tokio::test]
async fn test_mirror_failure_does_not_block_checkout() {
    let collections = collections();
    let store = FakeStore::new().deny_writes_to(&collections.users);
    let user = user();
    let mut cart = Cart::new();
    cart.add(ProductId::new(3), "Resistance Bands", "Fitness", Price::from_cents(1999), 1)
        .unwrap();

    let receipt = checkout(
        &store,
        &collections,
        &cart,
        Buyer {
            id: Some(&user.id),
            email: Some(&user.email),
            name: Some(user.display_name()),
        },
    )
    .await
    .unwrap();

    assert_eq!(receipt.units, 1);
    assert!(store.creates_in(&collections.users).is_empty());
    assert_eq!(store.creates_in(&collections.items).len(), 1);
    assert_eq!(store.creates_in(&collections.purchases).len(), 1);
}
