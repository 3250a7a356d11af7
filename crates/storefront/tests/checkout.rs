//! Checkout persistence against a schema-enforcing in-memory store.

#![allow(clippy::unwrap_used)]

mod common;

use common::{FakeStore, collections, user};
use servicehub_core::{AccountId, Cart, Price, ProductId};
use servicehub_storefront::services::checkout::{Buyer, checkout, order_confirmation};
use servicehub_storefront::services::persistence::{ITEM_ID_RANGE_HINT, PersistenceError};

fn cart(lines: &[(i32, &str, &str, u32)]) -> Cart {
    let mut cart = Cart::new();
    for (id, name, category, quantity) in lines {
        cart.add(
            ProductId::new(*id),
            *name,
            *category,
            Price::from_cents(4999),
            *quantity,
        )
        .unwrap();
    }
    cart
}

fn buyer<'a>(id: &'a AccountId, email: &'a str) -> Buyer<'a> {
    Buyer {
        id: Some(id),
        email: Some(email),
        name: Some("Jo Tester"),
    }
}

#[tokio::test]
async fn test_one_document_pair_per_unit() {
    let store = FakeStore::new();
    let collections = collections();
    let user = user();
    let cart = cart(&[(1, "Yoga Mat", "X", 2)]);

    let receipt = checkout(&store, &collections, &cart, buyer(&user.id, &user.email))
        .await
        .unwrap();

    let items = store.creates_in(&collections.items);
    let purchases = store.creates_in(&collections.purchases);
    assert_eq!(receipt.units, 2);
    assert_eq!(items.len(), 2);
    assert_eq!(purchases.len(), 2);

    let date = receipt.purchase_date();
    for write in items.iter().chain(&purchases) {
        assert_eq!(write.data["purchaseDate"], date.as_str());
    }
    assert_eq!(purchases[0].data["purchaseType"], "X");
    assert_eq!(items[0].data["itemID"], 1);
}

#[tokio::test]
async fn test_document_count_is_sum_of_quantities() {
    let store = FakeStore::new();
    let collections = collections();
    let cart = cart(&[(1, "Yoga Mat", "Fitness", 3), (2, "Headphones", "Electronics", 1)]);

    let receipt = checkout(&store, &collections, &cart, Buyer::default())
        .await
        .unwrap();

    assert_eq!(receipt.units, 4);
    assert_eq!(store.creates_in(&collections.items).len(), 4);
    assert_eq!(store.creates_in(&collections.purchases).len(), 4);
}

#[tokio::test]
async fn test_missing_owner_attributes_are_dropped() {
    let collections = collections();
    let store = FakeStore::new()
        .with_schema(&collections.items, &["itemName", "itemID", "itemType"])
        .with_schema(&collections.purchases, &["purchaseDate", "purchaseType", "item"]);
    let user = user();
    let cart = cart(&[(3, "Desk Lamp", "Home", 1)]);

    checkout(&store, &collections, &cart, buyer(&user.id, &user.email))
        .await
        .unwrap();

    let items = store.creates_in(&collections.items);
    let purchases = store.creates_in(&collections.purchases);
    assert_eq!(items.len(), 1);
    assert_eq!(purchases.len(), 1);
    assert!(!purchases[0].data.contains_key("userId"));
    assert!(!purchases[0].data.contains_key("userEmail"));
    assert_eq!(purchases[0].data["item"], "Desk Lamp");
    assert_eq!(items[0].data["itemName"], "Desk Lamp");
}

#[tokio::test]
async fn test_item_id_range_is_a_configuration_error() {
    let collections = collections();
    let store = FakeStore::new().with_item_id_range(3, 5);
    let cart = cart(&[(1, "Yoga Mat", "Fitness", 1)]);

    let err = checkout(&store, &collections, &cart, Buyer::default())
        .await
        .unwrap_err();

    assert!(matches!(&err, PersistenceError::InvalidConfiguration(msg) if msg == ITEM_ID_RANGE_HINT));
    assert_eq!(store.attempts(), 1);
    assert!(store.creates_in(&collections.purchases).is_empty());
}

#[tokio::test]
async fn test_permission_denied_is_not_retried() {
    let collections = collections();
    let store = FakeStore::new().deny_writes();
    let cart = cart(&[(1, "Yoga Mat", "Fitness", 2)]);

    let err = checkout(&store, &collections, &cart, Buyer::default())
        .await
        .unwrap_err();

    assert!(matches!(&err, PersistenceError::Remote(e) if e.is_unauthorized()));
    assert_eq!(store.attempts(), 1);
}

#[tokio::test]
async fn test_unknown_schema_exhausts_with_hint() {
    let collections = collections();
    let store = FakeStore::new().with_schema(&collections.purchases, &["title"]);
    let cart = cart(&[(1, "Yoga Mat", "Fitness", 1)]);

    let err = checkout(&store, &collections, &cart, Buyer::default())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains(&collections.purchases));
}

#[tokio::test]
async fn test_empty_cart_writes_nothing() {
    let store = FakeStore::new();
    let err = checkout(&store, &collections(), &Cart::new(), Buyer::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PersistenceError::Validation(_)));
    assert_eq!(store.attempts(), 0);
}

#[tokio::test]
async fn test_order_confirmation_lists_cart_lines() {
    let store = FakeStore::new();
    let cart = cart(&[(1, "Yoga Mat", "Fitness", 2)]);
    let totals = cart.totals(rust_decimal::Decimal::TEN);

    let receipt = checkout(&store, &collections(), &cart, Buyer::default())
        .await
        .unwrap();
    let confirmation = order_confirmation(&cart, &totals, &receipt, "jo@example.com", None);

    assert_eq!(confirmation.lines.len(), 1);
    assert_eq!(confirmation.lines[0].quantity, 2);
    assert_eq!(confirmation.subtotal, Price::from_cents(9998));
    assert_eq!(confirmation.total, Price::from_cents(10998));
    assert_eq!(confirmation.purchase_date_iso, receipt.purchase_date());
}
