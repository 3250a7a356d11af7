//! Booking lifecycle against a schema-enforcing in-memory store.

#![allow(clippy::unwrap_used)]

mod common;

use common::{FakeStore, FakeTransport, Reply, mailer, other_user, user};
use serde_json::json;
use servicehub_core::{BookingStatus, ServiceId};
use servicehub_storefront::appwrite::Payload;
use servicehub_storefront::catalog;
use servicehub_storefront::models::{BookingRequest, CurrentUser, RescheduleRequest};
use servicehub_storefront::services::bookings;
use servicehub_storefront::services::persistence::PersistenceError;

const APPOINTMENTS: &str = "appointments";

/// Attributes every appointments schema in these tests has.
const CORE: &[&str] = &[
    "name",
    "email",
    "city",
    "age",
    "serviceName",
    "serviceDescription",
    "servicePrice",
    "serviceDuration",
    "bookingDate",
    "bookingTime",
    "consentForm",
];

fn schema(extra: &[&'static str]) -> Vec<&'static str> {
    CORE.iter().chain(extra).copied().collect()
}

fn request(user: &CurrentUser, date: &str, time: &str) -> BookingRequest {
    let service = catalog::service(ServiceId::new(5)).unwrap();
    BookingRequest::new(user, service, date, time, Some("Portland"), None, true).unwrap()
}

fn stored(date: &str, time: &str, owner: &str) -> Payload {
    let value = json!({
        "serviceName": "Massage Therapy",
        "bookingDate": format!("{date}T{time}:00.000Z"),
        "bookingTime": time,
        "userId": owner,
        "email": "jo@example.com",
        "status": "scheduled",
    });
    value.as_object().unwrap().clone()
}

#[tokio::test]
async fn test_create_without_status_attribute() {
    let store = FakeStore::new().with_schema(
        APPOINTMENTS,
        &schema(&["userId", "serviceNameFull"]),
    );
    let transport = FakeTransport::new("resend", Reply::Accept);
    let mailer = mailer(Some(transport.clone()), None);
    let user = user();

    let outcome = bookings::create(
        &store,
        APPOINTMENTS,
        &mailer,
        &user,
        &request(&user, "2026-11-02", "10:30"),
    )
    .await
    .unwrap();

    assert_eq!(outcome.dropped, vec!["status"]);
    assert!(outcome.email.is_ok());

    let writes = store.creates_in(APPOINTMENTS);
    assert_eq!(writes.len(), 1);
    let data = &writes[0].data;
    assert!(!data.contains_key("status"));
    assert_eq!(data["userId"], "u1");
    assert_eq!(data["serviceName"], "Massage Therapy");
    assert_eq!(data["bookingDate"], "2026-11-02T10:30:00.000Z");
    assert_eq!(data["bookingTime"], "10:30");
    assert_eq!(data["consentForm"], true);
    assert_eq!(data["city"], "Portland");

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jo@example.com");
}

#[tokio::test]
async fn test_rejected_owner_id_falls_back_to_email_listing() {
    let store = FakeStore::new().with_schema(
        APPOINTMENTS,
        &schema(&["status", "serviceNameFull"]),
    );
    let mailer = mailer(None, None);
    let user = user();

    let outcome = bookings::create(
        &store,
        APPOINTMENTS,
        &mailer,
        &user,
        &request(&user, "2026-11-02", "10:30"),
    )
    .await
    .unwrap();

    let writes = store.creates_in(APPOINTMENTS);
    let data = &writes[0].data;
    assert!(!data.contains_key("userId"));
    assert_eq!(data["status"], "scheduled");
    assert_eq!(outcome.dropped, vec!["userId"]);
    // Email failure never fails the booking.
    assert!(outcome.email.is_err());

    let listed = bookings::list(&store, APPOINTMENTS, &user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, outcome.booking.id);
}

#[tokio::test]
async fn test_create_with_core_schema_only() {
    let store = FakeStore::new().with_schema(APPOINTMENTS, CORE);
    let mailer = mailer(None, None);
    let user = user();

    let outcome = bookings::create(
        &store,
        APPOINTMENTS,
        &mailer,
        &user,
        &request(&user, "2026-11-02", "10:30"),
    )
    .await
    .unwrap();

    assert_eq!(outcome.dropped.len(), 3);
    assert_eq!(outcome.booking.status, BookingStatus::Scheduled);
}

#[tokio::test]
async fn test_create_fails_when_core_fields_rejected() {
    let store = FakeStore::new().with_schema(APPOINTMENTS, &["name", "email"]);
    let mailer = mailer(None, None);
    let user = user();

    let err = bookings::create(
        &store,
        APPOINTMENTS,
        &mailer,
        &user,
        &request(&user, "2026-11-02", "10:30"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PersistenceError::SchemaExhausted { .. }));
}

#[tokio::test]
async fn test_list_orders_by_scheduled_date() {
    let store = FakeStore::new();
    store.insert(APPOINTMENTS, "late", stored("2026-12-01", "09:00", "u1"));
    store.insert(APPOINTMENTS, "early", stored("2026-11-01", "15:00", "u1"));
    store.insert(APPOINTMENTS, "middle", stored("2026-11-01", "16:00", "u1"));
    store.insert(APPOINTMENTS, "foreign", stored("2026-10-01", "08:00", "u2"));

    let listed = bookings::list(&store, APPOINTMENTS, &user()).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, ["early", "middle", "late"]);
}

#[tokio::test]
async fn test_cancel_keeps_scheduled_slot() {
    let store = FakeStore::new();
    store.insert(APPOINTMENTS, "b1", stored("2026-11-02", "10:30", "u1"));

    let booking = bookings::cancel(&store, APPOINTMENTS, &user(), "b1")
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Cancelled);
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].data["status"], "cancelled");

    let doc = store.get("b1").unwrap();
    assert_eq!(doc.data["bookingDate"], "2026-11-02T10:30:00.000Z");
    assert_eq!(doc.data["bookingTime"], "10:30");
}

#[tokio::test]
async fn test_cancel_falls_back_to_boolean_flag() {
    let store = FakeStore::new().with_schema(
        APPOINTMENTS,
        &schema(&["userId", "cancelled"]),
    );
    store.insert(APPOINTMENTS, "b1", stored("2026-11-02", "10:30", "u1"));

    bookings::cancel(&store, APPOINTMENTS, &user(), "b1")
        .await
        .unwrap();

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].data["cancelled"], true);
    // status, canceled, Status and bookingStatus were each tried first.
    assert_eq!(store.attempts(), 5);
}

#[tokio::test]
async fn test_reschedule_request_keeps_scheduled_slot() {
    let store = FakeStore::new();
    store.insert(APPOINTMENTS, "b1", stored("2026-11-02", "10:30", "u1"));

    let requested = RescheduleRequest::parse("2026-11-09", "14:00").unwrap();
    let booking = bookings::request_reschedule(&store, APPOINTMENTS, &user(), "b1", requested)
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::RescheduleRequested);
    let updates = store.updates();
    assert!(!updates[0].data.contains_key("bookingDate"));
    assert!(!updates[0].data.contains_key("bookingTime"));
    assert_eq!(updates[0].data["rescheduleDate"], "2026-11-09");
    assert_eq!(updates[0].data["rescheduleTime"], "14:00");

    let doc = store.get("b1").unwrap();
    assert_eq!(doc.data["bookingDate"], "2026-11-02T10:30:00.000Z");
    assert_eq!(doc.data["bookingTime"], "10:30");
}

#[tokio::test]
async fn test_foreign_booking_is_not_found() {
    let store = FakeStore::new();
    store.insert(APPOINTMENTS, "b1", stored("2026-11-02", "10:30", "u1"));
    let stranger = other_user();

    let err = bookings::cancel(&store, APPOINTMENTS, &stranger, "b1")
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound(_)));

    let err = bookings::delete(&store, APPOINTMENTS, &stranger, "b1")
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound(_)));

    assert!(store.updates().is_empty());
    assert!(store.get("b1").is_some());
}

#[tokio::test]
async fn test_delete_removes_document() {
    let store = FakeStore::new();
    store.insert(APPOINTMENTS, "b1", stored("2026-11-02", "10:30", "u1"));

    bookings::delete(&store, APPOINTMENTS, &user(), "b1")
        .await
        .unwrap();

    assert!(store.get("b1").is_none());
    let err = bookings::delete(&store, APPOINTMENTS, &user(), "b1")
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound(_)));
}
