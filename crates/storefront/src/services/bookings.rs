//! Booking lifecycle: create, list, cancel, reschedule-request, delete.
//!
//! All operations act on the appointments collection as the signed-in
//! customer. Cancel, reschedule and delete first load the document and
//! check it belongs to that customer.

use serde_json::{Value, json};
use servicehub_core::{BookingStatus, Email};
use tracing::{debug, info, instrument, warn};

use crate::appwrite::{AppwriteError, Document, DocumentId, DocumentStore, Permission, Query};
use crate::models::booking::{EMAIL_KEYS, STATUS_KEYS};
use crate::models::{Booking, BookingRequest, CurrentUser, RescheduleRequest};
use crate::services::email::{BookingConfirmation, EmailError, Mailer, Sent};
use crate::services::persistence::{
    Candidates, PersistenceError, first_accepted, payload, truncate,
};

/// Longest value the `serviceName` attribute accepts.
const SERVICE_NAME_MAX: usize = 50;

/// Upper bound on bookings listed for one customer.
const LIST_LIMIT: u32 = 100;

/// Attributes the create path may drop, in the order they are written.
const OPTIONAL_FIELDS: [&str; 3] = ["userId", "status", "serviceNameFull"];

const CREATE_HINT: &str = "add name, email, serviceName, serviceDescription, servicePrice, \
    serviceDuration, bookingDate, bookingTime and consentForm attributes to the appointments \
    collection";
const LIST_HINT: &str =
    "add a userId or email attribute to the appointments collection so bookings can be listed";
const CANCEL_HINT: &str = "add a status (string) or cancelled (boolean) attribute to the \
    appointments collection";
const RESCHEDULE_HINT: &str = "add rescheduleDate and rescheduleTime attributes (or \
    requestedDate and requestedTime) to the appointments collection";

/// A saved booking plus the outcome of its confirmation email.
#[derive(Debug)]
pub struct BookingOutcome {
    pub booking: Booking,
    /// Optional attributes the schema did not accept.
    pub dropped: Vec<&'static str>,
    pub email: Result<Sent, EmailError>,
}

/// Create a booking for `user`, then send the confirmation email.
///
/// # Errors
///
/// Returns [`PersistenceError`] only if the booking could not be saved; a
/// failed email is reported in [`BookingOutcome::email`].
#[instrument(skip_all, fields(user_id = %user.id, service = %request.service_name))]
pub async fn create(
    store: &dyn DocumentStore,
    collection: &str,
    mailer: &Mailer,
    user: &CurrentUser,
    request: &BookingRequest,
) -> Result<BookingOutcome, PersistenceError> {
    let (document, dropped) = create_document(store, collection, user, request).await?;
    info!(booking_id = %document.id, dropped = ?dropped, "Booking saved");

    let email = mailer
        .send_booking_confirmation(&BookingConfirmation {
            to: request.email.clone(),
            user_name: Some(request.name.clone()),
            service_name: request.service_name.clone(),
            booking_date_iso: request.slot.iso(),
            booking_time: request.slot.time_hhmm(),
            duration_minutes: request.duration_minutes,
            price: request.service_price,
        })
        .await;
    if let Err(e) = &email {
        warn!(error = %e, "Booking confirmation email not sent");
    }

    Ok(BookingOutcome {
        booking: Booking::from_document(&document),
        dropped,
        email,
    })
}

/// Write the appointment document, dropping optional attributes the schema
/// rejects.
///
/// A schema error naming an optional attribute drops that attribute; one
/// naming none of them drops them all. Each optional attribute is retried
/// at most once, then the base payload once.
///
/// # Errors
///
/// Returns [`PersistenceError::SchemaExhausted`] if the base payload is
/// rejected too, or [`PersistenceError::Remote`] for non-schema errors.
pub async fn create_document(
    store: &dyn DocumentStore,
    collection: &str,
    user: &CurrentUser,
    request: &BookingRequest,
) -> Result<(Document, Vec<&'static str>), PersistenceError> {
    let base = base_payload(request);
    let optional = [
        json!(user.id.as_str()),
        json!(BookingStatus::Scheduled.as_str()),
        json!(request.service_name),
    ];
    let mut kept: Vec<&'static str> = OPTIONAL_FIELDS.to_vec();
    let permissions = Permission::owner(&user.id);
    let document_id = DocumentId::Unique;

    loop {
        let mut data = base.clone();
        for (key, value) in OPTIONAL_FIELDS.iter().zip(&optional) {
            if kept.contains(key) {
                data.insert((*key).to_string(), value.clone());
            }
        }

        let err = match store
            .create_document(collection, &document_id, &data, &permissions)
            .await
        {
            Ok(document) => {
                let dropped = OPTIONAL_FIELDS
                    .iter()
                    .copied()
                    .filter(|f| !kept.contains(f))
                    .collect();
                return Ok((document, dropped));
            }
            Err(e) if e.is_schema_mismatch() && !kept.is_empty() => e,
            Err(e) if e.is_schema_mismatch() => {
                return Err(PersistenceError::SchemaExhausted {
                    collection: collection.to_string(),
                    hint: format!("{CREATE_HINT} (last error: {e})"),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let named = err.quoted_attributes();
        let before = kept.len();
        kept.retain(|f| !named.contains(f));
        if kept.len() == before {
            kept.clear();
        }
        debug!(error = %err, remaining = ?kept, "Booking payload rejected by schema");
    }
}

fn base_payload(request: &BookingRequest) -> crate::appwrite::Payload {
    payload([
        ("name", Some(json!(request.name))),
        ("email", Some(json!(request.email))),
        ("city", request.city.as_ref().map(|c| json!(c))),
        ("age", request.age.map(|a| json!(a))),
        (
            "serviceName",
            Some(json!(truncate(&request.service_name, SERVICE_NAME_MAX))),
        ),
        ("serviceDescription", Some(json!(request.service_description))),
        ("servicePrice", Some(json!(request.service_price.to_f64()))),
        ("serviceDuration", Some(json!(request.duration_minutes))),
        ("bookingDate", Some(json!(request.slot.iso()))),
        ("bookingTime", Some(json!(request.slot.time_hhmm()))),
        ("consentForm", Some(json!(true))),
    ])
}

/// Bookings owned by `user`, earliest scheduled first.
///
/// Queries by `userId`; if the collection has no such attribute, falls back
/// to the email attribute under its known spellings.
///
/// # Errors
///
/// Returns [`PersistenceError::SchemaExhausted`] if no owner attribute can
/// be queried, or [`PersistenceError::Remote`] for other failures.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list(
    store: &dyn DocumentStore,
    collection: &str,
    user: &CurrentUser,
) -> Result<Vec<Booking>, PersistenceError> {
    let by_id = [Query::equal("userId", user.id.as_str()), Query::limit(LIST_LIMIT)];

    let documents = match store.list_documents(collection, &by_id).await {
        Ok(list) => list.documents,
        Err(e) if e.is_schema_mismatch() => {
            debug!(error = %e, "No userId attribute; listing by email");
            list_by_email(store, collection, &user.email).await?
        }
        Err(e) => return Err(e.into()),
    };

    let mut bookings: Vec<Booking> = documents.iter().map(Booking::from_document).collect();
    bookings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(bookings)
}

async fn list_by_email(
    store: &dyn DocumentStore,
    collection: &str,
    email: &str,
) -> Result<Vec<Document>, PersistenceError> {
    let mut last: Option<AppwriteError> = None;

    for key in EMAIL_KEYS {
        let queries = [Query::equal(key, email), Query::limit(LIST_LIMIT)];
        match store.list_documents(collection, &queries).await {
            Ok(list) => return Ok(list.documents),
            Err(e) if e.is_schema_mismatch() => last = Some(e),
            Err(e) => return Err(e.into()),
        }
    }

    Err(PersistenceError::SchemaExhausted {
        collection: collection.to_string(),
        hint: last.map_or_else(
            || LIST_HINT.to_string(),
            |e| format!("{LIST_HINT} (last error: {e})"),
        ),
    })
}

/// Whether `doc` belongs to `user`, by owner id or any email spelling.
#[must_use]
pub fn is_owned_by(doc: &Document, user: &CurrentUser) -> bool {
    if doc.str("userId") == Some(user.id.as_str()) {
        return true;
    }
    let Ok(email) = Email::parse(user.email.trim()) else {
        return false;
    };
    EMAIL_KEYS
        .iter()
        .filter_map(|key| doc.str(key))
        .any(|stored| email.matches(stored))
}

/// Load a booking and check ownership. Someone else's booking is reported as
/// not found.
///
/// # Errors
///
/// Returns [`PersistenceError::NotFound`] if missing or not owned.
pub async fn fetch_owned(
    store: &dyn DocumentStore,
    collection: &str,
    user: &CurrentUser,
    booking_id: &str,
) -> Result<Document, PersistenceError> {
    let document = match store.get_document(collection, booking_id).await {
        Ok(document) => document,
        Err(e) if e.is_not_found() => return Err(PersistenceError::NotFound("Booking".into())),
        Err(e) => return Err(e.into()),
    };

    if is_owned_by(&document, user) {
        Ok(document)
    } else {
        warn!(booking_id, user_id = %user.id, "Booking not owned by user");
        Err(PersistenceError::NotFound("Booking".into()))
    }
}

/// Mark a booking cancelled.
///
/// # Errors
///
/// Returns [`PersistenceError::NotFound`] for a foreign or missing booking,
/// or [`PersistenceError::SchemaExhausted`] if no status shape is accepted.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn cancel(
    store: &dyn DocumentStore,
    collection: &str,
    user: &CurrentUser,
    booking_id: &str,
) -> Result<Booking, PersistenceError> {
    fetch_owned(store, collection, user, booking_id).await?;

    let candidates: Candidates = [
        single("status", json!("cancelled")),
        single("status", json!("canceled")),
        single("Status", json!("cancelled")),
        single("bookingStatus", json!("cancelled")),
        single("cancelled", json!(true)),
    ]
    .into_iter()
    .collect();

    let accepted = first_accepted(&candidates, |data| {
        store.update_document(collection, booking_id, data)
    })
    .await
    .map_err(|e| e.into_persistence(collection, CANCEL_HINT))?;

    info!(booking_id, candidate = accepted.index, "Booking cancelled");
    Ok(Booking::from_document(&accepted.document))
}

/// Record a reschedule request. `bookingDate` and `bookingTime` are not
/// touched.
///
/// # Errors
///
/// Returns [`PersistenceError::NotFound`] for a foreign or missing booking,
/// or [`PersistenceError::SchemaExhausted`] if no shape is accepted.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn request_reschedule(
    store: &dyn DocumentStore,
    collection: &str,
    user: &CurrentUser,
    booking_id: &str,
    request: RescheduleRequest,
) -> Result<Booking, PersistenceError> {
    fetch_owned(store, collection, user, booking_id).await?;

    let date = Some(json!(request.slot.date().format("%Y-%m-%d").to_string()));
    let time = Some(json!(request.slot.time_hhmm()));
    let status = Some(json!(BookingStatus::RescheduleRequested.as_str()));
    let flag = Some(json!(true));

    let candidates: Candidates = [
        payload([
            ("status", status.clone()),
            ("rescheduleRequested", flag.clone()),
            ("rescheduleDate", date.clone()),
            ("rescheduleTime", time.clone()),
        ]),
        payload([
            ("rescheduleRequested", flag),
            ("rescheduleDate", date.clone()),
            ("rescheduleTime", time.clone()),
        ]),
        payload([
            ("status", status.clone()),
            ("rescheduleDate", date.clone()),
            ("rescheduleTime", time.clone()),
        ]),
        payload([("status", status), ("requestedDate", date), ("requestedTime", time)]),
    ]
    .into_iter()
    .collect();

    let accepted = first_accepted(&candidates, |data| {
        store.update_document(collection, booking_id, data)
    })
    .await
    .map_err(|e| e.into_persistence(collection, RESCHEDULE_HINT))?;

    info!(booking_id, candidate = accepted.index, "Reschedule requested");
    Ok(Booking::from_document(&accepted.document))
}

/// Delete a booking outright.
///
/// # Errors
///
/// Returns [`PersistenceError::NotFound`] for a foreign or missing booking.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn delete(
    store: &dyn DocumentStore,
    collection: &str,
    user: &CurrentUser,
    booking_id: &str,
) -> Result<(), PersistenceError> {
    fetch_owned(store, collection, user, booking_id).await?;
    store.delete_document(collection, booking_id).await?;
    info!(booking_id, "Booking deleted");
    Ok(())
}

fn single(key: &str, value: Value) -> crate::appwrite::Payload {
    payload([(key, Some(value))])
}
