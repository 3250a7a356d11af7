//! Booking view and request types.
//!
//! Appointment documents come back with whatever attribute spellings the
//! collection happens to have, so [`Booking::from_document`] reads every
//! field through a list of variants.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use servicehub_core::{BookingSlot, BookingStatus, Price, SlotError};
use thiserror::Error;

use crate::appwrite::Document;
use crate::catalog::Service;
use crate::models::CurrentUser;

/// Status attribute spellings, in read precedence.
pub const STATUS_KEYS: &[&str] = &["status", "Status", "bookingStatus", "appointmentStatus"];

/// Owner email attribute spellings, in query precedence.
pub const EMAIL_KEYS: &[&str] = &["email", "Email", "userEmail", "UserEmail"];

const RESCHEDULE_DATE_KEYS: &[&str] = &["rescheduleDate", "requestedDate", "rescheduledDate"];
const RESCHEDULE_TIME_KEYS: &[&str] = &["rescheduleTime", "requestedTime", "rescheduledTime"];

/// A booking as shown on the profile page.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: String,
    pub service_name: String,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub duration_minutes: Option<i64>,
    /// Parsed `bookingDate`; `None` if missing or unreadable.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub booking_time: Option<String>,
    pub status: BookingStatus,
    pub reschedule_date: Option<String>,
    pub reschedule_time: Option<String>,
    pub created_at: Option<String>,
}

impl Booking {
    /// Build the view from a stored appointment document.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            service_name: doc
                .first_str(&["serviceNameFull", "serviceName"])
                .unwrap_or("Service")
                .to_string(),
            description: doc.str("serviceDescription").map(String::from),
            price: doc.f64("servicePrice").and_then(Price::from_f64),
            duration_minutes: doc.i64("serviceDuration"),
            scheduled_at: doc.str("bookingDate").and_then(parse_scheduled),
            booking_time: doc.str("bookingTime").map(String::from),
            status: read_status(doc),
            reschedule_date: doc.first_str(RESCHEDULE_DATE_KEYS).map(String::from),
            reschedule_time: doc.first_str(RESCHEDULE_TIME_KEYS).map(String::from),
            created_at: doc.created_at.clone(),
        }
    }

    /// Ordering key: scheduled time first, unreadable dates last.
    #[must_use]
    pub fn sort_key(&self) -> (bool, Option<DateTime<Utc>>, Option<&str>) {
        (
            self.scheduled_at.is_none(),
            self.scheduled_at,
            self.created_at.as_deref(),
        )
    }

    /// e.g. "October 20, 2026".
    #[must_use]
    pub fn date_label(&self) -> String {
        self.scheduled_at
            .map_or_else(|| "Date not set".to_string(), |at| at.format("%B %-d, %Y").to_string())
    }

    /// e.g. "2:30 PM".
    #[must_use]
    pub fn time_label(&self) -> String {
        self.booking_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
            .or_else(|| self.scheduled_at.map(|at| at.time()))
            .map_or_else(String::new, |t| t.format("%-I:%M %p").to_string())
    }

    #[must_use]
    pub fn price_label(&self) -> String {
        self.price.map_or_else(String::new, |p| p.to_string())
    }

    #[must_use]
    pub fn duration_label(&self) -> String {
        self.duration_minutes
            .map_or_else(String::new, |m| format!("{m} minutes"))
    }

    /// Requested new slot, if a reschedule was asked for.
    #[must_use]
    pub fn reschedule_label(&self) -> Option<String> {
        let date = self.reschedule_date.as_deref()?;
        let date = NaiveDate::parse_from_str(date.get(..10).unwrap_or(date), "%Y-%m-%d")
            .map_or_else(|_| date.to_string(), |d| d.format("%B %-d, %Y").to_string());
        Some(match self.reschedule_time.as_deref() {
            Some(time) => format!("{date} at {time}"),
            None => date,
        })
    }

    /// Whether cancel and reschedule actions still make sense.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Display status from the first non-empty status attribute, adjusted by the
/// boolean markers some schemas use instead.
fn read_status(doc: &Document) -> BookingStatus {
    if doc.flag("cancelled") {
        return BookingStatus::Cancelled;
    }
    let text = doc
        .first_str(STATUS_KEYS)
        .and_then(BookingStatus::normalize)
        .unwrap_or_default();
    if text == BookingStatus::Scheduled && doc.flag("rescheduleRequested") {
        return BookingStatus::RescheduleRequested;
    }
    text
}

fn parse_scheduled(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

/// Why a booking form was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingInputError {
    #[error("Please accept the consent form to book this service")]
    ConsentRequired,
    #[error("Invalid booking slot: {0}")]
    Slot(#[from] SlotError),
    #[error("Age must be a number between 1 and 150")]
    InvalidAge,
}

/// A validated booking, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub name: String,
    pub email: String,
    pub city: Option<String>,
    pub age: Option<u8>,
    pub service_name: String,
    pub service_description: String,
    pub service_price: Price,
    pub duration_minutes: u32,
    pub slot: BookingSlot,
}

impl BookingRequest {
    /// Validate form input for `service` on behalf of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingInputError`] if consent is missing, the slot does not
    /// parse, or the age is out of range.
    pub fn new(
        user: &CurrentUser,
        service: &Service,
        date: &str,
        time: &str,
        city: Option<&str>,
        age: Option<&str>,
        consent: bool,
    ) -> Result<Self, BookingInputError> {
        if !consent {
            return Err(BookingInputError::ConsentRequired);
        }
        let slot = BookingSlot::parse(date, time)?;
        let age = age
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| {
                a.parse::<u8>()
                    .ok()
                    .filter(|n| (1..=150).contains(n))
                    .ok_or(BookingInputError::InvalidAge)
            })
            .transpose()?;

        Ok(Self {
            name: user.display_name().to_string(),
            email: user.email.clone(),
            city: city
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
            age,
            service_name: service.name.to_string(),
            service_description: service.description.to_string(),
            service_price: service.price,
            duration_minutes: service.duration_minutes,
            slot,
        })
    }
}

/// A validated reschedule request. Only the requested slot is recorded; the
/// original booking date and time are left as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescheduleRequest {
    pub slot: BookingSlot,
}

impl RescheduleRequest {
    /// # Errors
    ///
    /// Returns [`SlotError`] if the date or time does not parse.
    pub fn parse(date: &str, time: &str) -> Result<Self, SlotError> {
        Ok(Self {
            slot: BookingSlot::parse(date, time)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use servicehub_core::ServiceId;

    use super::*;
    use crate::appwrite::Account;
    use crate::catalog;

    fn doc(value: serde_json::Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    fn user() -> CurrentUser {
        CurrentUser::new(
            &Account {
                id: "u1".into(),
                name: String::new(),
                email: "jo@example.com".into(),
                email_verification: true,
            },
            "secret",
        )
    }

    #[test]
    fn test_from_document_prefers_full_name() {
        let booking = Booking::from_document(&doc(json!({
            "$id": "b1",
            "serviceName": "Web Development Consultati",
            "serviceNameFull": "Web Development Consultation",
            "servicePrice": 199,
            "serviceDuration": 90,
            "bookingDate": "2026-10-20T14:30:00.000Z",
            "bookingTime": "14:30"
        })));

        assert_eq!(booking.service_name, "Web Development Consultation");
        assert_eq!(booking.price_label(), "$199.00");
        assert_eq!(booking.duration_label(), "90 minutes");
        assert_eq!(booking.date_label(), "October 20, 2026");
        assert_eq!(booking.time_label(), "2:30 PM");
        assert_eq!(booking.status, BookingStatus::Scheduled);
    }

    #[test]
    fn test_status_variants_and_markers() {
        let read = |v| Booking::from_document(&doc(v)).status;

        assert_eq!(
            read(json!({"$id": "a", "bookingStatus": "Canceled"})),
            BookingStatus::Cancelled
        );
        assert_eq!(
            read(json!({"$id": "a", "status": "scheduled", "cancelled": true})),
            BookingStatus::Cancelled
        );
        assert_eq!(
            read(json!({"$id": "a", "status": "scheduled", "rescheduleRequested": true})),
            BookingStatus::RescheduleRequested
        );
        assert_eq!(
            read(json!({"$id": "a", "status": "cancelled", "rescheduleRequested": true})),
            BookingStatus::Cancelled
        );
        assert_eq!(read(json!({"$id": "a"})), BookingStatus::Scheduled);
    }

    #[test]
    fn test_reschedule_variants() {
        let booking = Booking::from_document(&doc(json!({
            "$id": "a",
            "requestedDate": "2026-11-02",
            "requestedTime": "09:00"
        })));
        assert_eq!(
            booking.reschedule_label().as_deref(),
            Some("November 2, 2026 at 09:00")
        );
    }

    #[test]
    fn test_sort_key_puts_undated_last() {
        let dated = Booking::from_document(&doc(json!({
            "$id": "a", "bookingDate": "2026-10-20T14:30:00.000Z"
        })));
        let undated = Booking::from_document(&doc(json!({"$id": "b"})));
        assert!(dated.sort_key() < undated.sort_key());
    }

    #[test]
    fn test_booking_request_validation() {
        let service = catalog::service(ServiceId::new(5)).unwrap();

        let ok = BookingRequest::new(&user(), service, "2026-10-20", "14:30", Some(" "), Some("34"), true)
            .unwrap();
        assert_eq!(ok.name, "jo");
        assert_eq!(ok.city, None);
        assert_eq!(ok.age, Some(34));
        assert_eq!(ok.duration_minutes, 60);

        assert_eq!(
            BookingRequest::new(&user(), service, "2026-10-20", "14:30", None, None, false),
            Err(BookingInputError::ConsentRequired)
        );
        assert_eq!(
            BookingRequest::new(&user(), service, "2026-10-20", "14:30", None, Some("0"), true),
            Err(BookingInputError::InvalidAge)
        );
        assert_eq!(
            BookingRequest::new(&user(), service, "2026-10-20", "14:30", None, Some("151"), true),
            Err(BookingInputError::InvalidAge)
        );
        assert_eq!(
            BookingRequest::new(&user(), service, "tomorrow", "14:30", None, None, true),
            Err(BookingInputError::Slot(SlotError::InvalidDate))
        );
    }
}
