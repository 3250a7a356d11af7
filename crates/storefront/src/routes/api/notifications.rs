//! Confirmation email endpoints.
//!
//! Both endpoints send synchronously and answer with
//! `{ "ok": true, "id": ... }` or `{ "ok": false, "error": ... }`:
//!
//! - 200: sent
//! - 400: a required field is missing or the body is not JSON
//! - 501: no transport configured, or the sender domain is unverified
//! - 500: anything else

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use servicehub_core::Price;
use tracing::{error, instrument, warn};

use crate::services::email::{BookingConfirmation, EmailError, OrderConfirmation, OrderLine, Sent};
use crate::state::AppState;

/// Appended to 501 answers from the booking endpoint; the booking write has
/// already happened by the time the confirmation is requested.
const BOOKING_SAVED: &str = " Booking was saved successfully.";

/// Response body for both endpoints.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A failed notification request.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn email(err: &EmailError, unavailable_suffix: &str) -> Self {
        if err.is_unavailable() {
            warn!(error = %err, "Email unavailable; confirmation skipped");
            Self {
                status: StatusCode::NOT_IMPLEMENTED,
                message: format!("{err}{unavailable_suffix}"),
            }
        } else {
            let event_id = sentry::capture_error(err);
            error!(error = %err, sentry_event_id = %event_id, "Confirmation email failed");
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = NotificationResponse {
            ok: false,
            id: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

fn sent(sent: Sent) -> Json<NotificationResponse> {
    Json(NotificationResponse {
        ok: true,
        id: Some(sent.id),
        error: None,
    })
}

fn required(value: &str, name: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("Missing \"{name}\"")));
    }
    Ok(())
}

fn price(value: f64) -> Price {
    Price::from_f64(value).unwrap_or(Price::ZERO)
}

// =============================================================================
// Booking confirmation
// =============================================================================

/// Body of `POST /api/booking-confirmation`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingConfirmationBody {
    pub to: String,
    pub user_name: Option<String>,
    pub service_name: String,
    pub booking_date_iso: String,
    pub booking_time: String,
    pub service_price: f64,
    pub service_duration_minutes: u32,
}

impl From<BookingConfirmationBody> for BookingConfirmation {
    fn from(body: BookingConfirmationBody) -> Self {
        Self {
            to: body.to,
            user_name: body.user_name,
            service_name: body.service_name,
            booking_date_iso: body.booking_date_iso,
            booking_time: body.booking_time,
            duration_minutes: body.service_duration_minutes,
            price: price(body.service_price),
        }
    }
}

/// Send a booking confirmation.
///
/// POST /api/booking-confirmation
///
/// # Errors
///
/// Returns `ApiError` with the status described in the module docs.
#[instrument(skip_all)]
pub async fn booking_confirmation(
    State(state): State<AppState>,
    body: Result<Json<BookingConfirmationBody>, JsonRejection>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let Json(body) = body?;
    if body.to.trim().is_empty() {
        return Err(ApiError::bad_request("Missing \"to\" email"));
    }
    required(&body.service_name, "serviceName")?;

    state
        .mailer()
        .send_booking_confirmation(&body.into())
        .await
        .map(sent)
        .map_err(|e| ApiError::email(&e, BOOKING_SAVED))
}

// =============================================================================
// Order confirmation
// =============================================================================

/// One purchased line in an order confirmation request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PurchaseLine {
    pub item: String,
    pub purchase_type: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Body of `POST /api/order-confirmation`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderConfirmationBody {
    pub to: String,
    pub user_name: Option<String>,
    pub purchases: Vec<PurchaseLine>,
    pub subtotal: f64,
    pub total: f64,
    pub purchase_date_iso: String,
}

impl From<OrderConfirmationBody> for OrderConfirmation {
    fn from(body: OrderConfirmationBody) -> Self {
        Self {
            to: body.to,
            user_name: body.user_name,
            lines: body
                .purchases
                .into_iter()
                .map(|line| OrderLine {
                    item: line.item,
                    purchase_type: line.purchase_type,
                    quantity: line.quantity,
                    unit_price: price(line.unit_price),
                })
                .collect(),
            subtotal: price(body.subtotal),
            total: price(body.total),
            purchase_date_iso: body.purchase_date_iso,
        }
    }
}

/// Send an order confirmation.
///
/// POST /api/order-confirmation
///
/// # Errors
///
/// Returns `ApiError` with the status described in the module docs.
#[instrument(skip_all)]
pub async fn order_confirmation(
    State(state): State<AppState>,
    body: Result<Json<OrderConfirmationBody>, JsonRejection>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let Json(body) = body?;
    if body.to.trim().is_empty() {
        return Err(ApiError::bad_request("Missing \"to\" email"));
    }

    state
        .mailer()
        .send_order_confirmation(&body.into())
        .await
        .map(sent)
        .map_err(|e| ApiError::email(&e, ""))
}
