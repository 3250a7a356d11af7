//! Service listing and booking route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use servicehub_core::ServiceId;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::catalog::{self, Service};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAuth, set_flash};
use crate::models::{BookingRequest, Flash};
use crate::routes::Layout;
use crate::services::bookings;
use crate::state::AppState;

/// Booking form data.
#[derive(Debug, Deserialize)]
pub struct BookingForm {
    pub date: String,
    pub time: String,
    pub city: Option<String>,
    pub age: Option<String>,
    /// Checkbox; present only when ticked.
    pub consent: Option<String>,
}

/// Service listing template.
#[derive(Template, WebTemplate)]
#[template(path = "services/index.html")]
pub struct ServicesTemplate {
    pub layout: Layout,
    pub services: &'static [Service],
}

/// Booking form template.
#[derive(Template, WebTemplate)]
#[template(path = "services/book.html")]
pub struct BookTemplate {
    pub layout: Layout,
    pub service: &'static Service,
    /// Earliest selectable date, `YYYY-MM-DD`.
    pub min_date: String,
}

fn find_service(id: i32) -> Result<&'static Service, AppError> {
    catalog::service(ServiceId::new(id)).ok_or_else(|| AppError::NotFound("Service".to_string()))
}

/// Display the service listing.
pub async fn index(session: Session, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    ServicesTemplate {
        layout: Layout::load(&session, Some(user)).await,
        services: catalog::services(),
    }
}

/// Display the booking form for one service.
///
/// # Errors
///
/// Returns 404 for an unknown service id.
pub async fn book_page(
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let service = find_service(id)?;
    Ok(BookTemplate {
        layout: Layout::load(&session, Some(user)).await,
        service,
        min_date: chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
    })
}

/// Create a booking and send its confirmation email.
///
/// # Errors
///
/// Returns 404 for an unknown service id. Every other failure is shown as a
/// flash message.
#[instrument(skip_all, fields(user_id = %user.id, service_id = id))]
pub async fn book(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<BookingForm>,
) -> Result<Response, AppError> {
    let service = find_service(id)?;
    let back = Redirect::to(&format!("/services/{id}/book"));

    let request = match BookingRequest::new(
        &user,
        service,
        &form.date,
        &form.time,
        form.city.as_deref(),
        form.age.as_deref(),
        form.consent.is_some(),
    ) {
        Ok(request) => request,
        Err(e) => {
            set_flash(&session, Flash::error(e.to_string())).await;
            return Ok(back.into_response());
        }
    };

    let outcome = match state.documents(Some(user.session_secret())) {
        Ok(store) => {
            bookings::create(
                &store,
                &state.config().appwrite.collections.appointments,
                state.mailer(),
                &user,
                &request,
            )
            .await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(outcome) => {
            add_breadcrumb("booking", "Booking created", Some(&[("service", service.name)]));
            let email = match &outcome.email {
                Ok(_) => "A confirmation email is on its way.".to_string(),
                Err(e) => format!("Confirmation email not sent: {e}"),
            };
            set_flash(
                &session,
                Flash::success(format!(
                    "Booking confirmed for {} on {} at {}. {email}",
                    service.name,
                    request.slot.long_date(),
                    request.slot.time_hhmm(),
                )),
            )
            .await;
            Ok(Redirect::to("/profile").into_response())
        }
        Err(e) => {
            warn!(error = %e, "Booking failed");
            set_flash(&session, Flash::error(format!("Failed to create booking: {e}"))).await;
            Ok(back.into_response())
        }
    }
}
