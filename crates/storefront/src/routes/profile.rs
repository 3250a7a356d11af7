//! Profile and booking management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user, set_flash};
use crate::models::{Booking, CurrentUser, Flash, RescheduleRequest};
use crate::routes::Layout;
use crate::services::auth::AuthError;
use crate::services::bookings;
use crate::services::persistence::PersistenceError;
use crate::state::AppState;

/// Profile update form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
}

/// Reschedule request form data.
#[derive(Debug, Deserialize)]
pub struct RescheduleForm {
    pub date: String,
    pub time: String,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub user: CurrentUser,
    pub bookings: Vec<Booking>,
    pub bookings_error: Option<String>,
    pub min_date: String,
}

/// Delete confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/delete.html")]
pub struct DeleteBookingTemplate {
    pub layout: Layout,
    pub booking: Booking,
}

/// Display account details and the customer's bookings.
///
/// The session is re-checked against the backend with a short timeout; a
/// slow backend keeps the cached identity, an expired session signs out.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
) -> Response {
    match state.auth().check_session(&user).await {
        Ok(account) => {
            user.update_from(&account);
            if let Err(e) = set_current_user(&session, &user).await {
                warn!(error = %e, "Failed to refresh session user");
            }
        }
        Err(AuthError::Remote { source, .. }) if source.is_unauthorized() => {
            if let Err(e) = clear_current_user(&session).await {
                warn!(error = %e, "Failed to clear expired session user");
            }
            set_flash(
                &session,
                Flash::info("Your session has expired. Please sign in again."),
            )
            .await;
            return Redirect::to("/auth/signin").into_response();
        }
        Err(e) => warn!(error = %e, "Session check failed; using cached profile"),
    }

    let listed = match state.documents(Some(user.session_secret())) {
        Ok(store) => {
            bookings::list(&store, &state.config().appwrite.collections.appointments, &user).await
        }
        Err(e) => Err(e),
    };
    let (bookings, bookings_error) = match listed {
        Ok(bookings) => (bookings, None),
        Err(e) => {
            warn!(error = %e, "Could not list bookings");
            (Vec::new(), Some(e.to_string()))
        }
    };

    ProfileTemplate {
        layout: Layout::load(&session, Some(user.clone())).await,
        user,
        bookings,
        bookings_error,
        min_date: chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
    }
    .into_response()
}

/// Update the display name.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> impl IntoResponse {
    let flash = if form.name.trim().is_empty() {
        Flash::error("Name cannot be empty")
    } else {
        match state.auth().update_name(&mut user, &form.name).await {
            Ok(()) => {
                if let Err(e) = set_current_user(&session, &user).await {
                    warn!(error = %e, "Failed to refresh session user");
                }
                Flash::success("Profile updated successfully!")
            }
            Err(e) => Flash::error(e.to_string()),
        }
    };
    set_flash(&session, flash).await;
    Redirect::to("/profile")
}

/// Cancel a booking.
#[instrument(skip_all, fields(user_id = %user.id, booking_id = %id))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let result = match state.documents(Some(user.session_secret())) {
        Ok(store) => {
            bookings::cancel(&store, appointments(&state), &user, &id)
                .await
                .map(|_| ())
        }
        Err(e) => Err(e),
    };
    finish(&session, result, "Booking cancelled", "cancel").await
}

/// Ask before deleting a booking. Deletion cannot be undone, so the
/// profile page links here and only this page posts the delete.
#[instrument(skip_all, fields(user_id = %user.id, booking_id = %id))]
pub async fn confirm_delete_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let found = match state.documents(Some(user.session_secret())) {
        Ok(store) => bookings::fetch_owned(&store, appointments(&state), &user, &id).await,
        Err(e) => Err(e),
    };
    match found {
        Ok(document) => DeleteBookingTemplate {
            layout: Layout::load(&session, Some(user)).await,
            booking: Booking::from_document(&document),
        }
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Could not load booking for deletion");
            set_flash(&session, Flash::error(format!("Failed to delete booking: {e}"))).await;
            Redirect::to("/profile").into_response()
        }
    }
}

/// Delete a booking outright.
#[instrument(skip_all, fields(user_id = %user.id, booking_id = %id))]
pub async fn delete_booking(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let result = match state.documents(Some(user.session_secret())) {
        Ok(store) => bookings::delete(&store, appointments(&state), &user, &id).await,
        Err(e) => Err(e),
    };
    finish(&session, result, "Booking deleted", "delete").await
}

/// Record a reschedule request. The booked slot itself is unchanged.
#[instrument(skip_all, fields(user_id = %user.id, booking_id = %id))]
pub async fn reschedule_booking(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<RescheduleForm>,
) -> impl IntoResponse {
    let request = match RescheduleRequest::parse(&form.date, &form.time) {
        Ok(request) => request,
        Err(e) => {
            set_flash(&session, Flash::error(e.to_string())).await;
            return Redirect::to("/profile");
        }
    };

    let result = match state.documents(Some(user.session_secret())) {
        Ok(store) => {
            bookings::request_reschedule(&store, appointments(&state), &user, &id, request)
                .await
                .map(|_| ())
        }
        Err(e) => Err(e),
    };
    let done = format!(
        "Reschedule requested for {} at {}",
        request.slot.long_date(),
        request.slot.time_hhmm()
    );
    finish(&session, result, &done, "reschedule").await
}

fn appointments(state: &AppState) -> &str {
    &state.config().appwrite.collections.appointments
}

async fn finish(
    session: &Session,
    result: Result<(), PersistenceError>,
    success: &str,
    action: &str,
) -> Redirect {
    let flash = match result {
        Ok(()) => {
            add_breadcrumb("booking", success, Some(&[("action", action)]));
            Flash::success(success)
        }
        Err(e) => {
            warn!(error = %e, action, "Booking action failed");
            Flash::error(format!("Failed to {action} booking: {e}"))
        }
    };
    set_flash(session, flash).await;
    Redirect::to("/profile")
}
