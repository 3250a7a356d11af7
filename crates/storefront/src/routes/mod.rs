//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                - Home page
//! GET  /cookies                         - Cookie policy
//! POST /cookies/consent                 - Accept the cookie banner
//!
//! # Catalog (requires auth)
//! GET  /products                        - Product listing (?category=)
//! GET  /services                        - Service listing
//! GET  /services/{id}/book              - Booking form
//! POST /services/{id}/book              - Create booking
//!
//! # Cart (requires auth)
//! GET  /cart                            - Cart page
//! POST /cart/add                        - Add a product
//! POST /cart/update                     - Set a line quantity
//! POST /cart/remove                     - Remove a line
//! POST /cart/clear                      - Empty the cart
//! POST /cart/checkout                   - Save purchases, send confirmation
//!
//! # Profile (requires auth)
//! GET  /profile                         - Account details and bookings
//! POST /profile                         - Update display name
//! POST /profile/bookings/{id}/cancel    - Cancel a booking
//! GET  /profile/bookings/{id}/delete    - Confirm deletion
//! POST /profile/bookings/{id}/delete    - Delete a booking
//! POST /profile/bookings/{id}/reschedule - Request a new slot
//!
//! # Auth
//! GET  /auth/signin                     - Sign-in page
//! POST /auth/signin                     - Sign-in action
//! GET  /auth/signup                     - Sign-up page
//! POST /auth/signup                     - Sign-up action
//! POST /auth/signout                    - Sign-out action
//! GET  /auth/verify-email               - Confirm email (?userId=&secret=)
//! POST /auth/resend-verification        - Send another verification email
//! GET  /auth/forgot-password            - Recovery request page
//! POST /auth/forgot-password            - Send recovery email
//! GET  /auth/reset-password             - New password page (?userId=&secret=)
//! POST /auth/reset-password             - Set new password
//! GET  /auth/oauth/{provider}           - Start Google/Facebook sign-in
//! GET  /auth/oauth/callback             - Finish provider sign-in
//!
//! # Notification API (JSON)
//! POST /api/booking-confirmation        - Send a booking confirmation
//! POST /api/order-confirmation          - Send an order confirmation
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod home;
pub mod pages;
pub mod products;
pub mod profile;
pub mod services;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{api_rate_limiter, auth_rate_limiter, has_cookie_consent, take_flash};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Data every page layout needs: navigation state and the pending flash.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub cart_units: u32,
    pub flash: Option<Flash>,
    /// Hides the cookie banner.
    pub cookie_consent: bool,
}

impl Layout {
    /// Read the cart badge and take the pending flash message.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Self {
        Self {
            user,
            cart_units: cart::load_cart(session).await.unit_count(),
            flash: take_flash(session).await,
            cookie_consent: has_cookie_consent(session).await,
        }
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", CurrentUser::display_name)
    }
}

/// Create the auth routes router.
///
/// Form posts are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/signin", post(auth::signin))
        .route("/signup", post(auth::signup))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/signin", get(auth::signin_page))
        .route("/signup", get(auth::signup_page))
        .route("/signout", post(auth::signout))
        .route("/verify-email", get(auth::verify_email))
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password", get(auth::reset_password_page))
        .route("/oauth/callback", get(auth::oauth_callback))
        .route("/oauth/{provider}", get(auth::oauth_start))
        .merge(limited)
}

/// Create the service routes router.
pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(services::index))
        .route("/{id}/book", get(services::book_page).post(services::book))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).post(profile::update))
        .route("/bookings/{id}/cancel", post(profile::cancel_booking))
        .route(
            "/bookings/{id}/delete",
            get(profile::confirm_delete_page).post(profile::delete_booking),
        )
        .route(
            "/bookings/{id}/reschedule",
            post(profile::reschedule_booking),
        )
}

/// Create the notification API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/booking-confirmation",
            post(api::notifications::booking_confirmation),
        )
        .route(
            "/order-confirmation",
            post(api::notifications::order_confirmation),
        )
        .route_layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/cookies", get(pages::cookies))
        .route("/cookies/consent", post(pages::accept_cookies))
        .route("/products", get(products::index))
        .nest("/services", service_routes())
        .nest("/cart", cart_routes())
        .nest("/profile", profile_routes())
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}
