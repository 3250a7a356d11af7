//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (tags span and Sentry scope)
//! 4. Security headers
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Rate limiting (governor) on auth form posts and the JSON API

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{
    create_session_layer, has_cookie_consent, record_cookie_consent, set_flash, take_flash,
};
