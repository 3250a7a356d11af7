//! Static content pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Redirect};
use tower_sessions::Session;

use crate::filters;
use crate::middleware::{OptionalAuth, record_cookie_consent};
use crate::routes::Layout;

/// Cookie policy page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/cookies.html")]
pub struct CookiesTemplate {
    pub layout: Layout,
    pub session_cookie: &'static str,
}

/// Display the cookie policy.
pub async fn cookies(session: Session, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    CookiesTemplate {
        layout: Layout::load(&session, user).await,
        session_cookie: crate::middleware::session::SESSION_COOKIE_NAME,
    }
}

/// Accept the cookie banner. Consent lives in the session, so it is asked
/// again once the session expires.
pub async fn accept_cookies(session: Session) -> impl IntoResponse {
    record_cookie_consent(&session).await;
    Redirect::to("/")
}
