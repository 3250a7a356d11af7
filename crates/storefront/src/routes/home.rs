//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;

use crate::catalog::{self, Service};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Layout;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub services: &'static [Service],
}

/// Display the home page.
pub async fn home(session: Session, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    HomeTemplate {
        layout: Layout::load(&session, user).await,
        services: catalog::services(),
    }
}
