//! Product catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::Query, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;

use crate::catalog::{self, Product};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::Layout;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Vec<&'static Product>,
    pub categories: Vec<&'static str>,
    /// Empty means "All".
    pub selected: String,
}

impl ProductsTemplate {
    fn is_selected(&self, category: &str) -> bool {
        self.selected == category
    }
}

/// Display the product listing, optionally filtered by category.
pub async fn index(
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductsQuery>,
) -> impl IntoResponse {
    let selected = query
        .category
        .filter(|c| !c.is_empty() && c != "All")
        .unwrap_or_default();

    let products = catalog::products()
        .iter()
        .filter(|p| selected.is_empty() || p.category == selected)
        .collect();

    ProductsTemplate {
        layout: Layout::load(&session, Some(user)).await,
        products,
        categories: catalog::product_categories(),
        selected,
    }
}
