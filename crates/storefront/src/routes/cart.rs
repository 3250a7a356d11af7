//! Cart route handlers.
//!
//! The cart lives in the session. Every mutation is a form post that
//! redirects back with a flash message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use servicehub_core::{Cart, CartTotals, ProductId};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::catalog;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{RequireAuth, set_flash};
use crate::models::{Flash, session_keys};
use crate::routes::Layout;
use crate::services::checkout::{Buyer, checkout as save_checkout, order_confirmation};
use crate::state::AppState;

const CHECKOUT_FAILED: &str =
    "Checkout failed. Please confirm Appwrite Database + collection IDs and permissions.";

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session; a missing or unreadable cart is empty.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the cart in the session.
async fn save_cart(session: &Session, cart: &Cart) {
    if let Err(e) = session.insert(session_keys::CART, cart).await {
        warn!(error = %e, "Failed to store cart");
    }
}

// =============================================================================
// Forms and Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    /// Category filter to return to on the product listing.
    pub category: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub cart: Cart,
    pub totals: CartTotals,
    pub tax_rate: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    let totals = cart.totals(state.config().tax_rate_percent);

    CartTemplate {
        layout: Layout::load(&session, Some(user)).await,
        cart,
        totals,
        tax_rate: state.config().tax_rate_percent.normalize().to_string(),
    }
}

/// Add a catalog product to the cart.
pub async fn add(
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> impl IntoResponse {
    let back = form
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map_or_else(
            || "/products".to_string(),
            |c| format!("/products?category={}", urlencoding::encode(c)),
        );

    let Some(product) = catalog::product(form.product_id) else {
        set_flash(&session, Flash::error("That product is no longer available")).await;
        return Redirect::to(&back);
    };

    let mut cart = load_cart(&session).await;
    let flash = match cart.add(
        product.id,
        product.name,
        product.category,
        product.price,
        form.quantity.unwrap_or(1),
    ) {
        Ok(()) => {
            save_cart(&session, &cart).await;
            let product_id = product.id.to_string();
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            Flash::success(format!("Added {} to cart!", product.name))
        }
        Err(e) => Flash::error(e.to_string()),
    };
    set_flash(&session, flash).await;
    Redirect::to(&back)
}

/// Set a line quantity. Quantities below 1 are raised to 1; removal has its
/// own action.
pub async fn update(
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> impl IntoResponse {
    let mut cart = load_cart(&session).await;
    match cart.set_quantity(form.product_id, form.quantity.max(1)) {
        Ok(()) => save_cart(&session, &cart).await,
        Err(e) => set_flash(&session, Flash::error(e.to_string())).await,
    }
    Redirect::to("/cart")
}

/// Remove a line from the cart.
pub async fn remove(
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> impl IntoResponse {
    let mut cart = load_cart(&session).await;
    if cart.remove(form.product_id).is_ok() {
        save_cart(&session, &cart).await;
    }
    Redirect::to("/cart")
}

/// Empty the cart.
pub async fn clear(session: Session, RequireAuth(_user): RequireAuth) -> impl IntoResponse {
    save_cart(&session, &Cart::new()).await;
    Redirect::to("/cart")
}

/// Save the cart as test-mode purchases and send the order confirmation.
///
/// The cart is cleared only when every record was written. The email
/// outcome is appended to the success message and never fails checkout.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        set_flash(&session, Flash::error("Your cart is empty")).await;
        return Redirect::to("/cart");
    }

    let collections = &state.config().appwrite.collections;
    let buyer = Buyer {
        id: Some(&user.id),
        email: Some(user.email.as_str()),
        name: Some(user.display_name()),
    };

    let result = match state.documents(Some(user.session_secret())) {
        Ok(store) => save_checkout(&store, collections, &cart, buyer).await,
        Err(e) => Err(e),
    };

    let receipt = match result {
        Ok(receipt) => receipt,
        Err(e) => {
            warn!(error = %e, "Checkout failed");
            let message = e.to_string();
            let message = if message.trim().is_empty() {
                CHECKOUT_FAILED.to_string()
            } else {
                message
            };
            set_flash(&session, Flash::error(message)).await;
            return Redirect::to("/cart");
        }
    };

    save_cart(&session, &Cart::new()).await;

    let totals = cart.totals(state.config().tax_rate_percent);
    let confirmation =
        order_confirmation(&cart, &totals, &receipt, &user.email, Some(user.display_name()));
    let email_status = match state.mailer().send_order_confirmation(&confirmation).await {
        Ok(_) => "Confirmation email sent (test mode)".to_string(),
        Err(e) => {
            warn!(error = %e, "Order confirmation not sent");
            e.to_string()
        }
    };

    let units = receipt.units;
    set_flash(
        &session,
        Flash::success(format!(
            "Saved {units} purchase{} ({}). {email_status}",
            if units == 1 { "" } else { "s" },
            receipt.purchased_at.format("%B %-d, %Y, %-I:%M %p UTC"),
        )),
    )
    .await;
    Redirect::to("/cart")
}
