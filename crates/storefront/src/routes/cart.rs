//! Cart and checkout route handlers.
//!
//! Every handler here takes `RequireUser`: a signed-out request is redirected
//! to the login page before the handler runs, so none of these routes can
//! touch the document store without an authenticated caller.
//!
//! Mutations are plain form POSTs answered with redirects (no fragments); the
//! target page shows the outcome as a banner.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use urban_threads_core::ProductId;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::routes::MessageQuery;
use crate::services::{CartContents, CartError};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Checkout confirmation form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub confirm: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub user: Option<CurrentUser>,
    pub contents: CartContents,
    pub load_failed: bool,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Checkout confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/confirm.html")]
pub struct CheckoutTemplate {
    pub user: Option<CurrentUser>,
    pub contents: CartContents,
}

/// Map a cart failure to a redirect token.
fn cart_error_token(error: &CartError) -> &'static str {
    match error {
        CartError::Contention => "cart_busy",
        _ => "cart",
    }
}

/// Display the cart page.
///
/// A load failure degrades to a banner on an otherwise empty page rather
/// than an error response.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let (contents, load_failed) = match state.cart().load_cart(&user).await {
        Ok(contents) => (contents, false),
        Err(error) => {
            tracing::error!(%error, "Failed to load cart");
            (CartContents::default(), true)
        }
    };

    CartTemplate {
        user: Some(user),
        contents,
        load_failed,
        error: query.error_text(),
        success: query.success_text(),
    }
}

/// Add a product to the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let product_id = ProductId::from(form.product_id);
    let quantity = form.quantity.unwrap_or(1);

    match state.cart().add_to_cart(&user, &product_id, quantity).await {
        Ok(()) => {
            add_breadcrumb(
                "cart",
                "Added product to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            Redirect::to("/?success=added").into_response()
        }
        Err(error) => {
            tracing::error!(%error, product_id = %product_id, "Failed to add to cart");
            Redirect::to(&format!("/?error={}", cart_error_token(&error))).into_response()
        }
    }
}

/// Remove a product line from the cart.
///
/// Removing something that is not in the cart quietly succeeds.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let product_id = ProductId::from(form.product_id);

    match state.cart().remove_from_cart(&user, &product_id).await {
        Ok(()) => {
            add_breadcrumb(
                "cart",
                "Removed product from cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            Redirect::to("/cart?success=removed").into_response()
        }
        Err(error) => {
            tracing::error!(%error, product_id = %product_id, "Failed to remove from cart");
            Redirect::to(&format!("/cart?error={}", cart_error_token(&error))).into_response()
        }
    }
}

/// Display the checkout confirmation page.
///
/// An empty cart has nothing to confirm and bounces back to the cart page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Response {
    let contents = match state.cart().load_cart(&user).await {
        Ok(contents) => contents,
        Err(error) => {
            tracing::error!(%error, "Failed to load cart for checkout");
            return Redirect::to("/cart?error=cart").into_response();
        }
    };

    if contents.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    CheckoutTemplate {
        user: Some(user),
        contents,
    }
    .into_response()
}

/// Place the order: clear the cart after an explicit confirmation.
///
/// A POST without `confirm=yes` (the confirmation form was declined or
/// resubmitted stale) changes nothing and returns to the cart.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Response {
    if form.confirm.as_deref() != Some("yes") {
        return Redirect::to("/cart").into_response();
    }

    match state.cart().checkout_cart(&user).await {
        Ok(()) => {
            add_breadcrumb("cart", "Checked out", None);
            Redirect::to("/cart?success=order_placed").into_response()
        }
        Err(error) => {
            tracing::error!(%error, "Checkout failed");
            Redirect::to("/cart?error=checkout").into_response()
        }
    }
}
