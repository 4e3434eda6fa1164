//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Catalog page (product grid)
//!
//! # Cart (requires sign-in)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add a product to the cart
//! POST /cart/remove             - Remove a product line from the cart
//!
//! # Checkout (requires sign-in)
//! GET  /checkout                - Order confirmation page
//! POST /checkout                - Place the order (clears the cart)
//!
//! # Auth
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/register           - Register page
//! POST /auth/register           - Register action
//! POST /auth/logout             - Logout action
//!
//! # Federated sign-in
//! GET  /auth/federated/login    - Redirect to the hosted consent page
//! GET  /auth/federated/callback - Handle the provider callback
//! ```
//!
//! Mutating routes follow post/redirect/get: the POST answers with a
//! redirect carrying an `?error=` or `?success=` token, and the target page
//! renders the matching banner. Tokens (not prose) go in the URL so messages
//! can change without breaking bookmarks.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod federated;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::state::AppState;

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    /// Human-readable text for the `?error=` token, if any.
    pub(crate) fn error_text(&self) -> Option<&'static str> {
        self.error.as_deref().map(error_message)
    }

    /// Human-readable text for the `?success=` token, if any.
    pub(crate) fn success_text(&self) -> Option<&'static str> {
        self.success.as_deref().map(success_message)
    }
}

/// Map a redirect error token to display text.
fn error_message(token: &str) -> &'static str {
    match token {
        "credentials" => "Invalid email or password.",
        "email" => "Please enter a valid email address.",
        "password_mismatch" => "Passwords do not match.",
        "password_too_short" => "Password must be at least 8 characters.",
        "weak_password" => "Password does not meet the minimum requirements.",
        "email_taken" => "An account with this email already exists.",
        "cancelled" => "Sign-in was cancelled.",
        "session" => "Could not start a session. Please try again.",
        "missing_code" | "missing_state" | "invalid_state" | "token_exchange" | "federated" => {
            "Single sign-on failed. Please try again."
        }
        "cart" => "Could not update the cart. Please try again.",
        "cart_busy" => "The cart is busy right now, please try again.",
        "checkout" => "Checkout failed. Your cart is unchanged.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Map a redirect success token to display text.
fn success_message(token: &str) -> &'static str {
    match token {
        "added" => "Added to cart.",
        "removed" => "Removed from cart.",
        "order_placed" => "Order placed. Thank you!",
        "welcome" => "Welcome! Your account is ready.",
        _ => "Done.",
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        // Hosted federated sign-in
        .route("/federated/login", get(federated::login))
        .route("/federated/callback", get(federated::callback))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog page
        .route("/", get(catalog::index))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout confirmation
        .route("/checkout", get(cart::checkout_page).post(cart::checkout))
        // Auth routes
        .nest("/auth", auth_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tokens_have_specific_text() {
        assert_eq!(error_message("credentials"), "Invalid email or password.");
        assert_eq!(
            error_message("cart_busy"),
            "The cart is busy right now, please try again."
        );
        // Unknown tokens fall back to a generic message instead of echoing
        // attacker-controlled query strings.
        assert_eq!(
            error_message("<script>"),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn test_success_tokens() {
        assert_eq!(success_message("order_placed"), "Order placed. Thank you!");
        assert_eq!(success_message("unknown"), "Done.");
    }
}
