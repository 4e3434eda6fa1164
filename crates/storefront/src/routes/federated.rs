//! Federated sign-in route handlers.
//!
//! The heavy lifting happens on the identity service's hosted consent page:
//! - Login: redirects the browser there with a CSRF state parameter
//! - Callback: validates the state and exchanges the code for the signed-in
//!   user
//!
//! A user who closes or declines the consent page comes back with
//! `error=access_denied`; that is an ordinary outcome, not a failure.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::routes::auth::finish_sign_in;
use crate::state::AppState;

/// Query parameters from the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for the signed-in user.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            // SAFETY: idx is always within bounds since random_range returns 0..CHARSET.len()
            char::from(*CHARSET.get(idx).expect("idx within bounds"))
        })
        .collect()
}

/// Initiate federated sign-in.
///
/// Generates a state parameter, stores it in the session, and redirects to
/// the provider's consent page.
///
/// # Route
///
/// `GET /auth/federated/login`
pub async fn login(State(state): State<AppState>, session: Session) -> Response {
    // Generate CSRF state
    let oauth_state = generate_random_string(32);

    // Store in session for validation on callback
    if let Err(error) = session
        .insert(session_keys::OAUTH_STATE, &oauth_state)
        .await
    {
        tracing::error!(%error, "Failed to store OAuth state in session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    // Build the redirect URI
    let redirect_uri = format!("{}/auth/federated/callback", state.config().base_url);

    // Generate and redirect to the consent URL
    let auth_url = state
        .identity()
        .federated_authorize_url(&redirect_uri, &oauth_state);

    Redirect::to(&auth_url).into_response()
}

/// Handle the provider callback.
///
/// Validates the state parameter, exchanges the authorization code for the
/// signed-in user, and stores them in the session.
///
/// # Route
///
/// `GET /auth/federated/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // A declined or abandoned consent page is not an error condition.
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        if error == "access_denied" {
            tracing::info!("Federated sign-in cancelled by user");
            return Redirect::to("/auth/login?error=cancelled").into_response();
        }
        tracing::warn!(%error, %description, "Federated sign-in failed at provider");
        return Redirect::to("/auth/login?error=federated").into_response();
    }

    // Verify we have an authorization code
    let Some(code) = query.code else {
        tracing::warn!("Federated callback missing code");
        return Redirect::to("/auth/login?error=missing_code").into_response();
    };

    // Verify state parameter (CSRF protection)
    let Some(returned_state) = query.state else {
        tracing::warn!("Federated callback missing state");
        return Redirect::to("/auth/login?error=missing_state").into_response();
    };

    let stored_state: Option<String> = session
        .get(session_keys::OAUTH_STATE)
        .await
        .ok()
        .flatten();

    if stored_state.as_ref() != Some(&returned_state) {
        tracing::warn!("Federated callback state mismatch");
        return Redirect::to("/auth/login?error=invalid_state").into_response();
    }

    // Clear the stored state (one-time use)
    let _ = session.remove::<String>(session_keys::OAUTH_STATE).await;

    // Build redirect URI (must match the one used in the authorization request)
    let redirect_uri = format!("{}/auth/federated/callback", state.config().base_url);

    // Exchange code for the signed-in user
    let auth_user = match state
        .identity()
        .exchange_federated_code(&code, &redirect_uri)
        .await
    {
        Ok(user) => user,
        Err(error) => {
            tracing::error!(%error, "Failed to exchange federated sign-in code");
            return Redirect::to("/auth/login?error=token_exchange").into_response();
        }
    };

    // Federated sign-ins get a user record too, same as registration.
    let user = CurrentUser::from(auth_user);
    if let Err(error) = state.cart().ensure_user_record(&user).await {
        tracing::warn!(
            %error,
            user_id = %user.id,
            "Could not create user record at federated sign-in, deferring to first cart use"
        );
    }

    finish_sign_in(&session, user, "/").await
}
