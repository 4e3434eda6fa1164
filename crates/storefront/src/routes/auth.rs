//! Authentication route handlers.
//!
//! Login and registration call the hosted identity service; the resolved
//! identity is then stored in the server-side session. Nothing
//! password-shaped is ever persisted here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use urban_threads_core::Email;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::identity::AuthError;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::MessageQuery;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        user,
        error: query.error_text(),
        success: query.success_text(),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/auth/login?error=email").into_response();
    };

    match state.identity().sign_in(&email, &form.password).await {
        Ok(auth_user) => start_session(&session, auth_user, "/").await,
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Login failed: invalid credentials");
            Redirect::to("/auth/login?error=credentials").into_response()
        }
        Err(error) => {
            tracing::error!(%error, "Login failed");
            Redirect::to("/auth/login?error=auth").into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        user,
        error: query.error_text(),
        success: query.success_text(),
    }
}

/// Handle registration form submission.
///
/// Creates the account at the identity service and signs the new user in.
/// Their user record is written here too; if that write fails they are
/// still registered, and the record is (re)created on first cart use.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    // Validate passwords match
    if form.password != form.password_confirm {
        return Redirect::to("/auth/register?error=password_mismatch").into_response();
    }

    // Validate password length
    if form.password.len() < 8 {
        return Redirect::to("/auth/register?error=password_too_short").into_response();
    }

    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/auth/register?error=email").into_response();
    };

    match state.identity().sign_up(&email, &form.password).await {
        Ok(auth_user) => {
            let user = CurrentUser::from(auth_user);
            if let Err(error) = state.cart().ensure_user_record(&user).await {
                tracing::warn!(
                    %error,
                    user_id = %user.id,
                    "Could not create user record at registration, deferring to first cart use"
                );
            }
            finish_sign_in(&session, user, "/?success=welcome").await
        }
        Err(AuthError::EmailInUse) => {
            Redirect::to("/auth/register?error=email_taken").into_response()
        }
        Err(AuthError::WeakPassword(reason)) => {
            tracing::debug!(%reason, "Registration rejected: weak password");
            Redirect::to("/auth/register?error=weak_password").into_response()
        }
        Err(error) => {
            tracing::error!(%error, "Registration failed");
            Redirect::to("/auth/register?error=auth").into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Clears the signed-in user and destroys the session.
pub async fn logout(session: Session) -> Response {
    if let Err(error) = clear_current_user(&session).await {
        tracing::error!(%error, "Failed to clear session user");
    }

    // Also destroy the entire session
    if let Err(error) = session.flush().await {
        tracing::error!(%error, "Failed to flush session");
    }

    clear_sentry_user();

    Redirect::to("/").into_response()
}

// =============================================================================
// Session helpers shared with federated sign-in
// =============================================================================

/// Store a freshly authenticated user in the session and redirect.
pub(super) async fn start_session(
    session: &Session,
    auth_user: crate::identity::AuthUser,
    destination: &str,
) -> Response {
    finish_sign_in(session, CurrentUser::from(auth_user), destination).await
}

pub(super) async fn finish_sign_in(
    session: &Session,
    user: CurrentUser,
    destination: &str,
) -> Response {
    if let Err(error) = set_current_user(session, &user).await {
        tracing::error!(%error, "Failed to store user in session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User signed in");

    Redirect::to(destination).into_response()
}
