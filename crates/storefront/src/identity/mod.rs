//! Hosted identity service client.
//!
//! # Architecture
//!
//! All credential handling happens inside the hosted identity service - the
//! storefront never sees a password hash and stores no account data. The
//! service is consumed through the [`IdentityProvider`] trait (in-memory fake
//! in tests, [`HttpIdentityProvider`] in production).
//!
//! Who the signed-in user *is* lives in the server-side session, not here:
//! the provider resolves credentials to an [`AuthUser`] once, and from then
//! on handlers carry that identity explicitly (see
//! `crate::middleware::RequireUser`). The trait has no "current user"
//! accessor.

mod http;

pub use http::HttpIdentityProvider;

use async_trait::async_trait;
use thiserror::Error;

use urban_threads_core::{Email, EmailError, UserId};

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid credentials (wrong password or no such account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("email already in use")]
    EmailInUse,

    /// Password rejected by the identity service's policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The user abandoned the federated consent screen (closed it or
    /// declined). Not a failure worth alarming anyone about.
    #[error("sign-in was cancelled")]
    Cancelled,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Unrecognized error from the identity service.
    #[error("identity service error {code}: {message}")]
    Service {
        /// Provider error code.
        code: String,
        /// Human-readable detail.
        message: String,
    },
}

/// An authenticated user as resolved by the identity service.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Provider-assigned stable user ID (also keys the user document).
    pub id: UserId,
    /// Verified email address.
    pub email: Email,
    /// Optional display name (federated providers usually supply one).
    pub display_name: Option<String>,
}

/// Minimal consumed contract of the hosted identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a wrong password or
    /// unknown account, or another `AuthError` on transport/service failure.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError>;

    /// Create an account with email and password and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailInUse`] or [`AuthError::WeakPassword`] when
    /// the service rejects the registration, or another `AuthError` on
    /// transport/service failure.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError>;

    /// Where to send the user agent to start the hosted federated sign-in
    /// flow. `state` is the caller's CSRF token and comes back verbatim on
    /// the callback.
    fn federated_authorize_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Complete a federated sign-in by exchanging the callback code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Cancelled`] if the user declined consent, or
    /// another `AuthError` on transport/service failure.
    async fn exchange_federated_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthUser, AuthError>;
}
