//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use urban_threads_core::{Email, UserId};

use crate::identity::AuthUser;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user. Every
/// handler and service call that acts on behalf of a user receives this
/// explicitly - there is no ambient "current user" global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User ID assigned by the identity service (also the user document key).
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Optional display name from the identity service.
    pub display_name: Option<String>,
}

impl From<AuthUser> for CurrentUser {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for federated OAuth state (CSRF protection).
    pub const OAUTH_STATE: &str = "oauth_state";
}
