//! In-memory identity provider: a fixed set of credential accounts plus a
//! canned federated-exchange code.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use urban_threads_core::{Email, UserId};
use urban_threads_storefront::identity::{AuthError, AuthUser, IdentityProvider};

/// Authorization code the fake provider accepts in [`exchange_federated_code`].
///
/// [`exchange_federated_code`]: IdentityProvider::exchange_federated_code
pub const VALID_FEDERATED_CODE: &str = "valid-code";

struct Account {
    user_id: UserId,
    password: String,
    display_name: Option<String>,
}

/// Instrumented in-memory [`IdentityProvider`].
#[derive(Default)]
pub struct InMemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register an account that [`sign_in`] will accept.
    ///
    /// [`sign_in`]: IdentityProvider::sign_in
    #[must_use]
    pub fn with_account(self, user_id: &str, email: &str, password: &str) -> Self {
        {
            let mut accounts = self.accounts.lock().expect("identity lock");
            accounts.insert(
                email.to_string(),
                Account {
                    user_id: UserId::from(user_id),
                    password: password.to_string(),
                    display_name: None,
                },
            );
        }
        self
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let accounts = self.accounts.lock().expect("identity lock");
        match accounts.get(email.as_str()) {
            Some(account) if account.password == password => Ok(AuthUser {
                id: account.user_id.clone(),
                email: email.clone(),
                display_name: account.display_name.clone(),
            }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let mut accounts = self.accounts.lock().expect("identity lock");
        if accounts.contains_key(email.as_str()) {
            return Err(AuthError::EmailInUse);
        }
        // The hosted provider has its own policy beyond our length check;
        // model it as "no single repeated character".
        let mut chars = password.chars();
        let first = chars.next();
        if first.is_some() && chars.all(|c| Some(c) == first) {
            return Err(AuthError::WeakPassword(
                "password is too guessable".to_string(),
            ));
        }

        let user_id = UserId::from(format!("user-{}", accounts.len() + 1));
        accounts.insert(
            email.as_str().to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
                display_name: None,
            },
        );
        Ok(AuthUser {
            id: user_id,
            email: email.clone(),
            display_name: None,
        })
    }

    fn federated_authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://identity.test/oauth/consent?client_id=storefront-test&redirect_uri={redirect_uri}&state={state}"
        )
    }

    async fn exchange_federated_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<AuthUser, AuthError> {
        if code != VALID_FEDERATED_CODE {
            return Err(AuthError::Service {
                code: "invalid-grant".to_string(),
                message: "unknown authorization code".to_string(),
            });
        }
        Ok(AuthUser {
            id: UserId::from("fed-user-1"),
            email: Email::parse("sso@example.com").expect("valid email"),
            display_name: Some("SSO User".to_string()),
        })
    }
}
