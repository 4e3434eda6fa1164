//! HTTP client for the hosted identity service.
//!
//! Endpoint mapping:
//!
//! | Operation                 | Request                                      |
//! |---------------------------|----------------------------------------------|
//! | `sign_in`                 | `POST /v1/sessions` (JSON credentials)       |
//! | `sign_up`                 | `POST /v1/accounts` (JSON credentials)       |
//! | `federated_authorize_url` | `GET /v1/oauth/authorize` (redirect target)  |
//! | `exchange_federated_code` | `POST /v1/oauth/token` (form-encoded)        |
//!
//! Failures carry a JSON body of the form
//! `{"error": {"code": "...", "message": "..."}}`; [`map_service_error`]
//! translates the codes we act on into typed [`AuthError`] variants.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use urban_threads_core::{Email, UserId};

use super::{AuthError, AuthUser, IdentityProvider};
use crate::config::IdentityConfig;

/// Client for the hosted identity service HTTP API.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    inner: Arc<HttpIdentityProviderInner>,
}

struct HttpIdentityProviderInner {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
    oauth_client_id: String,
    oauth_client_secret: String,
}

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthUserResponse {
    #[serde(rename = "userId")]
    user_id: String,
    email: String,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

impl HttpIdentityProvider {
    /// Create a new client from identity service configuration.
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(HttpIdentityProviderInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.clone(),
                api_key: config.api_key.expose_secret().to_string(),
                oauth_client_id: config.oauth_client_id.clone(),
                oauth_client_secret: config.oauth_client_secret.expose_secret().to_string(),
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_url.as_str().trim_end_matches('/'))
    }

    /// POST JSON credentials and decode the signed-in user from the reply.
    async fn submit_credentials(
        &self,
        path: &str,
        email: &Email,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.inner.api_key)
            .json(&CredentialsRequest {
                email: email.as_str(),
                password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }

        let user: AuthUserResponse = response.json().await?;
        user.try_into()
    }
}

impl TryFrom<AuthUserResponse> for AuthUser {
    type Error = AuthError;

    fn try_from(response: AuthUserResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(response.user_id),
            email: Email::parse(&response.email)?,
            display_name: response.display_name,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        self.submit_credentials("/v1/sessions", email, password).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        self.submit_credentials("/v1/accounts", email, password).await
    }

    fn federated_authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        let mut url = self.inner.api_url.clone();
        // Url::join would eat a path the operator configured on the base URL.
        url.set_path(&format!("{}/v1/oauth/authorize", url.path().trim_end_matches('/')));
        url.query_pairs_mut()
            .append_pair("client_id", &self.inner.oauth_client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "profile email")
            .append_pair("state", state);
        url.to_string()
    }

    #[instrument(skip(self, code))]
    async fn exchange_federated_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthUser, AuthError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/v1/oauth/token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", &self.inner.oauth_client_id),
                ("client_secret", &self.inner.oauth_client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }

        let user: AuthUserResponse = response.json().await?;
        user.try_into()
    }
}

/// Translate a non-success identity service response into an [`AuthError`].
async fn service_error(response: reqwest::Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    map_service_error(status, &body)
}

/// Map a provider error payload onto the typed variants we act on.
///
/// Codes may arrive namespaced (`auth/weak-password`); the prefix is ignored
/// when matching. Anything unrecognized surfaces as [`AuthError::Service`].
fn map_service_error(status: u16, body: &str) -> AuthError {
    let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) else {
        let excerpt: String = body.chars().take(200).collect();
        tracing::error!(status, body = %excerpt, "identity service returned undecodable error");
        return AuthError::Service {
            code: format!("http-{status}"),
            message: excerpt,
        };
    };

    let ErrorDetail { code, message } = parsed.error;
    match code.rsplit('/').next().unwrap_or(&code) {
        "invalid-credential" | "wrong-password" | "user-not-found" => {
            AuthError::InvalidCredentials
        }
        "email-already-in-use" => AuthError::EmailInUse,
        "weak-password" => AuthError::WeakPassword(message),
        "access_denied" | "consent-denied" => AuthError::Cancelled,
        _ => AuthError::Service { code, message },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn error_body(code: &str, message: &str) -> String {
        serde_json::json!({"error": {"code": code, "message": message}}).to_string()
    }

    #[test]
    fn test_map_wrong_password_to_invalid_credentials() {
        let err = map_service_error(401, &error_body("wrong-password", "nope"));
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_map_unknown_account_to_invalid_credentials() {
        let err = map_service_error(404, &error_body("user-not-found", ""));
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_map_email_already_in_use() {
        let err = map_service_error(409, &error_body("email-already-in-use", ""));
        assert!(matches!(err, AuthError::EmailInUse));
    }

    #[test]
    fn test_map_weak_password_keeps_policy_message() {
        let err = map_service_error(400, &error_body("weak-password", "at least 8 characters"));
        match err {
            AuthError::WeakPassword(message) => assert_eq!(message, "at least 8 characters"),
            other => panic!("expected WeakPassword, got {other:?}"),
        }
    }

    #[test]
    fn test_map_namespaced_code() {
        let err = map_service_error(400, &error_body("auth/weak-password", "too short"));
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[test]
    fn test_map_consent_denied_to_cancelled() {
        let err = map_service_error(403, &error_body("access_denied", ""));
        assert!(matches!(err, AuthError::Cancelled));
    }

    #[test]
    fn test_map_unrecognized_code_to_service_error() {
        let err = map_service_error(429, &error_body("quota-exceeded", "slow down"));
        match err {
            AuthError::Service { code, message } => {
                assert_eq!(code, "quota-exceeded");
                assert_eq!(message, "slow down");
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[test]
    fn test_map_undecodable_body_to_service_error() {
        let err = map_service_error(502, "<html>bad gateway</html>");
        match err {
            AuthError::Service { code, message } => {
                assert_eq!(code, "http-502");
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[test]
    fn test_authorize_url_carries_state_and_redirect() {
        use crate::config::IdentityConfig;
        use secrecy::SecretString;

        let provider = HttpIdentityProvider::new(&IdentityConfig {
            api_url: Url::parse("https://id.example.com").unwrap(),
            api_key: SecretString::from("k"),
            oauth_client_id: "storefront-web".to_string(),
            oauth_client_secret: SecretString::from("s"),
        });

        let url = provider.federated_authorize_url(
            "https://shop.example.com/auth/federated/callback",
            "nonce-123",
        );
        let parsed = Url::parse(&url).unwrap();

        assert_eq!(parsed.path(), "/v1/oauth/authorize");
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "storefront-web".to_string())));
        assert!(pairs.contains(&("state".to_string(), "nonce-123".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "https://shop.example.com/auth/federated/callback".to_string()
        )));
        // The client secret belongs to the token exchange, never the redirect.
        assert!(!pairs.iter().any(|(k, _)| k == "client_secret"));
    }
}
