//! Access tokens for the commerce platform.
//!
//! The cart endpoints accept any bearer token scoped to a shopper. Anonymous
//! shoppers get one through the client-credentials grant on the anonymous
//! token endpoint; the platform ties the carts created with it to that
//! anonymous session. Later tokens come from the refresh-token grant, so the
//! session and the carts it owns outlive any single access token.

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::CommerceError;
use crate::config::CommerceConfig;

/// Seconds before expiry at which a token is treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for platform requests.
pub trait TokenProvider: Send + Sync + 'static {
    /// Return a usable access token, acquiring one if none is cached.
    fn access_token(&self) -> impl Future<Output = Result<SecretString, CommerceError>> + Send;

    /// Forget the cached access token so the next call renews it for the same
    /// shopper.
    fn invalidate(&self) -> impl Future<Output = ()> + Send;
}

/// A fixed token, for tooling and tests.
#[derive(Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<SecretString, CommerceError> {
        Ok(self.0.clone())
    }

    async fn invalidate(&self) {}
}

/// An access token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Bearer token value.
    pub value: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl AccessToken {
    /// Check if the token has expired or is about to.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
    /// Only issued when the anonymous session is created.
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Error response from the token endpoint.
#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Token state of one anonymous session.
#[derive(Default)]
struct SessionTokens {
    access: Option<AccessToken>,
    refresh: Option<SecretString>,
    /// Whether the anonymous session has been created.
    started: bool,
}

/// Token provider for one anonymous shopper session.
///
/// The first call creates the anonymous session. After that the access token
/// is cached in memory and renewed with the refresh token when it is missing
/// or about to expire; the provider never switches to a different anonymous
/// session. Once renewal is refused the session is lost and every call fails
/// with [`CommerceError::Unauthorized`].
///
/// Each visitor needs its own instance: the token identifies the anonymous
/// session that owns the visitor's cart.
pub struct AnonymousSession {
    client: reqwest::Client,
    anonymous_url: String,
    refresh_url: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
    tokens: RwLock<SessionTokens>,
}

impl AnonymousSession {
    /// Create a provider for a new anonymous session.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &CommerceConfig) -> Self {
        Self {
            client,
            anonymous_url: format!(
                "{}/oauth/{}/anonymous/token",
                config.auth_url, config.project_key
            ),
            refresh_url: format!("{}/oauth/token", config.auth_url),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scopes.join(" "),
            tokens: RwLock::new(SessionTokens::default()),
        }
    }

    /// Create the anonymous session.
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn start(&self) -> Result<TokenResponse, CommerceError> {
        let token = self
            .request_token(
                &self.anonymous_url,
                &[("grant_type", "client_credentials"), ("scope", self.scope.as_str())],
                CommerceError::Auth,
            )
            .await?;
        debug!(expires_in = token.expires_in, "Started anonymous session");
        Ok(token)
    }

    /// Renew the access token within the existing session.
    #[instrument(skip_all, fields(client_id = %self.client_id))]
    async fn renew(&self, refresh_token: &SecretString) -> Result<TokenResponse, CommerceError> {
        let token = self
            .request_token(
                &self.refresh_url,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.expose_secret()),
                ],
                CommerceError::Unauthorized,
            )
            .await?;
        debug!(expires_in = token.expires_in, "Renewed anonymous session token");
        Ok(token)
    }

    /// Post a token grant. A 4xx answer is reported through `rejected`.
    async fn request_token(
        &self,
        url: &str,
        form: &[(&str, &str)],
        rejected: fn(String) -> CommerceError,
    ) -> Result<TokenResponse, CommerceError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(form)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TokenErrorResponse>(&text)
            .ok()
            .and_then(|body| body.error_description.or(body.message).or(body.error))
            .unwrap_or_else(|| text.chars().take(200).collect());
        let message = format!("HTTP {status}: {message}");

        if status.is_client_error() {
            Err(rejected(message))
        } else {
            Err(CommerceError::Auth(message))
        }
    }
}

impl TokenProvider for AnonymousSession {
    async fn access_token(&self) -> Result<SecretString, CommerceError> {
        if let Some(token) = self.tokens.read().await.access.as_ref()
            && !token.is_expired()
        {
            return Ok(token.value.clone());
        }

        let mut tokens = self.tokens.write().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = tokens.access.as_ref()
            && !token.is_expired()
        {
            return Ok(token.value.clone());
        }

        let now = chrono::Utc::now().timestamp();
        let response = match (&tokens.refresh, tokens.started) {
            (Some(refresh_token), _) => self.renew(refresh_token).await?,
            (None, false) => self.start().await?,
            (None, true) => {
                return Err(CommerceError::Unauthorized(
                    "Anonymous session cannot be renewed".to_string(),
                ));
            }
        };

        tokens.started = true;
        if let Some(refresh_token) = response.refresh_token {
            tokens.refresh = Some(SecretString::from(refresh_token));
        }
        let value = SecretString::from(response.access_token);
        tokens.access = Some(AccessToken {
            value: value.clone(),
            expires_at: now + response.expires_in,
        });
        Ok(value)
    }

    async fn invalidate(&self) {
        self.tokens.write().await.access = None;
    }
}
