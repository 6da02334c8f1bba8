//! HTTP implementation of [`CartRemote`].

use std::sync::Arc;

use boba_core::{Cart, CartDraft, CartId, CartUpdate};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::auth::TokenProvider;
use super::{CartRemote, CommerceError};
use crate::config::CommerceConfig;

/// Reference expansion requested on every cart call so applied discount codes
/// carry their code string.
const DISCOUNT_CODE_EXPANSION: &str = "discountCodes[*].discountCode";

/// Maximum number of response body characters written to logs.
const LOGGED_BODY_CHARS: usize = 500;

/// Client for the shopper-scoped cart endpoints.
///
/// Cheap to clone; clones share the HTTP connection pool and token provider.
pub struct CommerceClient<T> {
    inner: Arc<CommerceClientInner<T>>,
}

impl<T> Clone for CommerceClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CommerceClientInner<T> {
    client: reqwest::Client,
    /// `{api_url}/{project_key}`
    project_url: String,
    tokens: T,
}

/// Error body returned by the platform on failed requests.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    current_version: Option<u64>,
}

impl ApiErrorBody {
    fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .or_else(|| self.errors.iter().find_map(|e| e.message.clone()))
            .unwrap_or_else(|| fallback.chars().take(200).collect())
    }

    fn current_version(&self) -> Option<u64> {
        self.errors.iter().find_map(|e| e.current_version)
    }
}

impl<T: TokenProvider> CommerceClient<T> {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &CommerceConfig, tokens: T) -> Self {
        Self::with_project_url(
            client,
            format!("{}/{}", config.api_url, config.project_key),
            tokens,
        )
    }

    /// Create a client against an explicit project URL (`{api}/{project}`).
    #[must_use]
    pub fn with_project_url(client: reqwest::Client, project_url: String, tokens: T) -> Self {
        Self {
            inner: Arc::new(CommerceClientInner {
                client,
                project_url: project_url.trim_end_matches('/').to_string(),
                tokens,
            }),
        }
    }

    /// The token provider backing this client.
    #[must_use]
    pub fn tokens(&self) -> &T {
        &self.inner.tokens
    }

    /// Send a request and decode a cart from the response.
    ///
    /// A rejected token is renewed and the request sent once more.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Cart, CommerceError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.project_url))?;
        url.query_pairs_mut()
            .append_pair("expand", DISCOUNT_CODE_EXPANSION);

        let mut response = self.execute(method.clone(), url.clone(), body).await?;
        if is_token_rejected(response.status()) {
            debug!(path, status = %response.status(), "Access token rejected, renewing");
            self.inner.tokens.invalidate().await;
            response = self.execute(method, url, body).await?;
        }

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str::<Cart>(&text).map_err(|e| {
                tracing::error!(
                    error = %e,
                    body = %truncate(&text),
                    "Failed to parse cart response"
                );
                CommerceError::Parse(e)
            });
        }

        let error_body = ApiErrorBody::parse(&text);

        match status {
            StatusCode::NOT_FOUND => {
                debug!(path, "Platform returned 404");
                Err(CommerceError::NotFound(error_body.message_or(path)))
            }
            StatusCode::CONFLICT => Err(CommerceError::VersionConflict {
                message: error_body.message_or(&text),
                current_version: error_body.current_version(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(CommerceError::Unauthorized(error_body.message_or(&text)))
            }
            _ => {
                tracing::error!(
                    status = %status,
                    body = %truncate(&text),
                    "Commerce API returned non-success status"
                );
                Err(CommerceError::Api {
                    status: status.as_u16(),
                    message: error_body.message_or(&text),
                })
            }
        }
    }

    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, CommerceError> {
        let token = self.inner.tokens.access_token().await?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

impl<T: TokenProvider> CartRemote for CommerceClient<T> {
    #[instrument(skip(self))]
    async fn active_cart(&self) -> Result<Cart, CommerceError> {
        self.send::<()>(Method::GET, "/me/active-cart", None).await
    }

    #[instrument(skip(self, draft), fields(country = %draft.country))]
    async fn create_cart(&self, draft: &CartDraft) -> Result<Cart, CommerceError> {
        self.send(Method::POST, "/me/carts", Some(draft)).await
    }

    #[instrument(
        skip(self, update),
        fields(cart_id = %id, version = update.version, actions = update.actions.len())
    )]
    async fn update_cart(&self, id: &CartId, update: &CartUpdate) -> Result<Cart, CommerceError> {
        self.send(Method::POST, &format!("/me/carts/{id}"), Some(update))
            .await
    }
}

const fn is_token_rejected(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

fn truncate(text: &str) -> String {
    text.chars().take(LOGGED_BODY_CHARS).collect()
}
