//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::StorefrontConfig;
use crate::registry::CartRegistry;

/// Timeout for a single HTTP request to the commerce platform.
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Sequential platform calls in the slowest cart operation: a conflicting
/// update, the refetch, the retried update and a token renewal.
const PLATFORM_CALLS_PER_OPERATION: u32 = 4;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the HTTP client, cart sessions and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    http: reqwest::Client,
    carts: CartRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. the TLS
    /// backend fails to initialize).
    pub fn new(config: StorefrontConfig) -> Result<Self, reqwest::Error> {
        if !fits_slowest_operation(config.cart.operation_timeout) {
            tracing::warn!(
                operation_timeout_ms = config.cart.operation_timeout.as_millis(),
                http_timeout_ms = HTTP_TIMEOUT.as_millis(),
                "Cart operation timeout is shorter than a conflict retry may take"
            );
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("boba-storefront/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()?;

        let carts = CartRegistry::new(
            http.clone(),
            config.commerce.clone(),
            config.market.clone(),
            &config.cart,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                http,
                carts,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the shared HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Get a reference to the per-visitor cart sessions.
    #[must_use]
    pub fn carts(&self) -> &CartRegistry {
        &self.inner.carts
    }
}

/// Whether every platform call of the slowest cart operation can run to its
/// HTTP timeout within `operation_timeout`.
fn fits_slowest_operation(operation_timeout: Duration) -> bool {
    HTTP_TIMEOUT * PLATFORM_CALLS_PER_OPERATION <= operation_timeout
}
