//! Per-visitor cart sessions.
//!
//! Each browser session gets its own [`CartHandle`], backed by its own
//! anonymous platform session. The platform only shows a cart to the session
//! that created it, so a handle and its session live and die together:
//!
//! - handles live in a `moka` cache and are evicted after the same idle period
//!   as the browser session, or earlier when the cache is full
//! - a handle whose platform session was lost closes itself and is replaced on
//!   the visitor's next request
//!
//! Either way the visitor continues with a new anonymous session and a new,
//! empty cart. The old cart stays on the platform.

use std::sync::Arc;
use std::time::Duration;

use boba_core::Market;
use moka::future::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cart::{CartHandle, CartSession};
use crate::commerce::{AnonymousSession, CommerceClient};
use crate::config::{CartConfig, CommerceConfig};

/// Cart handle for one visitor.
pub type ShopperCart = CartHandle<CommerceClient<AnonymousSession>>;

/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct CartRegistry {
    inner: Arc<CartRegistryInner>,
}

struct CartRegistryInner {
    client: reqwest::Client,
    commerce: CommerceConfig,
    market: Market,
    operation_timeout: Duration,
    carts: Cache<Uuid, ShopperCart>,
}

impl CartRegistry {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        commerce: CommerceConfig,
        market: Market,
        config: &CartConfig,
    ) -> Self {
        let carts = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(config.session_idle)
            .eviction_listener(|key, _, cause| {
                debug!(visitor = %key, ?cause, "Cart session evicted");
            })
            .build();

        Self {
            inner: Arc::new(CartRegistryInner {
                client,
                commerce,
                market,
                operation_timeout: config.operation_timeout,
                carts,
            }),
        }
    }

    /// The visitor's cart handle, opening a new session on first use or when
    /// the previous one has closed.
    ///
    /// Concurrent calls for the same visitor share one handle.
    pub async fn open(&self, visitor: Uuid) -> ShopperCart {
        self.inner
            .carts
            .entry(visitor)
            .or_insert_with_if(async { self.start(visitor) }, ShopperCart::is_closed)
            .await
            .into_value()
    }

    /// Drop the visitor's cart session. The remote cart is untouched.
    pub async fn forget(&self, visitor: Uuid) {
        self.inner.carts.invalidate(&visitor).await;
    }

    fn start(&self, visitor: Uuid) -> ShopperCart {
        info!(visitor = %visitor, "Opening cart session");
        let tokens = AnonymousSession::new(self.inner.client.clone(), &self.inner.commerce);
        let remote = CommerceClient::new(self.inner.client.clone(), &self.inner.commerce, tokens);
        CartHandle::spawn(
            CartSession::new(remote, self.inner.market.clone()),
            self.inner.operation_timeout,
        )
    }
}
