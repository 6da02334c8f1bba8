//! Cached cart snapshot and reconciliation with the platform.

use std::sync::Arc;

use boba_core::{Cart, CartUpdate, Market};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{CartError, CartMutation};
use crate::commerce::{CartRemote, CommerceError};

/// One shopper's cart, cached locally.
///
/// The snapshot is replaced wholesale with each platform response and never
/// edited in place. Callers outside this module should drive a session through
/// a [`super::CartHandle`] so that writes are serialized.
pub struct CartSession<R> {
    remote: R,
    market: Market,
    cart: RwLock<Option<Arc<Cart>>>,
}

impl<R: CartRemote> CartSession<R> {
    #[must_use]
    pub fn new(remote: R, market: Market) -> Self {
        Self {
            remote,
            market,
            cart: RwLock::new(None),
        }
    }

    /// The market carts are reconciled against.
    #[must_use]
    pub const fn market(&self) -> &Market {
        &self.market
    }

    /// The cached snapshot, if any. Never calls the platform.
    pub async fn cached(&self) -> Option<Arc<Cart>> {
        self.cart.read().await.clone()
    }

    /// Return the cached cart, resolving it from the platform on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform could not be reached or rejected the
    /// request. The cache is left untouched in that case.
    pub async fn get_or_create_cart(&self) -> Result<Arc<Cart>, CartError> {
        if let Some(cart) = self.cached().await {
            debug!(cart_id = %cart.id, version = cart.version, "Cart cache hit");
            return Ok(cart);
        }
        self.refresh().await
    }

    /// Re-resolve the cart from the platform and replace the cached snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_or_create_cart`].
    pub async fn refresh(&self) -> Result<Arc<Cart>, CartError> {
        let cart = self.resolve().await?;
        Ok(self.store(cart).await)
    }

    /// Apply a mutation to the current cart.
    ///
    /// A version conflict triggers exactly one refetch and one retry, with the
    /// actions rebuilt from the refetched cart. Any other failure, and a
    /// failed retry, is returned as is.
    ///
    /// # Errors
    ///
    /// Returns validation errors, lookup errors, and platform errors.
    pub async fn apply(&self, mutation: &CartMutation) -> Result<Arc<Cart>, CartError> {
        let cart = self.get_or_create_cart().await?;

        match self.submit(&cart, mutation).await {
            Ok(Some(updated)) => Ok(self.store(updated).await),
            Ok(None) => Ok(cart),
            Err(CartError::Remote(err)) if err.is_version_conflict() => {
                warn!(
                    cart_id = %cart.id,
                    version = cart.version,
                    operation = mutation.name(),
                    "Cart version conflict, refetching and retrying once"
                );
                let fresh = self.refresh().await?;
                match self.submit(&fresh, mutation).await? {
                    Some(updated) => Ok(self.store(updated).await),
                    None => Ok(fresh),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Send the mutation against `cart`. `None` when there was nothing to send.
    async fn submit(
        &self,
        cart: &Cart,
        mutation: &CartMutation,
    ) -> Result<Option<Cart>, CartError> {
        let actions = mutation.to_actions(cart, &self.market)?;
        if actions.is_empty() {
            debug!(operation = mutation.name(), "Mutation is a no-op, skipping update");
            return Ok(None);
        }

        let update = CartUpdate {
            version: cart.version,
            actions,
        };
        let updated = self.remote.update_cart(&cart.id, &update).await?;
        debug!(
            cart_id = %updated.id,
            version = updated.version,
            operation = mutation.name(),
            "Cart updated"
        );
        Ok(Some(updated))
    }

    /// Fetch the active cart and make sure it fits the market.
    ///
    /// - compliant: used as is
    /// - empty but misconfigured: patched with the corrective actions
    /// - misconfigured with items: left alone, a new cart is created
    /// - none: a new cart is created
    async fn resolve(&self) -> Result<Cart, CommerceError> {
        match self.remote.active_cart().await {
            Ok(cart) if self.market.is_compliant(&cart) => {
                debug!(cart_id = %cart.id, version = cart.version, "Using active cart");
                Ok(cart)
            }
            Ok(cart) if cart.is_empty() => {
                info!(
                    cart_id = %cart.id,
                    tax_mode = ?cart.tax_mode,
                    country = ?cart.country,
                    "Patching empty cart to market configuration"
                );
                let update = CartUpdate {
                    version: cart.version,
                    actions: self.market.corrective_actions(),
                };
                self.remote.update_cart(&cart.id, &update).await
            }
            Ok(cart) => {
                warn!(
                    orphaned_cart_id = %cart.id,
                    line_items = cart.line_items.len(),
                    "Active cart does not match the market and has items, creating a new cart"
                );
                self.create().await
            }
            Err(err) if err.is_not_found() => {
                debug!("No active cart");
                self.create().await
            }
            Err(err) => Err(err),
        }
    }

    async fn create(&self) -> Result<Cart, CommerceError> {
        let cart = self.remote.create_cart(&self.market.cart_draft()).await?;
        info!(cart_id = %cart.id, country = %self.market.country, "Created cart");
        Ok(cart)
    }

    async fn store(&self, cart: Cart) -> Arc<Cart> {
        let cart = Arc::new(cart);
        *self.cart.write().await = Some(Arc::clone(&cart));
        cart
    }
}
