//! Cart consistency core.
//!
//! One visitor has at most one active cart on the platform. This module keeps
//! a local snapshot of it and funnels every change through a single ordered
//! pipeline:
//!
//! - [`CartSession`] caches the snapshot and lazily fetches, repairs or
//!   creates the remote cart on first use
//! - [`CartMutation`] describes a change and builds the update actions for it
//! - [`CartHandle`] owns a single-consumer queue; mutations run strictly one
//!   at a time in submission order, each retried once on a version conflict
//!
//! ```text
//! Uninitialized -> Resolving -> Ready <-> Mutating
//!                    |  ^                   |
//!                    |  +---- 409 ----------+
//!                    +-> Patching / Creating -> Ready
//! ```
//!
//! Failed operations leave the snapshot at the last known-good cart. The one
//! exception is a lost platform session: the cart belongs to that session, so
//! the handle shuts down and the visitor starts over with a new one.

mod mutation;
mod queue;
mod session;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use boba_core::LineItemId;
use thiserror::Error;

use crate::commerce::CommerceError;

pub use mutation::CartMutation;
pub use queue::CartHandle;
pub use session::CartSession;

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The commerce platform rejected or failed the request.
    #[error(transparent)]
    Remote(#[from] CommerceError),

    /// The operation did not finish before its deadline.
    #[error("Cart operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Quantity outside the accepted range.
    #[error("Invalid quantity {quantity}: {reason}")]
    InvalidQuantity {
        /// The rejected quantity.
        quantity: u32,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Blank discount code.
    #[error("Discount code must not be empty")]
    InvalidDiscountCode,

    /// The cart has no line with this ID.
    #[error("Line item not found: {0}")]
    LineItemNotFound(LineItemId),

    /// The cart has no applied discount code matching this ID or code.
    #[error("Discount code is not applied to the cart: {0}")]
    DiscountNotApplied(String),

    /// The queue worker is gone.
    #[error("Cart queue is closed")]
    QueueClosed,
}

impl CartError {
    /// Whether the error was caused by the request itself rather than by the
    /// platform or the queue.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity { .. }
                | Self::InvalidDiscountCode
                | Self::LineItemNotFound(_)
                | Self::DiscountNotApplied(_)
        )
    }

    /// Whether the platform no longer accepts the shopper's session, which
    /// makes the cached cart unreachable.
    #[must_use]
    pub const fn is_session_lost(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_unauthorized())
    }
}
