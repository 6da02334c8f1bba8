//! Commerce platform REST client for the shopper-scoped cart endpoints.
//!
//! # Architecture
//!
//! - The platform is the source of truth for carts - NO local persistence
//! - [`CartRemote`] is the contract the cart core consumes; [`CommerceClient`]
//!   implements it over HTTP with `reqwest`
//! - Bearer tokens come from a [`TokenProvider`]; anonymous shoppers use
//!   [`AnonymousSession`]
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | Get active cart | `GET /{project}/me/active-cart` |
//! | Create cart | `POST /{project}/me/carts` |
//! | Update cart | `POST /{project}/me/carts/{id}` |
//!
//! Updates carry the cart `version` the client last saw; the platform answers
//! `409 Conflict` when another write got there first.

mod auth;
mod client;

use std::future::Future;

use boba_core::{Cart, CartDraft, CartId, CartUpdate};
use thiserror::Error;

pub use auth::{AccessToken, AnonymousSession, StaticToken, TokenProvider};
pub use client::CommerceClient;

/// Errors that can occur when talking to the commerce platform.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The cart version sent with an update is stale (HTTP 409).
    #[error("Version conflict: {message}")]
    VersionConflict {
        /// Error message from the platform.
        message: String,
        /// The version the platform currently holds, when reported.
        current_version: Option<u64>,
    },

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Token rejected (HTTP 401/403) even after renewal, or the session could
    /// not be renewed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the platform.
        message: String,
    },

    /// Access token could not be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl CommerceError {
    /// Whether the platform reported a missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the platform rejected a stale cart version.
    #[must_use]
    pub const fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Whether the shopper's platform session is no longer accepted.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// The cart endpoints of the commerce platform, scoped to one shopper.
///
/// Futures are `Send` so implementations can be driven from a spawned task.
pub trait CartRemote: Send + Sync + 'static {
    /// Fetch the shopper's most recently modified active cart.
    ///
    /// Fails with [`CommerceError::NotFound`] when the shopper has none.
    fn active_cart(&self) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Create a cart.
    fn create_cart(
        &self,
        draft: &CartDraft,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Apply update actions to a cart.
    ///
    /// Fails with [`CommerceError::VersionConflict`] when `update.version` is
    /// not the cart's current version.
    fn update_cart(
        &self,
        id: &CartId,
        update: &CartUpdate,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;
}
