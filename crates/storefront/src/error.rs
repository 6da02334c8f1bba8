//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`.
//!
//! The browser UI shows `error` as a notification; the cart itself stays at
//! its last known-good state.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::cart::CartError;
use crate::commerce::CommerceError;

/// Generic message for failures the shopper cannot fix.
const CART_UPDATE_FAILED: &str = "Failed to update cart";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => cart_status(err),
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the shopper.
    fn public_message(&self) -> String {
        match self {
            Self::Cart(err) if err.is_client_error() => err.to_string(),
            Self::Cart(CartError::Remote(CommerceError::VersionConflict { .. })) => {
                "The cart was changed elsewhere, please try again".to_string()
            }
            Self::Cart(CartError::Remote(CommerceError::RateLimited(_))) => {
                "Too many requests, please try again shortly".to_string()
            }
            Self::Cart(_) => CART_UPDATE_FAILED.to_string(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::BadRequest(message) => message.clone(),
        }
    }
}

fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::InvalidQuantity { .. } | CartError::InvalidDiscountCode => {
            StatusCode::BAD_REQUEST
        }
        CartError::LineItemNotFound(_) | CartError::DiscountNotApplied(_) => StatusCode::NOT_FOUND,
        CartError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CartError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        CartError::Remote(remote) => match remote {
            CommerceError::VersionConflict { .. } => StatusCode::CONFLICT,
            CommerceError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            // The platform rejected the actions themselves, e.g. an unknown
            // discount code or an unsellable variant
            CommerceError::Api { status: 400, .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "prod1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
