//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness check
//! GET    /health/ready                   - Readiness check (commerce API reachable)
//!
//! # Cart (JSON)
//! GET    /api/cart                       - Current cart (resolved on first visit)
//! POST   /api/cart/refresh               - Re-read the cart from the platform
//! DELETE /api/cart/session               - Forget the visitor's cart session
//! POST   /api/cart/items                 - Add item
//! DELETE /api/cart/items                 - Remove all items
//! PATCH  /api/cart/items/{line_item_id}  - Change quantity (0 removes)
//! DELETE /api/cart/items/{line_item_id}  - Remove item
//! POST   /api/cart/discounts             - Apply discount code
//! DELETE /api/cart/discounts/{code}      - Remove discount code (code or ID)
//! ```

pub mod cart;
pub mod health;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/refresh", post(cart::refresh))
        .route("/session", delete(cart::forget))
        .route("/items", post(cart::add_item).delete(cart::clear))
        .route(
            "/items/{line_item_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/discounts", post(cart::apply_discount))
        .route("/discounts/{code}", delete(cart::remove_discount))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/cart", cart_routes())
}

/// Build the application with its middleware stack, minus the Sentry layers
/// added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes()
        .layer(session_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                // request_id is filled in by the request ID middleware
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
