//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//!
//! The [`VisitorCart`] extractor then maps the session to the visitor's cart.

pub mod request_id;
pub mod session;
pub mod visitor;

pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::create_session_layer;
pub use visitor::{VISITOR_KEY, VisitorCart, forget_visitor, visitor_id};
