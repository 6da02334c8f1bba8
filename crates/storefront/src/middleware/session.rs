//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. Sessions only carry the
//! visitor key. Losing them on restart costs an anonymous visitor their cart:
//! the next request starts a new anonymous platform session with an empty
//! cart.

use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "boba_session";

/// Create the session layer with an in-memory store.
///
/// Cookies expire after the same idle period as cart sessions.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");
    let idle = i64::try_from(config.cart.session_idle.as_secs()).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(idle)))
        .with_secure(is_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
