//! Visitor identity and cart extraction.
//!
//! A visitor is identified by a random key stored in their session. The key
//! selects the visitor's cart session in the [`crate::registry::CartRegistry`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::registry::ShopperCart;
use crate::state::AppState;

/// Session key for the visitor's cart key.
pub const VISITOR_KEY: &str = "cart_visitor";

/// Extractor for the current visitor's cart.
///
/// Assigns a visitor key on first use.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(VisitorCart { cart, .. }: VisitorCart) -> Result<Json<CartView>> {
///     let cart = cart.get_or_create_cart().await?;
///     Ok(Json(CartView::from(cart.as_ref())))
/// }
/// ```
pub struct VisitorCart {
    pub visitor: Uuid,
    pub cart: ShopperCart,
}

impl FromRequestParts<AppState> for VisitorCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))?;

        let visitor = visitor_id(&session).await?;
        let cart = state.carts().open(visitor).await;

        Ok(Self { visitor, cart })
    }
}

/// The visitor key from the session, assigning one if absent.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn visitor_id(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(visitor) = session.get::<Uuid>(VISITOR_KEY).await? {
        return Ok(visitor);
    }

    let visitor = Uuid::new_v4();
    session.insert(VISITOR_KEY, visitor).await?;
    Ok(visitor)
}

/// Drop the visitor key and the cart session it points to.
///
/// Returns the forgotten key, if there was one.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn forget_visitor(
    session: &Session,
    state: &AppState,
) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    let visitor = session.remove::<Uuid>(VISITOR_KEY).await?;
    if let Some(visitor) = visitor {
        state.carts().forget(visitor).await;
    }
    Ok(visitor)
}
