//! Cart API handlers.
//!
//! Every mutating handler returns the cart as it is after the operation.
//! Failures leave the visitor's cart at its last known-good state.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use boba_core::{Cart, DiscountCodeInfo, LineItem, LineItemId, Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{VisitorCart, forget_visitor};
use crate::state::AppState;

/// Locale used for line item names.
const DISPLAY_LOCALE: &str = "en";

/// Cart as returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartView {
    pub id: String,
    pub version: u64,
    pub item_count: u64,
    /// Formatted total, e.g. `€12.50`.
    pub total: Option<String>,
    pub line_items: Vec<LineItemView>,
    pub discount_codes: Vec<DiscountView>,
}

/// Cart line as returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItemView {
    pub id: String,
    pub product_id: String,
    pub variant_id: u32,
    pub name: Option<String>,
    pub quantity: u32,
    pub total: Option<String>,
}

/// Applied discount code as returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountView {
    pub id: String,
    pub code: Option<String>,
    pub state: Option<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id.to_string(),
            version: cart.version,
            item_count: cart.total_quantity(),
            total: cart.total_price.as_ref().and_then(Money::display),
            line_items: cart.line_items.iter().map(LineItemView::from).collect(),
            discount_codes: cart.discount_codes.iter().map(DiscountView::from).collect(),
        }
    }
}

impl From<&LineItem> for LineItemView {
    fn from(line: &LineItem) -> Self {
        Self {
            id: line.id.to_string(),
            product_id: line.product_id.to_string(),
            variant_id: line.variant_id().as_u32(),
            name: line.display_name(DISPLAY_LOCALE).map(String::from),
            quantity: line.quantity,
            total: line.total_price.as_ref().and_then(Money::display),
        }
    }
}

impl From<&DiscountCodeInfo> for DiscountView {
    fn from(info: &DiscountCodeInfo) -> Self {
        Self {
            id: info.discount_code.id.to_string(),
            code: info.discount_code.code().map(String::from),
            state: info.state.clone(),
        }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    /// Defaults to the master variant.
    pub variant_id: Option<u32>,
    /// Defaults to one unit.
    pub quantity: Option<u32>,
}

/// Quantity change request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Discount code request body.
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub code: String,
}

/// Show the cart, resolving it on first visit.
#[instrument(skip_all, fields(visitor = %visitor))]
pub async fn show(VisitorCart { visitor, cart }: VisitorCart) -> Result<Json<CartView>> {
    let cart = cart.get_or_create_cart().await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Re-read the cart from the platform.
#[instrument(skip_all, fields(visitor = %visitor))]
pub async fn refresh(VisitorCart { visitor, cart }: VisitorCart) -> Result<Json<CartView>> {
    let cart = cart.refresh().await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Add units of a product variant.
#[instrument(skip_all, fields(visitor = %visitor, product_id = %form.product_id))]
pub async fn add_item(
    VisitorCart { visitor, cart }: VisitorCart,
    Json(form): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    if form.product_id.trim().is_empty() {
        return Err(AppError::BadRequest("product_id is required".to_string()));
    }

    let variant_id = form.variant_id.map_or(VariantId::MASTER, VariantId::new);
    let quantity = form.quantity.unwrap_or(1);

    add_breadcrumb(
        "cart",
        "Add to cart",
        Some(&[("product_id", form.product_id.as_str())]),
    );

    let cart = cart
        .add_to_cart(ProductId::new(form.product_id), variant_id, quantity)
        .await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Set a line's quantity; zero removes the line.
#[instrument(skip_all, fields(visitor = %visitor, line_item_id = %line_item_id))]
pub async fn update_item(
    VisitorCart { visitor, cart }: VisitorCart,
    Path(line_item_id): Path<String>,
    Json(form): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let cart = cart
        .change_quantity(LineItemId::new(line_item_id), form.quantity)
        .await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Remove a line.
#[instrument(skip_all, fields(visitor = %visitor, line_item_id = %line_item_id))]
pub async fn remove_item(
    VisitorCart { visitor, cart }: VisitorCart,
    Path(line_item_id): Path<String>,
) -> Result<Json<CartView>> {
    let cart = cart.remove_line_item(LineItemId::new(line_item_id)).await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Remove every line.
#[instrument(skip_all, fields(visitor = %visitor))]
pub async fn clear(VisitorCart { visitor, cart }: VisitorCart) -> Result<Json<CartView>> {
    add_breadcrumb("cart", "Clear cart", None);
    let cart = cart.clear().await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Apply a discount code.
#[instrument(skip_all, fields(visitor = %visitor))]
pub async fn apply_discount(
    VisitorCart { visitor, cart }: VisitorCart,
    Json(form): Json<DiscountRequest>,
) -> Result<Json<CartView>> {
    add_breadcrumb("cart", "Apply discount code", None);
    let cart = cart.apply_discount(form.code).await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Remove an applied discount code, by code or resource ID.
#[instrument(skip_all, fields(visitor = %visitor))]
pub async fn remove_discount(
    VisitorCart { visitor, cart }: VisitorCart,
    Path(code): Path<String>,
) -> Result<Json<CartView>> {
    let cart = cart.remove_discount(code).await?;
    Ok(Json(CartView::from(cart.as_ref())))
}

/// Forget the visitor's cart session, e.g. on logout.
///
/// The remote cart is left as is.
#[instrument(skip_all)]
pub async fn forget(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    if let Some(visitor) = forget_visitor(&session, &state).await? {
        tracing::info!(visitor = %visitor, "Cart session forgotten");
    }
    Ok(StatusCode::NO_CONTENT)
}
