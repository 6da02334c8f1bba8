//! Cart changes and the update actions they translate to.

use boba_core::{Cart, CartAction, LineItemId, Market, ProductId, VariantId};

use super::CartError;

/// A change a shopper makes to their cart.
///
/// Actions are built against a specific cart snapshot, so a mutation that is
/// retried after a version conflict is rebuilt from the refetched cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add units of a product variant.
    AddLineItem {
        product_id: ProductId,
        variant_id: VariantId,
        quantity: u32,
    },
    /// Set a line's quantity. Zero removes the line.
    ChangeLineItemQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
    /// Remove a line.
    RemoveLineItem { line_item_id: LineItemId },
    /// Apply a discount code.
    AddDiscountCode { code: String },
    /// Remove an applied discount code, given its resource ID or its code.
    RemoveDiscountCode { code: String },
    /// Remove every line in one update.
    Clear,
}

impl CartMutation {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddLineItem { .. } => "add_line_item",
            Self::ChangeLineItemQuantity { .. } => "change_line_item_quantity",
            Self::RemoveLineItem { .. } => "remove_line_item",
            Self::AddDiscountCode { .. } => "add_discount_code",
            Self::RemoveDiscountCode { .. } => "remove_discount_code",
            Self::Clear => "clear",
        }
    }

    /// Checks that do not depend on the cart contents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] when adding zero units and
    /// [`CartError::InvalidDiscountCode`] for blank codes.
    pub fn validate(&self) -> Result<(), CartError> {
        match self {
            Self::AddLineItem { quantity: 0, .. } => Err(CartError::InvalidQuantity {
                quantity: 0,
                reason: "must add at least one unit",
            }),
            Self::AddDiscountCode { code } | Self::RemoveDiscountCode { code }
                if code.trim().is_empty() =>
            {
                Err(CartError::InvalidDiscountCode)
            }
            _ => Ok(()),
        }
    }

    /// Build the update actions for this change against `cart`.
    ///
    /// An empty result means the cart already reflects the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation is invalid or refers to a line or
    /// discount code the cart does not have.
    pub fn to_actions(&self, cart: &Cart, market: &Market) -> Result<Vec<CartAction>, CartError> {
        self.validate()?;

        let actions = match self {
            Self::AddLineItem {
                product_id,
                variant_id,
                quantity,
            } => vec![CartAction::AddLineItem {
                product_id: product_id.clone(),
                variant_id: *variant_id,
                quantity: *quantity,
                external_tax_rate: market.external_tax_rate(),
            }],
            Self::ChangeLineItemQuantity {
                line_item_id,
                quantity,
            } => {
                let line = cart
                    .find_line_item(line_item_id)
                    .ok_or_else(|| CartError::LineItemNotFound(line_item_id.clone()))?;
                if line.quantity == *quantity {
                    Vec::new()
                } else {
                    vec![CartAction::ChangeLineItemQuantity {
                        line_item_id: line.id.clone(),
                        quantity: *quantity,
                    }]
                }
            }
            Self::RemoveLineItem { line_item_id } => {
                let line = cart
                    .find_line_item(line_item_id)
                    .ok_or_else(|| CartError::LineItemNotFound(line_item_id.clone()))?;
                vec![CartAction::RemoveLineItem {
                    line_item_id: line.id.clone(),
                }]
            }
            Self::AddDiscountCode { code } => vec![CartAction::AddDiscountCode {
                code: code.trim().to_string(),
            }],
            Self::RemoveDiscountCode { code } => {
                let reference = cart
                    .find_discount_code(code)
                    .ok_or_else(|| CartError::DiscountNotApplied(code.trim().to_string()))?;
                vec![CartAction::RemoveDiscountCode {
                    discount_code: reference.clone(),
                }]
            }
            Self::Clear => cart
                .line_items
                .iter()
                .map(|line| CartAction::RemoveLineItem {
                    line_item_id: line.id.clone(),
                })
                .collect(),
        };

        Ok(actions)
    }
}
