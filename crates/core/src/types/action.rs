//! Request payloads for creating and updating carts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::{Address, DiscountCodeReference, TaxMode};
use super::country::CountryCode;
use super::id::{LineItemId, ProductId, VariantId};
use super::money::CurrencyCode;

/// Tax rate supplied by the client for carts in [`TaxMode::External`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTaxRateDraft {
    /// Display name of the rate (e.g. "Standard").
    pub name: String,
    /// Rate as a fraction, `0.19` for 19%.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Country the rate applies to.
    pub country: CountryCode,
    /// Whether prices already include the tax.
    pub included_in_price: bool,
}

/// A single atomic change to a cart.
///
/// Serialized with an `action` discriminator, e.g.
/// `{"action":"removeLineItem","lineItemId":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum CartAction {
    ChangeTaxMode {
        tax_mode: TaxMode,
    },
    SetCountry {
        country: CountryCode,
    },
    SetShippingAddress {
        address: Address,
    },
    AddLineItem {
        product_id: ProductId,
        variant_id: VariantId,
        quantity: u32,
        external_tax_rate: ExternalTaxRateDraft,
    },
    ChangeLineItemQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
    RemoveLineItem {
        line_item_id: LineItemId,
    },
    AddDiscountCode {
        code: String,
    },
    RemoveDiscountCode {
        discount_code: DiscountCodeReference,
    },
}

impl CartAction {
    /// The wire name of the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChangeTaxMode { .. } => "changeTaxMode",
            Self::SetCountry { .. } => "setCountry",
            Self::SetShippingAddress { .. } => "setShippingAddress",
            Self::AddLineItem { .. } => "addLineItem",
            Self::ChangeLineItemQuantity { .. } => "changeLineItemQuantity",
            Self::RemoveLineItem { .. } => "removeLineItem",
            Self::AddDiscountCode { .. } => "addDiscountCode",
            Self::RemoveDiscountCode { .. } => "removeDiscountCode",
        }
    }
}

/// Body of a cart update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUpdate {
    /// The cart version the client last observed.
    pub version: u64,
    /// Actions applied atomically, in order.
    pub actions: Vec<CartAction>,
}

/// Body of a cart creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDraft {
    pub currency: CurrencyCode,
    pub country: CountryCode,
    pub tax_mode: TaxMode,
    pub shipping_address: Address,
}
