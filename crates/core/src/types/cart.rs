//! Cart resource as returned by the commerce platform.
//!
//! Field names follow the platform's camelCase JSON. Only the fields the
//! storefront reads are modeled; everything else in the payload is ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::country::CountryCode;
use super::id::{CartId, DiscountCodeId, LineItemId, ProductId, VariantId};
use super::money::Money;

/// How the platform determines taxes for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaxMode {
    /// Tax rates come from the platform's tax categories.
    #[default]
    Platform,
    /// Tax rates are supplied by the client on every line item.
    External,
    /// Tax amounts are supplied by the client.
    ExternalAmount,
    /// No taxes.
    Disabled,
    /// A mode this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Lifecycle state of a cart on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CartState {
    #[default]
    Active,
    Merged,
    Ordered,
    Frozen,
    #[serde(other)]
    Unknown,
}

/// Postal address. Only the country is required by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// ISO 3166-1 alpha-2 country.
    pub country: CountryCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Address {
    /// An address carrying only a country.
    #[must_use]
    pub const fn for_country(country: CountryCode) -> Self {
        Self {
            country,
            first_name: None,
            last_name: None,
            street_name: None,
            postal_code: None,
            city: None,
        }
    }
}

/// Variant information embedded in a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemVariant {
    /// Variant number within the product.
    pub id: VariantId,
    /// Stock keeping unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// A product variant placed in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Line item ID, stable for the lifetime of the line.
    pub id: LineItemId,
    /// Product the variant belongs to.
    pub product_id: ProductId,
    /// Localized product name (locale -> name).
    #[serde(default)]
    pub name: BTreeMap<String, String>,
    /// The selected variant.
    pub variant: LineItemVariant,
    /// Number of units.
    pub quantity: u32,
    /// Total for this line, taxes and discounts applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
}

impl LineItem {
    /// The selected variant number.
    #[must_use]
    pub const fn variant_id(&self) -> VariantId {
        self.variant.id
    }

    /// Name in the given locale, falling back to any available locale.
    #[must_use]
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.name
            .get(locale)
            .or_else(|| self.name.values().next())
            .map(String::as_str)
    }
}

/// The expanded discount code resource, present only when the request asked
/// for `discountCodes[*].discountCode` expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCodeObject {
    /// The code the shopper typed.
    pub code: String,
}

/// Reference to a discount code resource.
///
/// This is what a `removeDiscountCode` action must carry; the platform does
/// not accept the raw code string for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodeReference {
    /// Resource type, always `discount-code`.
    pub type_id: String,
    /// Discount code resource ID.
    pub id: DiscountCodeId,
    /// Expanded resource, never sent back to the platform.
    #[serde(default, skip_serializing)]
    pub obj: Option<DiscountCodeObject>,
}

impl DiscountCodeReference {
    /// Resource type identifier used by the platform for discount codes.
    pub const TYPE_ID: &'static str = "discount-code";

    /// A bare reference to the given discount code.
    #[must_use]
    pub fn new(id: DiscountCodeId) -> Self {
        Self {
            type_id: Self::TYPE_ID.to_owned(),
            id,
            obj: None,
        }
    }

    /// The code string, when the reference was expanded.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.obj.as_ref().map(|obj| obj.code.as_str())
    }
}

/// A discount code applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodeInfo {
    /// Reference to the discount code resource.
    pub discount_code: DiscountCodeReference,
    /// Whether the code currently matches the cart (e.g. `MatchesCart`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A shopping cart.
///
/// `version` increases on every successful update and must be echoed back on
/// the next update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart ID, assigned by the platform.
    pub id: CartId,
    /// Optimistic concurrency version.
    pub version: u64,
    /// Tax calculation mode.
    #[serde(default)]
    pub tax_mode: TaxMode,
    /// Country used for price selection and taxes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<CountryCode>,
    /// Shipping address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    /// Lines in the order they were added.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Applied discount codes.
    #[serde(default)]
    pub discount_codes: Vec<DiscountCodeInfo>,
    /// Lifecycle state.
    #[serde(default)]
    pub cart_state: CartState,
    /// Cart total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.line_items
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Find a line by ID.
    #[must_use]
    pub fn find_line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|line| &line.id == id)
    }

    /// Find an applied discount code by resource ID or by code string.
    ///
    /// Code matching is case-insensitive and only possible when the cart was
    /// fetched with discount code expansion.
    #[must_use]
    pub fn find_discount_code(&self, id_or_code: &str) -> Option<&DiscountCodeReference> {
        let needle = id_or_code.trim();
        self.discount_codes
            .iter()
            .map(|info| &info.discount_code)
            .find(|reference| {
                reference.id.as_str() == needle
                    || reference
                        .code()
                        .is_some_and(|code| code.eq_ignore_ascii_case(needle))
            })
    }
}
