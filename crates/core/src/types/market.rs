//! The single market a storefront deployment sells into.
//!
//! Every cart of a deployment must be configured for the market: external
//! tax mode, the market's country, and a shipping address in that country.
//! Because the tax mode is external, each added line item carries the
//! market's tax rate explicitly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::action::{CartAction, CartDraft, ExternalTaxRateDraft};
use super::cart::{Address, Cart, TaxMode};
use super::country::CountryCode;
use super::money::CurrencyCode;

/// Tax rate applied to every line item in the market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTaxRate {
    /// Display name (e.g. "Standard").
    pub name: String,
    /// Rate as a fraction, `0.19` for 19%.
    pub amount: Decimal,
    /// Whether catalog prices already include the tax.
    pub included_in_price: bool,
}

/// Deployment market configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub country: CountryCode,
    pub currency: CurrencyCode,
    pub tax_rate: MarketTaxRate,
}

impl Market {
    /// Whether a cart already has the configuration this market requires.
    #[must_use]
    pub fn is_compliant(&self, cart: &Cart) -> bool {
        cart.tax_mode == TaxMode::External
            && cart.country == Some(self.country)
            && cart
                .shipping_address
                .as_ref()
                .is_some_and(|address| address.country == self.country)
    }

    /// Actions that bring a cart in line with the market.
    ///
    /// Always `changeTaxMode`, `setCountry`, `setShippingAddress`, in that
    /// order, regardless of which settings are actually off.
    #[must_use]
    pub fn corrective_actions(&self) -> Vec<CartAction> {
        vec![
            CartAction::ChangeTaxMode {
                tax_mode: TaxMode::External,
            },
            CartAction::SetCountry {
                country: self.country,
            },
            CartAction::SetShippingAddress {
                address: Address::for_country(self.country),
            },
        ]
    }

    /// Creation payload for a new cart in this market.
    #[must_use]
    pub const fn cart_draft(&self) -> CartDraft {
        CartDraft {
            currency: self.currency,
            country: self.country,
            tax_mode: TaxMode::External,
            shipping_address: Address::for_country(self.country),
        }
    }

    /// The tax rate every added line item must carry.
    #[must_use]
    pub fn external_tax_rate(&self) -> ExternalTaxRateDraft {
        ExternalTaxRateDraft {
            name: self.tax_rate.name.clone(),
            amount: self.tax_rate.amount,
            country: self.country,
            included_in_price: self.tax_rate.included_in_price,
        }
    }
}
