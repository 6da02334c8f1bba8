//! Core types for the Boba Shop storefront.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod action;
pub mod cart;
pub mod country;
pub mod id;
pub mod market;
pub mod money;

pub use action::{CartAction, CartDraft, CartUpdate, ExternalTaxRateDraft};
pub use cart::{
    Address, Cart, CartState, DiscountCodeInfo, DiscountCodeObject, DiscountCodeReference,
    LineItem, LineItemVariant, TaxMode,
};
pub use country::{CountryCode, CountryCodeError};
pub use id::*;
pub use market::{Market, MarketTaxRate};
pub use money::{CurrencyCode, Money};
