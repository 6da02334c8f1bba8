//! Scripted [`CartRemote`] for cart tests.
//!
//! Each endpoint pops the next scripted reply; every call is recorded so tests
//! can assert on the exact request sequence.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use boba_core::{
    Address, Cart, CartDraft, CartId, CartState, CartUpdate, CountryCode, CurrencyCode,
    DiscountCodeId, DiscountCodeInfo, DiscountCodeObject, DiscountCodeReference, LineItem,
    LineItemId, LineItemVariant, Market, MarketTaxRate, ProductId, TaxMode, VariantId,
};
use rust_decimal::Decimal;

use crate::commerce::{CartRemote, CommerceError};

/// What an endpoint does when called.
pub enum Reply {
    Cart(Cart),
    Fail(CommerceError),
    /// Never completes.
    Hang,
}

impl Reply {
    async fn resolve(self) -> Result<Cart, CommerceError> {
        match self {
            Self::Cart(cart) => Ok(cart),
            Self::Fail(err) => Err(err),
            Self::Hang => std::future::pending().await,
        }
    }
}

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ActiveCart,
    CreateCart(CartDraft),
    UpdateCart(CartId, CartUpdate),
}

#[derive(Default)]
struct Script {
    active: VecDeque<Reply>,
    create: VecDeque<Reply>,
    update: VecDeque<Reply>,
    calls: Vec<Call>,
}

/// Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct ScriptedRemote {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_active_cart(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().active.push_back(reply);
        self
    }

    pub fn on_create_cart(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().create.push_back(reply);
        self
    }

    pub fn on_update_cart(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().update.push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn active_cart_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::ActiveCart))
    }

    pub fn create_cart_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::CreateCart(_)))
    }

    /// Updates sent so far, in order.
    pub fn updates(&self) -> Vec<CartUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UpdateCart(_, update) => Some(update),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn next(&self, call: Call, queue: impl FnOnce(&mut Script) -> &mut VecDeque<Reply>) -> Reply {
        let mut script = self.script.lock().unwrap();
        let reply = queue(&mut script).pop_front();
        let reply = reply.unwrap_or_else(|| {
            Reply::Fail(CommerceError::Api {
                status: 500,
                message: format!("unscripted call: {call:?}"),
            })
        });
        script.calls.push(call);
        reply
    }
}

impl CartRemote for ScriptedRemote {
    async fn active_cart(&self) -> Result<Cart, CommerceError> {
        self.next(Call::ActiveCart, |s| &mut s.active)
            .resolve()
            .await
    }

    async fn create_cart(&self, draft: &CartDraft) -> Result<Cart, CommerceError> {
        self.next(Call::CreateCart(draft.clone()), |s| &mut s.create)
            .resolve()
            .await
    }

    async fn update_cart(&self, id: &CartId, update: &CartUpdate) -> Result<Cart, CommerceError> {
        self.next(Call::UpdateCart(id.clone(), update.clone()), |s| {
            &mut s.update
        })
        .resolve()
        .await
    }
}

pub fn de() -> CountryCode {
    CountryCode::parse("DE").unwrap()
}

/// Germany, external 19% VAT included in price.
pub fn germany() -> Market {
    Market {
        country: de(),
        currency: CurrencyCode::EUR,
        tax_rate: MarketTaxRate {
            name: "Standard".to_string(),
            amount: Decimal::new(19, 2),
            included_in_price: true,
        },
    }
}

fn cart(id: &str, version: u64) -> Cart {
    Cart {
        id: CartId::new(id),
        version,
        tax_mode: TaxMode::Platform,
        country: None,
        shipping_address: None,
        line_items: Vec::new(),
        discount_codes: Vec::new(),
        cart_state: CartState::Active,
        total_price: None,
        created_at: None,
        last_modified_at: None,
    }
}

/// An empty cart configured for [`germany`].
pub fn compliant_cart(version: u64) -> Cart {
    Cart {
        tax_mode: TaxMode::External,
        country: Some(de()),
        shipping_address: Some(Address::for_country(de())),
        ..cart("cart-1", version)
    }
}

/// An empty cart with the platform's default tax mode and no country.
pub fn misconfigured_cart(version: u64) -> Cart {
    cart("cart-1", version)
}

/// A freshly created cart with its own ID.
pub fn new_cart(id: &str) -> Cart {
    Cart {
        id: CartId::new(id),
        ..compliant_cart(1)
    }
}

pub fn line_item(id: &str, product_id: &str, quantity: u32) -> LineItem {
    LineItem {
        id: LineItemId::new(id),
        product_id: ProductId::new(product_id),
        name: BTreeMap::from([("en".to_string(), format!("Tea {product_id}"))]),
        variant: LineItemVariant {
            id: VariantId::MASTER,
            sku: None,
        },
        quantity,
        total_price: None,
    }
}

pub fn with_line(mut cart: Cart, line: LineItem) -> Cart {
    cart.line_items.push(line);
    cart
}

pub fn with_discount(mut cart: Cart, id: &str, code: &str) -> Cart {
    cart.discount_codes.push(DiscountCodeInfo {
        discount_code: DiscountCodeReference {
            obj: Some(DiscountCodeObject {
                code: code.to_string(),
            }),
            ..DiscountCodeReference::new(DiscountCodeId::new(id))
        },
        state: Some("MatchesCart".to_string()),
    });
    cart
}

pub fn conflict() -> CommerceError {
    CommerceError::VersionConflict {
        message: "different version than expected".to_string(),
        current_version: None,
    }
}
