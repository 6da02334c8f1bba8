//! Integration tests for the Boba Shop storefront.
//!
//! Each test starts the storefront router on a random local port, backed by a
//! `wiremock` server that plays the commerce platform (both the API and the
//! auth endpoints). Requests go through a cookie-keeping `reqwest` client so
//! every test behaves like one browser visitor.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boba-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use boba_core::{CountryCode, CurrencyCode, Market, MarketTaxRate};
use boba_storefront::config::{CartConfig, CommerceConfig, StorefrontConfig};
use boba_storefront::routes;
use boba_storefront::state::AppState;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Project key used by every test.
pub const PROJECT: &str = "boba-shop";

/// Running storefront plus its mock commerce platform.
pub struct TestContext {
    /// Cookie-keeping client, i.e. one visitor.
    pub client: Client,
    /// Storefront base URL, e.g. `http://127.0.0.1:4711`.
    pub storefront_url: String,
    /// Mock commerce platform.
    pub commerce: MockServer,
}

impl TestContext {
    /// Start with default cart settings.
    pub async fn start() -> Self {
        Self::with_cart_config(CartConfig::default()).await
    }

    /// Start with custom cart settings.
    pub async fn with_cart_config(cart: CartConfig) -> Self {
        let commerce = MockServer::start().await;
        let config = test_config(&commerce.uri(), cart);

        let state = AppState::new(config).unwrap();
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: new_visitor(),
            storefront_url: format!("http://{addr}"),
            commerce,
        }
    }

    /// Absolute storefront URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// Path of a platform endpoint under the project, e.g. `/me/carts`.
    #[must_use]
    pub fn api_path(endpoint: &str) -> String {
        format!("/{PROJECT}{endpoint}")
    }

    /// Serve anonymous session tokens.
    pub async fn mount_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(Self::anonymous_token_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_json("anon-token")))
            .mount(&self.commerce)
            .await;
    }

    /// Path of the anonymous session token endpoint.
    #[must_use]
    pub fn anonymous_token_path() -> String {
        format!("/oauth/{PROJECT}/anonymous/token")
    }

    /// Path of the token endpoint serving the refresh-token grant.
    #[must_use]
    pub fn refresh_token_path() -> String {
        "/oauth/token".to_string()
    }

    /// GET a storefront path and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        decode(response).await
    }

    /// POST JSON to a storefront path and decode the JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap();
        decode(response).await
    }
}

/// A fresh visitor with its own cookie jar.
#[must_use]
pub fn new_visitor() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

async fn decode(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Anonymous session token response for `access_token`.
#[must_use]
pub fn token_json(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 172_800,
        "scope": format!("manage_my_orders:{PROJECT}"),
        "refresh_token": format!("{PROJECT}:refresh-{access_token}")
    })
}

/// Germany, 19% VAT included in price.
#[must_use]
pub fn market() -> Market {
    Market {
        country: CountryCode::parse("DE").unwrap(),
        currency: CurrencyCode::EUR,
        tax_rate: MarketTaxRate {
            name: "Standard".to_string(),
            amount: Decimal::new(19, 2),
            included_in_price: true,
        },
    }
}

fn test_config(commerce_url: &str, cart: CartConfig) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        commerce: CommerceConfig {
            project_key: PROJECT.to_string(),
            api_url: commerce_url.to_string(),
            auth_url: commerce_url.to_string(),
            client_id: "storefront-client".to_string(),
            client_secret: SecretString::from("kX9#mP2$vL7@nQ4!"),
            scopes: vec![format!("manage_my_orders:{PROJECT}")],
        },
        market: market(),
        cart,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Cart JSON as the platform returns it, configured for [`market`].
#[must_use]
pub fn cart_json(version: u64, line_items: &Value, discount_codes: &Value) -> Value {
    json!({
        "id": "cart-1",
        "version": version,
        "taxMode": "External",
        "country": "DE",
        "shippingAddress": {"country": "DE"},
        "lineItems": line_items,
        "discountCodes": discount_codes,
        "cartState": "Active",
        "totalPrice": {"currencyCode": "EUR", "centAmount": 0, "fractionDigits": 2}
    })
}

/// Line item JSON as the platform returns it.
#[must_use]
pub fn line_item_json(id: &str, product_id: &str, quantity: u32, cent_amount: i64) -> Value {
    json!({
        "id": id,
        "productId": product_id,
        "name": {"en": "Brown Sugar Milk Tea"},
        "variant": {"id": 1, "sku": "BSMT-L"},
        "quantity": quantity,
        "totalPrice": {"currencyCode": "EUR", "centAmount": cent_amount, "fractionDigits": 2}
    })
}

/// Short operation timeout for tests that exercise hung platform calls.
#[must_use]
pub fn fast_cart_config() -> CartConfig {
    CartConfig {
        operation_timeout: Duration::from_millis(500),
        ..CartConfig::default()
    }
}
