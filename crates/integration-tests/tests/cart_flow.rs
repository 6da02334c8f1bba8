//! End-to-end cart flows against a mock commerce platform.
//!
//! Run with: cargo test -p boba-integration-tests

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use boba_integration_tests::{
    TestContext, cart_json, fast_cart_config, line_item_json, new_visitor, token_json,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn no_lines() -> Value {
    json!([])
}

async fn mount_active_cart(ctx: &TestContext, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&ctx.commerce)
        .await;
}

fn not_found() -> Value {
    json!({
        "statusCode": 404,
        "message": "No active cart exists.",
        "errors": [{"code": "ResourceNotFound", "message": "No active cart exists."}]
    })
}

fn conflict() -> Value {
    json!({
        "statusCode": 409,
        "message": "Object cart-1 has a different version than expected.",
        "errors": [{"code": "ConcurrentModification", "currentVersion": 3}]
    })
}

// ============================================================================
// First visit: create, add item
// ============================================================================

#[tokio::test]
async fn test_first_visit_creates_cart_then_adds_item() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .and(header("authorization", "Bearer anon-token"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found()))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts")))
        .and(body_partial_json(json!({
            "currency": "EUR",
            "country": "DE",
            "taxMode": "External",
            "shippingAddress": {"country": "DE"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(cart_json(1, &no_lines(), &json!([]))))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(body_partial_json(json!({
            "version": 1,
            "actions": [{
                "action": "addLineItem",
                "productId": "prod1",
                "variantId": 1,
                "quantity": 2,
                "externalTaxRate": {
                    "name": "Standard",
                    "amount": 0.19,
                    "country": "DE",
                    "includedInPrice": true
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(
            2,
            &json!([line_item_json("li-1", "prod1", 2, 990)]),
            &json!([]),
        )))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    let (status, cart) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
    assert_eq!(cart["id"], "cart-1");
    assert_eq!(cart["version"], 1);
    assert_eq!(cart["item_count"], 0);

    let (status, cart) = ctx
        .post_json(
            "/api/cart/items",
            &json!({"product_id": "prod1", "variant_id": 1, "quantity": 2}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(cart["version"], 2);
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["line_items"][0]["name"], "Brown Sugar Milk Tea");
    assert_eq!(cart["line_items"][0]["total"], "€9.90");

    // Served from the cache, no further platform reads
    let (_, cart) = ctx.get_json("/api/cart").await;
    assert_eq!(cart["version"], 2);
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_empty_misconfigured_cart_is_patched() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;

    mount_active_cart(
        &ctx,
        200,
        json!({"id": "cart-1", "version": 4, "taxMode": "Platform", "lineItems": []}),
    )
    .await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(body_partial_json(json!({
            "version": 4,
            "actions": [
                {"action": "changeTaxMode", "taxMode": "External"},
                {"action": "setCountry", "country": "DE"},
                {"action": "setShippingAddress", "address": {"country": "DE"}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(5, &no_lines(), &json!([]))))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.commerce)
        .await;

    let (status, cart) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
    assert_eq!(cart["version"], 5);
}

// ============================================================================
// Version conflicts
// ============================================================================

#[tokio::test]
async fn test_conflict_is_retried_once_with_fresh_version() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;

    // First read sees version 2, the refetch after the conflict sees 3
    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(2, &no_lines(), &json!([]))))
        .up_to_n_times(1)
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(3, &no_lines(), &json!([]))))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(body_partial_json(json!({"version": 2})))
        .respond_with(ResponseTemplate::new(409).set_body_json(conflict()))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(body_partial_json(json!({
            "version": 3,
            "actions": [{"action": "addDiscountCode", "code": "BOBA10"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(
            4,
            &no_lines(),
            &json!([{
                "discountCode": {"typeId": "discount-code", "id": "dc-1", "obj": {"code": "BOBA10"}},
                "state": "MatchesCart"
            }]),
        )))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    let (status, cart) = ctx
        .post_json("/api/cart/discounts", &json!({"code": " BOBA10 "}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(cart["version"], 4);
    assert_eq!(cart["discount_codes"][0]["code"], "BOBA10");
}

#[tokio::test]
async fn test_second_conflict_is_reported() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;
    mount_active_cart(&ctx, 200, cart_json(2, &no_lines(), &json!([]))).await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .respond_with(ResponseTemplate::new(409).set_body_json(conflict()))
        .expect(2)
        .mount(&ctx.commerce)
        .await;

    let (status, body) = ctx.post_json("/api/cart/items", &json!({"product_id": "prod1"})).await;

    assert_eq!(status, 409);
    assert!(body["error"].as_str().unwrap().contains("try again"));
}

// ============================================================================
// Discount removal
// ============================================================================

#[tokio::test]
async fn test_discount_is_removed_by_reference() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;
    mount_active_cart(
        &ctx,
        200,
        cart_json(
            6,
            &no_lines(),
            &json!([{
                "discountCode": {"typeId": "discount-code", "id": "dc-1", "obj": {"code": "BOBA10"}},
                "state": "MatchesCart"
            }]),
        ),
    )
    .await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(body_partial_json(json!({
            "version": 6,
            "actions": [{
                "action": "removeDiscountCode",
                "discountCode": {"typeId": "discount-code", "id": "dc-1"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(7, &no_lines(), &json!([]))))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    let response = ctx
        .client
        .delete(ctx.url("/api/cart/discounts/boba10"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Unknown codes never reach the platform
    let response = ctx
        .client
        .delete(ctx.url("/api/cart/discounts/NOPE"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_platform_failure_keeps_last_known_cart() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;
    mount_active_cart(&ctx, 200, cart_json(2, &no_lines(), &json!([]))).await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    let (status, body) = ctx.post_json("/api/cart/items", &json!({"product_id": "prod1"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"], "Failed to update cart");

    let (status, cart) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
    assert_eq!(cart["version"], 2);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let ctx = TestContext::start().await;

    let (status, _) = ctx
        .post_json("/api/cart/items", &json!({"product_id": "prod1", "quantity": 0}))
        .await;
    assert_eq!(status, 400);

    let (status, _) = ctx.post_json("/api/cart/discounts", &json!({"code": "  "})).await;
    assert_eq!(status, 400);

    assert!(ctx.commerce.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hung_platform_call_times_out() {
    let ctx = TestContext::with_cart_config(fast_cart_config()).await;
    ctx.mount_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(1, &no_lines(), &json!([])))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&ctx.commerce)
        .await;

    let (status, body) = ctx.get_json("/api/cart").await;

    assert_eq!(status, 504);
    assert_eq!(body["error"], "Failed to update cart");
}

// ============================================================================
// Platform session tokens
// ============================================================================

#[tokio::test]
async fn test_rejected_token_is_renewed_without_losing_the_cart() {
    let ctx = TestContext::start().await;

    Mock::given(method("POST"))
        .and(path(TestContext::anonymous_token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("anon-1")))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::refresh_token_path()))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "anon-1-renewed",
            "expires_in": 172_800
        })))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    mount_active_cart(&ctx, 200, cart_json(1, &no_lines(), &json!([]))).await;

    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(header("authorization", "Bearer anon-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "statusCode": 401,
            "message": "invalid_token"
        })))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .and(header("authorization", "Bearer anon-1-renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(
            2,
            &json!([line_item_json("li-1", "prod1", 1, 495)]),
            &json!([]),
        )))
        .expect(2)
        .mount(&ctx.commerce)
        .await;

    let (status, _) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);

    let (status, cart) = ctx.post_json("/api/cart/items", &json!({"product_id": "prod1"})).await;
    assert_eq!(status, 200);
    assert_eq!(cart["id"], "cart-1");
    assert_eq!(cart["version"], 2);

    // Later writes keep using the renewed token
    let response = ctx.client.delete(ctx.url("/api/cart/items/li-1")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_lost_platform_session_starts_a_clean_cart() {
    let ctx = TestContext::start().await;

    Mock::given(method("POST"))
        .and(path(TestContext::anonymous_token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("anon-1")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::anonymous_token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("anon-2")))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::refresh_token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "statusCode": 400,
            "message": "The refresh token was not found. It may have expired.",
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    // The first session owns cart-1
    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .and(header("authorization", "Bearer anon-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(
            2,
            &json!([line_item_json("li-1", "prod1", 1, 495)]),
            &json!([]),
        )))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-1")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "statusCode": 401,
            "message": "invalid_token"
        })))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    // The second session has no cart yet
    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .and(header("authorization", "Bearer anon-2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found()))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    let mut fresh = cart_json(1, &no_lines(), &json!([]));
    fresh["id"] = json!("cart-2");
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts")))
        .and(header("authorization", "Bearer anon-2"))
        .respond_with(ResponseTemplate::new(201).set_body_json(fresh))
        .expect(1)
        .mount(&ctx.commerce)
        .await;
    let mut added = cart_json(2, &json!([line_item_json("li-9", "prod2", 1, 495)]), &json!([]));
    added["id"] = json!("cart-2");
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("/me/carts/cart-2")))
        .and(header("authorization", "Bearer anon-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(added))
        .expect(1)
        .mount(&ctx.commerce)
        .await;

    let (status, cart) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
    assert_eq!(cart["id"], "cart-1");

    let (status, body) = ctx.post_json("/api/cart/items", &json!({"product_id": "prod1"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"], "Failed to update cart");

    // cart-1 is unreachable now; the visitor continues with a new cart
    let (status, cart) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
    assert_eq!(cart["id"], "cart-2");
    assert_eq!(cart["item_count"], 0);

    let (status, cart) = ctx.post_json("/api/cart/items", &json!({"product_id": "prod2"})).await;
    assert_eq!(status, 200);
    assert_eq!(cart["id"], "cart-2");
    assert_eq!(cart["version"], 2);
}

// ============================================================================
// Visitor sessions
// ============================================================================

#[tokio::test]
async fn test_each_visitor_gets_its_own_platform_session() {
    let ctx = TestContext::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/boba-shop/anonymous/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "anon-token",
            "expires_in": 172_800
        })))
        .expect(2)
        .mount(&ctx.commerce)
        .await;
    mount_active_cart(&ctx, 200, cart_json(1, &no_lines(), &json!([]))).await;

    let (status, _) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
    // Same visitor, same session
    let (status, _) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);

    let other = new_visitor();
    let response = other.get(ctx.url("/api/cart")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_forgotten_session_resolves_again() {
    let ctx = TestContext::start().await;
    ctx.mount_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path(TestContext::api_path("/me/active-cart")))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(1, &no_lines(), &json!([]))))
        .expect(2)
        .mount(&ctx.commerce)
        .await;

    ctx.get_json("/api/cart").await;

    let response = ctx
        .client
        .delete(ctx.url("/api/cart/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let (status, _) = ctx.get_json("/api/cart").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::start().await;

    let response = ctx.client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    // The mock platform answers (404 for an unmatched path), so we are ready
    let response = ctx.client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}
