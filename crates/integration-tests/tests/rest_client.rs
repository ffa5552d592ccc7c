//! Integration tests for the REST client against the fake remote service.
//!
//! These tests verify wire parsing, error mapping and the read-through cache
//! over real HTTP.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use shopfront_core::{CartLine, ProductId, Quantity};
use shopfront_integration_tests::{FakeRemote, Route};
use shopfront_storefront::remote::{ApiError, RestClient};

async fn setup() -> (FakeRemote, RestClient) {
    let remote = FakeRemote::start().await.unwrap();
    let config = remote.config();
    let client = RestClient::new(&config.api, config.currency).unwrap();
    (remote, client)
}

fn line(id: &str, quantity: u32) -> CartLine {
    CartLine::new(ProductId::from(id), Quantity::new(quantity).unwrap())
}

// =============================================================================
// Wire Parsing
// =============================================================================

#[tokio::test]
async fn test_products_bare_array() {
    let (remote, client) = setup().await;
    remote.add_product("p1", "Mug", json!(10));
    remote.add_product("p2", "Tee", json!("19.99"));

    let catalog = client.get_products().await.unwrap();

    assert_eq!(catalog.len(), 2);
    let tee = catalog.get(&ProductId::from("p2")).unwrap();
    assert_eq!(tee.price.display(), "$19.99");
    assert_eq!(tee.image.as_deref(), Some("p2.jpg"));
}

#[tokio::test]
async fn test_products_envelope() {
    let (remote, client) = setup().await;
    remote.use_envelope(true);
    remote.add_product("p1", "Mug", json!(10));

    let catalog = client.get_products().await.unwrap();
    assert!(catalog.contains(&ProductId::from("p1")));
}

#[tokio::test]
async fn test_unpriceable_product_dropped() {
    let (remote, client) = setup().await;
    remote.add_product("p1", "Mug", json!(10));
    remote.add_product("p2", "Broken", json!("call us"));
    remote.add_product("p3", "Refund", json!(-5));

    let catalog = client.get_products().await.unwrap();
    assert_eq!(catalog.len(), 1);
}

#[tokio::test]
async fn test_cart_drops_zero_quantity_lines() {
    let (remote, client) = setup().await;
    remote.put_cart_line("p1", 2);
    remote.put_cart_line("p2", 0);

    let lines = client.get_cart().await.unwrap();
    assert_eq!(lines, vec![line("p1", 2)]);
}

// =============================================================================
// Error Mapping
// =============================================================================

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let (remote, client) = setup().await;
    remote.set_failing(Route::Products, true);

    let err = client.get_products().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let (remote, client) = setup().await;
    remote.rate_limit(Route::Cart, 7);

    let err = client.get_cart().await.unwrap_err();
    assert!(matches!(err, ApiError::RateLimited(7)));
}

#[tokio::test]
async fn test_remove_missing_line_is_not_found() {
    let (_remote, client) = setup().await;

    let err = client
        .remove_from_cart(&ProductId::from("ghost"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Cache Behavior
// =============================================================================

#[tokio::test]
async fn test_catalog_served_from_cache() {
    let (remote, client) = setup().await;
    remote.add_product("p1", "Mug", json!(10));

    client.get_products().await.unwrap();
    client.get_products().await.unwrap();
    assert_eq!(remote.hits(Route::Products), 1);

    client.invalidate_products().await;
    client.get_products().await.unwrap();
    assert_eq!(remote.hits(Route::Products), 2);
}

#[tokio::test]
async fn test_mutation_invalidates_cached_cart() {
    let (remote, client) = setup().await;
    remote.put_cart_line("p1", 1);

    assert_eq!(client.get_cart().await.unwrap().len(), 1);
    client.add_to_cart(&[line("p2", 3)]).await.unwrap();

    let lines = client.get_cart().await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(remote.hits(Route::Cart), 2);
    assert_eq!(remote.cart_quantity("p2"), Some(3));
}

#[tokio::test]
async fn test_failed_mutation_still_invalidates_cart() {
    let (remote, client) = setup().await;
    client.get_cart().await.unwrap();
    remote.set_failing(Route::Quantity, true);

    assert!(client.update_quantity(&line("p1", 2)).await.is_err());
    client.get_cart().await.unwrap();
    assert_eq!(remote.hits(Route::Cart), 2);
}

#[tokio::test]
async fn test_fetch_overlapping_mutation_is_not_cached() {
    let (remote, client) = setup().await;
    remote.put_cart_line("p1", 1);
    remote.set_delay(Route::Cart, Some(Duration::from_millis(300)));

    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.get_cart().await })
    };
    // Wait until the remote has answered the fetch with the old cart.
    while remote.hits(Route::Cart) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    client.add_to_cart(&[line("p2", 3)]).await.unwrap();
    assert_eq!(slow.await.unwrap().unwrap(), vec![line("p1", 1)]);

    remote.set_delay(Route::Cart, None);
    let lines = client.get_cart().await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(remote.hits(Route::Cart), 2);
}

#[tokio::test]
async fn test_product_id_is_percent_encoded() {
    let (remote, client) = setup().await;
    remote.put_cart_line("a b", 1);

    client.remove_from_cart(&ProductId::from("a b")).await.unwrap();
    assert_eq!(remote.cart_len(), 0);
}
