//! Catalog caching, error decoding and delivery tracking over real HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]

use std::collections::HashMap;
use std::time::Duration;

use agritrade_core::{DeliveryAgentId, ProductId, UserId, UserRole};
use agritrade_integration_tests::{MockMarketplace, MockProduct, MockSettings, ScriptedWidget};
use agritrade_retailer::api::{ApiError, MarketplaceApi, MarketplaceClient};
use agritrade_retailer::cart::CartStore;
use agritrade_retailer::checkout::CheckoutOrchestrator;
use agritrade_retailer::config::{ApiConfig, CheckoutSettings};
use agritrade_retailer::session::{CurrentUser, MemoryStore};
use agritrade_retailer::tracking::LocationTracker;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_catalog_reads_backend_quantity_as_stock() {
    let mut rice = MockProduct::new(1, "Basmati Rice", 40.0, 10);
    rice.farmer = None;
    let market = MockMarketplace::start(MockSettings::with_products(vec![
        rice,
        MockProduct::new(2, "Tomatoes", 24.5, 0),
    ]))
    .await;

    let products = market.client().list_products().await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, ProductId::new(1));
    assert_eq!(products[0].stock, 10);
    assert_eq!(products[0].price, Decimal::new(40, 0));
    assert_eq!(products[0].farmer_label(), "N/A");
    assert_eq!(products[1].stock, 0);
    assert_eq!(products[1].farmer_label(), "Meena Devi");
}

#[tokio::test]
async fn test_catalog_is_cached_until_checkout_places_orders() {
    let market = MockMarketplace::start(MockSettings::with_products(vec![MockProduct::new(
        1,
        "Basmati Rice",
        40.0,
        10,
    )]))
    .await;
    let client = market.client();

    let first = client.list_products().await.unwrap();
    client.list_products().await.unwrap();
    assert_eq!(market.catalog_fetches(), 1);

    let mut cart = CartStore::restore(MemoryStore::new());
    cart.add(&first[0], 4).unwrap();
    let retailer = CurrentUser {
        id: UserId::new(7),
        name: "Asha Traders".to_string(),
        email: None,
        role: Some(UserRole::Retailer),
    };
    CheckoutOrchestrator::new(client.clone(), CheckoutSettings::default())
        .checkout(&mut cart, &retailer, &mut ScriptedWidget::paying())
        .await
        .unwrap();

    let refreshed = client.list_products().await.unwrap();
    assert_eq!(market.catalog_fetches(), 2);
    assert_eq!(refreshed[0].stock, 6);
}

#[tokio::test]
async fn test_client_without_token_sends_no_authorization() {
    let market = MockMarketplace::start(MockSettings::default()).await;
    let client = MarketplaceClient::new(&ApiConfig::new(market.base_url())).unwrap();

    client.payment_key().await.unwrap();

    assert_eq!(market.auth_headers(), vec![None]);
}

#[tokio::test]
async fn test_error_message_extracted_from_bodies() {
    let market = MockMarketplace::start(MockSettings {
        key_fails: true,
        ..MockSettings::default()
    })
    .await;
    let client = market.client();

    match client.payment_key().await.unwrap_err() {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Razorpay keys not configured");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = client
        .agent_location(DeliveryAgentId::new(99))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Delivery agent not found");
}

#[tokio::test]
async fn test_unreachable_backend_reports_network_error() {
    let market = MockMarketplace::start(MockSettings::default()).await;
    let base_url = market.base_url();
    drop(market);

    let mut config = ApiConfig::new(base_url);
    config.request_timeout = Duration::from_secs(2);
    let client = MarketplaceClient::new(&config).unwrap();

    let err = client.list_products().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}

#[tokio::test]
async fn test_tracker_publishes_agent_position() {
    let market = MockMarketplace::start(MockSettings {
        locations: HashMap::from([(4, (12.9716, 77.5946))]),
        ..MockSettings::default()
    })
    .await;

    let mut handle =
        LocationTracker::spawn(market.client(), DeliveryAgentId::new(4), Duration::from_millis(100));
    let position = tokio::time::timeout(Duration::from_secs(5), handle.changed())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(position.point.lat, 12.9716);
    assert_eq!(position.point.lng, 77.5946);
    assert_eq!(handle.latest(), Some(position));
    assert!(handle.is_running());
    handle.stop();
}

#[tokio::test]
async fn test_tracker_ignores_unknown_agent() {
    let market = MockMarketplace::start(MockSettings::default()).await;

    let handle =
        LocationTracker::spawn(market.client(), DeliveryAgentId::new(8), Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert_eq!(handle.latest(), None);
    assert!(handle.is_running());
}
