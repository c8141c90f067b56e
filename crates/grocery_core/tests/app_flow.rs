mod common;

use common::{StubApi, StubIdentity};
use grocery_core::db::LocalCache;
use grocery_core::remote::store::InMemoryDocumentStore;
use grocery_core::service::order_service::CheckoutRequest;
use grocery_core::service::{MirrorState, ServiceError};
use grocery_core::{ClientConfig, GroceryApp, OrderStatus};
use rust_decimal::Decimal;
use std::sync::Arc;

fn app(dir: &std::path::Path) -> GroceryApp {
    GroceryApp::from_parts(
        Arc::new(LocalCache::open_in_memory().unwrap()),
        Arc::new(StubApi::default()),
        Some(Arc::new(InMemoryDocumentStore::new())),
        dir.join("documents"),
    )
}

#[tokio::test]
async fn startup_seeds_then_survives_offline_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let first = app.start().await.unwrap();
    assert!(first.seeded > 0);
    assert!(!first.refreshed);

    let second = app.start().await.unwrap();
    assert_eq!(second.seeded, 0);
    assert_eq!(app.catalog().list_all().unwrap().len(), first.seeded);
}

#[tokio::test]
async fn checkout_places_order_and_empties_cart() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    app.start().await.unwrap();
    let auth = app.auth(Arc::new(StubIdentity::accepting("secreta")));

    let bread = app.catalog().get_by_code("PAN-001").unwrap().unwrap();
    let pasta = app.catalog().get_by_code("ALM-003").unwrap().unwrap();
    app.cart().add(&bread);
    app.cart().add(&bread);
    for _ in 0..4 {
        app.cart().add(&pasta);
    }
    let checkout = CheckoutRequest {
        delivery_address: "Av. Providencia 1234".to_string(),
        ..CheckoutRequest::default()
    };

    let signed_out = app.checkout(&auth, &checkout).await.unwrap_err();
    assert!(matches!(signed_out, ServiceError::InvalidInput(_)));
    assert!(!app.cart().snapshot().is_empty());

    auth.sign_in("ana@example.cl", "secreta").await;
    let placed = app.checkout(&auth, &checkout).await.unwrap();
    assert_eq!(placed.value.total, Decimal::from(7000));
    assert_eq!(placed.value.status, OrderStatus::Pending);
    assert_eq!(placed.mirror, MirrorState::Mirrored);
    assert!(app.cart().snapshot().is_empty());

    let mine = app.orders().observe_by_user("ana@example.cl");
    assert_eq!(mine.borrow().len(), 1);
}

#[tokio::test]
async fn catalog_state_starts_from_cached_products() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    app.start().await.unwrap();

    let state = app.catalog_state();
    let view = state.current();
    assert_eq!(view.products.len(), app.catalog().list_all().unwrap().len());
    assert!(view.categories.contains(&"Panadería".to_string()));
}

#[test]
fn open_creates_database_under_configured_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig::with_data_dir(dir.path().join("nested")).unwrap();

    let app = GroceryApp::open(&config, None).unwrap();
    assert!(config.database_path.exists());
    assert!(app.catalog().initialize_database_if_needed().unwrap() > 0);
}
