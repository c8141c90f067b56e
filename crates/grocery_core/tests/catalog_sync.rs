mod common;

use common::{product, StubApi};
use grocery_core::db::LocalCache;
use grocery_core::service::catalog_service::{parse_seed_catalog, CatalogService, BUNDLED_CATALOG};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

fn service(api: StubApi) -> (CatalogService, Arc<StubApi>) {
    let cache = Arc::new(LocalCache::open_in_memory().unwrap());
    let api = Arc::new(api);
    (CatalogService::new(cache, api.clone()), api)
}

#[test]
fn seeding_twice_inserts_once() {
    let (catalog, _) = service(StubApi::default());
    let expected = parse_seed_catalog(BUNDLED_CATALOG).unwrap().len();

    assert_eq!(catalog.initialize_database_if_needed().unwrap(), expected);
    assert_eq!(catalog.initialize_database_if_needed().unwrap(), 0);
    assert_eq!(catalog.list_all().unwrap().len(), expected);
}

#[test]
fn seeding_is_skipped_when_cache_already_has_products() {
    let (catalog, _) = service(StubApi::default());
    catalog
        .insert_all(&[product(99, "ESP-099", "Especial", "Otros", 100)])
        .unwrap();

    assert_eq!(catalog.initialize_database_if_needed().unwrap(), 0);
    assert_eq!(catalog.list_all().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_stale_cache_intact() {
    let (catalog, _) = service(StubApi::default());
    catalog.initialize_database_if_needed().unwrap();
    let before = catalog.list_all().unwrap();

    assert!(!catalog.refresh_products_from_network().await);
    assert_eq!(catalog.list_all().unwrap(), before);
}

#[tokio::test]
async fn refresh_overwrites_matching_rows_by_id() {
    let (catalog, api) = service(StubApi::default());
    catalog.initialize_database_if_needed().unwrap();
    let seeded = catalog.list_all().unwrap().len();

    let mut bread = catalog.get_by_code("PAN-001").unwrap().unwrap();
    bread.price = Decimal::from(2700);
    bread.stock = 3;
    *api.products.lock().unwrap() = Some(vec![
        bread.clone(),
        product(500, "NEW-500", "Queso de cabra", "Lácteos", 4990),
    ]);

    assert!(catalog.refresh_products_from_network().await);
    let refreshed = catalog.get_by_id(bread.id).unwrap().unwrap();
    assert_eq!(refreshed.price, Decimal::from(2700));
    assert_eq!(refreshed.stock, 3);
    assert_eq!(catalog.list_all().unwrap().len(), seeded + 1);
}

#[tokio::test]
async fn refresh_replaces_seeded_code_served_under_new_id() {
    let (catalog, api) = service(StubApi::default());
    catalog.initialize_database_if_needed().unwrap();
    let seeded = catalog.list_all().unwrap().len();
    assert_eq!(catalog.get_by_code("PAN-001").unwrap().unwrap().id, 6);

    *api.products.lock().unwrap() = Some(vec![product(
        106,
        "PAN-001",
        "Marraqueta (kg)",
        "Panadería",
        2700,
    )]);

    assert!(catalog.refresh_products_from_network().await);
    let bread = catalog.get_by_code("PAN-001").unwrap().unwrap();
    assert_eq!(bread.id, 106);
    assert_eq!(bread.price, Decimal::from(2700));
    assert_eq!(catalog.get_by_id(6).unwrap(), None);
    assert_eq!(catalog.list_all().unwrap().len(), seeded);

    // The next refresh is not blocked by the earlier collision.
    assert!(catalog.refresh_products_from_network().await);
}

#[tokio::test]
async fn refresh_with_invalid_row_stores_nothing() {
    let (catalog, api) = service(StubApi::default());
    let mut broken = product(2, "BAD-002", "Roto", "Otros", 100);
    broken.price = Decimal::from(-1);
    *api.products.lock().unwrap() = Some(vec![product(1, "OK-001", "Bueno", "Otros", 100), broken]);

    assert!(!catalog.refresh_products_from_network().await);
    assert!(catalog.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn live_catalog_follows_writes() {
    let (catalog, _) = service(StubApi::default());
    let mut live = catalog.get_all();
    assert!(live.borrow_and_update().is_empty());

    catalog.initialize_database_if_needed().unwrap();
    tokio::time::timeout(Duration::from_secs(2), live.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(!live.borrow_and_update().is_empty());

    catalog.delete_all().unwrap();
    tokio::time::timeout(Duration::from_secs(2), live.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(live.borrow_and_update().is_empty());
}

#[test]
fn admin_stock_update_is_visible() {
    let (catalog, _) = service(StubApi::default());
    catalog.initialize_database_if_needed().unwrap();
    let categories = catalog.list_categories().unwrap();
    assert!(categories.windows(2).all(|pair| pair[0] < pair[1]));

    let pasta = catalog.get_by_code("ALM-003").unwrap().unwrap();
    catalog.update_stock(pasta.id, 0).unwrap();
    assert!(!catalog.get_by_id(pasta.id).unwrap().unwrap().in_stock());
}
