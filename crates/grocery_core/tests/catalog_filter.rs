mod common;

use common::product;
use grocery_core::model::product::Product;
use grocery_core::state::catalog::{filter_products, CatalogState, CatalogView};
use std::time::Duration;
use tokio::sync::watch;

fn catalog() -> Vec<Product> {
    vec![
        product(1, "FRU-001", "Manzana Fuji", "Frutas", 1290),
        product(2, "FRU-002", "Manzana Verde", "Frutas", 1190),
        product(3, "JUG-001", "Jugo de manzana", "Bebidas", 1590),
        product(4, "PAN-001", "Marraqueta", "Panadería", 2500),
    ]
}

fn ids(products: &[Product]) -> Vec<i64> {
    products.iter().map(|product| product.id).collect()
}

#[test]
fn category_and_text_filters_intersect() {
    let products = catalog();
    assert_eq!(ids(&filter_products(&products, "manzana", None)), vec![1, 2, 3]);
    assert_eq!(ids(&filter_products(&products, "", Some("Frutas"))), vec![1, 2]);
    assert_eq!(
        ids(&filter_products(&products, "MANZANA", Some("Bebidas"))),
        vec![3]
    );
    assert!(filter_products(&products, "marraqueta", Some("Frutas")).is_empty());
}

#[test]
fn view_lists_categories_of_unfiltered_catalog() {
    let view = CatalogView::build(&catalog(), "pan", Some("Panadería"));
    assert_eq!(view.categories, vec!["Bebidas", "Frutas", "Panadería"]);
    assert_eq!(ids(&view.products), vec![4]);
}

#[tokio::test]
async fn state_recomputes_on_every_upstream_change() {
    let (products_tx, products_rx) = watch::channel(Vec::new());
    let state = CatalogState::new(products_rx);
    let mut view = state.subscribe();
    assert!(view.borrow_and_update().products.is_empty());

    products_tx.send_replace(catalog());
    wait(&mut view).await;
    assert_eq!(view.borrow_and_update().products.len(), 4);

    state.set_category(Some("Frutas"));
    wait(&mut view).await;
    assert_eq!(ids(&view.borrow_and_update().products), vec![1, 2]);

    state.set_query("verde");
    wait(&mut view).await;
    let current = view.borrow_and_update().clone();
    assert_eq!(ids(&current.products), vec![2]);
    assert_eq!(current.query, "verde");
    assert_eq!(state.current(), current);
}

async fn wait(view: &mut watch::Receiver<CatalogView>) {
    tokio::time::timeout(Duration::from_secs(2), view.changed())
        .await
        .unwrap()
        .unwrap();
}
