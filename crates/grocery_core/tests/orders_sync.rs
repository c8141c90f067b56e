mod common;

use common::{product, StubApi};
use grocery_core::db::LocalCache;
use grocery_core::model::cart::CartSnapshot;
use grocery_core::model::order::{NewOrder, OrderStatus};
use grocery_core::remote::mirror::OrderMirror;
use grocery_core::remote::store::{DocumentStore, InMemoryDocumentStore};
use grocery_core::service::order_service::{CheckoutRequest, OrderService};
use grocery_core::repo::RepoError;
use grocery_core::service::{MirrorState, ServiceError};
use rust_decimal::Decimal;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    orders: OrderService,
    api: Arc<StubApi>,
    store: Arc<InMemoryDocumentStore>,
}

fn fixture() -> Fixture {
    let cache = Arc::new(LocalCache::open_in_memory().unwrap());
    let api = Arc::new(StubApi::default());
    let store = Arc::new(InMemoryDocumentStore::new());
    let orders = OrderService::new(cache, api.clone(), Some(OrderMirror::new(store.clone())));
    Fixture { orders, api, store }
}

fn new_order(email: &str, total: i64) -> NewOrder {
    NewOrder {
        user_email: email.to_string(),
        delivery_address: "Av. Providencia 1234".to_string(),
        total: Decimal::from(total),
        ..NewOrder::default()
    }
}

fn cart() -> CartSnapshot {
    let bread = product(6, "PAN-001", "Marraqueta", "Panadería", 2500);
    let pasta = product(9, "ALM-003", "Fideos", "Almacén", 500);
    let mut cart = CartSnapshot::default().with_added(&bread).with_added(&bread);
    for _ in 0..4 {
        cart = cart.with_added(&pasta);
    }
    cart
}

#[tokio::test]
async fn insert_writes_locally_and_mirrors_to_pedidos() {
    let fx = fixture();
    let outcome = fx.orders.insert(&new_order("ana@example.cl", 7000)).await.unwrap();

    assert_eq!(outcome.mirror, MirrorState::Mirrored);
    assert_eq!(outcome.value.status, OrderStatus::Pending);
    let key = outcome.value.id.to_string();
    let raw = fx.store.get("pedidos", &key).await.unwrap().unwrap();
    assert_eq!(raw["status"], "PENDING");
    assert_eq!(fx.orders.get(outcome.value.id).unwrap(), Some(outcome.value));
}

#[tokio::test]
async fn status_updates_are_last_write_wins() {
    let fx = fixture();
    let order = fx.orders.insert(&new_order("ana@example.cl", 100)).await.unwrap().value;

    for status in [
        OrderStatus::Delivered,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
        OrderStatus::Shipped,
    ] {
        let outcome = fx.orders.update_status(order.id, status).await.unwrap();
        assert_eq!(outcome.mirror, MirrorState::Mirrored);
        assert_eq!(fx.orders.get(order.id).unwrap().unwrap().status, status);
    }
}

#[tokio::test]
async fn mirror_failure_keeps_local_write() {
    let fx = fixture();
    fx.store.set_offline(true);

    let outcome = fx.orders.insert(&new_order("ana@example.cl", 100)).await.unwrap();
    assert!(matches!(outcome.mirror, MirrorState::Failed(_)));
    let id = outcome.value.id;
    assert!(fx.orders.get(id).unwrap().is_some());

    let outcome = fx.orders.update_status(id, OrderStatus::Confirmed).await.unwrap();
    assert!(matches!(outcome.mirror, MirrorState::Failed(_)));
    assert_eq!(
        fx.orders.get(id).unwrap().unwrap().status,
        OrderStatus::Confirmed
    );
}

#[tokio::test]
async fn observe_by_user_only_sees_own_orders() {
    let fx = fixture();
    let mut mine = fx.orders.observe_by_user("ANA@example.cl");
    let all = fx.orders.observe_all();

    fx.orders.insert(&new_order("ana@example.cl", 100)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), mine.changed())
        .await
        .unwrap()
        .unwrap();
    fx.orders.insert(&new_order("luis@example.cl", 200)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mine_now = mine.borrow_and_update().clone();
    assert_eq!(mine_now.len(), 1);
    assert_eq!(mine_now[0].user_email, "ana@example.cl");
    assert_eq!(all.borrow().len(), 2);
}

#[tokio::test]
async fn place_order_posts_codes_and_stores_pending_order() {
    let fx = fixture();
    *fx.api.created_order_id.lock().unwrap() = Some(1001);
    let checkout = CheckoutRequest {
        delivery_address: "Av. Providencia 1234".to_string(),
        comuna: Some("Providencia".to_string()),
        ..CheckoutRequest::default()
    };

    let outcome = fx
        .orders
        .place_order("ana@example.cl", &cart(), &checkout, Some("token-1"))
        .await
        .unwrap();

    assert_eq!(outcome.value.id, 1001);
    assert_eq!(outcome.value.total, Decimal::from(7000));
    assert_eq!(outcome.value.status, OrderStatus::Pending);
    assert_eq!(outcome.mirror, MirrorState::Mirrored);

    let sent = fx.api.orders.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let (request, token) = &sent[0];
    assert_eq!(token.as_deref(), Some("token-1"));
    let codes: Vec<_> = request.items.iter().map(|line| line.product_code.as_str()).collect();
    assert_eq!(codes, vec!["PAN-001", "ALM-003"]);
}

#[tokio::test]
async fn server_id_colliding_with_cached_order_keeps_the_cached_order() {
    let fx = fixture();
    let luis = fx.orders.insert(&new_order("luis@example.cl", 200)).await.unwrap().value;
    *fx.api.created_order_id.lock().unwrap() = Some(luis.id);
    let checkout = CheckoutRequest {
        delivery_address: "Av. Providencia 1234".to_string(),
        ..CheckoutRequest::default()
    };

    let err = fx
        .orders
        .place_order("ana@example.cl", &cart(), &checkout, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Conflict { entity: "order", .. })
    ));
    assert!(!err.user_message().is_empty());

    assert_eq!(fx.orders.get(luis.id).unwrap(), Some(luis.clone()));
    assert_eq!(fx.orders.list_by_user("luis@example.cl").unwrap().len(), 1);
    assert!(fx.orders.list_by_user("ana@example.cl").unwrap().is_empty());
    let mirrored = fx.store.get("pedidos", &luis.id.to_string()).await.unwrap().unwrap();
    assert_eq!(mirrored["user_email"], "luis@example.cl");
}

#[tokio::test]
async fn rejected_order_stores_nothing() {
    let fx = fixture();
    fx.api.reject_orders.store(true, Ordering::SeqCst);
    let checkout = CheckoutRequest {
        delivery_address: "Av. Providencia 1234".to_string(),
        ..CheckoutRequest::default()
    };

    let err = fx
        .orders
        .place_order("ana@example.cl", &cart(), &checkout, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Api(_)));
    assert!(fx.orders.observe_all().borrow().is_empty());
}

#[tokio::test]
async fn empty_cart_or_blank_address_is_rejected_before_any_call() {
    let fx = fixture();
    let checkout = CheckoutRequest {
        delivery_address: "  ".to_string(),
        ..CheckoutRequest::default()
    };

    let empty = fx
        .orders
        .place_order("ana@example.cl", &CartSnapshot::default(), &checkout, None)
        .await;
    assert!(matches!(empty, Err(ServiceError::InvalidInput(_))));
    let blank = fx
        .orders
        .place_order("ana@example.cl", &cart(), &checkout, None)
        .await;
    assert!(matches!(blank, Err(ServiceError::InvalidInput(_))));
    assert!(fx.api.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pull_from_mirror_fills_cache() {
    let fx = fixture();
    let remote = OrderMirror::new(fx.store.clone());
    let mut order = fx.orders.insert(&new_order("ana@example.cl", 100)).await.unwrap().value;
    fx.orders.delete(order.id).await.unwrap();
    assert!(fx.orders.get(order.id).unwrap().is_none());

    order.status = OrderStatus::Shipped;
    remote.save(&order).await.unwrap();

    assert_eq!(fx.orders.pull_from_mirror(Some("ana@example.cl")).await.unwrap(), 1);
    assert_eq!(
        fx.orders.get(order.id).unwrap().unwrap().status,
        OrderStatus::Shipped
    );
}
