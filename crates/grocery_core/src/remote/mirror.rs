//! Typed mirrors of cache entities in the remote document store.
//!
//! # Responsibility
//! - Map orders to the `pedidos` collection (key = order id) and users to the
//!   `users` collection (key = normalized email).
//! - Offer get-once reads and live listener feeds of typed records.
//!
//! # Invariants
//! - Every failure is logged here and returned with its cause.
//! - Listener feeds skip undecodable documents instead of closing.
//! - A typed listener task ends when its receivers are dropped or the
//!   underlying store feed closes.

use crate::model::order::{Order, OrderId, OrderStatus};
use crate::model::user::{normalize_email, User};
use crate::remote::store::{DocumentStore, StoreResult, StoredDocument};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::watch;

pub const ORDERS_COLLECTION: &str = "pedidos";
pub const USERS_COLLECTION: &str = "users";

/// Mirror of orders in the `pedidos` collection.
#[derive(Clone)]
pub struct OrderMirror {
    store: Arc<dyn DocumentStore>,
}

impl OrderMirror {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let document = logged(
            "get",
            ORDERS_COLLECTION,
            self.store.get(ORDERS_COLLECTION, &id.to_string()).await,
        )?;
        document
            .map(|data| serde_json::from_value(data).map_err(Into::into))
            .transpose()
    }

    pub async fn get_by_user(&self, email: &str) -> StoreResult<Vec<Order>> {
        let key = Value::String(normalize_email(email));
        let documents = logged(
            "query",
            ORDERS_COLLECTION,
            self.store
                .query_eq(ORDERS_COLLECTION, "user_email", &key)
                .await,
        )?;
        Ok(decode_all(ORDERS_COLLECTION, documents))
    }

    pub async fn get_all(&self) -> StoreResult<Vec<Order>> {
        let documents = logged(
            "list",
            ORDERS_COLLECTION,
            self.store.list(ORDERS_COLLECTION).await,
        )?;
        Ok(decode_all(ORDERS_COLLECTION, documents))
    }

    pub async fn save(&self, order: &Order) -> StoreResult<()> {
        let data = serde_json::to_value(order)?;
        logged(
            "set",
            ORDERS_COLLECTION,
            self.store
                .set(ORDERS_COLLECTION, &order.id.to_string(), data)
                .await,
        )
    }

    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<()> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), serde_json::to_value(status)?);
        logged(
            "update",
            ORDERS_COLLECTION,
            self.store
                .update_fields(ORDERS_COLLECTION, &id.to_string(), fields)
                .await,
        )
    }

    pub async fn delete(&self, id: OrderId) -> StoreResult<()> {
        logged(
            "delete",
            ORDERS_COLLECTION,
            self.store.delete(ORDERS_COLLECTION, &id.to_string()).await,
        )
    }

    /// Live feed of every mirrored order, newest first.
    pub fn listen_all(&self) -> watch::Receiver<Vec<Order>> {
        typed_listener(self.store.listen(ORDERS_COLLECTION), |documents| {
            sorted_newest_first(decode_all(ORDERS_COLLECTION, documents))
        })
    }

    /// Live feed of one user's mirrored orders, newest first.
    pub fn listen_by_user(&self, email: &str) -> watch::Receiver<Vec<Order>> {
        let email = normalize_email(email);
        typed_listener(self.store.listen(ORDERS_COLLECTION), move |documents| {
            let orders = decode_all::<Order>(ORDERS_COLLECTION, documents)
                .into_iter()
                .filter(|order| order.user_email == email)
                .collect();
            sorted_newest_first(orders)
        })
    }
}

/// Mirror of profiles in the `users` collection.
#[derive(Clone)]
pub struct UserMirror {
    store: Arc<dyn DocumentStore>,
}

impl UserMirror {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, email: &str) -> StoreResult<Option<User>> {
        let document = logged(
            "get",
            USERS_COLLECTION,
            self.store
                .get(USERS_COLLECTION, &normalize_email(email))
                .await,
        )?;
        document
            .map(|data| serde_json::from_value(data).map_err(Into::into))
            .transpose()
    }

    /// Writes the profile; the password never leaves the device.
    pub async fn save(&self, user: &User) -> StoreResult<()> {
        let data = serde_json::to_value(user)?;
        logged(
            "set",
            USERS_COLLECTION,
            self.store
                .set(USERS_COLLECTION, &normalize_email(&user.email), data)
                .await,
        )
    }

    /// Live feed of one profile; `None` while the document is absent.
    pub fn listen(&self, email: &str) -> watch::Receiver<Option<User>> {
        let key = normalize_email(email);
        typed_listener(self.store.listen(USERS_COLLECTION), move |documents| {
            documents
                .into_iter()
                .find(|document| document.key == key)
                .and_then(|document| decode_one(USERS_COLLECTION, document))
        })
    }
}

fn logged<T>(operation: &str, collection: &str, result: StoreResult<T>) -> StoreResult<T> {
    if let Err(err) = &result {
        warn!(
            "event=store_call module=remote status=error op={operation} collection={collection} error={err}"
        );
    }
    result
}

fn decode_one<T: DeserializeOwned>(collection: &str, document: StoredDocument) -> Option<T> {
    match serde_json::from_value(document.data) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "event=store_decode module=remote status=error collection={} key={} error={}",
                collection, document.key, err
            );
            None
        }
    }
}

fn decode_all<T: DeserializeOwned>(collection: &str, documents: Vec<StoredDocument>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| decode_one(collection, document))
        .collect()
}

fn sorted_newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

fn typed_listener<T, F>(
    mut source: watch::Receiver<Vec<StoredDocument>>,
    map: F,
) -> watch::Receiver<T>
where
    T: Send + Sync + 'static,
    F: Fn(Vec<StoredDocument>) -> T + Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(map(source.borrow_and_update().clone()));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = tx.closed() => break,
                changed = source.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let documents = source.borrow_and_update().clone();
                    tx.send_replace(map(documents));
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::{OrderMirror, UserMirror};
    use crate::model::order::{Order, OrderStatus};
    use crate::model::user::User;
    use crate::remote::store::{DocumentStore, InMemoryDocumentStore};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::Arc;

    fn order(id: i64, email: &str, created_at: i64) -> Order {
        Order {
            id,
            user_email: email.to_string(),
            delivery_date: None,
            delivery_address: "Calle 1".to_string(),
            region: None,
            comuna: None,
            comments: None,
            total: Decimal::from(1000),
            status: OrderStatus::Pending,
            created_at,
        }
    }

    #[tokio::test]
    async fn orders_roundtrip_through_pedidos_collection() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mirror = OrderMirror::new(store.clone());

        mirror.save(&order(1, "ana@example.cl", 10)).await.unwrap();
        mirror.save(&order(2, "luis@example.cl", 20)).await.unwrap();
        mirror
            .update_status(1, OrderStatus::Delivered)
            .await
            .unwrap();

        let raw = store.get("pedidos", "1").await.unwrap().unwrap();
        assert_eq!(raw["status"], "DELIVERED");

        let ana = mirror.get_by_user("ANA@example.cl").await.unwrap();
        assert_eq!(ana.len(), 1);
        assert_eq!(ana[0].status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn user_listener_follows_profile_and_skips_bad_documents() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mirror = UserMirror::new(store.clone());
        let mut feed = mirror.listen("ana@example.cl");
        assert!(feed.borrow_and_update().is_none());

        store
            .set("users", "ana@example.cl", json!({ "unexpected": true }))
            .await
            .unwrap();
        feed.changed().await.unwrap();
        assert!(feed.borrow_and_update().is_none());

        mirror
            .save(&User::new("ana@example.cl", "Ana", "Pérez"))
            .await
            .unwrap();
        feed.changed().await.unwrap();
        let user = feed.borrow_and_update().clone().unwrap();
        assert_eq!(user.name, "Ana");
    }

    #[tokio::test]
    async fn listen_by_user_filters_and_sorts_newest_first() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mirror = OrderMirror::new(store);
        mirror.save(&order(1, "ana@example.cl", 10)).await.unwrap();
        mirror.save(&order(2, "ana@example.cl", 30)).await.unwrap();
        mirror.save(&order(3, "luis@example.cl", 20)).await.unwrap();

        let feed = mirror.listen_by_user("ana@example.cl");
        let ids: Vec<i64> = feed.borrow().iter().map(|order| order.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
