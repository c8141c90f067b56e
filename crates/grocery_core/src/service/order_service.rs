//! Order repository service and admin order management.
//!
//! # Responsibility
//! - Serve owner-filtered and admin order streams from the local cache.
//! - Write orders locally, then mirror them to the `pedidos` collection.
//! - Submit checkout orders to the REST API.
//!
//! # Invariants
//! - Status updates accept any status over any other (last write wins).
//! - The local write always happens first; mirror failures are reported in
//!   `DualWrite::mirror` and never undo the local write.
//! - The stored order total is the cart total computed by the client.
//! - Checkout never overwrites a cached order; only mirror pulls upsert.

use crate::db::{CacheTable, LocalCache};
use crate::model::cart::CartSnapshot;
use crate::model::now_epoch_ms;
use crate::model::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::model::user::normalize_email;
use crate::remote::api::{ApiClient, CreateOrderRequest, OrderLineRequest};
use crate::remote::mirror::OrderMirror;
use crate::remote::store::StoreResult;
use crate::repo::order_repo::{OrderRepository, SqliteOrderRepository};
use crate::repo::RepoResult;
use crate::service::{DualWrite, MirrorState, ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Delivery details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutRequest {
    pub delivery_address: String,
    pub delivery_date: Option<NaiveDate>,
    pub region: Option<String>,
    pub comuna: Option<String>,
    pub comments: Option<String>,
}

/// Order service over the shared cache, REST API and optional mirror.
#[derive(Clone)]
pub struct OrderService {
    cache: Arc<LocalCache>,
    api: Arc<dyn ApiClient>,
    mirror: Option<OrderMirror>,
}

impl OrderService {
    pub fn new(cache: Arc<LocalCache>, api: Arc<dyn ApiClient>, mirror: Option<OrderMirror>) -> Self {
        Self { cache, api, mirror }
    }

    /// Live view of one user's orders, newest first.
    pub fn observe_by_user(&self, email: &str) -> watch::Receiver<Vec<Order>> {
        let email = normalize_email(email);
        self.cache.live_query(CacheTable::Orders, move |conn| {
            SqliteOrderRepository::new(conn).list_by_user(&email)
        })
    }

    /// Live view of every cached order (admin).
    pub fn observe_all(&self) -> watch::Receiver<Vec<Order>> {
        self.cache.live_query(CacheTable::Orders, |conn| {
            SqliteOrderRepository::new(conn).list_all()
        })
    }

    pub fn get(&self, id: OrderId) -> RepoResult<Option<Order>> {
        self.cache
            .read(|conn| SqliteOrderRepository::new(conn).get(id))
    }

    /// Snapshot of one user's cached orders (non-live).
    pub fn list_by_user(&self, email: &str) -> RepoResult<Vec<Order>> {
        let email = normalize_email(email);
        self.cache
            .read(|conn| SqliteOrderRepository::new(conn).list_by_user(&email))
    }

    pub fn list_all(&self) -> RepoResult<Vec<Order>> {
        self.cache
            .read(|conn| SqliteOrderRepository::new(conn).list_all())
    }

    /// Inserts a `PENDING` order locally, then mirrors it.
    pub async fn insert(&self, order: &NewOrder) -> ServiceResult<DualWrite<Order>> {
        let created_at = now_epoch_ms();
        let stored = self.cache.write(CacheTable::Orders, |conn| {
            SqliteOrderRepository::new(conn).insert(order, created_at)
        })?;
        let mirror = self
            .mirror_with(|mirror| {
                let stored = stored.clone();
                async move { mirror.save(&stored).await }
            })
            .await;
        Ok(DualWrite {
            value: stored,
            mirror,
        })
    }

    /// Overwrites an order locally, then mirrors it.
    pub async fn update(&self, order: &Order) -> ServiceResult<DualWrite<()>> {
        self.cache.write(CacheTable::Orders, |conn| {
            SqliteOrderRepository::new(conn).update(order)
        })?;
        let mirror = self
            .mirror_with(|mirror| {
                let order = order.clone();
                async move { mirror.save(&order).await }
            })
            .await;
        Ok(DualWrite { value: (), mirror })
    }

    /// Sets the status regardless of the current value.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> ServiceResult<DualWrite<()>> {
        self.cache.write(CacheTable::Orders, |conn| {
            SqliteOrderRepository::new(conn).update_status(id, status)
        })?;
        info!(
            "event=order_status module=service status=ok order_id={} new_status={}",
            id, status
        );
        let mirror = self
            .mirror_with(|mirror| async move { mirror.update_status(id, status).await })
            .await;
        Ok(DualWrite { value: (), mirror })
    }

    pub async fn delete(&self, id: OrderId) -> ServiceResult<DualWrite<()>> {
        self.cache.write(CacheTable::Orders, |conn| {
            SqliteOrderRepository::new(conn).delete(id)
        })?;
        let mirror = self
            .mirror_with(|mirror| async move { mirror.delete(id).await })
            .await;
        Ok(DualWrite { value: (), mirror })
    }

    /// Submits the cart as an order and records it locally as `PENDING`.
    ///
    /// The REST call happens first; when it fails nothing is stored. A server
    /// id that collides with a cached order fails with `RepoError::Conflict`
    /// and leaves the cached order as it was. The cart itself is not touched.
    pub async fn place_order(
        &self,
        user_email: &str,
        cart: &CartSnapshot,
        checkout: &CheckoutRequest,
        bearer_token: Option<&str>,
    ) -> ServiceResult<DualWrite<Order>> {
        if cart.is_empty() {
            return Err(ServiceError::InvalidInput("El carrito está vacío.".to_string()));
        }
        if checkout.delivery_address.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "La dirección de entrega es obligatoria.".to_string(),
            ));
        }

        let request = build_create_order_request(cart, checkout);
        let created = match self.api.create_order(&request, bearer_token).await {
            Ok(created) => created,
            Err(err) => {
                warn!(
                    "event=order_place module=service status=error stage=api error={}",
                    err
                );
                return Err(err.into());
            }
        };

        let new_order = NewOrder {
            user_email: normalize_email(user_email),
            delivery_date: checkout.delivery_date,
            delivery_address: checkout.delivery_address.trim().to_string(),
            region: non_blank(checkout.region.as_deref()),
            comuna: non_blank(checkout.comuna.as_deref()),
            comments: non_blank(checkout.comments.as_deref()),
            total: cart.total,
        };

        let outcome = match created.id {
            Some(server_id) => self.insert_with_id(server_id, &new_order).await?,
            None => self.insert(&new_order).await?,
        };
        info!(
            "event=order_place module=service status=ok order_id={} lines={}",
            outcome.value.id,
            cart.items.len()
        );
        Ok(outcome)
    }

    /// Copies mirrored orders into the cache (last write wins).
    ///
    /// `Some(email)` pulls one user's orders, `None` pulls every order.
    pub async fn pull_from_mirror(&self, email: Option<&str>) -> ServiceResult<usize> {
        let Some(mirror) = &self.mirror else {
            return Ok(0);
        };
        let orders = match email {
            Some(email) => mirror.get_by_user(email).await?,
            None => mirror.get_all().await?,
        };
        self.cache.write(CacheTable::Orders, |conn| {
            let repo = SqliteOrderRepository::new(conn);
            orders.iter().try_for_each(|order| repo.upsert(order))
        })?;
        Ok(orders.len())
    }

    async fn insert_with_id(
        &self,
        id: OrderId,
        order: &NewOrder,
    ) -> ServiceResult<DualWrite<Order>> {
        let stored = Order {
            id,
            user_email: order.user_email.clone(),
            delivery_date: order.delivery_date,
            delivery_address: order.delivery_address.clone(),
            region: order.region.clone(),
            comuna: order.comuna.clone(),
            comments: order.comments.clone(),
            total: order.total,
            status: OrderStatus::Pending,
            created_at: now_epoch_ms(),
        };
        if let Err(err) = self.cache.write(CacheTable::Orders, |conn| {
            SqliteOrderRepository::new(conn).insert_with_id(&stored)
        }) {
            warn!(
                "event=order_place module=service status=error stage=cache order_id={} error={}",
                id, err
            );
            return Err(err.into());
        }
        let mirror = self
            .mirror_with(|mirror| {
                let stored = stored.clone();
                async move { mirror.save(&stored).await }
            })
            .await;
        Ok(DualWrite {
            value: stored,
            mirror,
        })
    }

    async fn mirror_with<F, Fut>(&self, op: F) -> MirrorState
    where
        F: FnOnce(OrderMirror) -> Fut,
        Fut: Future<Output = StoreResult<()>>,
    {
        let Some(mirror) = self.mirror.clone() else {
            return MirrorState::Skipped;
        };
        match op(mirror).await {
            Ok(()) => MirrorState::Mirrored,
            Err(err) => MirrorState::Failed(err.to_string()),
        }
    }
}

/// Builds the REST order body with lines keyed by product code.
pub fn build_create_order_request(
    cart: &CartSnapshot,
    checkout: &CheckoutRequest,
) -> CreateOrderRequest {
    CreateOrderRequest {
        delivery_address: checkout.delivery_address.trim().to_string(),
        delivery_date: checkout.delivery_date,
        region: non_blank(checkout.region.as_deref()),
        comuna: non_blank(checkout.comuna.as_deref()),
        comments: non_blank(checkout.comments.as_deref()),
        items: cart
            .items
            .iter()
            .map(|item| OrderLineRequest {
                product_code: item.product.code.clone(),
                quantity: item.quantity,
            })
            .collect(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
