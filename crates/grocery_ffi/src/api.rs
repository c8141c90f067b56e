//! FFI use-case API for the mobile shell.
//!
//! # Responsibility
//! - Expose catalog, cart and order use cases to Dart via FRB.
//! - Own the process-wide app context and its Tokio runtime.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Failures are reported through envelopes carrying a localized message.
//! - Money crosses the boundary as a decimal string.

use chrono::NaiveDate;
use grocery_core::model::cart::CartSnapshot;
use grocery_core::model::order::{Order, OrderStatus};
use grocery_core::model::product::Product;
use grocery_core::notification::PushNotification;
use grocery_core::service::order_service::CheckoutRequest;
use grocery_core::state::catalog::filter_products;
use grocery_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ClientConfig, GroceryApp,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use url::Url;

static CONTEXT: OnceCell<FfiContext> = OnceCell::new();

struct FfiContext {
    data_dir: PathBuf,
    runtime: Runtime,
    app: GroceryApp,
}

/// Health check.
///
/// # FFI contract
/// - Sync call, non-blocking; never throws.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`.
/// - Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Opens the cache under `data_dir` and wires the REST client.
///
/// # FFI contract
/// - Must be called before any catalog, cart or order function.
/// - Repeating the call with the same `data_dir` is a no-op.
/// - Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn app_init(data_dir: String, api_base_url: Option<String>) -> String {
    let data_dir = PathBuf::from(data_dir.trim());
    if let Some(context) = CONTEXT.get() {
        if context.data_dir == data_dir {
            return String::new();
        }
        return format!(
            "app already initialized at `{}`",
            context.data_dir.display()
        );
    }

    match CONTEXT.get_or_try_init(|| build_context(data_dir.clone(), api_base_url)) {
        Ok(context) if context.data_dir == data_dir => String::new(),
        Ok(context) => format!(
            "app already initialized at `{}`",
            context.data_dir.display()
        ),
        Err(err) => {
            error!("event=ffi_app_init module=ffi status=error error={err}");
            err
        }
    }
}

fn build_context(data_dir: PathBuf, api_base_url: Option<String>) -> Result<FfiContext, String> {
    let mut config = ClientConfig::with_data_dir(&data_dir).map_err(|err| err.to_string())?;
    if let Some(url) = api_base_url.filter(|url| !url.trim().is_empty()) {
        config.api_base_url = Url::parse(url.trim()).map_err(|err| err.to_string())?;
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let app = GroceryApp::open(&config, None).map_err(|err| err.to_string())?;
    info!("event=ffi_app_init module=ffi status=ok");
    Ok(FfiContext {
        data_dir,
        runtime,
        app,
    })
}

fn with_context<T>(f: impl FnOnce(&FfiContext) -> Result<T, String>) -> Result<T, String> {
    let context = CONTEXT
        .get()
        .ok_or_else(|| "app_init must be called first".to_string())?;
    f(context)
}

/// Product row shown by the catalog screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductItem {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub stock: i64,
    pub image_url: Option<String>,
}

/// Catalog startup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSyncResponse {
    pub ok: bool,
    pub seeded: u32,
    pub refreshed: bool,
    pub message: String,
}

/// Seeds an empty cache and refreshes from the network.
///
/// # FFI contract
/// - Blocking call; run off the UI isolate.
/// - A failed refresh still reports `ok` with `refreshed=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_sync() -> CatalogSyncResponse {
    let result = with_context(|context| {
        context
            .runtime
            .block_on(context.app.start())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(report) => CatalogSyncResponse {
            ok: true,
            seeded: u32::try_from(report.seeded).unwrap_or(u32::MAX),
            refreshed: report.refreshed,
            message: String::new(),
        },
        Err(message) => CatalogSyncResponse {
            ok: false,
            seeded: 0,
            refreshed: false,
            message,
        },
    }
}

/// Filters the cached catalog. Empty `query` and `None` category match all.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_search(query: String, category: Option<String>) -> Vec<ProductItem> {
    with_context(|context| context.app.catalog().list_all().map_err(|err| err.to_string()))
        .map(|products| {
            filter_products(&products, &query, category.as_deref())
                .into_iter()
                .map(to_product_item)
                .collect()
        })
        .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn catalog_categories() -> Vec<String> {
    with_context(|context| {
        context
            .app
            .catalog()
            .list_categories()
            .map_err(|err| err.to_string())
    })
    .unwrap_or_default()
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineItem {
    pub product_id: i64,
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub subtotal: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartLineItem>,
    pub item_count: u32,
    pub total: String,
    /// Empty unless the intent failed.
    pub message: String,
}

#[flutter_rust_bridge::frb(sync)]
pub fn cart_view() -> CartView {
    cart_response(with_context(|context| Ok(context.app.cart().snapshot())))
}

/// Adds one unit of a cached product.
#[flutter_rust_bridge::frb(sync)]
pub fn cart_add(product_id: i64) -> CartView {
    cart_response(with_context(|context| {
        let product = context
            .app
            .catalog()
            .get_by_id(product_id)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("product {product_id} not found"))?;
        Ok(context.app.cart().add(&product))
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn cart_increase(product_id: i64) -> CartView {
    cart_response(with_context(|context| Ok(context.app.cart().increase(product_id))))
}

#[flutter_rust_bridge::frb(sync)]
pub fn cart_decrease(product_id: i64) -> CartView {
    cart_response(with_context(|context| Ok(context.app.cart().decrease(product_id))))
}

#[flutter_rust_bridge::frb(sync)]
pub fn cart_remove(product_id: i64) -> CartView {
    cart_response(with_context(|context| Ok(context.app.cart().remove(product_id))))
}

fn cart_response(result: Result<CartSnapshot, String>) -> CartView {
    match result {
        Ok(cart) => to_cart_view(&cart, String::new()),
        Err(message) => to_cart_view(&CartSnapshot::default(), message),
    }
}

/// Order row for order history and admin screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: i64,
    pub user_email: String,
    /// `YYYY-MM-DD` when set.
    pub delivery_date: Option<String>,
    pub delivery_address: String,
    pub total: String,
    pub status: String,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderActionResponse {
    pub ok: bool,
    pub order_id: Option<i64>,
    /// Set when the order is stored locally but its remote copy is stale.
    pub mirror_error: Option<String>,
    pub message: String,
}

impl OrderActionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            order_id: None,
            mirror_error: None,
            message: message.into(),
        }
    }
}

/// Submits the cart as an order; on success the placed quantities leave the
/// cart.
///
/// # FFI contract
/// - Blocking call; run off the UI isolate.
/// - `delivery_date` uses `YYYY-MM-DD`.
#[flutter_rust_bridge::frb(sync)]
#[allow(clippy::too_many_arguments)]
pub fn checkout(
    user_email: String,
    bearer_token: Option<String>,
    delivery_address: String,
    delivery_date: Option<String>,
    region: Option<String>,
    comuna: Option<String>,
    comments: Option<String>,
) -> OrderActionResponse {
    let delivery_date = match delivery_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => return OrderActionResponse::failure("La fecha de entrega no es válida."),
        },
    };
    let request = CheckoutRequest {
        delivery_address,
        delivery_date,
        region,
        comuna,
        comments,
    };

    let result = with_context(|context| {
        let cart = context.app.cart().snapshot();
        let placed = context
            .runtime
            .block_on(context.app.orders().place_order(
                &user_email,
                &cart,
                &request,
                bearer_token.as_deref(),
            ))
            .map_err(|err| err.user_message())?;
        context.app.cart().confirm_placed(&cart);
        Ok(placed)
    });

    match result {
        Ok(placed) => OrderActionResponse {
            ok: true,
            order_id: Some(placed.value.id),
            mirror_error: mirror_error(&placed.mirror),
            message: "Pedido realizado.".to_string(),
        },
        Err(message) => OrderActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn orders_for_user(user_email: String) -> Vec<OrderItem> {
    with_context(|context| {
        context
            .app
            .orders()
            .list_by_user(&user_email)
            .map_err(|err| err.to_string())
    })
    .map(|orders| orders.iter().map(to_order_item).collect())
    .unwrap_or_default()
}

/// Every cached order (admin).
#[flutter_rust_bridge::frb(sync)]
pub fn orders_all() -> Vec<OrderItem> {
    with_context(|context| context.app.orders().list_all().map_err(|err| err.to_string()))
        .map(|orders| orders.iter().map(to_order_item).collect())
        .unwrap_or_default()
}

/// Sets an order status (admin). Any status may replace any other.
#[flutter_rust_bridge::frb(sync)]
pub fn order_update_status(order_id: i64, status: String) -> OrderActionResponse {
    let status: OrderStatus = match status.parse() {
        Ok(status) => status,
        Err(message) => return OrderActionResponse::failure(message),
    };
    let result = with_context(|context| {
        context
            .runtime
            .block_on(context.app.orders().update_status(order_id, status))
            .map_err(|err| err.user_message())
    });
    match result {
        Ok(outcome) => OrderActionResponse {
            ok: true,
            order_id: Some(order_id),
            mirror_error: mirror_error(&outcome.mirror),
            message: format!("Estado actualizado a {status}."),
        },
        Err(message) => OrderActionResponse::failure(message),
    }
}

/// Typed push notification and the channel it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationItem {
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub order_id: Option<i64>,
}

#[flutter_rust_bridge::frb(sync)]
pub fn parse_push_payload(payload: HashMap<String, String>) -> NotificationItem {
    let notification = PushNotification::from_payload(&payload);
    NotificationItem {
        channel_id: notification.channel_id().to_string(),
        title: notification.title,
        body: notification.body,
        order_id: notification.order_id,
    }
}

fn mirror_error(state: &grocery_core::MirrorState) -> Option<String> {
    match state {
        grocery_core::MirrorState::Failed(message) => Some(message.clone()),
        grocery_core::MirrorState::Skipped | grocery_core::MirrorState::Mirrored => None,
    }
}

fn format_money(value: Decimal) -> String {
    value.normalize().to_string()
}

fn to_product_item(product: Product) -> ProductItem {
    ProductItem {
        id: product.id,
        price: format_money(product.price),
        code: product.code,
        name: product.name,
        description: product.description,
        category: product.category,
        stock: product.stock,
        image_url: product.image_url,
    }
}

fn to_cart_view(cart: &CartSnapshot, message: String) -> CartView {
    CartView {
        items: cart
            .items
            .iter()
            .map(|item| CartLineItem {
                product_id: item.product.id,
                name: item.product.name.clone(),
                unit_price: format_money(item.product.price),
                quantity: item.quantity,
                subtotal: format_money(item.subtotal()),
            })
            .collect(),
        item_count: cart.item_count(),
        total: format_money(cart.total),
        message,
    }
}

fn to_order_item(order: &Order) -> OrderItem {
    OrderItem {
        id: order.id,
        user_email: order.user_email.clone(),
        delivery_date: order
            .delivery_date
            .map(|date| date.format("%Y-%m-%d").to_string()),
        delivery_address: order.delivery_address.clone(),
        total: format_money(order.total),
        status: order.status.as_str().to_string(),
        created_at_ms: order.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        app_init, cart_add, cart_decrease, cart_view, catalog_search, catalog_sync, checkout,
        core_version, format_money, init_logging, order_update_status, parse_push_payload, ping,
    };
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn money_is_rendered_without_trailing_zeros() {
        assert_eq!(format_money(Decimal::new(250000, 2)), "2500");
        assert_eq!(format_money(Decimal::new(49990, 2)), "499.9");
    }

    #[test]
    fn push_payload_maps_to_channel() {
        let mut payload = HashMap::new();
        payload.insert("type".to_string(), "promotion".to_string());
        payload.insert("body".to_string(), "2x1 en pan".to_string());
        let item = parse_push_payload(payload);
        assert_eq!(item.channel_id, "promotions");
        assert_eq!(item.body, "2x1 en pan");
    }

    #[test]
    fn catalog_cart_and_order_flow_over_ffi() {
        // The context outlives the test, so the directory is kept.
        let dir = tempfile::tempdir().unwrap().into_path();
        let data_dir = dir.to_str().unwrap().to_string();
        assert_eq!(
            app_init(data_dir.clone(), Some("http://127.0.0.1:9/api".to_string())),
            ""
        );
        assert_eq!(app_init(data_dir, None), "");

        let sync = catalog_sync();
        assert!(sync.ok, "{}", sync.message);
        assert!(sync.seeded > 0);
        assert!(!sync.refreshed);

        let bread = catalog_search("marraqueta".to_string(), None);
        assert_eq!(bread.len(), 1);
        cart_add(bread[0].id);
        cart_add(bread[0].id);
        assert_eq!(cart_decrease(bread[0].id).item_count, 1);

        let rejected = checkout(
            "ana@example.cl".to_string(),
            None,
            "Av. Providencia 1234".to_string(),
            Some("2026-13-40".to_string()),
            None,
            None,
            None,
        );
        assert!(!rejected.ok);

        // The API is unreachable, so the cart survives.
        let offline = checkout(
            "ana@example.cl".to_string(),
            None,
            "Av. Providencia 1234".to_string(),
            None,
            None,
            None,
            None,
        );
        assert!(!offline.ok);
        assert_eq!(cart_view().item_count, 1);

        assert!(!order_update_status(1, "LOST".to_string()).ok);
    }
}
