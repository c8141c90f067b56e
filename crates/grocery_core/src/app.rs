//! Application context wiring.
//!
//! # Responsibility
//! - Build the shared cache, REST client and services from a `ClientConfig`.
//! - Own the cart and hand out per-screen state containers.
//!
//! # Invariants
//! - Exactly one `LocalCache` is shared by every service of one app.
//! - The session lives in an `AuthState` owned by the caller, never in a
//!   global.

use crate::config::{ClientConfig, ConfigError};
use crate::db::{DbError, LocalCache};
use crate::model::order::Order;
use crate::remote::api::{ApiClient, ApiError};
use crate::remote::http::HttpApiClient;
use crate::remote::identity::IdentityProvider;
use crate::remote::mirror::{OrderMirror, UserMirror};
use crate::remote::store::DocumentStore;
use crate::service::catalog_service::CatalogService;
use crate::service::document_service::DocumentService;
use crate::service::order_service::{CheckoutRequest, OrderService};
use crate::service::user_service::UserService;
use crate::service::{DualWrite, ServiceError, ServiceResult};
use crate::state::auth::AuthState;
use crate::state::cart::CartState;
use crate::state::catalog::CatalogState;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Db(DbError),
    Api(ApiError),
    Io(std::io::Error),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Api(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ApiError> for AppError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Outcome of the startup catalog pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    pub seeded: usize,
    pub refreshed: bool,
}

pub struct GroceryApp {
    cache: Arc<LocalCache>,
    api: Arc<dyn ApiClient>,
    catalog: CatalogService,
    orders: OrderService,
    users: UserService,
    documents: DocumentService,
    cart: CartState,
}

impl GroceryApp {
    /// Opens the cache file and the REST client described by `config`.
    pub fn open(
        config: &ClientConfig,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = Arc::new(LocalCache::open(&config.database_path)?);
        let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(
            config.api_base_url.as_str(),
            config.request_timeout(),
        )?);
        info!(
            "event=app_open module=app status=ok mirror={}",
            store.is_some()
        );
        Ok(Self::from_parts(
            cache,
            api,
            store,
            config.documents_dir.clone(),
        ))
    }

    /// Wires services over already-built adapters.
    pub fn from_parts(
        cache: Arc<LocalCache>,
        api: Arc<dyn ApiClient>,
        store: Option<Arc<dyn DocumentStore>>,
        documents_dir: PathBuf,
    ) -> Self {
        let order_mirror = store.clone().map(OrderMirror::new);
        let user_mirror = store.map(UserMirror::new);
        Self {
            catalog: CatalogService::new(Arc::clone(&cache), Arc::clone(&api)),
            orders: OrderService::new(Arc::clone(&cache), Arc::clone(&api), order_mirror),
            users: UserService::new(Arc::clone(&cache), user_mirror),
            documents: DocumentService::new(Arc::clone(&cache), documents_dir),
            cart: CartState::new(),
            cache,
            api,
        }
    }

    /// Seeds an empty catalog, then tries one network refresh.
    pub async fn start(&self) -> ServiceResult<StartupReport> {
        let seeded = self.catalog.initialize_database_if_needed()?;
        let refreshed = self.catalog.refresh_products_from_network().await;
        Ok(StartupReport { seeded, refreshed })
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn auth(&self, identity: Arc<dyn IdentityProvider>) -> AuthState {
        AuthState::new(identity, Arc::clone(&self.api), self.users.clone())
    }

    /// Catalog browsing container over the live product stream.
    pub fn catalog_state(&self) -> CatalogState {
        CatalogState::new(self.catalog.get_all())
    }

    /// Places the current cart for the signed-in user.
    ///
    /// Once the order is stored, the placed quantities leave the cart. Items
    /// added while the order was in flight stay for the next checkout.
    pub async fn checkout(
        &self,
        auth: &AuthState,
        checkout: &CheckoutRequest,
    ) -> ServiceResult<DualWrite<Order>> {
        let session = auth.current_session().ok_or_else(|| {
            ServiceError::InvalidInput("Debes iniciar sesión para comprar.".to_string())
        })?;
        let cart = self.cart.snapshot();
        let placed = self
            .orders
            .place_order(&session.user.email, &cart, checkout, Some(&session.token))
            .await?;
        self.cart.confirm_placed(&cart);
        Ok(placed)
    }
}
