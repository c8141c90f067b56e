//! Core client logic for the grocery store app.
//! Owns the local cache, the remote sync services and the view-state
//! containers the mobile shell binds to.

pub mod app;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notification;
pub mod remote;
pub mod repo;
pub mod service;
pub mod state;

pub use app::{AppError, GroceryApp, StartupReport};
pub use config::{ClientConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, CacheTable, DbError, DbResult, LocalCache};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::cart::{CartItem, CartSnapshot};
pub use model::order::{NewOrder, Order, OrderId, OrderStatus};
pub use model::product::{Product, ProductId};
pub use model::user::{User, UserRole};
pub use repo::{RepoError, RepoResult};
pub use service::{DualWrite, MirrorState, ServiceError, ServiceResult};

/// Health-check used by the shell and the CLI.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
