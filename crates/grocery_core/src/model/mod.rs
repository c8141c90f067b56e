//! Domain model for the grocery client cache.
//!
//! # Responsibility
//! - Define the records persisted in the local cache and exchanged with
//!   the remote API and document store.
//! - Keep transient cart state separate from persisted entities.
//!
//! # Invariants
//! - `Product.id` and `Product.code` are unique within the cache.
//! - `User.email` is the natural key for users.
//! - `Order.total` is trusted as supplied at creation time.

pub mod cart;
pub mod document;
pub mod order;
pub mod product;
pub mod user;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
