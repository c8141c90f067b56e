//! Shopping cart state container.
//!
//! # Invariants
//! - Every intent is applied to the latest snapshot and published atomically.
//! - `total` always equals the sum of line subtotals.
//! - Confirming returns the current snapshot and resets to empty.
//! - Confirming a placed snapshot only removes the quantities it carried.

use crate::model::cart::CartSnapshot;
use crate::model::product::{Product, ProductId};
use tokio::sync::watch;

pub struct CartState {
    state: watch::Sender<CartSnapshot>,
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

impl CartState {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CartSnapshot::default());
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.state.borrow().clone()
    }

    /// Adds one unit; a new line starts at quantity 1.
    pub fn add(&self, product: &Product) -> CartSnapshot {
        self.apply(|cart| cart.with_added(product))
    }

    pub fn increase(&self, product_id: ProductId) -> CartSnapshot {
        self.apply(|cart| cart.with_increased(product_id))
    }

    /// Removes one unit; the line disappears when it reaches zero.
    pub fn decrease(&self, product_id: ProductId) -> CartSnapshot {
        self.apply(|cart| cart.with_decreased(product_id))
    }

    pub fn remove(&self, product_id: ProductId) -> CartSnapshot {
        self.apply(|cart| cart.without(product_id))
    }

    /// Returns the confirmed cart and empties it.
    pub fn confirm_order(&self) -> CartSnapshot {
        let mut confirmed = CartSnapshot::default();
        self.state.send_modify(|cart| {
            confirmed = std::mem::take(cart);
        });
        confirmed
    }

    /// Removes what `placed` ordered and keeps anything added meanwhile.
    pub fn confirm_placed(&self, placed: &CartSnapshot) -> CartSnapshot {
        self.apply(|cart| cart.without_placed(placed))
    }

    fn apply(&self, intent: impl FnOnce(&CartSnapshot) -> CartSnapshot) -> CartSnapshot {
        let mut next = CartSnapshot::default();
        self.state.send_modify(|cart| {
            *cart = intent(cart);
            next = cart.clone();
        });
        next
    }
}
