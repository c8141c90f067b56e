//! Transient cart model and pure reducer steps.
//!
//! # Responsibility
//! - Describe the in-progress order as an immutable snapshot.
//! - Provide pure transitions used by the cart state container.
//!
//! # Invariants
//! - `total` always equals the sum of `price * quantity` over all lines.
//! - No line ever has quantity zero; decrementing a quantity-1 line removes it.
//! - Never persisted.

use crate::model::product::{Product, ProductId};
use rust_decimal::Decimal;

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Immutable cart snapshot published by the cart container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total: Decimal,
}

impl CartSnapshot {
    fn from_items(items: Vec<CartItem>) -> Self {
        let total = compute_total(&items);
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product.id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Adds one unit; creates the line when absent.
    pub fn with_added(&self, product: &Product) -> Self {
        let mut items = self.items.clone();
        match items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => items.push(CartItem {
                product: product.clone(),
                quantity: 1,
            }),
        }
        Self::from_items(items)
    }

    /// Adds one unit to an existing line; unknown ids leave the cart unchanged.
    pub fn with_increased(&self, product_id: ProductId) -> Self {
        let items = self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                if item.product.id == product_id {
                    item.quantity = item.quantity.saturating_add(1);
                }
                item
            })
            .collect();
        Self::from_items(items)
    }

    /// Removes one unit; a line at quantity 1 is removed entirely.
    pub fn with_decreased(&self, product_id: ProductId) -> Self {
        let items = self
            .items
            .iter()
            .cloned()
            .filter_map(|mut item| {
                if item.product.id != product_id {
                    return Some(item);
                }
                if item.quantity <= 1 {
                    return None;
                }
                item.quantity -= 1;
                Some(item)
            })
            .collect();
        Self::from_items(items)
    }

    pub fn without(&self, product_id: ProductId) -> Self {
        let items = self
            .items
            .iter()
            .filter(|item| item.product.id != product_id)
            .cloned()
            .collect();
        Self::from_items(items)
    }

    /// Subtracts the quantities of an already placed cart; lines that reach
    /// zero are removed and lines added since `placed` was taken survive.
    pub fn without_placed(&self, placed: &CartSnapshot) -> Self {
        let items = self
            .items
            .iter()
            .cloned()
            .filter_map(|mut item| {
                let ordered = placed.quantity_of(item.product.id);
                item.quantity = item.quantity.saturating_sub(ordered);
                (item.quantity > 0).then_some(item)
            })
            .collect();
        Self::from_items(items)
    }
}

/// Sum of unit price times quantity over all lines.
pub fn compute_total(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |acc, item| acc + item.subtotal())
}
