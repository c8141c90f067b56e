//! Catalog product model.
//!
//! # Responsibility
//! - Define the canonical product record shown by the catalog.
//! - Validate write-side invariants before persistence.
//!
//! # Invariants
//! - `code` and `name` are never blank.
//! - `price` is never negative.
//! - `stock` is expected to be non-negative but is not enforced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Local cache identifier for products.
pub type ProductId = i64;

/// Catalog entry as cached locally and returned by `GET /productos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Business code used as the line-item key when creating orders.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Validation failures for product writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductValidationError {
    BlankCode(ProductId),
    BlankName(ProductId),
    NegativePrice { id: ProductId, price: Decimal },
}

impl Display for ProductValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankCode(id) => write!(f, "product {id} has a blank code"),
            Self::BlankName(id) => write!(f, "product {id} has a blank name"),
            Self::NegativePrice { id, price } => {
                write!(f, "product {id} has a negative price {price}")
            }
        }
    }
}

impl Error for ProductValidationError {}

impl Product {
    /// Creates a product with empty optional fields.
    pub fn new(
        id: ProductId,
        code: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            price,
            stock: 0,
            image_url: None,
            created_at: None,
        }
    }

    /// Checks write-side invariants.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.code.trim().is_empty() {
            return Err(ProductValidationError::BlankCode(self.id));
        }
        if self.name.trim().is_empty() {
            return Err(ProductValidationError::BlankName(self.id));
        }
        if self.price < Decimal::ZERO {
            return Err(ProductValidationError::NegativePrice {
                id: self.id,
                price: self.price,
            });
        }
        Ok(())
    }

    /// Whether the product can currently be added to a cart.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
