//! Order model and status labels.
//!
//! # Responsibility
//! - Define the order record shared by the local cache, the REST API and the
//!   `pedidos` document-store collection.
//!
//! # Invariants
//! - New orders start as `OrderStatus::Pending`.
//! - Any status may be replaced by any other status; there is no transition
//!   graph.
//! - `total` is stored exactly as supplied by the creating client.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Local cache identifier for orders.
pub type OrderId = i64;

/// Order status label. Serialized in upper case (`PENDING`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown order status `{value}`"))
    }
}

/// Persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Owner reference by email.
    pub user_email: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_address: String,
    pub region: Option<String>,
    pub comuna: Option<String>,
    pub comments: Option<String>,
    pub total: Decimal,
    pub status: OrderStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Order fields supplied at checkout, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewOrder {
    pub user_email: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_address: String,
    pub region: Option<String>,
    pub comuna: Option<String>,
    pub comments: Option<String>,
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus;

    #[test]
    fn status_parses_case_insensitively_and_roundtrips_label() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.as_str().to_lowercase().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_in_upper_case() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"SHIPPED\"");
    }
}
