//! Push-notification payload parsing.
//!
//! # Responsibility
//! - Turn a push data payload into a typed notification and the local
//!   channel it is shown on.
//!
//! # Invariants
//! - A missing or unknown `type` is treated as `general`.
//! - `order_id` is only attached to order updates and only when numeric.

use crate::model::order::OrderId;
use std::collections::HashMap;

pub const ORDERS_CHANNEL_ID: &str = "orders";
pub const PROMOTIONS_CHANNEL_ID: &str = "promotions";
pub const GENERAL_CHANNEL_ID: &str = "general";

const DEFAULT_TITLE: &str = "Almacén";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderUpdate,
    Promotion,
    General,
}

impl NotificationKind {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("order_update") => Self::OrderUpdate,
            Some("promotion") => Self::Promotion,
            _ => Self::General,
        }
    }

    pub fn channel_id(self) -> &'static str {
        match self {
            Self::OrderUpdate => ORDERS_CHANNEL_ID,
            Self::Promotion => PROMOTIONS_CHANNEL_ID,
            Self::General => GENERAL_CHANNEL_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub order_id: Option<OrderId>,
}

impl PushNotification {
    /// Parses a push data payload. Blank titles fall back to the store name.
    pub fn from_payload(payload: &HashMap<String, String>) -> Self {
        let field = |name: &str| {
            payload
                .get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let kind = NotificationKind::parse(field("type"));
        let order_id = match kind {
            NotificationKind::OrderUpdate => field("order_id").and_then(|id| id.parse().ok()),
            NotificationKind::Promotion | NotificationKind::General => None,
        };

        Self {
            kind,
            title: field("title").unwrap_or(DEFAULT_TITLE).to_string(),
            body: field("body").unwrap_or_default().to_string(),
            order_id,
        }
    }

    pub fn channel_id(&self) -> &'static str {
        self.kind.channel_id()
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationKind, PushNotification};
    use std::collections::HashMap;

    fn payload(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn order_updates_carry_numeric_order_id() {
        let notification = PushNotification::from_payload(&payload(&[
            ("type", "ORDER_UPDATE"),
            ("title", "Pedido despachado"),
            ("body", "Tu pedido va en camino"),
            ("order_id", "42"),
        ]));
        assert_eq!(notification.kind, NotificationKind::OrderUpdate);
        assert_eq!(notification.channel_id(), "orders");
        assert_eq!(notification.order_id, Some(42));
    }

    #[test]
    fn unknown_or_missing_type_is_general() {
        let unknown = PushNotification::from_payload(&payload(&[("type", "survey")]));
        assert_eq!(unknown.channel_id(), "general");
        assert_eq!(unknown.title, "Almacén");

        let promo = PushNotification::from_payload(&payload(&[
            ("type", "promotion"),
            ("order_id", "7"),
        ]));
        assert_eq!(promo.channel_id(), "promotions");
        assert_eq!(promo.order_id, None);
    }
}
