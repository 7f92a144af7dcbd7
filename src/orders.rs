//! Order intake records.
//!
//! Orders are append-only: the router creates them from inbound `pedido`
//! messages and the management surface consumes them. Nothing in this
//! worker mutates an order after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an order. This worker only ever produces `Received`;
/// fulfillment states live in the management surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
        }
    }
}

/// A free-form order placed by a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Recipient id of the contact who placed the order.
    pub contact_id: String,
    /// Raw order payload as typed by the contact.
    pub text: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(contact_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id: contact_id.into(),
            text: text.into(),
            status: OrderStatus::Received,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_is_received() {
        let order = Order::new("5511999990000", "2 temaki");
        assert_eq!(order.status, OrderStatus::Received);
        assert_eq!(order.text, "2 temaki");
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Received).unwrap();
        assert_eq!(json, "\"received\"");
    }
}
