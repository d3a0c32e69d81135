//! Order Model
//!
//! Orders are owned by the backend. Once created only `status` and
//! `payment_status` change; items never do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::{deserialize_id, deserialize_opt_id, null_as_default};

/// Backend order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
    /// Status string this client does not know about
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Served => "served",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Served or completed: fulfilment is over
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Served | Self::Completed)
    }

    /// Orders in these states can no longer be cancelled or replaced
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Served | Self::Completed | Self::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status as the backend spells it (`Pending`, `Requested`, `Approved`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    /// Customer asked for the bill
    Requested,
    Approved,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// First order of a session is `regular`, everything after is an `addon`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Regular,
    Addon,
}

/// Selected customization on a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Price delta in currency unit
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_modifier: f64,
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(alias = "itemId", deserialize_with = "deserialize_id")]
    pub menu_item_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub quantity: u32,
    /// Price in currency unit; `null` on the wire decodes as 0
    #[serde(default, alias = "price", deserialize_with = "null_as_default")]
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customizations: Vec<Customization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl OrderItem {
    /// Customization names in the order they were selected
    pub fn customization_names(&self) -> Vec<String> {
        self.customizations.iter().map(|c| c.name.clone()).collect()
    }
}

/// Order entity as returned by `GET /orders`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub table_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_type: OrderType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_status: PaymentStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub restaurant_id: Option<String>,
    /// Server-computed total, if the backend sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl Order {
    /// Paid and served/completed: immutable from here on
    pub fn is_settled(&self) -> bool {
        self.payment_status.is_approved() && self.status.is_fulfilled()
    }

    /// Total units across every line
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// Line item for `POST /orders`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<String>,
    /// Customization ids, in the original selection order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl OrderItemInput {
    /// Re-issue an existing line with a different quantity
    pub fn from_item(item: &OrderItem, quantity: u32) -> Self {
        Self {
            item_id: item.menu_item_id.clone(),
            quantity,
            spice_level: item.spice_level.clone(),
            customizations: if item.customizations.is_empty() {
                None
            } else {
                Some(item.customizations.iter().map(|c| c.id.clone()).collect())
            },
            special_instructions: item.special_instructions.clone(),
        }
    }
}

/// Body of `POST /orders`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub table_id: String,
    pub items: Vec<OrderItemInput>,
    pub customer_name: String,
    pub customer_phone: String,
    pub restaurant_id: String,
    pub order_type: OrderType,
}

/// Body of `PATCH /orders/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Body of `PATCH /orders/{id}/payment`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
}

/// Filter for `GET /orders`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    pub statuses: Vec<OrderStatus>,
    pub table_id: Option<String>,
}

impl OrderQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_table(table_id: impl Into<String>) -> Self {
        Self {
            statuses: Vec::new(),
            table_id: Some(table_id.into()),
        }
    }

    pub fn with_statuses(mut self, statuses: &[OrderStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// Query pairs in the order the backend documents them
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.statuses.is_empty() {
            let joined = self
                .statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("status", joined));
        }
        if let Some(table_id) = &self.table_id {
            pairs.push(("tableId", table_id.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_order() {
        let json = r#"{
            "id": "o-1",
            "tableId": 12,
            "orderType": "addon",
            "status": "preparing",
            "paymentStatus": "Approved",
            "createdAt": "2026-10-19T12:00:00Z",
            "customerName": "Asha",
            "items": [{
                "menuItemId": "m-7",
                "name": "Paneer Tikka",
                "quantity": 2,
                "unitPrice": 250.0,
                "spiceLevel": "hot",
                "customizations": [{"id": 3, "name": "Extra Cheese", "priceModifier": 20}],
                "specialInstructions": "no onion"
            }]
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.table_id, "12");
        assert_eq!(order.order_type, OrderType::Addon);
        assert_eq!(order.status, OrderStatus::Preparing);
        assert!(order.payment_status.is_approved());
        assert_eq!(order.items[0].customizations[0].id, "3");
        assert_eq!(order.items[0].special_instructions.as_deref(), Some("no onion"));
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn test_decode_partial_order_uses_defaults() {
        let json = r#"{
            "id": 5,
            "tableId": "t-1",
            "status": "on_hold",
            "paymentStatus": null,
            "items": [{"itemId": "m-1", "quantity": 1, "unitPrice": null, "customizations": null}]
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, "5");
        assert_eq!(order.status, OrderStatus::Unknown);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.order_type, OrderType::Regular);
        assert!(order.customer_name.is_none());
        assert_eq!(order.items[0].unit_price, 0.0);
        assert_eq!(order.items[0].name, "");
        assert!(order.items[0].customizations.is_empty());
    }

    #[test]
    fn test_is_settled() {
        let json = r#"{"id":"o","tableId":"t","status":"served","paymentStatus":"Approved"}"#;
        let mut order: Order = serde_json::from_str(json).unwrap();
        assert!(order.is_settled());

        order.payment_status = PaymentStatus::Requested;
        assert!(!order.is_settled());

        order.payment_status = PaymentStatus::Approved;
        order.status = OrderStatus::Ready;
        assert!(!order.is_settled());
    }

    #[test]
    fn test_create_request_wire_format() {
        let req = CreateOrderRequest {
            table_id: "t-4".into(),
            items: vec![OrderItemInput {
                item_id: "m-1".into(),
                quantity: 3,
                spice_level: None,
                customizations: Some(vec!["c-2".into(), "c-1".into()]),
                special_instructions: None,
            }],
            customer_name: String::new(),
            customer_phone: String::new(),
            restaurant_id: "r-1".into(),
            order_type: OrderType::Addon,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tableId"], "t-4");
        assert_eq!(json["orderType"], "addon");
        assert_eq!(json["items"][0]["itemId"], "m-1");
        assert_eq!(json["items"][0]["customizations"][1], "c-1");
        assert!(json["items"][0].get("spiceLevel").is_none());
    }

    #[test]
    fn test_status_bodies() {
        let body = serde_json::to_value(OrderStatusUpdate {
            status: OrderStatus::Preparing,
        })
        .unwrap();
        assert_eq!(body["status"], "preparing");

        let body = serde_json::to_value(PaymentStatusUpdate {
            payment_status: PaymentStatus::Approved,
        })
        .unwrap();
        assert_eq!(body["paymentStatus"], "Approved");
    }

    #[test]
    fn test_query_pairs() {
        let q = OrderQuery::for_table("9").with_statuses(&[OrderStatus::Pending, OrderStatus::Ready]);
        assert_eq!(
            q.to_pairs(),
            vec![("status", "pending,ready".to_string()), ("tableId", "9".to_string())]
        );
        assert!(OrderQuery::all().to_pairs().is_empty());
    }

    #[test]
    fn test_item_input_from_item_keeps_variant() {
        let item = OrderItem {
            menu_item_id: "m-1".into(),
            name: "Naan".into(),
            quantity: 2,
            unit_price: 40.0,
            spice_level: Some("mild".into()),
            customizations: vec![Customization {
                id: "c-9".into(),
                name: "Butter".into(),
                price_modifier: 5.0,
            }],
            special_instructions: Some("crispy".into()),
        };
        let input = OrderItemInput::from_item(&item, 1);
        assert_eq!(input.quantity, 1);
        assert_eq!(input.spice_level.as_deref(), Some("mild"));
        assert_eq!(input.customizations, Some(vec!["c-9".to_string()]));
        assert_eq!(input.special_instructions.as_deref(), Some("crispy"));
    }
}
