//! Order Mapper
//!
//! Raw backend orders into the two shapes the host renders: the customer's
//! order history and the kitchen ticket. Both are pure and tolerate partial
//! records (absent customer name becomes `""`, a null price is already `0`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Order, OrderItem, OrderStatus, OrderType, PaymentStatus};

use super::kitchen::{KitchenBucket, map_bucket};
use super::money::{line_total, to_f64};

/// 顾客视角的订单行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastOrderLine {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
    pub customizations: Vec<String>,
    pub spice_level: Option<String>,
    pub special_instructions: Option<String>,
}

/// 顾客视角的订单
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastOrder {
    pub id: String,
    pub table_id: String,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub items: Vec<PastOrderLine>,
    /// Sum of line totals
    pub total: f64,
}

/// Kitchen ticket line; prices are irrelevant to the pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenLine {
    pub name: String,
    pub quantity: u32,
    pub customizations: Vec<String>,
    pub spice_level: Option<String>,
    pub special_instructions: Option<String>,
}

/// 厨房视角的订单
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOrder {
    pub id: String,
    pub table_id: String,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub bucket: KitchenBucket,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    /// Relative age at mapping time, e.g. `"5 min ago"`
    pub elapsed: String,
    pub items: Vec<KitchenLine>,
}

pub fn map_to_customer_order(order: &Order) -> PastOrder {
    let mut total = Decimal::ZERO;
    let items = order
        .items
        .iter()
        .map(|item| {
            let line = line_total(item.unit_price, item.quantity);
            total += line;
            PastOrderLine {
                menu_item_id: item.menu_item_id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: to_f64(line),
                customizations: item.customization_names(),
                spice_level: item.spice_level.clone(),
                special_instructions: item.special_instructions.clone(),
            }
        })
        .collect();

    PastOrder {
        id: order.id.clone(),
        table_id: order.table_id.clone(),
        order_type: order.order_type,
        status: order.status,
        payment_status: order.payment_status,
        created_at: order.created_at,
        customer_name: order.customer_name.clone().unwrap_or_default(),
        items,
        total: to_f64(total),
    }
}

/// `None` when the status is not shown on the kanban
pub fn map_to_kitchen_order(order: &Order, now: DateTime<Utc>) -> Option<KitchenOrder> {
    let bucket = map_bucket(order.status)?;
    Some(KitchenOrder {
        id: order.id.clone(),
        table_id: order.table_id.clone(),
        order_type: order.order_type,
        status: order.status,
        bucket,
        customer_name: order.customer_name.clone().unwrap_or_default(),
        created_at: order.created_at,
        elapsed: elapsed_label(order.created_at, now),
        items: order.items.iter().map(kitchen_line).collect(),
    })
}

fn kitchen_line(item: &OrderItem) -> KitchenLine {
    KitchenLine {
        name: item.name.clone(),
        quantity: item.quantity,
        customizations: item.customization_names(),
        spice_level: item.spice_level.clone(),
        special_instructions: item.special_instructions.clone(),
    }
}

/// Human-relative age; clock skew into the future reads as "just now"
pub fn elapsed_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{} min ago", s / 60),
        s if s < 86_400 => format!("{} h ago", s / 3_600),
        s => format!("{} d ago", s / 86_400),
    }
}
