//! Session Aggregator
//!
//! Folds every line of a table's orders into one row per variant. Paid and
//! unpaid units are tracked separately so the bill can be split, and an
//! optimistic overlay may replace the displayed quantity of a row.
//!
//! All functions here are pure: the same orders and overlay always give the
//! same rows.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Order, OrderItemInput};
use std::collections::HashMap;

use super::money::{line_total, to_decimal, to_f64};
use super::variant::VariantKey;

/// 聚合行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub key: VariantKey,
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub paid_count: u32,
    pub unpaid_amount: f64,
    /// Customization names as first selected
    pub customizations: Vec<String>,
    pub spice_level: Option<String>,
    /// First contributing line, used when more units of this variant are ordered
    #[serde(skip)]
    pub template: OrderItemInput,
}

impl AggregateRow {
    pub fn unpaid_count(&self) -> u32 {
        self.quantity - self.paid_count
    }
}

#[derive(Debug)]
struct Accumulator {
    row: AggregateRow,
    total: Decimal,
    unpaid: Decimal,
}

/// Build the rows for one table
///
/// `overlay` maps variant keys to pending quantities. An entry of 0 hides the
/// row; an entry for a variant absent from `orders` is ignored.
pub fn aggregate(orders: &[Order], overlay: &HashMap<VariantKey, u32>) -> Vec<AggregateRow> {
    let mut index: HashMap<VariantKey, usize> = HashMap::new();
    let mut acc: Vec<Accumulator> = Vec::new();

    for order in orders.iter().filter(|o| !o.status.is_cancelled()) {
        let paid = order.payment_status.is_approved();
        for item in &order.items {
            let key = VariantKey::of(item);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                acc.push(Accumulator {
                    row: AggregateRow {
                        key,
                        menu_item_id: item.menu_item_id.clone(),
                        name: item.name.clone(),
                        quantity: 0,
                        unit_price: item.unit_price,
                        total_price: 0.0,
                        paid_count: 0,
                        unpaid_amount: 0.0,
                        customizations: item.customization_names(),
                        spice_level: item.spice_level.clone(),
                        template: OrderItemInput::from_item(item, 0),
                    },
                    total: Decimal::ZERO,
                    unpaid: Decimal::ZERO,
                });
                acc.len() - 1
            });

            let entry = &mut acc[slot];
            let line = line_total(item.unit_price, item.quantity);
            entry.row.quantity += item.quantity;
            entry.total += line;
            if paid {
                entry.row.paid_count += item.quantity;
            } else {
                entry.unpaid += line;
            }
        }
    }

    let mut rows: Vec<AggregateRow> = acc
        .into_iter()
        .filter_map(|mut a| {
            match overlay.get(&a.row.key) {
                Some(0) => return None,
                Some(&pending) => {
                    let price = to_decimal(a.row.unit_price);
                    a.row.quantity = pending;
                    a.row.paid_count = a.row.paid_count.min(pending);
                    a.total = price * Decimal::from(pending);
                    a.unpaid = a.total - price * Decimal::from(a.row.paid_count);
                }
                None => {}
            }
            a.row.total_price = to_f64(a.total);
            a.row.unpaid_amount = to_f64(a.unpaid);
            Some(a.row)
        })
        .collect();

    // 稳定排序: 同名保持首次出现顺序
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Authoritative quantity of one variant, ignoring any overlay
pub fn real_quantity(orders: &[Order], key: &VariantKey) -> u32 {
    orders
        .iter()
        .filter(|o| !o.status.is_cancelled())
        .flat_map(|o| &o.items)
        .filter(|item| key.matches(item))
        .map(|item| item.quantity)
        .sum()
}

/// The table's live session: non-cancelled orders that are not yet settled
pub fn session_orders<'a>(orders: &'a [Order], table_id: &str) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|o| o.table_id == table_id && !o.status.is_cancelled() && !o.is_settled())
        .collect()
}

pub fn is_session_active(orders: &[Order], table_id: &str) -> bool {
    !session_orders(orders, table_id).is_empty()
}

/// 账单汇总, 供外部 PDF 渲染使用
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    pub subtotal: f64,
    pub paid_amount: f64,
    pub amount_due: f64,
    pub item_count: u32,
}

pub fn bill_summary(rows: &[AggregateRow]) -> BillSummary {
    let subtotal: Decimal = rows.iter().map(|r| to_decimal(r.total_price)).sum();
    let due: Decimal = rows.iter().map(|r| to_decimal(r.unpaid_amount)).sum();
    BillSummary {
        subtotal: to_f64(subtotal),
        paid_amount: to_f64(subtotal - due),
        amount_due: to_f64(due),
        item_count: rows.iter().map(|r| r.quantity).sum(),
    }
}
