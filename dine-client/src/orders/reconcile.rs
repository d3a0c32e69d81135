//! Reconciliation Engine
//!
//! The backend can create, cancel and re-status whole orders but cannot edit
//! a line inside one. Changing how many units of a variant a table has is
//! therefore a diff against the table's orders, replayed as cancel/create
//! calls:
//!
//! - more units: one new order carrying the difference
//! - fewer units: cancel the newest unlocked orders that carry the variant,
//!   and re-create each of them without the consumed units (every other
//!   line goes back unchanged)
//!
//! [`plan_reconciliation`] computes the steps and is pure.
//! [`ReconciliationEngine`] fetches fresh orders, plans and executes.

use serde::Serialize;
use shared::models::{CreateOrderRequest, Order, OrderItemInput, OrderQuery, OrderType};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

use super::aggregate::{is_session_active, real_quantity};
use super::money::validate_target;
use super::variant::VariantKey;
use crate::{ClientConfig, ClientError, ClientResult, CustomerInfo, OrderApi};

/// 对账步骤
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReconcileStep {
    /// New order with extra units of the variant
    Create {
        items: Vec<OrderItemInput>,
        order_type: OrderType,
    },
    /// Cancel an order whose every line is consumed
    Cancel { order_id: String, removed: u32 },
    /// Cancel an order and re-create what must survive of it (always `addon`)
    CancelAndReplace {
        order_id: String,
        removed: u32,
        replacement: Vec<OrderItemInput>,
    },
}

/// 对账计划
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePlan {
    pub table_id: String,
    pub key: VariantKey,
    pub target: u32,
    /// Authoritative quantity the plan was computed against
    pub real: u32,
    pub steps: Vec<ReconcileStep>,
    /// Units that could not be removed because only locked orders hold them
    pub shortfall: u32,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    /// Quantity the table ends up with once every step succeeds
    pub fn resulting_quantity(&self) -> u32 {
        let added: u32 = self
            .steps
            .iter()
            .map(|s| match s {
                ReconcileStep::Create { items, .. } => items.iter().map(|i| i.quantity).sum(),
                _ => 0,
            })
            .sum();
        let removed: u32 = self
            .steps
            .iter()
            .map(|s| match s {
                ReconcileStep::Cancel { removed, .. }
                | ReconcileStep::CancelAndReplace { removed, .. } => *removed,
                ReconcileStep::Create { .. } => 0,
            })
            .sum();
        self.real + added - removed
    }
}

/// Compute the steps that move `key` on `table_id` to `target` units
///
/// `orders` must be the table's authoritative orders, fetched just before.
/// `template` describes the line to copy when units are added; without one
/// the first matching line in `orders` is used.
pub fn plan_reconciliation(
    orders: &[Order],
    table_id: &str,
    key: &VariantKey,
    target: u32,
    template: Option<&OrderItemInput>,
) -> ClientResult<ReconcilePlan> {
    let table_orders: Vec<Order> = orders
        .iter()
        .filter(|o| o.table_id == table_id)
        .cloned()
        .collect();
    let real = real_quantity(&table_orders, key);

    let mut plan = ReconcilePlan {
        table_id: table_id.to_string(),
        key: key.clone(),
        target,
        real,
        steps: Vec::new(),
        shortfall: 0,
    };

    if target > real {
        let mut line = match template {
            Some(t) => t.clone(),
            None => table_orders
                .iter()
                .flat_map(|o| &o.items)
                .find(|item| key.matches(item))
                .map(|item| OrderItemInput::from_item(item, 0))
                .ok_or_else(|| {
                    ClientError::Validation(format!("no line to copy for variant {}", key))
                })?,
        };
        line.quantity = target - real;
        let order_type = if is_session_active(&table_orders, table_id) {
            OrderType::Addon
        } else {
            OrderType::Regular
        };
        plan.steps.push(ReconcileStep::Create {
            items: vec![line],
            order_type,
        });
    } else if target < real {
        plan_decrease(&table_orders, key, real - target, &mut plan)?;
    }

    Ok(plan)
}

fn plan_decrease(
    orders: &[Order],
    key: &VariantKey,
    to_remove: u32,
    plan: &mut ReconcilePlan,
) -> ClientResult<()> {
    // 候选: 含该变体且未锁定, 最新优先; 同一时间时列表中靠后的优先
    let mut candidates: Vec<(usize, &Order)> = orders
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.status.is_locked() && o.items.iter().any(|i| key.matches(i)))
        .collect();
    if candidates.is_empty() {
        return Err(ClientError::NoCancelableOrder(key.to_string()));
    }
    candidates.sort_by_key(|(idx, o)| Reverse((o.created_at, *idx)));

    let mut removed = 0u32;
    for (_, order) in candidates {
        if removed >= to_remove {
            break;
        }
        let mut take = to_remove - removed;
        let mut consumed = 0u32;
        let mut replacement = Vec::with_capacity(order.items.len());

        for item in &order.items {
            if key.matches(item) {
                let used = item.quantity.min(take);
                take -= used;
                consumed += used;
                if item.quantity > used {
                    replacement.push(OrderItemInput::from_item(item, item.quantity - used));
                }
            } else {
                replacement.push(OrderItemInput::from_item(item, item.quantity));
            }
        }

        removed += consumed;
        plan.steps.push(if replacement.is_empty() {
            ReconcileStep::Cancel {
                order_id: order.id.clone(),
                removed: consumed,
            }
        } else {
            ReconcileStep::CancelAndReplace {
                order_id: order.id.clone(),
                removed: consumed,
                replacement,
            }
        });
    }

    plan.shortfall = to_remove - removed;
    Ok(())
}

/// Result of one engine run
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub plan: ReconcilePlan,
    /// Orders created by `Create` and replacement steps
    pub created: Vec<Order>,
}

/// 对账执行器
///
/// Runs for the same table are serialized; different tables run in parallel.
#[derive(Clone)]
pub struct ReconciliationEngine {
    api: Arc<dyn OrderApi>,
    restaurant_id: String,
    customer: CustomerInfo,
    timeout: Duration,
    table_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ReconciliationEngine {
    pub fn new(api: Arc<dyn OrderApi>, config: &ClientConfig) -> Self {
        Self {
            api,
            restaurant_id: config.restaurant_id.clone(),
            customer: config.customer.clone(),
            timeout: config.reconcile_timeout,
            table_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn api(&self) -> &Arc<dyn OrderApi> {
        &self.api
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn table_lock(&self, table_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.table_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(table_id.to_string()).or_default().clone()
    }

    /// Bring `key` on `table_id` to `target` units
    ///
    /// The target is validated before any request. Planning always uses a
    /// fresh fetch of the table's orders.
    ///
    /// The run shares one deadline (`reconcile_timeout`). Waiting for the
    /// table, the fetch and every request are cut at that deadline. A
    /// replacement create cut after its cancel went through is reported as
    /// [`ClientError::PartialReconciliation`], never as a bare timeout.
    pub async fn reconcile(
        &self,
        table_id: &str,
        key: &VariantKey,
        target: i64,
        template: Option<&OrderItemInput>,
    ) -> ClientResult<ReconcileOutcome> {
        let target = validate_target(target)?;
        let deadline = Instant::now() + self.timeout;
        let timed_out = || {
            tracing::warn!(table_id, variant = %key, "Reconciliation timed out");
            ClientError::Timeout(format!(
                "reconciling {} on table {} took longer than {:?}",
                key, table_id, self.timeout
            ))
        };

        let lock = self.table_lock(table_id);
        let _guard = timeout_at(deadline, lock.lock())
            .await
            .map_err(|_| timed_out())?;

        let orders = timeout_at(deadline, self.api.list_orders(&OrderQuery::for_table(table_id)))
            .await
            .map_err(|_| timed_out())??;
        let plan = plan_reconciliation(&orders, table_id, key, target, template)?;

        if plan.is_noop() {
            tracing::debug!(table_id, variant = %key, target, "Nothing to reconcile");
            return Ok(ReconcileOutcome {
                plan,
                created: Vec::new(),
            });
        }

        tracing::info!(
            table_id,
            variant = %key,
            real = plan.real,
            target,
            steps = plan.steps.len(),
            "Executing reconciliation plan"
        );
        if plan.shortfall > 0 {
            tracing::warn!(
                table_id,
                variant = %key,
                shortfall = plan.shortfall,
                "Locked orders hold units that cannot be removed"
            );
        }

        let mut created = Vec::new();
        for step in &plan.steps {
            match step {
                ReconcileStep::Create { items, order_type } => {
                    let order = timeout_at(deadline, self.create(table_id, items.clone(), *order_type))
                        .await
                        .map_err(|_| timed_out())??;
                    created.push(order);
                }
                ReconcileStep::Cancel { order_id, .. } => {
                    timeout_at(deadline, self.api.cancel_order(order_id))
                        .await
                        .map_err(|_| timed_out())??;
                }
                ReconcileStep::CancelAndReplace {
                    order_id,
                    replacement,
                    ..
                } => {
                    timeout_at(deadline, self.api.cancel_order(order_id))
                        .await
                        .map_err(|_| timed_out())??;
                    // 取消已生效, 之后的失败都必须带上丢失的行
                    let replaced = timeout_at(
                        deadline,
                        self.create(table_id, replacement.clone(), OrderType::Addon),
                    )
                    .await
                    .unwrap_or_else(|_| Err(timed_out()));
                    match replaced {
                        Ok(order) => created.push(order),
                        Err(e) => {
                            tracing::error!(
                                table_id,
                                order_id = %order_id,
                                "Replacement order failed after cancel: {}",
                                e
                            );
                            return Err(ClientError::PartialReconciliation {
                                cancelled_order_id: order_id.clone(),
                                lost_items: replacement.clone(),
                                source: Box::new(e),
                            });
                        }
                    }
                }
            }
        }

        Ok(ReconcileOutcome { plan, created })
    }

    async fn create(
        &self,
        table_id: &str,
        items: Vec<OrderItemInput>,
        order_type: OrderType,
    ) -> ClientResult<Order> {
        let request = CreateOrderRequest {
            table_id: table_id.to_string(),
            items,
            customer_name: self.customer.name.clone(),
            customer_phone: self.customer.phone.clone(),
            restaurant_id: self.restaurant_id.clone(),
            order_type,
        };
        self.api.create_order(&request).await
    }
}
