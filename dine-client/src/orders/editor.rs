//! Table session editor
//!
//! What the host calls when a user changes a quantity. The overlay updates
//! at once, the debouncer batches clicks, and the engine runs once per
//! settled edit. Whatever the outcome, the overlay entry that edit wrote is
//! dropped and a refetch is requested; failures become dismissable notices.
//! An entry rewritten by a later edit stays until that edit settles.

use shared::message::{NotificationCategory, NotificationPayload};
use shared::models::Order;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::broadcast;

use super::aggregate::{AggregateRow, aggregate};
use super::money::validate_target;
use super::overlay::{EditDebouncer, OptimisticOverlay, SettledEdit};
use super::reconcile::{ReconcileOutcome, ReconciliationEngine};
use super::variant::VariantKey;
use crate::sync::RefreshHandle;
use crate::{ClientConfig, ClientError, ClientResult};

/// 单桌编辑器
#[derive(Clone)]
pub struct TableSessionEditor {
    inner: Arc<EditorInner>,
}

struct EditorInner {
    table_id: String,
    engine: ReconciliationEngine,
    debouncer: EditDebouncer,
    stale_after: Duration,
    notices: broadcast::Sender<NotificationPayload>,
    refresh: OnceLock<RefreshHandle>,
}

impl TableSessionEditor {
    pub fn new(
        table_id: impl Into<String>,
        engine: ReconciliationEngine,
        config: &ClientConfig,
    ) -> Self {
        let (notices, _) = broadcast::channel(64);
        // 超过防抖窗口加执行超时仍未清除的条目视为悬挂
        let stale_after = config.edit_debounce + config.reconcile_timeout + Duration::from_secs(5);
        Self {
            inner: Arc::new(EditorInner {
                table_id: table_id.into(),
                engine,
                debouncer: EditDebouncer::new(OptimisticOverlay::new(), config.edit_debounce),
                stale_after,
                notices,
                refresh: OnceLock::new(),
            }),
        }
    }

    /// Request a refetch through `refresh` whenever an edit settles
    ///
    /// Only the first handle given is kept.
    pub fn with_refresh(self, refresh: RefreshHandle) -> Self {
        let _ = self.inner.refresh.set(refresh);
        self
    }

    pub fn table_id(&self) -> &str {
        &self.inner.table_id
    }

    pub fn overlay(&self) -> &OptimisticOverlay {
        self.inner.debouncer.overlay()
    }

    /// Dismissable notices about failed or incomplete edits
    pub fn subscribe_notices(&self) -> broadcast::Receiver<NotificationPayload> {
        self.inner.notices.subscribe()
    }

    /// Rows to render for this table, overlay applied
    pub fn rows(&self, orders: &[Order]) -> Vec<AggregateRow> {
        let overlay = self.overlay();
        overlay.clear_stale(self.inner.stale_after);
        let table_orders: Vec<Order> = orders
            .iter()
            .filter(|o| o.table_id == self.inner.table_id)
            .cloned()
            .collect();
        aggregate(&table_orders, &overlay.snapshot())
    }

    /// Quantity currently shown for `row`
    pub fn displayed_quantity(&self, row: &AggregateRow) -> u32 {
        self.overlay().get(&row.key).unwrap_or(row.quantity)
    }

    /// Set the total for a row; the request goes out after the debounce window
    pub fn set_quantity(&self, row: &AggregateRow, target: i64) -> ClientResult<()> {
        let target = validate_target(target)?;
        let editor = self.clone();
        let template = row.template.clone();
        self.inner
            .debouncer
            .schedule(row.key.clone(), target, move |edit: SettledEdit| async move {
                let result = editor
                    .inner
                    .engine
                    .reconcile(
                        &editor.inner.table_id,
                        &edit.key,
                        i64::from(edit.target),
                        Some(&template),
                    )
                    .await;
                editor.settle(&edit.key, edit.generation, &result);
            });
        Ok(())
    }

    pub fn increment(&self, row: &AggregateRow) -> ClientResult<()> {
        self.set_quantity(row, i64::from(self.displayed_quantity(row)) + 1)
    }

    pub fn decrement(&self, row: &AggregateRow) -> ClientResult<()> {
        self.set_quantity(row, i64::from(self.displayed_quantity(row)) - 1)
    }

    /// Remove every unit of the variant, without waiting for a debounce window
    pub async fn remove_variant(&self, row: &AggregateRow) -> ClientResult<ReconcileOutcome> {
        let debouncer = &self.inner.debouncer;
        debouncer.cancel(&row.key);
        let generation = debouncer.overlay().set(row.key.clone(), 0);

        let result = self
            .inner
            .engine
            .reconcile(&self.inner.table_id, &row.key, 0, Some(&row.template))
            .await;
        self.settle(&row.key, generation, &result);
        result
    }

    fn settle(&self, key: &VariantKey, generation: u64, result: &ClientResult<ReconcileOutcome>) {
        if !self.overlay().clear_if(key, generation) {
            tracing::debug!(variant = %key, "Newer edit pending, overlay kept");
        }
        if let Some(refresh) = self.inner.refresh.get() {
            refresh.request();
        }

        let notice = match result {
            Ok(outcome) if outcome.plan.shortfall > 0 => Some(
                NotificationPayload::warning(
                    "Some items could not be removed",
                    format!(
                        "{} unit(s) are in orders that were already served",
                        outcome.plan.shortfall
                    ),
                )
                .with_data(serde_json::json!({ "variant": key.to_string() }))
                .with_category(NotificationCategory::Business),
            ),
            Ok(_) => None,
            Err(e) => Some(notice_for(key, e)),
        };

        if let Some(notice) = notice {
            let _ = self.inner.notices.send(notice);
        }
    }
}

fn notice_for(key: &VariantKey, err: &ClientError) -> NotificationPayload {
    tracing::warn!(variant = %key, "Quantity edit failed: {}", err);
    let code = err.code();
    let mut data = serde_json::json!({
        "code": code.code(),
        "category": code.category(),
        "variant": key.to_string(),
    });

    let notice = match err {
        ClientError::PartialReconciliation {
            cancelled_order_id,
            lost_items,
            ..
        } => {
            data["cancelledOrderId"] = serde_json::json!(cancelled_order_id);
            data["lostItems"] = serde_json::json!(lost_items);
            NotificationPayload::error(
                "Order partially updated",
                format!(
                    "Order {} was cancelled but its replacement could not be created. Please check the table.",
                    cancelled_order_id
                ),
            )
        }
        ClientError::NoCancelableOrder(_) => NotificationPayload::warning(
            "Nothing to remove",
            "All units of this item are already served or paid",
        ),
        ClientError::Timeout(_) => NotificationPayload::warning(
            "Update timed out",
            "The change may not have been applied; the table will refresh",
        ),
        other => NotificationPayload::error("Update failed", other.to_string()),
    };

    let category = if err.is_transient() {
        NotificationCategory::Network
    } else {
        NotificationCategory::Business
    };
    notice.with_data(data).with_category(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::NotificationLevel;
    use shared::models::OrderItemInput;

    #[test]
    fn test_notice_for_partial_reconciliation() {
        let key = VariantKey::new("m-1", None, Vec::<String>::new());
        let err = ClientError::PartialReconciliation {
            cancelled_order_id: "o-7".into(),
            lost_items: vec![OrderItemInput {
                item_id: "m-2".into(),
                quantity: 2,
                spice_level: None,
                customizations: None,
                special_instructions: None,
            }],
            source: Box::new(ClientError::Internal("503".into())),
        };
        let notice = notice_for(&key, &err);
        assert_eq!(notice.level, NotificationLevel::Error);
        let data = notice.data.unwrap();
        assert_eq!(data["cancelledOrderId"], "o-7");
        assert_eq!(data["lostItems"][0]["itemId"], "m-2");
        assert_eq!(data["code"], 4005);
        assert_eq!(data["category"], "order");
        assert_eq!(notice.category, NotificationCategory::Business);
    }

    #[test]
    fn test_notice_levels() {
        let key = VariantKey::new("m-1", None, Vec::<String>::new());
        let notice = notice_for(&key, &ClientError::NoCancelableOrder(key.to_string()));
        assert_eq!(notice.level, NotificationLevel::Warning);
        let notice = notice_for(&key, &ClientError::Unauthorized);
        assert_eq!(notice.level, NotificationLevel::Error);
        assert_eq!(notice.data.unwrap()["category"], "auth");

        let notice = notice_for(&key, &ClientError::Timeout("15s".into()));
        assert_eq!(notice.level, NotificationLevel::Warning);
        assert_eq!(notice.category, NotificationCategory::Network);
    }
}
