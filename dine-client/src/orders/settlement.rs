//! Payment and table settlement
//!
//! Both operations act on the table's live session, fetched fresh, and stop
//! at the first failed request. Orders already handled stay handled; the
//! error says how far it got.

use serde::Serialize;
use shared::models::{OrderQuery, OrderStatus, PaymentStatus};
use std::sync::Arc;

use super::aggregate::session_orders;
use crate::{ClientError, ClientResult, OrderApi};

/// 结账结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub table_id: String,
    /// Orders fully processed, in request order
    pub settled: Vec<String>,
}

#[derive(Clone)]
pub struct SettlementService {
    api: Arc<dyn OrderApi>,
}

impl SettlementService {
    pub fn new(api: Arc<dyn OrderApi>) -> Self {
        Self { api }
    }

    /// Customer asks for the bill: every unsettled order goes to `Requested`
    pub async fn request_payment(&self, table_id: &str) -> ClientResult<SettlementReport> {
        let orders = self.api.list_orders(&OrderQuery::for_table(table_id)).await?;
        let mut report = SettlementReport {
            table_id: table_id.to_string(),
            settled: Vec::new(),
        };

        for order in session_orders(&orders, table_id) {
            if order.payment_status == PaymentStatus::Requested || order.payment_status.is_approved() {
                continue;
            }
            self.api
                .update_payment(&order.id, PaymentStatus::Requested)
                .await
                .map_err(|e| partial(&report, e))?;
            report.settled.push(order.id.clone());
        }

        tracing::info!(table_id, orders = report.settled.len(), "Payment requested");
        Ok(report)
    }

    /// Staff settles the table: payment `Approved`, then status `completed`
    pub async fn settle_and_clear(&self, table_id: &str) -> ClientResult<SettlementReport> {
        let orders = self.api.list_orders(&OrderQuery::for_table(table_id)).await?;
        let mut report = SettlementReport {
            table_id: table_id.to_string(),
            settled: Vec::new(),
        };

        for order in session_orders(&orders, table_id) {
            if !order.payment_status.is_approved() {
                self.api
                    .update_payment(&order.id, PaymentStatus::Approved)
                    .await
                    .map_err(|e| partial(&report, e))?;
            }
            if !order.status.is_fulfilled() {
                self.api
                    .update_status(&order.id, OrderStatus::Completed)
                    .await
                    .map_err(|e| partial(&report, e))?;
            }
            report.settled.push(order.id.clone());
        }

        tracing::info!(table_id, orders = report.settled.len(), "Table settled and cleared");
        Ok(report)
    }
}

fn partial(report: &SettlementReport, source: ClientError) -> ClientError {
    if report.settled.is_empty() {
        return source;
    }
    tracing::warn!(
        table_id = %report.table_id,
        done = report.settled.len(),
        "Settlement stopped part way: {}",
        source
    );
    ClientError::Api {
        code: source.code(),
        message: format!(
            "{} order(s) on table {} were settled before the failure: {}",
            report.settled.len(),
            report.table_id,
            source
        ),
    }
}
