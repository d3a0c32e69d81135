//! Kitchen Kanban
//!
//! Three display columns derived from backend status. Columns are never
//! mutated locally: a move is one status PATCH, and membership changes only
//! when the next fetch says so.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{Order, OrderStatus};
use std::sync::Arc;

use super::mapper::{KitchenOrder, map_to_kitchen_order};
use crate::{ClientError, ClientResult, OrderApi};

/// 看板列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KitchenBucket {
    New,
    InProgress,
    Completed,
}

impl KitchenBucket {
    /// Status a forward move out of this column issues
    pub fn forward_status(&self) -> Option<OrderStatus> {
        match self {
            Self::New => Some(OrderStatus::Preparing),
            Self::InProgress => Some(OrderStatus::Ready),
            Self::Completed => None,
        }
    }
}

/// `None` for statuses excluded from the board
pub fn map_bucket(status: OrderStatus) -> Option<KitchenBucket> {
    match status {
        OrderStatus::Pending | OrderStatus::Confirmed => Some(KitchenBucket::New),
        OrderStatus::Preparing => Some(KitchenBucket::InProgress),
        OrderStatus::Ready => Some(KitchenBucket::Completed),
        OrderStatus::Served
        | OrderStatus::Completed
        | OrderStatus::Cancelled
        | OrderStatus::Unknown => None,
    }
}

/// 看板快照, 每列按下单时间升序
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanBoard {
    pub new: Vec<KitchenOrder>,
    pub in_progress: Vec<KitchenOrder>,
    pub completed: Vec<KitchenOrder>,
}

impl KanbanBoard {
    pub fn from_orders(orders: &[Order], now: DateTime<Utc>) -> Self {
        let mut board = Self::default();
        for ticket in orders.iter().filter_map(|o| map_to_kitchen_order(o, now)) {
            match ticket.bucket {
                KitchenBucket::New => board.new.push(ticket),
                KitchenBucket::InProgress => board.in_progress.push(ticket),
                KitchenBucket::Completed => board.completed.push(ticket),
            }
        }
        // sort_by_key 是稳定排序
        for column in [&mut board.new, &mut board.in_progress, &mut board.completed] {
            column.sort_by_key(|t| t.created_at);
        }
        board
    }

    pub fn column(&self, bucket: KitchenBucket) -> &[KitchenOrder] {
        match bucket {
            KitchenBucket::New => &self.new,
            KitchenBucket::InProgress => &self.in_progress,
            KitchenBucket::Completed => &self.completed,
        }
    }

    pub fn find(&self, order_id: &str) -> Option<&KitchenOrder> {
        self.new
            .iter()
            .chain(&self.in_progress)
            .chain(&self.completed)
            .find(|t| t.id == order_id)
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.in_progress.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Order ids per column, for comparing boards regardless of elapsed labels
    pub fn ids(&self) -> [Vec<&str>; 3] {
        [
            self.new.iter().map(|t| t.id.as_str()).collect(),
            self.in_progress.iter().map(|t| t.id.as_str()).collect(),
            self.completed.iter().map(|t| t.id.as_str()).collect(),
        ]
    }
}

/// 看板操作: 每次移动恰好一次 PATCH
#[derive(Clone)]
pub struct KanbanController {
    api: Arc<dyn OrderApi>,
}

impl KanbanController {
    pub fn new(api: Arc<dyn OrderApi>) -> Self {
        Self { api }
    }

    /// Move a ticket one column forward; returns the status that was issued
    pub async fn advance(&self, ticket: &KitchenOrder) -> ClientResult<OrderStatus> {
        let next = ticket
            .bucket
            .forward_status()
            .ok_or_else(|| ClientError::NoForwardTransition(ticket.status.to_string()))?;

        self.api.update_status(&ticket.id, next).await?;
        tracing::info!(order_id = %ticket.id, status = %next, "Kitchen ticket advanced");
        Ok(next)
    }

    /// Front of house picked up a finished ticket (`ready → served`)
    pub async fn mark_served(&self, ticket: &KitchenOrder) -> ClientResult<()> {
        if ticket.bucket != KitchenBucket::Completed {
            return Err(ClientError::NoForwardTransition(ticket.status.to_string()));
        }
        self.api
            .update_status(&ticket.id, OrderStatus::Served)
            .await?;
        tracing::info!(order_id = %ticket.id, "Order served");
        Ok(())
    }
}
