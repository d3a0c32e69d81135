//! Realtime Sync Controller
//!
//! Keeps a [`SyncSnapshot`] current. Push events are only invalidation
//! signals: on every connect, every relevant order event and every explicit
//! refresh the controller pulls the authoritative state again over HTTP.
//! Event payloads are read only to decide whether a refetch is due.

use chrono::{DateTime, Utc};
use shared::message::{EventType, OrderPushEvent, SyncPayload};
use shared::models::{DiningTable, Order, OrderQuery};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::message::{BusMessage, ConnectionState, MessageClient};
use crate::orders::{KanbanBoard, PastOrder, map_to_customer_order};
use crate::{ClientResult, OrderApi};

/// Who the client is syncing for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncContext {
    /// Customer at one table
    Table { table_id: String },
    /// Staff: every order, the table roster and the kitchen queue
    Staff,
}

/// 同步快照
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    /// Table orders (customer) or all orders (staff)
    pub orders: Vec<Order>,
    pub customer_orders: Vec<PastOrder>,
    /// Staff only
    pub tables: Vec<DiningTable>,
    /// Staff only: `GET /orders/kitchen/active` as fetched
    pub kitchen_queue: Vec<Order>,
    pub kitchen: KanbanBoard,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Bumped on every successful refetch
    pub version: u64,
}

/// Cheap handle asking the controller for a refetch
///
/// Requests made while one is already queued coalesce.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    pub fn request(&self) {
        let _ = self.tx.try_send(());
    }
}

/// 实时同步控制器
#[derive(Debug, Clone)]
pub struct RealtimeSyncController {
    snapshot_rx: watch::Receiver<SyncSnapshot>,
    refresh: RefreshHandle,
    shutdown: CancellationToken,
}

impl RealtimeSyncController {
    /// Start syncing; without a push client only explicit refreshes refetch
    pub fn spawn(
        api: Arc<dyn OrderApi>,
        messages: Option<MessageClient>,
        context: SyncContext,
    ) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(SyncSnapshot::default());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let worker = SyncWorker {
            api,
            context,
            snapshot_tx,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(worker.run(messages, refresh_rx));

        Self {
            snapshot_rx,
            refresh: RefreshHandle { tx: refresh_tx },
            shutdown,
        }
    }

    pub fn snapshot(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// Ask for a refetch (e.g. after an edit settled)
    pub fn refresh(&self) {
        self.refresh.request();
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

struct SyncWorker {
    api: Arc<dyn OrderApi>,
    context: SyncContext,
    snapshot_tx: watch::Sender<SyncSnapshot>,
    shutdown: CancellationToken,
}

impl SyncWorker {
    async fn run(self, messages: Option<MessageClient>, mut refresh_rx: mpsc::Receiver<()>) {
        let mut events = messages.as_ref().map(|m| m.subscribe());
        let mut state = messages.as_ref().map(|m| m.state());

        let connected = state
            .as_mut()
            .map(|s| *s.borrow_and_update() == ConnectionState::Connected);
        if connected != Some(false) {
            self.refetch().await;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                changed = next_state(&mut state) => match changed {
                    Some(ConnectionState::Connected) => {
                        tracing::info!("Push channel connected, refetching");
                        self.refetch().await;
                    }
                    Some(other) => tracing::debug!(state = ?other, "Push channel state"),
                    None => {
                        tracing::warn!("Push channel supervisor stopped");
                        state = None;
                    }
                },

                msg = next_event(&mut events) => match msg {
                    Ok(msg) => {
                        if self.is_relevant(&msg) {
                            self.refetch().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Push events lagged, refetching");
                        self.refetch().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events = None;
                    }
                },

                Some(()) = refresh_rx.recv() => self.refetch().await,
            }
        }

        tracing::debug!("Sync controller stopped");
    }

    fn is_relevant(&self, msg: &BusMessage) -> bool {
        if msg.event_type != EventType::Sync {
            return false;
        }
        let event = match msg.parse_payload::<SyncPayload>() {
            Ok(payload) => OrderPushEvent::from_sync(&payload),
            Err(e) => {
                tracing::debug!("Ignoring undecodable sync payload: {}", e);
                None
            }
        };
        let Some(event) = event else {
            return false;
        };

        match (&self.context, event.table_id()) {
            (SyncContext::Table { table_id }, Some(other)) if other != table_id.as_str() => {
                tracing::trace!(order_id = event.order_id(), "Event for another table");
                false
            }
            _ => true,
        }
    }

    async fn refetch(&self) {
        match self.fetch().await {
            Ok(mut snapshot) => {
                self.snapshot_tx.send_modify(|current| {
                    snapshot.version = current.version + 1;
                    *current = snapshot;
                });
            }
            // 保留旧状态, 下一次事件或重连会再次拉取
            Err(e) => tracing::warn!("Refetch failed: {}", e),
        }
    }

    async fn fetch(&self) -> ClientResult<SyncSnapshot> {
        let now = Utc::now();
        let mut snapshot = match &self.context {
            SyncContext::Table { table_id } => {
                let orders = self.api.list_orders(&OrderQuery::for_table(table_id)).await?;
                SyncSnapshot {
                    orders,
                    ..SyncSnapshot::default()
                }
            }
            SyncContext::Staff => {
                let query = OrderQuery::all();
                let (orders, tables, kitchen_queue) = futures::try_join!(
                    self.api.list_orders(&query),
                    self.api.list_tables(),
                    self.api.kitchen_active(),
                )?;
                let kitchen = KanbanBoard::from_orders(&kitchen_queue, now);
                SyncSnapshot {
                    orders,
                    tables,
                    kitchen_queue,
                    kitchen,
                    ..SyncSnapshot::default()
                }
            }
        };
        snapshot.customer_orders = snapshot.orders.iter().map(map_to_customer_order).collect();
        snapshot.fetched_at = Some(now);
        Ok(snapshot)
    }
}

/// Next connection state; `None` once the supervisor is gone. Pends forever without a client.
async fn next_state(state: &mut Option<watch::Receiver<ConnectionState>>) -> Option<ConnectionState> {
    match state {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<BusMessage>>,
) -> Result<BusMessage, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
