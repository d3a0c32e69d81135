//! Dine Client - table-session ordering client
//!
//! Talks to the ordering backend over HTTP and listens on its push channel.
//! On top of that it keeps per-table sessions editable line by line even
//! though the backend only knows whole orders, and keeps the kitchen board
//! in sync.

pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod message;
pub mod orders;
pub mod sync;

pub use config::{ClientConfig, CustomerInfo};
pub use error::{ClientError, ClientResult};
pub use http::{NetworkHttpClient, OrderApi};

// Message types and clients
pub use message::{
    BusMessage, ConnectionState, EventType, MessageClient, MessageClientConfig, MessageError,
    PushTarget,
};

pub use orders::{
    AggregateRow, BillSummary, KanbanBoard, KanbanController, KitchenBucket, KitchenOrder,
    OptimisticOverlay, PastOrder, ReconcilePlan, ReconcileStep, ReconciliationEngine,
    TableSessionEditor, VariantKey,
};
pub use sync::{RealtimeSyncController, SyncContext, SyncSnapshot};
