//! Table session core
//!
//! - **mapper**: raw orders into customer and kitchen views
//! - **aggregate**: per-variant rows for one table, paid/unpaid split
//! - **reconcile**: quantity changes as cancel/create plans, and their execution
//! - **overlay**: optimistic quantities and the edit debouncer
//! - **editor**: ties overlay, debouncer and engine together for one table
//! - **kitchen**: kanban columns and moves
//! - **settlement**: bill request and settle & clear
//!
//! # Data Flow
//!
//! ```text
//! push event → refetch → mapper / aggregate → host renders rows
//!                                                 ↓
//!                                            user edit
//!                                                 ↓
//!                               overlay (instant) → debouncer → engine
//!                                                                  ↓
//!                                                   cancel/create → refetch
//! ```

pub mod aggregate;
pub mod editor;
pub mod kitchen;
pub mod mapper;
pub mod money;
pub mod overlay;
pub mod reconcile;
pub mod settlement;
pub mod variant;

// Re-exports
pub use aggregate::{
    AggregateRow, BillSummary, aggregate, bill_summary, is_session_active, real_quantity,
    session_orders,
};
pub use editor::TableSessionEditor;
pub use kitchen::{KanbanBoard, KanbanController, KitchenBucket, map_bucket};
pub use mapper::{
    KitchenLine, KitchenOrder, PastOrder, PastOrderLine, elapsed_label, map_to_customer_order,
    map_to_kitchen_order,
};
pub use overlay::{EditDebouncer, OptimisticOverlay, SettledEdit};
pub use reconcile::{
    ReconcileOutcome, ReconcilePlan, ReconcileStep, ReconciliationEngine, plan_reconciliation,
};
pub use settlement::{SettlementReport, SettlementService};
pub use variant::VariantKey;
