//! Data models
//!
//! Wire types for the ordering backend's REST API. Field names follow the
//! backend's camelCase JSON; ids are kept as strings because the backend
//! emits both numeric and string ids.

pub mod dining_table;
pub mod order;

// Re-exports
pub use dining_table::*;
pub use order::*;
