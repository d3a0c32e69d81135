//! Shared types for the dine ordering platform
//!
//! Wire types used by both the ordering backend and its clients: order and
//! table models, push-channel frames and payloads, and unified error codes.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{BusMessage, EventType};
