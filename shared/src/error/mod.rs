//! Unified error system for the dine platform
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Error/success body exchanged with the backend
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::NoCancelableOrder, "nothing to cancel")
//!     .with_detail("table_id", 4);
//! assert_eq!(err.code.code(), 4004);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};

/// Result alias using [`AppError`]
pub type AppResult<T> = Result<T, AppError>;
