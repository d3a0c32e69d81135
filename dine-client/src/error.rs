//! Client error types

use shared::error::{AppError, ErrorCode};
use shared::models::OrderItemInput;
use thiserror::Error;

use crate::message::MessageError;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a structured error body
    #[error("API error {code}: {message}")]
    Api { code: ErrorCode, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected before any network call, or by the backend with 400
    #[error("Validation error: {0}")]
    Validation(String),

    /// No unsettled order carries the variant being decremented
    #[error("No cancelable order found for {0}")]
    NoCancelableOrder(String),

    /// Cancel succeeded, the replacement create did not.
    ///
    /// The table is now under-counted by `lost_items`; the operator has to
    /// verify and correct it by hand.
    #[error("Order {cancelled_order_id} was cancelled but its replacement failed: {source}")]
    PartialReconciliation {
        cancelled_order_id: String,
        lost_items: Vec<OrderItemInput>,
        #[source]
        source: Box<ClientError>,
    },

    /// Kanban move requested from a column with no forward transition
    #[error("No forward transition from {0}")]
    NoForwardTransition(String),

    /// Operation exceeded its time bound
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Push channel error
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Stable error code for host-side localization
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Http(e) if e.is_timeout() => ErrorCode::TimeoutError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::Api { code, .. } => *code,
            Self::InvalidResponse(_) => ErrorCode::InvalidFormat,
            Self::Unauthorized => ErrorCode::NotAuthenticated,
            Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::NoCancelableOrder(_) => ErrorCode::NoCancelableOrder,
            Self::PartialReconciliation { .. } => ErrorCode::PartialReconciliation,
            Self::NoForwardTransition(_) => ErrorCode::InvalidStatusTransition,
            Self::Timeout(_) => ErrorCode::TimeoutError,
            Self::Message(_) => ErrorCode::ClientDisconnected,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Serialization(_) => ErrorCode::InvalidFormat,
        }
    }

    /// Transient failures the user may simply try again
    pub fn is_transient(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::NetworkError | ErrorCode::TimeoutError | ErrorCode::ClientDisconnected
        )
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        ClientError::Api {
            code: err.code,
            message: err.message,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
