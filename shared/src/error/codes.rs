//! Unified error codes for the dine platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so hosts written in other
/// languages can localize them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order already cancelled
    OrderAlreadyCancelled = 4002,
    /// Order is settled and can no longer change
    OrderSettled = 4003,
    /// No order holds a cancelable line for the variant
    NoCancelableOrder = 4004,
    /// Cancel succeeded but the replacement order was not created
    PartialReconciliation = 4005,
    /// Status transition not allowed from the current state
    InvalidStatusTransition = 4006,
    /// Not enough unsettled units to reach the requested quantity
    InsufficientQuantity = 4007,
    /// Order has no items
    OrderEmpty = 4008,

    // ==================== 5xxx: Payment ====================
    /// Payment update failed
    PaymentFailed = 5001,
    /// Payment already approved
    PaymentAlreadyApproved = 5002,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table has no running session
    TableNotOccupied = 7002,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Push channel disconnected
    ClientDisconnected = 9301,
}

impl ErrorCode {
    /// Numeric value of this code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether this code represents success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Default English message for this code
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::ValueOutOfRange => "Value out of range",

            Self::NotAuthenticated => "Not authenticated",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Token is invalid",

            Self::PermissionDenied => "Permission denied",

            Self::OrderNotFound => "Order not found",
            Self::OrderAlreadyCancelled => "Order already cancelled",
            Self::OrderSettled => "Order is settled",
            Self::NoCancelableOrder => "No cancelable order found",
            Self::PartialReconciliation => {
                "Order was cancelled but its replacement could not be created"
            }
            Self::InvalidStatusTransition => "Invalid status transition",
            Self::InsufficientQuantity => "Insufficient quantity",
            Self::OrderEmpty => "Order has no items",

            Self::PaymentFailed => "Payment update failed",
            Self::PaymentAlreadyApproved => "Payment already approved",

            Self::TableNotFound => "Table not found",
            Self::TableNotOccupied => "Table has no running session",

            Self::InternalError => "Internal error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Operation timed out",
            Self::ConfigError => "Configuration error",
            Self::ClientDisconnected => "Client disconnected",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Raised when a numeric value does not name a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            8 => Ok(ErrorCode::ValueOutOfRange),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            2001 => Ok(ErrorCode::PermissionDenied),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyCancelled),
            4003 => Ok(ErrorCode::OrderSettled),
            4004 => Ok(ErrorCode::NoCancelableOrder),
            4005 => Ok(ErrorCode::PartialReconciliation),
            4006 => Ok(ErrorCode::InvalidStatusTransition),
            4007 => Ok(ErrorCode::InsufficientQuantity),
            4008 => Ok(ErrorCode::OrderEmpty),

            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentAlreadyApproved),

            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableNotOccupied),

            9001 => Ok(ErrorCode::InternalError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9301 => Ok(ErrorCode::ClientDisconnected),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
