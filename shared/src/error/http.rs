//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound | Self::OrderNotFound | Self::TableNotFound => StatusCode::NOT_FOUND,

            Self::OrderAlreadyCancelled
            | Self::OrderSettled
            | Self::PaymentAlreadyApproved
            | Self::InvalidStatusTransition => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::PermissionDenied => StatusCode::FORBIDDEN,

            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::ValueOutOfRange
            | Self::OrderEmpty => StatusCode::BAD_REQUEST,

            Self::NoCancelableOrder | Self::InsufficientQuantity | Self::TableNotOccupied => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            Self::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            Self::NetworkError | Self::ClientDisconnected => StatusCode::SERVICE_UNAVAILABLE,

            Self::Unknown
            | Self::PartialReconciliation
            | Self::PaymentFailed
            | Self::InternalError
            | Self::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Best-effort classification of a bare HTTP status returned by the backend
    pub fn from_http_status(status: StatusCode) -> Self {
        match status {
            s if s.is_success() => Self::Success,
            StatusCode::UNAUTHORIZED => Self::NotAuthenticated,
            StatusCode::FORBIDDEN => Self::PermissionDenied,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::ValidationFailed,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Self::TimeoutError,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => Self::NetworkError,
            _ => Self::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::OrderSettled.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TokenExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::NoCancelableOrder.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(ErrorCode::from_http_status(StatusCode::OK), ErrorCode::Success);
        assert_eq!(
            ErrorCode::from_http_status(StatusCode::FORBIDDEN),
            ErrorCode::PermissionDenied
        );
        assert_eq!(
            ErrorCode::from_http_status(StatusCode::IM_A_TEAPOT),
            ErrorCode::InternalError
        );
    }
}
