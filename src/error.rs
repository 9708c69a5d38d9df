//! Error types for the cache server
//!
//! Scheduling errors surface synchronously from `Scheduler::start`; API errors
//! map onto HTTP responses.

use axum::{
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Schedule Error Enum ==
/// Rejection of a job at schedule time. Fatal to that attempt only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Target fire time is not strictly after the current time
    #[error("Target time {target} is not after {now}")]
    NotInFuture {
        target: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// Call limit of zero
    #[error("Call limit must be greater than 0")]
    InvalidCallLimit,

    /// Repeat interval is zero or too large to add to a timestamp
    #[error("Invalid repeat interval: {0}")]
    InvalidInterval(String),

    /// Scheduler was shut down
    #[error("Scheduler is closed")]
    Closed,
}

// == API Error Enum ==
/// Unified error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Id not found in cache
    #[error("Id not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Resend limit reached; retry after the given number of seconds
    #[error("The number of attempts has been exhausted. Try again later")]
    TooManyRequests { retry_in: u64 },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        let mut response = (status, body).into_response();
        if let ApiError::TooManyRequests { retry_in } = self {
            response.headers_mut().insert(
                HeaderName::from_static("retry-in"),
                HeaderValue::from(retry_in),
            );
        }
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::NotFound("session".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_too_many_requests_sets_retry_header() {
        let response = ApiError::TooManyRequests { retry_in: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("retry-in").unwrap(), "42");
    }

    #[test]
    fn test_schedule_error_messages() {
        assert_eq!(ScheduleError::Closed.to_string(), "Scheduler is closed");
        assert_eq!(
            ScheduleError::InvalidCallLimit.to_string(),
            "Call limit must be greater than 0"
        );
    }
}
