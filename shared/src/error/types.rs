//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the error type returned across the HTTP boundary:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (order id, current status, ...)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a detail entry
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Unknown or already deleted kitchen order
    pub fn order_not_found(order_id: i64) -> Self {
        Self::with_message(
            ErrorCode::KitchenOrderNotFound,
            format!("Kitchen order {} not found", order_id),
        )
        .with_detail("orderId", order_id)
    }

    /// Event not legal from the order's current status
    pub fn invalid_transition(
        order_id: i64,
        current_status: impl Into<String>,
        attempted_action: impl Into<String>,
    ) -> Self {
        let status = current_status.into();
        let action = attempted_action.into();
        Self::with_message(
            ErrorCode::InvalidTransition,
            format!(
                "Cannot apply {} to order {} in status {}",
                action, order_id, status
            ),
        )
        .with_detail("orderId", order_id)
        .with_detail("currentStatus", status)
        .with_detail("attemptedAction", action)
    }
}

/// Unified API response structure
///
/// Provides a consistent response format for all API endpoints:
/// - `code`: Error code (0 for success)
/// - `message`: Human-readable message
/// - `data`: Response payload (on success)
/// - `details`: Additional error details (on failure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Error code (0 for success, non-zero for errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Human-readable message
    pub message: String,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Additional error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// Whether the response carries the success code
    pub fn is_success(&self) -> bool {
        matches!(self.code, None | Some(0))
    }

    /// Convert a decoded response back into the error it describes
    ///
    /// Unknown codes map to [`ErrorCode::Unknown`] so newer servers do not
    /// break older displays.
    pub fn into_result(self) -> Result<Option<T>, AppError> {
        if self.is_success() {
            return Ok(self.data);
        }
        let code = self
            .code
            .and_then(|c| ErrorCode::try_from(c).ok())
            .unwrap_or(ErrorCode::Unknown);
        Err(AppError {
            code,
            message: self.message,
            details: self.details,
        })
    }
}

impl ApiResponse<()> {
    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        // Log system errors
        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = match self.code {
            None | Some(0) => StatusCode::OK,
            Some(code) => ErrorCode::try_from(code)
                .map(|c| c.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::KitchenOrderNotFound);
        assert_eq!(err.code, ErrorCode::KitchenOrderNotFound);
        assert_eq!(err.message, "Kitchen order not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("Missing required fields")
            .with_detail("field", "batchSize")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.detail("field").unwrap(), "batchSize");
        assert_eq!(err.detail("reason").unwrap(), "required");
        assert!(err.detail("missing").is_none());
    }

    #[test]
    fn test_invalid_transition_details() {
        let err = AppError::invalid_transition(42, "pending", "add_time");
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
        assert_eq!(err.detail("orderId").unwrap(), 42);
        assert_eq!(err.detail("currentStatus").unwrap(), "pending");
        assert_eq!(err.detail("attemptedAction").unwrap(), "add_time");
        assert!(err.message.contains("add_time"));
    }

    #[test]
    fn test_order_not_found() {
        let err = AppError::order_not_found(7);
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Kitchen order 7 not found");
    }

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(42);
        assert_eq!(response.code, Some(0));
        assert_eq!(response.message, "OK");
        assert_eq!(response.data, Some(42));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_api_response_error_serialize() {
        let err = AppError::invalid_transition(1, "cooking", "start_timer");
        let json = serde_json::to_value(ApiResponse::<()>::error(&err)).unwrap();
        assert_eq!(json["code"], 4002);
        assert_eq!(json["details"]["currentStatus"], "cooking");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_into_result() {
        let ok: ApiResponse<i32> = serde_json::from_str(r#"{"code":0,"message":"OK","data":5}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), Some(5));

        let err: ApiResponse<i32> = serde_json::from_str(
            r#"{"code":4001,"message":"gone","details":{"orderId":3}}"#,
        )
        .unwrap();
        let err = err.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::KitchenOrderNotFound);
        assert_eq!(err.detail("orderId").unwrap(), 3);

        let unknown: ApiResponse<i32> =
            serde_json::from_str(r#"{"code":7777,"message":"new"}"#).unwrap();
        assert_eq!(unknown.into_result().unwrap_err().code, ErrorCode::Unknown);
    }
}
