//! Display error types

use std::collections::HashMap;

use serde_json::Value;
use shared::error::{ApiResponse, ErrorCode};
use thiserror::Error;

/// Display client error type
#[derive(Debug, Error)]
pub enum DisplayError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body
    #[error("API error {code}: {message}")]
    Api {
        code: ErrorCode,
        message: String,
        details: Option<HashMap<String, Value>>,
    },

    /// Non-2xx response without a decodable error body
    #[error("Unexpected response ({status}): {body}")]
    InvalidResponse { status: u16, body: String },

    /// WebSocket failure on the push channel
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for display operations
pub type DisplayResult<T> = Result<T, DisplayError>;

impl DisplayError {
    /// Decode a non-2xx body in the server's `ApiResponse` format
    pub(crate) fn from_body(status: u16, body: String) -> Self {
        match serde_json::from_str::<ApiResponse<Value>>(&body).map(ApiResponse::into_result) {
            Ok(Err(err)) => DisplayError::Api {
                code: err.code,
                message: err.message,
                details: err.details,
            },
            _ => DisplayError::InvalidResponse { status, body },
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            DisplayError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The command lost against the order's current status
    pub fn is_invalid_transition(&self) -> bool {
        self.code() == Some(ErrorCode::InvalidTransition)
    }

    /// The order is already gone
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code(),
            Some(ErrorCode::KitchenOrderNotFound | ErrorCode::NotFound)
        )
    }

    /// Worth retrying on the next poll
    pub fn is_transient(&self) -> bool {
        match self {
            DisplayError::Http(_) | DisplayError::WebSocket(_) => true,
            DisplayError::Api { code, .. } => code.is_transient(),
            DisplayError::InvalidResponse { status, .. } => *status >= 500,
            DisplayError::Serialization(_) => false,
        }
    }
}
