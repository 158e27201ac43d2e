use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::{ApiResponse, TransportError};
use crate::storage::StoreError;

/// Application-level error returned by every [`crate::SessionClient`] operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// FastAPI error envelope: `{"detail": "..."}` or a list of validation issues.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

impl ApiError {
    /// Builds the error for a non-2xx response, preferring the backend's `detail`.
    pub fn from_response(response: &ApiResponse) -> Self {
        let body = response.text();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| match e.detail {
                Value::String(detail) => detail,
                other => other.to_string(),
            })
            .unwrap_or(body);

        if response.status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Server {
                status: response.status.as_u16(),
                message,
            }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for an inline alert. Client errors carrying a backend
    /// detail show it; everything else collapses to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ApiError::Server { status, message }
                if (400..500).contains(status) && !message.trim().is_empty() =>
            {
                message.clone()
            }
            ApiError::Server { status, message } => {
                tracing::error!("Server error {status}: {message}");
                "Something went wrong on the server. Please try again.".to_string()
            }
            ApiError::Transport(e) => {
                tracing::error!("Transport error: {e}");
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Parse(e) => {
                tracing::error!("Unexpected response body: {e}");
                "The server returned an unexpected response.".to_string()
            }
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                "Could not save session data on this device.".to_string()
            }
        }
    }
}
