use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::TokenError;
use crate::discovery::UpstreamError;

/// Which upstream method a failure came from; only changes the wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Answer,
}

impl Operation {
    fn api_name(self) -> &'static str {
        match self {
            Operation::Search => "Google Search API",
            Operation::Answer => "Google Answer API",
        }
    }

    fn failure(self) -> &'static str {
        match self {
            Operation::Search => "Failed to search",
            Operation::Answer => "Failed to generate answer",
        }
    }
}

/// JSON error body returned by every proxy endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    /// Non-success status from the upstream API, relayed as-is.
    #[error("{op:?} upstream error ({status}): {body}")]
    Upstream {
        op: Operation,
        status: StatusCode,
        body: String,
    },

    #[error("{op:?} failed: {details}")]
    Internal { op: Operation, details: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn token(op: Operation, err: TokenError) -> Self {
        ApiError::Internal {
            op,
            details: err.to_string(),
        }
    }

    pub fn upstream(op: Operation, err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, body } => ApiError::Upstream { op, status, body },
            UpstreamError::Transport(e) => ApiError::Internal {
                op,
                details: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest { message, details } => ErrorBody {
                error: message.clone(),
                details: details.clone(),
            },
            ApiError::Upstream { op, status, body } => ErrorBody {
                error: format!(
                    "Error from {}: {}",
                    op.api_name(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                ),
                details: Some(body.clone()),
            },
            ApiError::Internal { op, details } => ErrorBody {
                error: op.failure().to_string(),
                details: Some(details.clone()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadRequest { .. } => log::warn!("rejected request: {self}"),
            _ => log::error!("{self}"),
        }
        (self.status(), Json(self.body())).into_response()
    }
}
