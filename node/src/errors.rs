// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledgerpost_kernel::LogError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Log error: {0}")]
    Log(#[from] LogError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            NodeError::Log(log_err) => {
                let status = match &log_err {
                    LogError::InvalidEntry(_) => StatusCode::BAD_REQUEST,
                    LogError::NotFound { .. } => StatusCode::NOT_FOUND,
                    LogError::UnknownRoot { .. } => StatusCode::CONFLICT,
                    LogError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    LogError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
                };
                (status, log_err.to_string())
            }
            NodeError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            NodeError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            NodeError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Failure reported by a `DeliverySink`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The sink answered and declined the message.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
    #[error("Delivery service unavailable: {0}")]
    Unavailable(String),
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_status_codes() {
        let cases = [
            (NodeError::Log(LogError::InvalidEntry("empty".into())), StatusCode::BAD_REQUEST),
            (NodeError::Log(LogError::Unavailable("disk".into())), StatusCode::SERVICE_UNAVAILABLE),
            (NodeError::Log(LogError::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT),
            (NodeError::InvalidInput("bad hex".into()), StatusCode::BAD_REQUEST),
            (NodeError::Config("missing".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (NodeError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
