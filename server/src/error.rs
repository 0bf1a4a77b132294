//! Service error taxonomy and its HTTP mapping.
//!
//! # Design
//! Validation problems are reported before the store is touched. Store
//! failures keep their cause as `source` for logging, but the body sent to
//! the caller only carries the generic message of the failed operation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// The item operation a store failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch items",
            Operation::Get => "Failed to fetch item",
            Operation::Create => "Failed to create item",
            Operation::Update => "Failed to update item",
            Operation::Delete => "Failed to delete item",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Item not found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{}", .operation.failure_message())]
    StoreUnavailable {
        operation: Operation,
        #[source]
        source: StoreError,
    },

    #[error("{}", .operation.failure_message())]
    StoreTimeout {
        operation: Operation,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    pub fn missing_id() -> Self {
        ServiceError::InvalidArgument("Item ID is required".to_string())
    }

    /// Maps a store failure raised while running `operation`.
    pub fn from_store(operation: Operation, source: StoreError) -> Self {
        match source {
            StoreError::Missing(_) => ServiceError::NotFound,
            StoreError::Timeout { .. } => ServiceError::StoreTimeout { operation, source },
            StoreError::Unavailable(_) | StoreError::Malformed { .. } => {
                ServiceError::StoreUnavailable { operation, source }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::StoreUnavailable { .. } | ServiceError::StoreTimeout { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
