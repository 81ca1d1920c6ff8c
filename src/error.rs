// src/error.rs
//! Error taxonomy shared by services and handlers.
//!
//! Upstream failures (LLM intent/summary calls) never surface here; they are
//! absorbed where they happen. Only caller mistakes, missing records and
//! storage trouble propagate.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NewsError {
    /// Rejected synchronously; no state was touched.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Lookup by identity found nothing. An empty search is not this.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl NewsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid request",
            Self::NotFound(_) => "Not found",
            Self::Storage(_) => "Internal error",
        }
    }
}

impl From<anyhow::Error> for NewsError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(format!("{e:#}"))
    }
}

impl From<QueryRejection> for NewsError {
    fn from(r: QueryRejection) -> Self {
        Self::InvalidInput(r.body_text())
    }
}

impl From<JsonRejection> for NewsError {
    fn from(r: JsonRejection) -> Self {
        Self::InvalidInput(r.body_text())
    }
}

pub type NewsResult<T> = Result<T, NewsError>;

/// JSON error body: `{"error": ..., "message": ..., "code": ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub code: u16,
}

impl IntoResponse for NewsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.label(),
            message: match &self {
                Self::InvalidInput(m) | Self::NotFound(m) | Self::Storage(m) => m.clone(),
            },
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
