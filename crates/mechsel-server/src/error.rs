//! Uniform error envelope for the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::reference::ReferenceError;
use mechsel_suggest::InvokeError;

/// Returned when a required motor input is missing, non-numeric or zero.
pub const MISSING_INPUT: &str = "missing input parameters";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller input problem, reported verbatim with 400.
    #[error("{0}")]
    InvalidInput(String),
    /// An extractor rejected the request body with its own status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    /// Form extraction came back without some required fields.
    #[error("missing fields: {}", fields.join(", "))]
    MissingFields {
        fields: Vec<&'static str>,
        data: serde_json::Value,
    },
    /// Store, reference image or model failure, reported raw with 500.
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::MissingFields { .. } => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            ApiError::MissingFields { data, .. } => json!({ "error": message, "data": data }),
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        error!(error = %e, "catalog query failed");
        ApiError::Upstream(e.to_string())
    }
}

impl From<ReferenceError> for ApiError {
    fn from(e: ReferenceError) -> Self {
        error!(error = %e, "reference image fetch failed");
        ApiError::Upstream(e.to_string())
    }
}

impl From<InvokeError> for ApiError {
    fn from(e: InvokeError) -> Self {
        match &e {
            InvokeError::Timeout(_) => warn!(error = %e, "model call timed out"),
            _ => error!(error = %e, "model call failed"),
        }
        ApiError::Upstream(e.to_string())
    }
}
