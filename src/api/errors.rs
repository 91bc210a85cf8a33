// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartRejection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_type: String,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{message}")]
    ValidationError { field: String, message: String },
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Uploaded {field} is not valid UTF-8 text: {message}")]
    InvalidEncoding { field: String, message: String },
    #[error("Inference failed: {0}")]
    InferenceError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    /// Request refused by an extractor before reaching the handler.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    /// Wraps a pipeline failure, keeping the full context chain.
    pub fn inference(err: anyhow::Error) -> Self {
        ApiError::InferenceError(format!("{:#}", err))
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::ValidationError { .. } => "validation_error",
            ApiError::MissingField(_) => "missing_field",
            ApiError::InvalidEncoding { .. } => "invalid_encoding",
            ApiError::InferenceError(_) => "inference_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::Rejected { status, .. } => match *status {
                StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
                StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
                _ => "invalid_request",
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::InvalidEncoding { .. } => StatusCode::BAD_REQUEST,
            ApiError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InferenceError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Rejected { status, .. } => *status,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
            error_type: self.error_type().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::InvalidRequest(format!("Expected a multipart/form-data upload: {}", rejection))
    }
}
