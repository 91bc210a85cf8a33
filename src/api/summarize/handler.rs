// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /summarize/ HTTP handler

use crate::api::http_server::AppState;
use crate::api::summarize::SummarizeResponse;
use crate::api::upload::{read_text_field, FILE_FIELD};
use crate::api::ApiError;
use axum::{extract::State, Json};
use axum_extra::extract::{Multipart, WithRejection};
use tracing::{debug, info};

/// POST /summarize/ handler
///
/// Summarizes an uploaded plain-text document.
///
/// # Request
/// `multipart/form-data` with the document in the `file` field.
///
/// # Response Body
/// ```json
/// { "summary": "..." }
/// ```
///
/// # Errors
/// - 400 Bad Request: upload is not valid UTF-8 or the form is malformed
/// - 422 Unprocessable Entity: no `file` field
/// - 500 Internal Server Error: summarization failed
pub async fn summarize_handler(
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let text = read_text_field(&mut multipart, FILE_FIELD).await?;
    debug!("Summarize request: {} bytes of text", text.len());

    let summarizer = state.models.summarizer();
    let summary = summarizer
        .summarize(&text)
        .await
        .map_err(ApiError::inference)?;

    info!(
        "Summarized {} bytes into {} bytes with {}",
        text.len(),
        summary.len(),
        summarizer.model_name()
    );
    Ok(Json(SummarizeResponse { summary }))
}
