// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /qa/ HTTP handler

use crate::api::http_server::AppState;
use crate::api::qa::{QaQuery, QaRequest, QaResponse};
use crate::api::upload::{read_text_field, FILE_FIELD};
use crate::api::ApiError;
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::{Multipart, WithRejection};
use tracing::{debug, info};

/// POST /qa/?question=... handler
///
/// Answers `question` from the uploaded context document by extracting a
/// span of it. The question is not validated; an empty one is answered too.
///
/// # Errors
/// - 400 Bad Request: upload is not valid UTF-8 or the form is malformed
/// - 422 Unprocessable Entity: no `file` field
/// - 500 Internal Server Error: inference failed
pub async fn qa_handler(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<QaQuery>, ApiError>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<QaResponse>, ApiError> {
    let context = read_text_field(&mut multipart, FILE_FIELD).await?;
    let request = QaRequest::new(query, context);
    debug!(
        "QA request: question {:?}, {} bytes of context",
        request.question,
        request.context.len()
    );

    let answer = state
        .models
        .question_answerer()
        .answer(&request.question, &request.context)
        .await
        .map_err(ApiError::inference)?;

    info!(
        "Answered question with span {}..{} (score {:.4})",
        answer.start, answer.end, answer.score
    );
    Ok(Json(QaResponse::from(answer)))
}
