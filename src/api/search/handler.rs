// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Smart search endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use tracing::{debug, info, warn};

use super::request::SearchRequest;
use super::response::SearchResponse;
use crate::api::http_server::AppState;
use crate::api::ApiError;
use crate::embeddings::closest_match;

/// POST /search/ - Pick the candidate document closest to a query
///
/// # Request
/// - `query`: Free-text query
/// - `documents`: Candidate texts (at least one)
///
/// # Response
/// - `document`: The best matching candidate, verbatim
/// - `similarity`: Its cosine similarity to the query
///
/// Query and candidates are re-encoded on every call; nothing is cached.
///
/// # Errors
/// - 400 Bad Request: `documents` is empty (the encoder is not invoked)
/// - 4xx: body is not a valid `SearchRequest` JSON document
/// - 500 Internal Server Error: encoding failed
pub async fn search_handler(
    State(state): State<AppState>,
    WithRejection(Json(mut request), _): WithRejection<Json<SearchRequest>, ApiError>,
) -> Result<Json<SearchResponse>, ApiError> {
    debug!(
        "Search request: {:?} over {} documents",
        request.query,
        request.documents.len()
    );

    if let Err(e) = request.validate() {
        warn!("Search validation failed: {}", e);
        return Err(e);
    }

    let encoder = state.models.encoder();
    let query_embedding = encoder
        .encode(&request.query)
        .await
        .map_err(ApiError::inference)?;
    let document_embeddings = encoder
        .encode_batch(&request.documents)
        .await
        .map_err(ApiError::inference)?;

    if document_embeddings.len() != request.documents.len() {
        return Err(ApiError::InternalError(format!(
            "Encoder returned {} embeddings for {} documents",
            document_embeddings.len(),
            request.documents.len()
        )));
    }

    let (index, similarity) = closest_match(&query_embedding, &document_embeddings)
        .ok_or_else(|| ApiError::InternalError("No document embeddings to rank".to_string()))?;

    info!(
        "Search matched document {} of {} (similarity {:.4})",
        index,
        request.documents.len(),
        similarity
    );

    Ok(Json(SearchResponse {
        document: request.documents.swap_remove(index),
        similarity,
    }))
}
