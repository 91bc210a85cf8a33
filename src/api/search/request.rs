// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Smart search request types

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Request body for POST /search/
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,

    /// Candidate documents, in ranking tie-break order
    pub documents: Vec<String>,
}

impl SearchRequest {
    /// Rejects an empty candidate list before any model is touched.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.documents.is_empty() {
            return Err(ApiError::ValidationError {
                field: "documents".to_string(),
                message: "No documents provided for search.".to_string(),
            });
        }
        Ok(())
    }
}
