// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Smart search response types

use serde::{Deserialize, Serialize};

/// Response body for POST /search/
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    /// Candidate text closest to the query, returned verbatim
    pub document: String,

    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}
