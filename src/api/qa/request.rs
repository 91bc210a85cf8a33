// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request types for POST /qa/

use serde::{Deserialize, Serialize};

/// Query string of POST /qa/
///
/// `question` defaults to the empty string. An empty question is passed to
/// the reader unchanged; the answer is then whatever span the model scores
/// highest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QaQuery {
    #[serde(default)]
    pub question: String,
}

/// A question paired with the context decoded from the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct QaRequest {
    pub question: String,
    pub context: String,
}

impl QaRequest {
    pub fn new(query: QaQuery, context: String) -> Self {
        Self {
            question: query.question,
            context,
        }
    }
}
