// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::models::Answer;
use serde::{Deserialize, Serialize};

/// Response body for POST /qa/
///
/// Only the answer text is surfaced; score and offsets stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaResponse {
    pub answer: String,
}

impl From<Answer> for QaResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
        }
    }
}
