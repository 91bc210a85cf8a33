// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline abstractions and the process-wide model set.
//!
//! Each capability exposed over HTTP is backed by one pretrained model behind
//! a trait object. `ModelManager` loads all three at startup and refuses to
//! hand out a partially initialised set.

pub mod manager;
pub mod session;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use manager::{ModelManager, ModelsConfig};

/// Generates an abstractive summary of a document.
#[async_trait]
pub trait TextSummarizer: Send + Sync {
    /// Summarize `text` with the pipeline's fixed generation settings.
    async fn summarize(&self, text: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Extracts the span of a context passage that answers a question.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer>;

    fn model_name(&self) -> &str;
}

/// Maps text to dense vectors comparable by cosine similarity.
#[async_trait]
pub trait SentenceEncoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encodes every text, preserving input order.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;
}

/// Answer span produced by a [`QuestionAnswerer`].
///
/// `start` and `end` are byte offsets into the context the answer was
/// extracted from, so `&context[start..end] == text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

impl Answer {
    /// Answer returned when the context holds no candidate tokens.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            score: 0.0,
            start: 0,
            end: 0,
        }
    }
}

/// Information about a loaded pipeline, reported by `/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub task: String,
}
