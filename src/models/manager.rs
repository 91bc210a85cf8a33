// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model Manager
//!
//! Loads the summarizer, the question-answering reader and the sentence
//! encoder in parallel at startup. Unlike an optional model pool, every
//! pipeline is mandatory: if any one of them fails the whole load fails and
//! the server never binds its port.

use crate::embeddings::OnnxSentenceEncoder;
use crate::models::{ModelInfo, QuestionAnswerer, SentenceEncoder, TextSummarizer};
use crate::qa::OnnxQuestionAnswerer;
use crate::summarization::T5Summarizer;
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Where the model artifacts live on disk.
#[derive(Debug, Clone)]
pub struct ModelsConfig {
    /// Directory holding `encoder_model.onnx`, `decoder_model.onnx` and `tokenizer.json`
    pub summarizer_dir: PathBuf,
    /// Directory holding the SQuAD reader `model.onnx` and `tokenizer.json`
    pub qa_dir: PathBuf,
    /// Directory holding the sentence encoder `model.onnx` and `tokenizer.json`
    pub encoder_dir: PathBuf,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            summarizer_dir: PathBuf::from("./models/t5-base-onnx"),
            qa_dir: PathBuf::from("./models/bert-large-squad-onnx"),
            encoder_dir: PathBuf::from("./models/all-MiniLM-L6-v2-onnx"),
            intra_threads: 4,
        }
    }
}

/// Read-only handles to the three pipelines, shared by every request.
#[derive(Clone)]
pub struct ModelManager {
    summarizer: Arc<dyn TextSummarizer>,
    question_answerer: Arc<dyn QuestionAnswerer>,
    encoder: Arc<dyn SentenceEncoder>,
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelManager")
            .field("summarizer", &self.summarizer.model_name())
            .field("question_answerer", &self.question_answerer.model_name())
            .field("encoder", &self.encoder.model_name())
            .finish()
    }
}

impl ModelManager {
    /// Loads all three ONNX pipelines, one blocking task each.
    ///
    /// # Errors
    /// Returns the first failure if any model cannot be loaded.
    pub async fn load(config: &ModelsConfig) -> Result<Self> {
        info!("Loading 3 pipelines in parallel");
        let threads = config.intra_threads;

        let summarizer_dir = config.summarizer_dir.clone();
        let summarizer_task =
            tokio::task::spawn_blocking(move || T5Summarizer::load(&summarizer_dir, threads));

        let qa_dir = config.qa_dir.clone();
        let qa_task =
            tokio::task::spawn_blocking(move || OnnxQuestionAnswerer::load(&qa_dir, threads));

        let encoder_dir = config.encoder_dir.clone();
        let encoder_task =
            tokio::task::spawn_blocking(move || OnnxSentenceEncoder::load(&encoder_dir, threads));

        let (summarizer, question_answerer, encoder) = tokio::try_join!(
            join_model("summarizer", summarizer_task),
            join_model("question-answering", qa_task),
            join_model("sentence encoder", encoder_task),
        )?;

        let manager = Self::from_parts(
            Arc::new(summarizer),
            Arc::new(question_answerer),
            Arc::new(encoder),
        );
        info!("Model manager initialized: {:?}", manager);
        Ok(manager)
    }

    /// Assembles a manager from already constructed pipelines.
    pub fn from_parts(
        summarizer: Arc<dyn TextSummarizer>,
        question_answerer: Arc<dyn QuestionAnswerer>,
        encoder: Arc<dyn SentenceEncoder>,
    ) -> Self {
        Self {
            summarizer,
            question_answerer,
            encoder,
        }
    }

    pub fn summarizer(&self) -> &Arc<dyn TextSummarizer> {
        &self.summarizer
    }

    pub fn question_answerer(&self) -> &Arc<dyn QuestionAnswerer> {
        &self.question_answerer
    }

    pub fn encoder(&self) -> &Arc<dyn SentenceEncoder> {
        &self.encoder
    }

    pub fn list_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                name: self.summarizer.model_name().to_string(),
                task: "summarization".to_string(),
            },
            ModelInfo {
                name: self.question_answerer.model_name().to_string(),
                task: "question-answering".to_string(),
            },
            ModelInfo {
                name: self.encoder.model_name().to_string(),
                task: "sentence-embedding".to_string(),
            },
        ]
    }
}

async fn join_model<T>(label: &str, task: JoinHandle<Result<T>>) -> Result<T> {
    match task.await {
        Ok(Ok(model)) => {
            info!("✓ Loaded {} model", label);
            Ok(model)
        }
        Ok(Err(e)) => {
            error!("✗ Failed to load {} model: {:#}", label, e);
            Err(e).with_context(|| format!("Failed to load {} model", label))
        }
        Err(e) => Err(anyhow!("{} loading task failed: {}", label, e)),
    }
}
