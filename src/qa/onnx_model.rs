// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Extractive Question Answering
//!
//! Runs a SQuAD fine-tuned BERT reader (bert-large-uncased-whole-word-masking
//! by default). The question and context are encoded as a pair; contexts that
//! do not fit in one window are split with overlapping strides and every
//! window is scored.

use crate::models::session::{build_session, load_tokenizer, require_file};
use crate::models::{Answer, QuestionAnswerer};
use crate::qa::span::{best_span, SpanCandidate, MAX_ANSWER_TOKENS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

/// Maximum tokens per question/context window
pub const MAX_SEQUENCE_LENGTH: usize = 384;

/// Overlap, in tokens, between consecutive context windows
pub const DOC_STRIDE: usize = 128;

/// Extractive QA reader backed by ONNX Runtime.
#[derive(Clone)]
pub struct OnnxQuestionAnswerer {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    cls_token_id: Option<u32>,
}

impl std::fmt::Debug for OnnxQuestionAnswerer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxQuestionAnswerer")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

/// Scored span from one window, kept with the window it came from.
struct WindowAnswer<'a> {
    window: &'a Encoding,
    span: SpanCandidate,
}

impl OnnxQuestionAnswerer {
    /// Loads `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path, intra_threads: usize) -> Result<Self> {
        let model_path = require_file(model_dir, "model.onnx")?;
        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().trim_end_matches("-onnx").to_string())
            .unwrap_or_else(|| "question-answering".to_string());

        info!("Loading question-answering model from {}", model_dir.display());

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        configure_windowing(&mut tokenizer)?;
        let cls_token_id = tokenizer.token_to_id("[CLS]");

        let session = build_session(&model_path, intra_threads)?;
        let output_names: Vec<_> = session.outputs.iter().map(|o| o.name.clone()).collect();
        debug!("QA model outputs: {:?}", output_names);
        if session.outputs.len() < 2 {
            anyhow::bail!(
                "QA model must expose start and end logits, found outputs {:?}",
                output_names
            );
        }

        info!("✅ Question-answering model {} loaded", model_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            cls_token_id,
        })
    }

    /// Splits the pair into windows: the primary encoding plus its overflow.
    fn windows(&self, question: &str, context: &str) -> Result<Vec<Encoding>> {
        let mut encoding = self
            .tokenizer
            .encode((question, context), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        let overflow = encoding.take_overflowing();

        let mut windows = Vec::with_capacity(1 + overflow.len());
        windows.push(encoding);
        windows.extend(overflow);
        Ok(windows)
    }

    /// Runs the reader on one window, returning (start_logits, end_logits).
    fn logits(&self, window: &Encoding) -> Result<(Vec<f32>, Vec<f32>)> {
        let len = window.get_ids().len();
        let input_ids: Vec<i64> = window.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = window
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = window.get_type_ids().iter().map(|&t| t as i64).collect();

        let input_ids_array = Array2::from_shape_vec((1, len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((1, len), attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((1, len), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("QA session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Both outputs are [batch, seq_len]
        let start = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract start logits")?;
        let end = outputs[1]
            .try_extract_array::<f32>()
            .context("Failed to extract end logits")?;

        Ok((
            start.iter().copied().take(len).collect(),
            end.iter().copied().take(len).collect(),
        ))
    }

    fn extract(&self, question: &str, context: &str) -> Result<Answer> {
        let windows = self.windows(question, context)?;
        debug!("QA context split into {} window(s)", windows.len());

        let mut best: Option<WindowAnswer<'_>> = None;
        for window in &windows {
            let is_context: Vec<bool> = window
                .get_sequence_ids()
                .iter()
                .map(|id| *id == Some(1))
                .collect();
            if !is_context.iter().any(|&c| c) {
                continue;
            }

            let cls_index = self
                .cls_token_id
                .and_then(|cls| window.get_ids().iter().position(|&id| id == cls));

            let (start_logits, end_logits) = self.logits(window)?;
            if let Some(span) = best_span(
                &start_logits,
                &end_logits,
                &is_context,
                cls_index,
                MAX_ANSWER_TOKENS,
            ) {
                if best.as_ref().map_or(true, |b| span.score > b.span.score) {
                    best = Some(WindowAnswer { window, span });
                }
            }
        }

        let Some(WindowAnswer { window, span }) = best else {
            return Ok(Answer::empty());
        };

        let (start, end) = word_aligned_offsets(window, &span);
        let text = context
            .get(start..end)
            .with_context(|| format!("Answer offsets {}..{} are not valid in context", start, end))?
            .to_string();

        Ok(Answer {
            text,
            score: span.score,
            start,
            end,
        })
    }
}

/// Truncates only the context, emitting overlapping overflow windows.
fn configure_windowing(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQUENCE_LENGTH,
            strategy: TruncationStrategy::OnlySecond,
            stride: DOC_STRIDE,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);
    Ok(())
}

/// Byte range of the answer in the context, widened to whole words.
///
/// A span that starts or ends inside a word (on a `##` continuation piece)
/// is extended to the word boundaries. Falls back to the raw token offsets
/// when the tokenizer has no word information.
fn word_aligned_offsets(window: &Encoding, span: &SpanCandidate) -> (usize, usize) {
    let offsets = window.get_offsets();
    let word_chars = |token: usize| {
        window
            .token_to_word(token)
            .and_then(|(sequence, word)| window.word_to_chars(word, sequence))
    };

    let start = word_chars(span.start).map_or(offsets[span.start].0, |(start, _)| start);
    let end = word_chars(span.end).map_or(offsets[span.end].1, |(_, end)| end);
    (start, end.max(start))
}

#[async_trait]
impl QuestionAnswerer for OnnxQuestionAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        if context.trim().is_empty() {
            return Ok(Answer::empty());
        }
        let reader = self.clone();
        let (question, context) = (question.to_string(), context.to_string());
        let answer = tokio::task::spawn_blocking(move || reader.extract(&question, &context))
            .await
            .context("Question answering task failed")??;
        debug!("QA answer {:?} (score {:.4})", answer.text, answer.score);
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
