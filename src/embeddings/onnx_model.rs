// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Sentence Encoder
//!
//! Wraps ONNX Runtime to run the all-MiniLM-L6-v2 sentence transformer.
//!
//! Features:
//! - BERT tokenization with truncation to 256 tokens
//! - Batch inference with manual right padding
//! - Mean pooling over token embeddings (attention-mask weighted)
//! - L2 normalization of the pooled vector

use crate::embeddings::l2_normalize;
use crate::models::session::{build_session, load_tokenizer, require_file};
use crate::models::SentenceEncoder;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Maximum sequence length for all-MiniLM-L6-v2
pub const MAX_SEQUENCE_LENGTH: usize = 256;

/// ONNX-based sentence encoder (all-MiniLM-L6-v2 by default)
///
/// The session is behind a mutex because ONNX Runtime sessions need
/// exclusive access while running; the tokenizer is shared freely.
#[derive(Clone)]
pub struct OnnxSentenceEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for OnnxSentenceEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSentenceEncoder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxSentenceEncoder {
    /// Loads `model.onnx` and `tokenizer.json` from `model_dir`.
    ///
    /// Runs one validation inference to learn the hidden dimension and to
    /// reject models that do not emit token-level embeddings.
    ///
    /// # Errors
    /// Returns error if either file is missing, the tokenizer or session
    /// cannot be built, or the model output is not `[batch, seq_len, hidden]`.
    pub fn load(model_dir: &Path, intra_threads: usize) -> Result<Self> {
        let model_path = require_file(model_dir, "model.onnx")?;
        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().trim_end_matches("-onnx").to_string())
            .unwrap_or_else(|| "sentence-encoder".to_string());

        info!("Loading sentence encoder from {}", model_dir.display());

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let session = build_session(&model_path, intra_threads)?;

        let encoder = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: 0,
        };

        let probe = encoder
            .run_batch(&["validation test"])
            .context("Sentence encoder validation inference failed")?;
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            anyhow::bail!("Sentence encoder produced an empty embedding during validation");
        }

        info!(
            "✅ Sentence encoder {} loaded ({} dimensions)",
            encoder.model_name, dimension
        );

        Ok(Self {
            dimension,
            ..encoder
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Tokenizes, pads, runs and pools a batch of texts.
    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(*text, true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            input_ids.extend(ids.iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));

            let padding = max_len - ids.len();
            input_ids.extend(std::iter::repeat(0i64).take(padding));
            attention_mask.extend(std::iter::repeat(0i64).take(padding));
        }

        let mask_for_pooling = attention_mask.clone();
        let token_type_ids = vec![0i64; texts.len() * max_len];

        let input_ids_array = Array2::from_shape_vec((texts.len(), max_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((texts.len(), max_len), attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((texts.len(), max_len), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Sentence encoder session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Token-level embeddings: [batch, seq_len, hidden_dim]
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        if output.ndim() != 3 {
            anyhow::bail!(
                "Sentence encoder output has unexpected shape {:?} (expected [batch, seq_len, hidden])",
                output.shape()
            );
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch_idx in 0..texts.len() {
            let item = output.index_axis(Axis(0), batch_idx);
            let mask = &mask_for_pooling[batch_idx * max_len..(batch_idx + 1) * max_len];
            let mut pooled = mean_pool(item.shape()[0], item.shape()[1], mask, |i, j| {
                item[[i, j]]
            });
            l2_normalize(&mut pooled);
            embeddings.push(pooled);
        }

        debug!("Encoded {} texts (padded length {})", texts.len(), max_len);
        Ok(embeddings)
    }
}

/// Averages token vectors, counting only positions whose mask is non-zero.
fn mean_pool(
    seq_len: usize,
    hidden_dim: usize,
    mask: &[i64],
    value_at: impl Fn(usize, usize) -> f32,
) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut sum_mask = 0.0f32;

    for (i, &m) in mask.iter().enumerate().take(seq_len) {
        let weight = m as f32;
        sum_mask += weight;
        if weight == 0.0 {
            continue;
        }
        for (j, slot) in pooled.iter_mut().enumerate() {
            *slot += value_at(i, j) * weight;
        }
    }

    for val in &mut pooled {
        *val /= sum_mask.max(1e-9);
    }
    pooled
}

#[async_trait]
impl SentenceEncoder for OnnxSentenceEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.encode_batch(&[text.to_string()])
            .await?
            .pop()
            .context("Sentence encoder returned no embedding")
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encoder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            encoder.run_batch(&refs)
        })
        .await
        .context("Sentence encoder task failed")?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
