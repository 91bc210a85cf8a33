// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! T5 summarizer (encoder + decoder ONNX exports)
//!
//! The encoder runs once per request; the decoder is re-run over the full
//! prefix of every live beam at each generation step.

use crate::models::session::{build_session, load_tokenizer, require_file};
use crate::models::TextSummarizer;
use crate::summarization::beam::{beam_search, GenerationConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Array3, Ix3, IxDyn};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Instruction prefix T5 was trained with for summarization
pub const TASK_PREFIX: &str = "summarize: ";

/// Maximum input tokens; longer documents are silently truncated
pub const MAX_INPUT_TOKENS: usize = 512;

/// Encoder output kept for the decoding loop.
struct EncodedInput {
    /// [1, seq_len, hidden]
    hidden_states: Array3<f32>,
    /// [1, seq_len]
    attention_mask: Array2<i64>,
}

#[derive(Clone)]
pub struct T5Summarizer {
    encoder: Arc<Mutex<Session>>,
    decoder: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    generation: GenerationConfig,
    /// Decoder start token (T5 uses the pad token)
    decoder_start_token_id: u32,
    eos_token_id: u32,
}

impl std::fmt::Debug for T5Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("T5Summarizer")
            .field("model_name", &self.model_name)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl T5Summarizer {
    /// Loads `encoder_model.onnx`, `decoder_model.onnx` and `tokenizer.json`
    /// from `model_dir`.
    ///
    /// # Errors
    /// Returns error if any file is missing or a session fails to build.
    pub fn load(model_dir: &Path, intra_threads: usize) -> Result<Self> {
        let encoder_path = require_file(model_dir, "encoder_model.onnx")?;
        let decoder_path = require_file(model_dir, "decoder_model.onnx")?;
        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().trim_end_matches("-onnx").to_string())
            .unwrap_or_else(|| "t5-base".to_string());

        info!("Loading T5 summarizer from {}", model_dir.display());

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        configure_input_truncation(&mut tokenizer)?;

        let decoder_start_token_id = tokenizer.token_to_id("<pad>").unwrap_or(0);
        let eos_token_id = tokenizer.token_to_id("</s>").unwrap_or(1);
        debug!(
            "Special tokens - decoder start: {}, EOS: {}",
            decoder_start_token_id, eos_token_id
        );

        let encoder = build_session(&encoder_path, intra_threads)?;
        let decoder = build_session(&decoder_path, intra_threads)?;

        info!("✅ T5 summarizer {} loaded", model_name);

        Ok(Self {
            encoder: Arc::new(Mutex::new(encoder)),
            decoder: Arc::new(Mutex::new(decoder)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            generation: GenerationConfig::default(),
            decoder_start_token_id,
            eos_token_id,
        })
    }

    fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding = self
            .tokenizer
            .encode(prompt(text), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let len = encoding.get_ids().len();
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        let input_ids_array = Array2::from_shape_vec((1, len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((1, len), attention_mask)
            .context("Failed to create attention_mask array")?;

        let mut encoder = self
            .encoder
            .lock()
            .map_err(|_| anyhow::anyhow!("T5 encoder session lock poisoned"))?;
        let outputs = encoder
            .run(ort::inputs![
                "input_ids" => Value::from_array(input_ids_array)?,
                "attention_mask" => Value::from_array(attention_mask_array.clone())?
            ])
            .context("T5 encoder inference failed")?;

        let hidden_states = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder hidden states")?
            .to_owned()
            .into_dimensionality::<Ix3>()
            .context("Encoder hidden states are not [batch, seq_len, hidden]")?;

        debug!("Encoded {} input tokens", len);
        Ok(EncodedInput {
            hidden_states,
            attention_mask: attention_mask_array,
        })
    }

    /// One decoder pass over all beams; returns last-position logits per beam.
    fn decode_step(&self, encoded: &EncodedInput, beams: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        let num_beams = beams.len();
        let cur_len = beams.first().map(Vec::len).unwrap_or(0);
        let (_, seq_len, hidden) = encoded.hidden_states.dim();

        let input_ids: Vec<i64> = beams
            .iter()
            .flat_map(|beam| beam.iter().map(|&t| t as i64))
            .collect();
        let input_ids_array = Array2::from_shape_vec((num_beams, cur_len), input_ids)
            .context("Failed to create decoder input_ids array")?;

        let hidden_states = encoded
            .hidden_states
            .broadcast((num_beams, seq_len, hidden))
            .context("Failed to broadcast encoder hidden states across beams")?
            .to_owned();
        let attention_mask = encoded
            .attention_mask
            .broadcast((num_beams, seq_len))
            .context("Failed to broadcast encoder attention mask across beams")?
            .to_owned();

        let mut decoder = self
            .decoder
            .lock()
            .map_err(|_| anyhow::anyhow!("T5 decoder session lock poisoned"))?;
        let outputs = decoder
            .run(ort::inputs![
                "input_ids" => Value::from_array(input_ids_array)?,
                "encoder_hidden_states" => Value::from_array(hidden_states)?,
                "encoder_attention_mask" => Value::from_array(attention_mask)?
            ])
            .context("T5 decoder inference failed")?;

        // Logits: [num_beams, cur_len, vocab]
        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract decoder logits")?;
        let shape = logits.shape().to_vec();
        if shape.len() != 3 || shape[0] != num_beams {
            anyhow::bail!("Unexpected decoder logits shape {:?}", shape);
        }
        let last_pos = shape[1] - 1;
        let vocab = shape[2];

        Ok((0..num_beams)
            .map(|b| {
                (0..vocab)
                    .map(|v| logits[IxDyn(&[b, last_pos, v])])
                    .collect()
            })
            .collect())
    }

    fn generate(&self, text: &str) -> Result<String> {
        let encoded = self.encode(text)?;
        let tokens = beam_search(
            &self.generation,
            self.decoder_start_token_id,
            self.eos_token_id,
            |beams| self.decode_step(&encoded, beams),
        )?;
        debug!("Generated {} summary tokens", tokens.len());

        let summary = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;
        Ok(summary.trim().to_string())
    }
}

/// Task-prefixed model input.
fn prompt(text: &str) -> String {
    format!("{}{}", TASK_PREFIX, text)
}

/// Longer inputs are cut to `MAX_INPUT_TOKENS` without error.
fn configure_input_truncation(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_INPUT_TOKENS,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);
    Ok(())
}

#[async_trait]
impl TextSummarizer for T5Summarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let summarizer = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || summarizer.generate(&text))
            .await
            .context("Summarization task failed")?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
