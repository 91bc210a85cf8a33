// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every flag can also be supplied through a `TEXTLAB_*` environment
//! variable; `.env` files are loaded by the binary before parsing.

use crate::models::ModelsConfig;
use anyhow::{anyhow, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::path::PathBuf;

/// Text Lab inference server
#[derive(Parser, Debug, Clone)]
#[command(name = "textlab-server")]
#[command(version)]
#[command(about = "HTTP inference server for summarization, question answering and smart search", long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "TEXTLAB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "TEXTLAB_PORT", default_value_t = 8000)]
    pub port: u16,

    /// The single browser origin allowed to call the API
    #[arg(long, env = "TEXTLAB_CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Directory with the T5 encoder/decoder ONNX exports and tokenizer
    #[arg(long, env = "TEXTLAB_SUMMARIZER_DIR", default_value = "./models/t5-base-onnx")]
    pub summarizer_dir: PathBuf,

    /// Directory with the SQuAD reader ONNX export and tokenizer
    #[arg(long, env = "TEXTLAB_QA_DIR", default_value = "./models/bert-large-squad-onnx")]
    pub qa_dir: PathBuf,

    /// Directory with the sentence encoder ONNX export and tokenizer
    #[arg(long, env = "TEXTLAB_ENCODER_DIR", default_value = "./models/all-MiniLM-L6-v2-onnx")]
    pub encoder_dir: PathBuf,

    /// Maximum request body size in bytes
    #[arg(long, env = "TEXTLAB_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "TEXTLAB_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl ServerConfig {
    pub fn models(&self) -> ModelsConfig {
        ModelsConfig {
            summarizer_dir: self.summarizer_dir.clone(),
            qa_dir: self.qa_dir.clone(),
            encoder_dir: self.encoder_dir.clone(),
            intra_threads: self.intra_threads,
        }
    }

    /// Parses the configured origin into a header value.
    ///
    /// # Errors
    /// Fails when the origin contains characters not allowed in a header.
    pub fn cors_origin(&self) -> Result<HeaderValue> {
        let origin = self.cors_origin.trim();
        if origin.is_empty() || origin == "*" {
            return Err(anyhow!(
                "Invalid CORS origin {:?}: a single explicit origin is required",
                self.cors_origin
            ));
        }
        HeaderValue::from_str(origin)
            .map_err(|e| anyhow!("Invalid CORS origin {:?}: {}", self.cors_origin, e))
    }
}
