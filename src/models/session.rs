// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared ONNX Runtime session and tokenizer loading.

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{info, warn};

/// Resolves `file_name` inside `dir`, failing if it does not exist.
pub fn require_file(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    if !path.exists() {
        anyhow::bail!("Model file not found: {}", path.display());
    }
    Ok(path)
}

/// Builds a session for `model_path`, trying CUDA first and falling back to CPU.
pub fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("CUDA execution provider initialized for {}", model_path.display());
            Ok(session)
        }
        Err(e) => {
            warn!("CUDA execution provider failed for {}: {}", model_path.display(), e);
            warn!("   Falling back to CPU execution provider");
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(intra_threads)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
        }
    }
}

pub fn load_tokenizer(tokenizer_path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(tokenizer_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load tokenizer from {}: {}",
            tokenizer_path.display(),
            e
        )
    })
}
