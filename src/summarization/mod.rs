// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Abstractive summarization

pub mod beam;
pub mod t5;

pub use beam::{beam_search, GenerationConfig};
pub use t5::T5Summarizer;
