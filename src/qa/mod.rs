// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Extractive question answering

pub mod onnx_model;
pub mod span;

pub use onnx_model::OnnxQuestionAnswerer;
pub use span::{best_span, SpanCandidate, MAX_ANSWER_TOKENS};
