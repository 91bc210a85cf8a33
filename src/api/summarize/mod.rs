// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Summarization API Module
//!
//! POST /summarize/ turns an uploaded document into an abstractive summary.

pub mod handler;
pub mod response;

pub use handler::summarize_handler;
pub use response::SummarizeResponse;
