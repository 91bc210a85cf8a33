// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;
pub mod models;
pub mod qa;
pub mod summarization;

pub use api::{create_app, start_server, ApiError, AppState, RouterConfig};
pub use config::ServerConfig;
pub use models::{
    Answer, ModelInfo, ModelManager, ModelsConfig, QuestionAnswerer, SentenceEncoder,
    TextSummarizer,
};
