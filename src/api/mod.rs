// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod qa;
pub mod search;
pub mod summarize;
pub mod upload;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{
    bind_listener, create_app, start_server, AppState, HealthResponse, RouterConfig,
};
pub use qa::{qa_handler, QaQuery, QaRequest, QaResponse};
pub use search::{search_handler, SearchRequest, SearchResponse};
pub use summarize::{summarize_handler, SummarizeResponse};
