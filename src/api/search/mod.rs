// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Smart Search API Module
//!
//! POST /search/ ranks candidate documents against a query by embedding
//! similarity and returns the single best match.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::search_handler;
pub use request::SearchRequest;
pub use response::SearchResponse;
