// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Question Answering API Module
//!
//! POST /qa/ extracts the answer to a question from an uploaded document.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::qa_handler;
pub use request::{QaQuery, QaRequest};
pub use response::QaResponse;
