// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart text uploads shared by the document endpoints

use crate::api::ApiError;
use axum_extra::extract::Multipart;
use tracing::debug;

/// Multipart field carrying the uploaded document
pub const FILE_FIELD: &str = "file";

/// Reads the first multipart field called `name` and decodes it as UTF-8.
///
/// Other fields are skipped. A missing field yields `ApiError::MissingField`.
pub async fn read_text_field(multipart: &mut Multipart, name: &str) -> Result<String, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(name) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read {}: {}", name, e)))?;
        debug!(
            "Received upload {:?} ({} bytes) in field {}",
            file_name,
            data.len(),
            name
        );

        return decode_utf8(data.to_vec(), name);
    }

    Err(ApiError::MissingField(name.to_string()))
}

/// Decodes raw upload bytes; invalid UTF-8 is a client error.
pub fn decode_utf8(bytes: Vec<u8>, field: &str) -> Result<String, ApiError> {
    String::from_utf8(bytes).map_err(|e| ApiError::InvalidEncoding {
        field: field.to_string(),
        message: e.utf8_error().to_string(),
    })
}
