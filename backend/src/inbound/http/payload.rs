//! Request body and query extractor configuration.
//!
//! Extractor failures are reported through the domain [`Error`] so clients
//! see the same JSON envelope as for every other failure.

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::web::{JsonConfig, QueryConfig};

use crate::domain::Error;

/// Largest accepted JSON body, sized for code plus a base64 snapshot.
pub const JSON_BODY_MAX_BYTES: usize = 4 * 1024 * 1024;

fn map_json_error(error: &JsonPayloadError) -> Error {
    match error {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            Error::payload_too_large("request body is too large")
        }
        JsonPayloadError::ContentType => {
            Error::invalid_request("expected an application/json request body")
        }
        other => Error::invalid_request(format!("invalid JSON body: {other}")),
    }
}

/// JSON extractor limits with domain error mapping.
pub fn json_config() -> JsonConfig {
    JsonConfig::default()
        .limit(JSON_BODY_MAX_BYTES)
        .error_handler(|err, _req| map_json_error(&err).into())
}

/// Query extractor with domain error mapping.
pub fn query_config() -> QueryConfig {
    QueryConfig::default().error_handler(|err: QueryPayloadError, _req| {
        Error::invalid_request(format!("invalid query string: {err}")).into()
    })
}
