// HTTP handlers, one module per resource.
//
// Handlers stay thin: parse path/query/body, call the service held in
// `AppState`, wrap the result in `ApiResponse`.

pub mod billing;
pub mod connections;
pub mod ean;
pub mod hierarchy;
pub mod organizations;
pub mod system;
pub mod tasks;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse an id path segment, reporting the segment name on failure
pub(crate) fn parse_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::field_error(field, format!("Invalid UUID format: {}", raw)))
}
