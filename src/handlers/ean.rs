use axum::extract::{Path, State};
use std::sync::Arc;

use crate::ean::{validate_ean, EanCheck, EanDetails, EanLookup, DUTCH_PREFIX};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/ean/:code - validation result, always 200
pub async fn check(Path(code): Path<String>) -> ApiResult<EanCheck> {
    Ok(ApiResponse::success(EanCheck::of(&code)))
}

/// GET /api/ean/:code/lookup
pub async fn lookup(
    State(lookup): State<Arc<dyn EanLookup>>,
    Path(code): Path<String>,
) -> ApiResult<EanDetails> {
    let code = validate_ean(&code)?;
    if !code.starts_with(DUTCH_PREFIX) {
        return Err(ApiError::unprocessable_entity(format!(
            "Only EAN codes starting with {} can be looked up",
            DUTCH_PREFIX
        )));
    }
    let details = lookup.lookup(code).await?;
    Ok(ApiResponse::success(details))
}
