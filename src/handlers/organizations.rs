use axum::extract::{Path, State};

use super::parse_id;
use crate::database::models::{Organization, OrganizationBilling};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::OrganizationService;

/// GET /api/organizations/:id/billing
pub async fn get_billing(
    State(service): State<OrganizationService>,
    Path(id): Path<String>,
) -> ApiResult<OrganizationBilling> {
    Ok(ApiResponse::success(service.billing(parse_id("id", &id)?).await?))
}

/// PUT /api/organizations/:id/billing
pub async fn put_billing(
    State(service): State<OrganizationService>,
    Path(id): Path<String>,
    ApiJson(billing): ApiJson<OrganizationBilling>,
) -> ApiResult<OrganizationBilling> {
    let billing = service.update_billing(parse_id("id", &id)?, billing).await?;
    Ok(ApiResponse::success(billing))
}

/// POST /api/organizations/:id/deletion - schedule deletion after the grace period
pub async fn schedule_deletion(
    State(service): State<OrganizationService>,
    Path(id): Path<String>,
) -> ApiResult<Organization> {
    Ok(ApiResponse::success(service.schedule_deletion(parse_id("id", &id)?).await?))
}

/// DELETE /api/organizations/:id/deletion
pub async fn cancel_deletion(
    State(service): State<OrganizationService>,
    Path(id): Path<String>,
) -> ApiResult<Organization> {
    Ok(ApiResponse::success(service.cancel_deletion(parse_id("id", &id)?).await?))
}
