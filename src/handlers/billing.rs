use axum::extract::{Path, State};
use serde::Deserialize;

use super::parse_id;
use crate::database::models::{BillingSettings, Invoice};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::{BillingService, BillingSettingsRequest, InvoiceRequest};
use crate::types::InvoiceStatus;

#[derive(Debug, Deserialize)]
pub struct InvoiceStatusRequest {
    pub status: InvoiceStatus,
}

/// GET /api/organizations/:id/billing-settings
pub async fn get_settings(State(service): State<BillingService>, Path(id): Path<String>) -> ApiResult<BillingSettings> {
    Ok(ApiResponse::success(service.settings(parse_id("id", &id)?).await?))
}

/// PUT /api/organizations/:id/billing-settings
pub async fn put_settings(
    State(service): State<BillingService>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<BillingSettingsRequest>,
) -> ApiResult<BillingSettings> {
    let settings = service.update_settings(parse_id("id", &id)?, request).await?;
    Ok(ApiResponse::success(settings))
}

/// GET /api/organizations/:id/invoices
pub async fn list_invoices(State(service): State<BillingService>, Path(id): Path<String>) -> ApiResult<Vec<Invoice>> {
    Ok(ApiResponse::success(service.invoices(parse_id("id", &id)?).await?))
}

/// POST /api/organizations/:id/invoices
pub async fn create_invoice(
    State(service): State<BillingService>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<InvoiceRequest>,
) -> ApiResult<Invoice> {
    let invoice = service.create_invoice(parse_id("id", &id)?, request).await?;
    Ok(ApiResponse::created(invoice))
}

/// PUT /api/invoices/:id/status
pub async fn set_invoice_status(
    State(service): State<BillingService>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<InvoiceStatusRequest>,
) -> ApiResult<Invoice> {
    let invoice = service.set_invoice_status(parse_id("id", &id)?, request.status).await?;
    Ok(ApiResponse::success(invoice))
}
