use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::database::models::{Connection, ConnectionPatch};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::services::{ConnectionCreated, ConnectionRequest, ConnectionService, PipelinePage, PipelineQuery};
use crate::types::ConnectionType;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CapacityOptions {
    pub connection_type: ConnectionType,
    pub options: &'static [&'static str],
}

/// GET /api/connections - pipeline board (list or kanban)
pub async fn board(
    State(service): State<ConnectionService>,
    ApiQuery(query): ApiQuery<PipelineQuery>,
) -> ApiResult<PipelinePage> {
    Ok(ApiResponse::success(service.board(&query).await?))
}

/// POST /api/connections and POST /api/connections/create
pub async fn create(
    State(service): State<ConnectionService>,
    ApiJson(request): ApiJson<ConnectionRequest>,
) -> ApiResult<ConnectionCreated> {
    let created = service.create(request).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/connections/:id
pub async fn get(State(service): State<ConnectionService>, Path(id): Path<String>) -> ApiResult<Connection> {
    Ok(ApiResponse::success(service.get(parse_id("id", &id)?).await?))
}

/// PATCH /api/connections/:id
pub async fn update(
    State(service): State<ConnectionService>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ConnectionPatch>,
) -> ApiResult<Connection> {
    let connection = service.update(parse_id("id", &id)?, patch).await?;
    Ok(ApiResponse::success(connection))
}

/// PUT /api/connections/:id/status
pub async fn set_status(
    State(service): State<ConnectionService>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Connection> {
    let connection = service.set_status(parse_id("id", &id)?, &request.status).await?;
    Ok(ApiResponse::success(connection))
}

/// POST /api/connections/:id/mark
pub async fn mark(State(service): State<ConnectionService>, Path(id): Path<String>) -> ApiResult<Connection> {
    Ok(ApiResponse::success(service.mark(parse_id("id", &id)?).await?))
}

/// DELETE /api/connections/:id/mark
pub async fn unmark(State(service): State<ConnectionService>, Path(id): Path<String>) -> ApiResult<Connection> {
    Ok(ApiResponse::success(service.unmark(parse_id("id", &id)?).await?))
}

/// GET /api/connections/capacities/:type
pub async fn capacities(Path(kind): Path<String>) -> ApiResult<CapacityOptions> {
    let connection_type: ConnectionType = kind
        .parse()
        .map_err(|message: String| ApiError::field_error("connection_type", message))?;
    Ok(ApiResponse::success(CapacityOptions {
        connection_type,
        options: connection_type.capacity_options(),
    }))
}
