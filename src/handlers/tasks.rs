use axum::extract::{Path, State};

use super::parse_id;
use crate::database::models::{Task, TaskPatch};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::{TaskRequest, TaskService};

/// GET /api/organizations/:id/tasks
pub async fn list(State(service): State<TaskService>, Path(id): Path<String>) -> ApiResult<Vec<Task>> {
    Ok(ApiResponse::success(service.list(parse_id("id", &id)?).await?))
}

/// POST /api/organizations/:id/tasks
pub async fn create(
    State(service): State<TaskService>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<TaskRequest>,
) -> ApiResult<Task> {
    let task = service.create(parse_id("id", &id)?, request).await?;
    Ok(ApiResponse::created(task))
}

/// PATCH /api/tasks/:id
pub async fn update(
    State(service): State<TaskService>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Task> {
    Ok(ApiResponse::success(service.update(parse_id("id", &id)?, patch).await?))
}
