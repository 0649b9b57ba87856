use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_id;
use crate::database::models::{HierarchyNode, NewNode, NodePatch};
use crate::hierarchy::{
    DeletePolicy, HierarchyLevel, HierarchyOptions, HierarchyPath, HierarchyResolver, HierarchySelection,
};
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::services::{DeleteOutcome, HierarchyService};

#[derive(Debug, Deserialize)]
pub struct ChildrenQuery {
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Overrides the configured policy for this request
    pub policy: Option<DeletePolicy>,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(default)]
    pub selection: HierarchySelection,
    pub level: HierarchyLevel,
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub cleared: Vec<HierarchyLevel>,
    /// Deepest level still selected
    pub deepest: Option<HierarchyLevel>,
    #[serde(flatten)]
    pub options: HierarchyOptions,
}

/// GET /api/hierarchy/options - options for every level of a selection
pub async fn options(
    State(resolver): State<HierarchyResolver>,
    ApiQuery(selection): ApiQuery<HierarchySelection>,
) -> ApiResult<HierarchyOptions> {
    selection.check()?;
    Ok(ApiResponse::success(resolver.resolve(&selection).await))
}

/// POST /api/hierarchy/select - change one level, clear everything below it
pub async fn select(
    State(resolver): State<HierarchyResolver>,
    ApiJson(request): ApiJson<SelectRequest>,
) -> ApiResult<SelectResponse> {
    let mut selection = request.selection;
    selection.check()?;
    let cleared = match request.id {
        Some(id) => selection.select(request.level, Some(id)),
        None => selection.clear(request.level),
    };
    let deepest = selection.deepest();
    let options = resolver.resolve(&selection).await;
    Ok(ApiResponse::success(SelectResponse { cleared, deepest, options }))
}

/// GET /api/hierarchy/:level - nodes at a level, under `parent_id`
pub async fn list(
    State(resolver): State<HierarchyResolver>,
    Path(level): Path<String>,
    ApiQuery(query): ApiQuery<ChildrenQuery>,
) -> ApiResult<Vec<HierarchyNode>> {
    let level: HierarchyLevel = level.parse()?;
    let nodes = resolver.children(level, query.parent_id).await?;
    Ok(ApiResponse::success(nodes))
}

/// POST /api/hierarchy/:level
pub async fn create(
    State(service): State<HierarchyService>,
    Path(level): Path<String>,
    ApiJson(node): ApiJson<NewNode>,
) -> ApiResult<HierarchyNode> {
    let level: HierarchyLevel = level.parse()?;
    let node = service.create(level, node).await?;
    Ok(ApiResponse::created(node))
}

/// GET /api/hierarchy/:level/:id
pub async fn get(
    State(service): State<HierarchyService>,
    Path((level, id)): Path<(String, String)>,
) -> ApiResult<HierarchyNode> {
    let level: HierarchyLevel = level.parse()?;
    let node = service.get(level, parse_id("id", &id)?).await?;
    Ok(ApiResponse::success(node))
}

/// PATCH /api/hierarchy/:level/:id
pub async fn update(
    State(service): State<HierarchyService>,
    Path((level, id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<NodePatch>,
) -> ApiResult<HierarchyNode> {
    let level: HierarchyLevel = level.parse()?;
    let node = service.update(level, parse_id("id", &id)?, patch).await?;
    Ok(ApiResponse::success(node))
}

/// DELETE /api/hierarchy/:level/:id[?policy=cascade]
pub async fn delete(
    State(service): State<HierarchyService>,
    Path((level, id)): Path<(String, String)>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<DeleteOutcome> {
    let level: HierarchyLevel = level.parse()?;
    let id = parse_id("id", &id)?;
    let outcome = match query.policy {
        Some(policy) => service.delete_with(level, id, policy).await?,
        None => service.delete(level, id).await?,
    };
    Ok(ApiResponse::success(outcome))
}

/// GET /api/hierarchy/:level/:id/ancestry - the node and everything above it
pub async fn ancestry(
    State(resolver): State<HierarchyResolver>,
    Path((level, id)): Path<(String, String)>,
) -> ApiResult<HierarchyPath> {
    let level: HierarchyLevel = level.parse()?;
    let path = resolver.ancestry(level, parse_id("id", &id)?).await?;
    Ok(ApiResponse::success(path))
}
