use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Energy Admin API",
            "version": version,
            "description": "Organization hierarchy, energy connections, billing and tasks",
            "endpoints": {
                "hierarchy": "/api/hierarchy/options, /api/hierarchy/select, /api/hierarchy/:level[/:id[/ancestry]]",
                "connections": "/api/connections[/:id[/status|/mark]], /api/connections/create, /api/connections/capacities/:type",
                "ean": "/api/ean/:code[/lookup]",
                "organizations": "/api/organizations/:id/{billing,deletion,billing-settings,invoices,tasks}",
                "invoices": "/api/invoices/:id/status",
                "tasks": "/api/tasks/:id",
            }
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let lookup = if state.lookup.is_enabled() { "enabled" } else { "disabled" };

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "ean_lookup": lookup
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
