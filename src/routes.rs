use axum::{
    http::HeaderValue,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{billing, connections, ean, hierarchy, organizations, system, tasks};
use crate::state::AppState;

/// The complete router with global middleware
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(hierarchy_routes())
        .merge(connection_routes())
        .merge(ean_routes())
        .merge(organization_routes())
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn hierarchy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/hierarchy/options", get(hierarchy::options))
        .route("/api/hierarchy/select", post(hierarchy::select))
        .route("/api/hierarchy/:level", get(hierarchy::list).post(hierarchy::create))
        .route(
            "/api/hierarchy/:level/:id",
            get(hierarchy::get)
                .patch(hierarchy::update)
                .delete(hierarchy::delete),
        )
        .route("/api/hierarchy/:level/:id/ancestry", get(hierarchy::ancestry))
}

fn connection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/connections", get(connections::board).post(connections::create))
        .route("/api/connections/create", post(connections::create))
        .route("/api/connections/capacities/:type", get(connections::capacities))
        .route("/api/connections/:id", get(connections::get).patch(connections::update))
        .route("/api/connections/:id/status", put(connections::set_status))
        .route("/api/connections/:id/mark", post(connections::mark).delete(connections::unmark))
}

fn ean_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ean/:code", get(ean::check))
        .route("/api/ean/:code/lookup", get(ean::lookup))
}

fn organization_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/organizations/:id/billing",
            get(organizations::get_billing).put(organizations::put_billing),
        )
        .route(
            "/api/organizations/:id/deletion",
            post(organizations::schedule_deletion).delete(organizations::cancel_deletion),
        )
        .route(
            "/api/organizations/:id/billing-settings",
            get(billing::get_settings).put(billing::put_settings),
        )
        .route(
            "/api/organizations/:id/invoices",
            get(billing::list_invoices).post(billing::create_invoice),
        )
        .route("/api/invoices/:id/status", put(billing::set_invoice_status))
        .route("/api/organizations/:id/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/:id", patch(tasks::update))
}
