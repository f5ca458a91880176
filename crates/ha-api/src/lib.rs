//! Home Assistant config flow HTTP API
//!
//! The endpoints a frontend uses to render config flow forms, submit
//! answers, and manage the config entries finished flows create.
//! Based on: https://developers.home-assistant.io/docs/api/rest

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use ha_config_entries::{ConfigEntries, ConfigEntriesError};
use ha_config_flow::{ConfigFlowHandler, FlowError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Config entries manager
    pub config_entries: Arc<ConfigEntries>,
    /// Config flow handler for integration setup
    pub config_flow_handler: Option<Arc<dyn ConfigFlowHandler>>,
}

/// API status response
#[derive(Serialize)]
struct ApiStatus {
    message: &'static str,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/", get(api_status))
        // Config entries
        .route("/api/config/config_entries/entry", get(get_config_entries))
        .route(
            "/api/config/config_entries/entry/:entry_id",
            delete(delete_config_entry),
        )
        // Config flows
        .route(
            "/api/config/config_entries/flow_handlers",
            get(get_config_flow_handlers),
        )
        .route(
            "/api/config/config_entries/flow",
            get(list_config_flows).post(start_config_flow),
        )
        .route(
            "/api/config/config_entries/flow/:flow_id",
            get(get_config_flow)
                .post(progress_config_flow)
                .delete(cancel_config_flow),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(state: AppState, addr: &str) -> std::io::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);
    axum::serve(listener, router).await
}

// ==================== Handlers ====================

/// GET /api/ - Returns API status
async fn api_status() -> Json<ApiStatus> {
    Json(ApiStatus {
        message: "API running.",
    })
}

fn message(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({ "message": message.into() })),
    )
}

fn flow_error_response(err: &FlowError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        FlowError::UnknownHandler(_) | FlowError::UnknownFlow(_) => StatusCode::NOT_FOUND,
        FlowError::InvalidInput(_) | FlowError::UnknownStep { .. } => StatusCode::BAD_REQUEST,
        FlowError::Persist(_) | FlowError::Serialization(_) => {
            tracing::error!("Config flow failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    message(status, err.to_string())
}

fn flow_handler(
    state: &AppState,
) -> Result<Arc<dyn ConfigFlowHandler>, (StatusCode, Json<serde_json::Value>)> {
    state.config_flow_handler.clone().ok_or_else(|| {
        message(
            StatusCode::SERVICE_UNAVAILABLE,
            "Config flow handler not available",
        )
    })
}

/// Query parameters for the entry listing
#[derive(Deserialize)]
struct EntriesQuery {
    domain: Option<String>,
}

/// GET /api/config/config_entries/entry - List config entries
async fn get_config_entries(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> impl IntoResponse {
    let entries = match query.domain {
        Some(domain) => state.config_entries.get_by_domain(&domain),
        None => state.config_entries.entries(),
    };
    Json(entries)
}

/// DELETE /api/config/config_entries/entry/{entry_id} - Delete a config entry
async fn delete_config_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> impl IntoResponse {
    info!("HTTP DELETE config entry: {}", entry_id);

    match state.config_entries.remove(&entry_id).await {
        Ok(_entry) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "require_restart": false
            })),
        ),
        Err(ConfigEntriesError::NotFound(_)) => message(
            StatusCode::NOT_FOUND,
            format!("Invalid entry specified: {}", entry_id),
        ),
        Err(e) => {
            tracing::error!("Failed to delete config entry {}: {}", entry_id, e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/config/config_entries/flow_handlers - Domains with a config flow
async fn get_config_flow_handlers(State(state): State<AppState>) -> impl IntoResponse {
    let handlers = state
        .config_flow_handler
        .as_ref()
        .map(|h| h.handlers())
        .unwrap_or_default();
    Json(handlers)
}

/// GET /api/config/config_entries/flow - In-progress flows
async fn list_config_flows(State(state): State<AppState>) -> impl IntoResponse {
    let flows = match &state.config_flow_handler {
        Some(handler) => handler.list_flows().await,
        None => Vec::new(),
    };
    Json(flows)
}

/// Request to start a config flow
#[derive(Deserialize)]
pub struct StartFlowRequest {
    pub handler: String,
    #[serde(default)]
    pub show_advanced_options: bool,
}

/// POST /api/config/config_entries/flow - Start a new config flow
async fn start_config_flow(
    State(state): State<AppState>,
    Json(request): Json<StartFlowRequest>,
) -> impl IntoResponse {
    info!(
        "HTTP POST start config flow for handler: {}",
        request.handler
    );

    let handler = match flow_handler(&state) {
        Ok(h) => h,
        Err(response) => return response,
    };

    match handler
        .start_flow(&request.handler, request.show_advanced_options)
        .await
        .and_then(|result| serde_json::to_value(result).map_err(FlowError::from))
    {
        Ok(flow_result) => (StatusCode::OK, Json(flow_result)),
        Err(e) => flow_error_response(&e),
    }
}

/// GET /api/config/config_entries/flow/{flow_id} - Re-render the current step
async fn get_config_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
) -> impl IntoResponse {
    info!("HTTP GET config flow: {}", flow_id);

    let handler = match flow_handler(&state) {
        Ok(h) => h,
        Err(response) => return response,
    };

    match handler
        .progress_flow(&flow_id, None)
        .await
        .and_then(|result| serde_json::to_value(result).map_err(FlowError::from))
    {
        Ok(flow_result) => (StatusCode::OK, Json(flow_result)),
        Err(e) => flow_error_response(&e),
    }
}

/// POST /api/config/config_entries/flow/{flow_id} - Submit answers for the current step
async fn progress_config_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Json(user_input): Json<serde_json::Value>,
) -> impl IntoResponse {
    info!("HTTP POST progress config flow: {}", flow_id);

    let handler = match flow_handler(&state) {
        Ok(h) => h,
        Err(response) => return response,
    };

    // An empty body object is a submitted form with nothing filled in,
    // not a request to re-render
    match handler
        .progress_flow(&flow_id, Some(user_input))
        .await
        .and_then(|result| serde_json::to_value(result).map_err(FlowError::from))
    {
        Ok(flow_result) => (StatusCode::OK, Json(flow_result)),
        Err(e) => flow_error_response(&e),
    }
}

/// DELETE /api/config/config_entries/flow/{flow_id} - Cancel a config flow
async fn cancel_config_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
) -> impl IntoResponse {
    info!("HTTP DELETE (cancel) config flow: {}", flow_id);

    let handler = match flow_handler(&state) {
        Ok(h) => h,
        Err(response) => return response,
    };

    match handler.abort_flow(&flow_id).await {
        Ok(()) => message(StatusCode::OK, "Flow aborted"),
        Err(e) => flow_error_response(&e),
    }
}
