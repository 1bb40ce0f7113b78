use axum::{extract::State, http::StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::database::DocumentStore;
use crate::middleware::{ApiResponse, ApiResult};

/// Shared by the service-level routes
#[derive(Clone)]
pub struct ServiceState {
    pub store: Arc<dyn DocumentStore>,
    pub resources: Vec<String>,
}

/// GET / - Service info and bound resources
pub async fn root(State(state): State<ServiceState>) -> ApiResult<Value> {
    let endpoints: Vec<Value> = state
        .resources
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "list": format!("GET /api/{}", name),
                "get": format!("GET /api/{}/:id", name),
                "create": format!("POST /api/{}/create", name),
                "update": format!("PUT /api/{}/update", name),
                "destroy": format!("DELETE /api/{}/destroy", name),
            })
        })
        .collect();

    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "kinds": state.store.registry().kinds().collect::<Vec<_>>(),
        "resources": endpoints,
    })))
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<ServiceState>) -> ApiResponse<Value> {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
