// handlers/mod.rs - HTTP binding for CRUD resources
//
// Handlers stay thin: extract request data, call into `crate::crud`, and let
// `ApiError` map failures to status codes.

pub mod body;
pub mod crud;
pub mod service;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::crud::Crud;
use crate::database::DocumentStore;
use crate::middleware::request_log_middleware;

pub use service::ServiceState;

/// All five operations under `/api/{name}`
pub fn bind_crud(name: &str, crud: Crud) -> Router {
    bind_crud_at(&format!("/api/{}", name), crud)
}

/// All five operations under an arbitrary base path. Path parameters in the
/// base (`/api/parents/:parent/children`) reach dynamic resource options.
pub fn bind_crud_at(base: &str, crud: Crud) -> Router {
    Router::new()
        .route(&format!("{}/:id", base), get(crud::get))
        .route(base, get(crud::list))
        .route(&format!("{}/create", base), post(crud::create))
        .route(&format!("{}/update", base), put(crud::update))
        .route(&format!("{}/destroy", base), delete(crud::destroy))
        .with_state(crud)
}

/// Only `get` and `list` under `/api/{name}`
pub fn bind_read(name: &str, crud: Crud) -> Router {
    let base = format!("/api/{}", name);
    Router::new()
        .route(&format!("{}/:id", base), get(crud::get))
        .route(&base, get(crud::list))
        .with_state(crud)
}

/// Full application: service routes, every resource, and global layers
pub fn app(store: Arc<dyn DocumentStore>, resources: Vec<(String, Crud)>, api: &ApiConfig) -> Router {
    let state = ServiceState {
        store,
        resources: resources.iter().map(|(name, _)| name.clone()).collect(),
    };

    let mut router = Router::new()
        .route("/", get(service::root))
        .route("/health", get(service::health))
        .with_state(state);

    for (name, crud) in resources {
        router = router.merge(bind_crud(&name, crud));
    }

    if api.enable_request_logging {
        router = router.layer(middleware::from_fn(request_log_middleware));
    }

    router
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
