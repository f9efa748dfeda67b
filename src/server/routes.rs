// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{control_handler, health_handler, intercept_handler, metrics_handler};
use super::middleware::request_id_layers;
use crate::config::AppConfig;
use crate::control::ControlHandle;
use crate::engine::CacheEngine;
use crate::error::Result;
use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: CacheEngine,
    pub control: ControlHandle,
}

pub fn create_router(config: AppConfig, engine: CacheEngine, control: ControlHandle) -> Result<Router> {
    let body_limit = config.server.max_body_bytes;
    let state = AppState {
        config: Arc::new(config),
        engine,
        control,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/__vault/health", get(health_handler))
        .route("/__vault/metrics", get(metrics_handler))
        .route("/__vault/control", post(control_handler))
        // Everything else is an intercepted application request
        .fallback(intercept_handler)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
