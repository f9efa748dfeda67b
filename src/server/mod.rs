//! Axum-based HTTP host for the offline-vault proxy.
//!
//! Application requests hit the fallback handler and go through the cache
//! engine. A small management surface lives under `/__vault/`.
//!
//! # Components
//!
//! - `handlers`: Interception, control, health and metrics endpoints.
//! - `middleware`: Request ID tracking layers.
//! - `routes`: The main router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthCheck, HealthResponse, HealthStatus};
pub use routes::{create_router, AppState};
