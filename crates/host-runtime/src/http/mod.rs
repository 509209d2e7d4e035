//! # Router Infrastructure
//!
//! The shared router every module adds its routes to, the host-owned
//! endpoints, and the middleware stack wrapped around all of it.
//!
//! ```text
//! TraceLayer ─► CatchPanicLayer ─► CorsLayer ─► TimeoutLayer ─► routes
//! ```

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shared_bus::EventBus;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::container::ServerConfig;

pub use shared_types::{ApiError, FieldErrors, ValidatedJson};

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// Router holding the host's own endpoints.
pub fn build_router(server: &ServerConfig, bus: Arc<EventBus>) -> Router {
    let service = server.app_name.clone();

    Router::new()
        .route(HEALTH_PATH, get(move || health_check(service.clone())))
        .route(METRICS_PATH, get(move || metrics(Arc::clone(&bus))))
}

/// Wrap every route currently in `router` with the host middleware.
pub fn with_middleware(router: Router, server: &ServerConfig) -> Router {
    router
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check(service: String) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": service,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus text exposition, bus gauges refreshed first.
async fn metrics(bus: Arc<EventBus>) -> impl IntoResponse {
    let stats = bus.stats();
    host_telemetry::record_bus_stats(
        stats.published,
        stats.dispatched,
        stats.handler_failures,
        stats.in_flight,
    );

    match host_telemetry::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            ApiError::internal(e.to_string()).into_response()
        }
    }
}
