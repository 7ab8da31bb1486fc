//! HTTP surface for the citizen lookup service.
//!
//! # Responsibility
//! - Mount citizen routes under `/api/v2/citizen` plus a root health probe.
//! - Log one event per request with method, route template, status and latency.
//! - Serve until Ctrl-C.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use log::{info, warn};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Instant;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use state::{AppState, SharedResolver};

pub const API_PREFIX: &str = "/api/v2/citizen";

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest(API_PREFIX, routes::router())
        .fallback(handler_not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Binds `bind_addr` and serves until Ctrl-C.
pub async fn serve(bind_addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(
        "event=server_start module=api status=ok bind_addr={}",
        listener.local_addr()?
    );
    axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=api status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            "event=server_stop module=api status=signal_error error={}",
            err
        );
    }
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: citizen_core::core_version(),
    })
}

async fn handler_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "No such resource")
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    // Route template only; raw paths and queries may carry personal numbers.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        warn!(
            "event=http_request module=api status={} method={} route={} duration_ms={}",
            status.as_u16(),
            method,
            route,
            elapsed_ms
        );
    } else {
        info!(
            "event=http_request module=api status={} method={} route={} duration_ms={}",
            status.as_u16(),
            method,
            route,
            elapsed_ms
        );
    }
    response
}
