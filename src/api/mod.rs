//! REST API server for stream-recorder.
//!
//! Provides HTTP endpoints for:
//! - Service info and health (`/`, `/api/ping`, `/api/version`)
//! - Supported platforms
//! - Recording control (start, stop, list)

pub mod error;
pub mod routes;

use crate::config::ServerConfig;
use crate::recorder::{RecordingManager, SUPPORTED_PLATFORMS};
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::recording::{RecordRequest, RecordResponse, RecordingState};

pub struct ApiServer {
    address: String,
    recording_state: RecordingState,
}

impl ApiServer {
    pub fn new(manager: Arc<RecordingManager>, config: &ServerConfig) -> Self {
        Self {
            address: config.address(),
            recording_state: RecordingState { manager },
        }
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/ping", get(ping))
            .route("/version", get(version))
            .route("/platforms", get(platforms))
            .merge(routes::recording::router(self.recording_state.clone()));

        Router::new()
            .route("/", get(status))
            .nest("/api", api)
            .layer(ServiceBuilder::new())
    }

    /// Serve until `shutdown` resolves.
    pub async fn start(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&self.address).await?;

        info!("API server listening on http://{}", self.address);
        info!("Endpoints:");
        info!("  GET  /                  - Service info");
        info!("  GET  /api/ping          - Health check");
        info!("  GET  /api/version       - Get version info");
        info!("  GET  /api/platforms     - List supported platforms");
        info!("  POST /api/record/start  - Start a recording");
        info!("  POST /api/record/stop   - Stop a recording");
        info!("  GET  /api/recordings    - List active recordings");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "stream-recorder",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "stream-recorder"
    }))
}

async fn platforms() -> Json<Value> {
    Json(json!({ "platforms": SUPPORTED_PLATFORMS }))
}
