//! Recording control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting a recording (POST /record/start)
//! - Stopping a recording (POST /record/stop)
//! - Listing active recordings (GET /recordings)

use crate::api::error::ApiResult;
use crate::recorder::{RecordingInfo, RecordingManager};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Request body for the start and stop endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    pub platform: String,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    pub message: String,
    pub recording: RecordingInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingsResponse {
    pub recordings: Vec<RecordingInfo>,
}

#[derive(Clone)]
pub struct RecordingState {
    pub manager: Arc<RecordingManager>,
}

/// Creates the recording router with all recording-related endpoints.
pub fn router(state: RecordingState) -> Router {
    Router::new()
        .route("/record/start", post(start_recording))
        .route("/record/stop", post(stop_recording))
        .route("/recordings", get(list_recordings))
        .with_state(state)
}

async fn start_recording(
    State(state): State<RecordingState>,
    Json(req): Json<RecordRequest>,
) -> ApiResult<Json<RecordResponse>> {
    info!(
        "Start recording requested for {} on {}",
        req.channel, req.platform
    );

    let recording = state.manager.start(&req.platform, &req.channel).await?;

    Ok(Json(RecordResponse {
        message: format!("recording started for channel: {}", recording.channel),
        recording,
    }))
}

async fn stop_recording(
    State(state): State<RecordingState>,
    Json(req): Json<RecordRequest>,
) -> ApiResult<Json<RecordResponse>> {
    info!(
        "Stop recording requested for {} on {}",
        req.channel, req.platform
    );

    let recording = state.manager.stop(&req.platform, &req.channel).await?;

    Ok(Json(RecordResponse {
        message: format!("recording stopped for channel: {}", recording.channel),
        recording,
    }))
}

async fn list_recordings(State(state): State<RecordingState>) -> Json<RecordingsResponse> {
    Json(RecordingsResponse {
        recordings: state.manager.list().await,
    })
}
