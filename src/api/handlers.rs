use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;

use super::AppState;

/// Answer to a job trigger
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub status: String,
    pub run_id: Uuid,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "update_running": state.update_job.is_running(),
            "similarities_running": state.similarity_job.is_running(),
        })),
    )
}

/// Starts a full catalog update in the background
pub async fn update_database(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let pipeline = state.pipeline.clone();
    let cancel = state.cancel.clone();

    let run_id = state
        .update_job
        .start(move || async move { pipeline.run_catalog_update(&cancel).await })?;

    tracing::info!(run_id = %run_id, "Catalog update started");

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskResponse {
            status: "Started update".to_string(),
            run_id,
        }),
    ))
}

/// Starts a similarity recompute in the background
pub async fn find_similarities(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let pipeline = state.pipeline.clone();
    let cancel = state.cancel.clone();

    let run_id = state
        .similarity_job
        .start(move || async move { pipeline.run_similarity_recompute(&cancel).await })?;

    tracing::info!(run_id = %run_id, "Similarity recompute started");

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskResponse {
            status: "Finding similarities".to_string(),
            run_id,
        }),
    ))
}
