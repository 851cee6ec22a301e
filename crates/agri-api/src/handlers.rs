//! Route handler functions for all API endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use agri_control::RegistryError;
use agri_core::types::Task;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskAccepted {
    pub task_id: String,
    pub trace_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub task_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub task_types: Vec<String>,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub workers: usize,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub pending_timers: usize,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /control/task - validate and enqueue a task.
///
/// Returns 202 once the task is queued; execution happens later on a worker.
pub async fn submit_task(
    State(state): State<AppState>,
    payload: Result<Json<Task>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskAccepted>), ApiError> {
    let Json(task) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    task.validate()?;

    let receipt = state.service.enqueue(task)?;
    tracing::info!(
        task_id = %receipt.task_id,
        trace_id = %receipt.trace_id,
        "Task accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            task_id: receipt.task_id,
            trace_id: receipt.trace_id,
            status: "accepted".to_string(),
        }),
    ))
}

/// GET /control/registry - registered task types.
pub async fn list_registry(State(state): State<AppState>) -> Json<RegistryResponse> {
    let registry = state.service.registry();
    Json(RegistryResponse {
        task_types: registry.task_types(),
        source: registry.source().map(|p| p.display().to_string()),
    })
}

/// POST /control/registry/reload - re-read the scenario file.
///
/// On failure the previous table stays active.
pub async fn reload_registry(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let registry = state.service.registry();
    let path = state
        .registry_path
        .clone()
        .or_else(|| registry.source())
        .ok_or(RegistryError::NoSource)?;

    if let Err(e) = registry.load_from_file(&path) {
        tracing::warn!(path = %path.display(), error = %e, "Registry reload failed");
        return Err(e.into());
    }

    Ok(Json(ReloadResponse {
        task_types: registry.task_types(),
        source: path.display().to_string(),
    }))
}

/// GET /health - liveness plus engine counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.service.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        workers: stats.workers,
        queue_depth: stats.queue_depth,
        queue_capacity: stats.queue_capacity,
        pending_timers: stats.pending_timers,
    })
}
