//! Liveness probe.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::{AppState, JobStatus};

/// Node status with queue depth.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol: String,
    /// Jobs not yet picked up by the engine.
    pub queued_jobs: usize,
    /// Jobs being explored right now.
    pub running_jobs: usize,
}

/// Report liveness, version and queue depth.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let jobs = state.list_jobs().await;
    let count = |status: JobStatus| jobs.iter().filter(|job| job.status == status).count();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol: "envision/1.0".to_string(),
        queued_jobs: count(JobStatus::Received),
        running_jobs: count(JobStatus::Running),
    })
}
