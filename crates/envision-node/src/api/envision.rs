//! Envisioning job endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use envision_core::StateId;
use envision_engine::{EnvisionConfig, EnvisionStats, Envisionment, Truncation};
use envision_graph::{GraphSummary, Transition};
use envision_scenario::{builtin, Scenario, ScenarioDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error_response;
use crate::render;
use crate::state::{AppState, CancelOutcome, JobRecord, JobStatus};

/// Request to explore a scenario.
///
/// Exactly one of `scenario` (a built-in name) and `definition` must be set.
#[derive(Debug, Deserialize)]
pub struct EnvisionRequest {
    /// Name of a built-in scenario.
    pub scenario: Option<String>,

    /// Inline scenario definition.
    pub definition: Option<ScenarioDefinition>,

    /// Engine configuration; the node defaults apply when omitted.
    pub config: Option<EnvisionConfig>,
}

impl EnvisionRequest {
    /// Resolve the request into a validated scenario.
    pub fn scenario(&self) -> Result<Scenario, (StatusCode, String)> {
        match (&self.scenario, &self.definition) {
            (Some(name), None) => builtin::find(name)
                .map_err(error_response)?
                .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Scenario {} not found", name))),
            (None, Some(definition)) => definition.build().map_err(error_response),
            _ => Err((
                StatusCode::BAD_REQUEST,
                "Provide exactly one of `scenario` or `definition`".to_string(),
            )),
        }
    }
}

/// Response after submitting a job.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub status: String,
    pub message: String,
}

/// Job details.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub scenario: String,
    pub status: JobStatus,
    pub stats: Option<EnvisionStats>,
    pub summary: Option<GraphSummary>,
    pub truncation: Option<Truncation>,
    pub error: Option<String>,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl From<&JobRecord> for JobResponse {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id,
            scenario: record.scenario.name.clone(),
            status: record.status,
            stats: record.result.as_ref().map(|r| r.stats.clone()),
            summary: record.result.as_ref().map(|r| r.summary()),
            truncation: record.result.as_ref().and_then(|r| r.truncation.clone()),
            error: record.error.clone(),
            created_at: record.created_at.to_rfc3339(),
            finished_at: record.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Submit a scenario for background exploration.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<EnvisionRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), (StatusCode, String)> {
    let scenario = req.scenario()?;
    let config = req.config.unwrap_or_else(|| state.defaults.clone());

    let id = state.submit(scenario, config).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id,
            status: "received".to_string(),
            message: "Envisioning job submitted successfully".to_string(),
        }),
    ))
}

/// Get a job by ID.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, (StatusCode, String)> {
    let record = find_job(&state, id).await?;
    Ok(Json(JobResponse::from(&record)))
}

/// Cancel a job that has not finished.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    match state.cancel(id).await {
        CancelOutcome::Cancelled => Ok(StatusCode::NO_CONTENT),
        CancelOutcome::AlreadyFinished(status) => Err((
            StatusCode::CONFLICT,
            format!("Job {} is already in terminal state {:?}", id, status),
        )),
        CancelOutcome::NotFound => Err((StatusCode::NOT_FOUND, format!("Job {} not found", id))),
    }
}

/// Full state graph of a finished job.
pub async fn get_graph(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envisionment>, (StatusCode, String)> {
    let result = find_result(&state, id).await?;
    Ok(Json(Envisionment::clone(&result)))
}

/// Graphviz DOT of a finished job's state graph.
pub async fn get_dot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<String, (StatusCode, String)> {
    let result = find_result(&state, id).await?;
    Ok(render::state_graph_dot(&result.graph))
}

/// Plain-text state table of a finished job.
pub async fn get_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<String, (StatusCode, String)> {
    let result = find_result(&state, id).await?;
    Ok(render::state_table(&result.graph))
}

/// Shortest transition path from the initial state to a given state.
pub async fn get_path(
    State(state): State<AppState>,
    Path((id, target)): Path<(Uuid, String)>,
) -> Result<Json<Vec<Transition>>, (StatusCode, String)> {
    let result = find_result(&state, id).await?;
    let target = StateId::new(target);

    let path = result.graph.path_to(&target).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("State {} is not reachable in job {}", target, id),
        )
    })?;

    Ok(Json(path.into_iter().cloned().collect()))
}

/// List all jobs.
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobResponse>> {
    let records = state.list_jobs().await;
    Json(records.iter().map(JobResponse::from).collect())
}

async fn find_job(state: &AppState, id: Uuid) -> Result<JobRecord, (StatusCode, String)> {
    state
        .get_job(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Job {} not found", id)))
}

async fn find_result(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<Envisionment>, (StatusCode, String)> {
    let record = find_job(state, id).await?;
    record.result.ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            format!("Job {} has no result (status {:?})", id, record.status),
        )
    })
}
