//! Synchronous envisioning endpoint.

use axum::{extract::State, http::StatusCode, Json};
use envision_engine::{EnvisionStats, Envisioner, ParallelEnvisioner, Truncation};
use envision_graph::GraphSummary;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::envision::EnvisionRequest;
use super::error_response;
use crate::state::AppState;

/// Response from a synchronous run.
#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub simulation_id: Uuid,
    pub scenario: String,
    pub truncated: bool,
    pub stats: EnvisionStats,
    pub summary: GraphSummary,
    pub truncation: Option<Truncation>,
}

/// Explore a scenario and answer with its summary, without storing a job.
pub async fn simulate(
    State(state): State<AppState>,
    Json(req): Json<EnvisionRequest>,
) -> Result<Json<SimulateResponse>, (StatusCode, String)> {
    let scenario = req.scenario()?;
    let config = req.config.clone().unwrap_or_else(|| state.defaults.clone());
    let simulation_id = Uuid::new_v4();

    info!("🧪 Simulating scenario '{}' ({})", scenario.name, simulation_id);

    let envisioner = ParallelEnvisioner::with_config(config);
    let result = envisioner
        .envision(&scenario.initial, &scenario.rules)
        .await
        .map_err(error_response)?;

    Ok(Json(SimulateResponse {
        simulation_id,
        scenario: scenario.name,
        truncated: result.is_truncated(),
        summary: result.summary(),
        stats: result.stats,
        truncation: result.truncation,
    }))
}
