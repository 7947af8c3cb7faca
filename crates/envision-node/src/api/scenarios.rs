//! Built-in scenario catalog.

use axum::{extract::Path, http::StatusCode, Json};
use envision_scenario::{builtin, Scenario};
use serde::Serialize;

use super::error_response;
use crate::render;

/// One catalog entry.
#[derive(Debug, Serialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    /// Quantities as `entity.quantity`, in state order.
    pub quantities: Vec<String>,
    /// Rules in display form.
    pub rules: Vec<String>,
    /// Readable id of the initial state.
    pub initial: String,
}

impl From<&Scenario> for ScenarioInfo {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            quantities: scenario
                .initial
                .quantities()
                .map(|(entity, q)| format!("{}.{}", entity, q.name()))
                .collect(),
            rules: scenario
                .rules
                .inter
                .iter()
                .chain(scenario.rules.intra.iter())
                .map(|rule| rule.to_string())
                .collect(),
            initial: scenario.initial.readable_id(),
        }
    }
}

/// List the built-in scenarios.
pub async fn list_scenarios() -> Result<Json<Vec<ScenarioInfo>>, (StatusCode, String)> {
    let catalog = builtin::catalog().map_err(error_response)?;
    Ok(Json(catalog.iter().map(ScenarioInfo::from).collect()))
}

/// Graphviz DOT of a built-in scenario's causal model.
pub async fn scenario_dot(Path(name): Path<String>) -> Result<String, (StatusCode, String)> {
    let scenario = builtin::find(&name)
        .map_err(error_response)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Scenario {} not found", name)))?;

    Ok(render::causal_model_dot(&scenario))
}
