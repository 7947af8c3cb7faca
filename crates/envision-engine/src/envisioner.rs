//! Envisioner trait, configuration and results.

use async_trait::async_trait;
use envision_core::{Result, RuleSet, State};
use envision_graph::{GraphSummary, StateGraph};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How much diagnostic output a run produces. Never affects discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No report at all.
    Quiet,
    /// Counts at the end of the run.
    #[default]
    Summary,
    /// Counts plus one line per discovered state.
    Detailed,
}

/// Configuration for the envisioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvisionConfig {
    /// Maximum number of states to register.
    pub max_states: usize,

    /// Maximum wall-clock time in milliseconds.
    pub max_duration_ms: u64,

    /// Maximum closure passes per state.
    pub closure_iterations: usize,

    /// Diagnostic volume.
    pub verbosity: Verbosity,
}

impl Default for EnvisionConfig {
    fn default() -> Self {
        Self {
            max_states: 10_000,
            max_duration_ms: 30_000,
            closure_iterations: 16,
            verbosity: Verbosity::Summary,
        }
    }
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvisionStats {
    /// Registered states.
    pub states: usize,

    /// Recorded transitions.
    pub transitions: usize,

    /// Transitions produced by closure.
    pub implied_transitions: usize,

    /// Candidates dropped for jumping a landmark.
    pub discontinuities: usize,

    /// Candidates dropped by a value correspondence.
    pub violations: usize,

    /// States left unexpanded because closure did not converge.
    pub diverged: usize,

    /// Wall-clock time of the run.
    pub elapsed_ms: u64,
}

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// `max_states` reached.
    MaxStates,
    /// `max_duration_ms` elapsed.
    Deadline,
}

/// Marker on a partial graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Which guard fired.
    pub reason: TruncationReason,

    /// Number of states that were never expanded.
    pub unexpanded: usize,
}

/// The outcome of envisioning: a state graph plus run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Envisionment {
    /// Discovered states and transitions.
    pub graph: StateGraph,

    /// Run counters.
    pub stats: EnvisionStats,

    /// Set when a resource guard stopped the run.
    pub truncation: Option<Truncation>,
}

impl Envisionment {
    /// Whether the graph is partial.
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    /// Summary of the graph.
    pub fn summary(&self) -> GraphSummary {
        self.graph.summary()
    }

    /// Log the run at the requested verbosity.
    pub fn report(&self, verbosity: Verbosity) {
        if verbosity == Verbosity::Quiet {
            return;
        }

        if verbosity == Verbosity::Detailed {
            for (id, state) in self.graph.nodes() {
                info!("state {}: {}", id, state.readable_id());
            }
            for edge in self.graph.edges() {
                info!("transition {} -[{}]-> {}", edge.source, edge.label, edge.target);
            }
        }

        info!(
            "Envisioned {} states, {} transitions ({} implied), {} discontinuities, {} violations in {}ms",
            self.stats.states,
            self.stats.transitions,
            self.stats.implied_transitions,
            self.stats.discontinuities,
            self.stats.violations,
            self.stats.elapsed_ms
        );
    }
}

/// Trait for envisioning engines.
#[async_trait]
pub trait Envisioner: Send + Sync {
    /// Explore every state reachable from `initial` under `rules`.
    async fn envision(&self, initial: &State, rules: &RuleSet) -> Result<Envisionment>;

    /// Get the envisioner configuration.
    fn config(&self) -> &EnvisionConfig;

    /// Update the envisioner configuration.
    fn set_config(&mut self, config: EnvisionConfig);
}
