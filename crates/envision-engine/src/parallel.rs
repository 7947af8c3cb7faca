//! Level-parallel envisioner.
//!
//! Expands a whole breadth-first level at once on the blocking thread pool,
//! then registers the results in frontier order. Registration order is the
//! same as the sequential engine's, so both produce the same graph.

use std::sync::Arc;

use async_trait::async_trait;
use envision_core::{EnvisionError, Result, RuleSet, State};
use futures::future::join_all;
use tracing::debug;

use crate::envisioner::{EnvisionConfig, Envisioner, Envisionment};
use crate::exploration::Exploration;
use crate::expansion::Expander;

/// Envisioner that fans each frontier out over tokio blocking tasks.
pub struct ParallelEnvisioner {
    config: EnvisionConfig,
    workers: usize,
}

impl ParallelEnvisioner {
    /// Create a new envisioner using all available cores.
    pub fn new() -> Self {
        Self::with_config(EnvisionConfig::default())
    }

    /// Create a new envisioner with custom configuration.
    pub fn with_config(config: EnvisionConfig) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { config, workers }
    }

    /// Set the number of blocking tasks per level.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

impl Default for ParallelEnvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Envisioner for ParallelEnvisioner {
    async fn envision(&self, initial: &State, rules: &RuleSet) -> Result<Envisionment> {
        let expander = Arc::new(Expander::new(rules.clone(), self.config.closure_iterations));
        let mut exploration = Exploration::start(initial, rules, self.config.clone())?;
        let budget = exploration.budget();

        loop {
            let level = exploration.drain_level();
            if level.is_empty() {
                break;
            }
            debug!("Expanding level of {} states on {} workers", level.len(), self.workers);

            let chunk_size = level.len().div_ceil(self.workers);
            let tasks = level.chunks(chunk_size).map(|chunk| {
                let chunk = chunk.to_vec();
                let expander = Arc::clone(&expander);
                tokio::task::spawn_blocking(move || {
                    chunk
                        .into_iter()
                        .map(|(id, state)| {
                            let outcome = expander.expand(&state, &budget);
                            (id, outcome)
                        })
                        .collect::<Vec<_>>()
                })
            });

            for joined in join_all(tasks).await {
                let results = joined.map_err(|e| {
                    EnvisionError::Internal(format!("expansion task failed: {}", e))
                })?;
                for (id, outcome) in results {
                    exploration.record(&id, outcome)?;
                }
            }
        }

        Ok(exploration.finish())
    }

    fn config(&self) -> &EnvisionConfig {
        &self.config
    }

    fn set_config(&mut self, config: EnvisionConfig) {
        self.config = config;
    }
}
