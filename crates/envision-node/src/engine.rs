//! Background job runner.

use std::sync::Arc;

use envision_engine::{Envisioner, ParallelEnvisioner};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Runs submitted envisioning jobs one at a time.
pub struct Engine {
    state: AppState,
}

impl Engine {
    /// Create a new engine.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Run the engine's main loop.
    pub async fn run(self: Arc<Self>) {
        info!("🔧 Engine started");

        loop {
            self.process_received_jobs().await;

            // Small delay to prevent busy-waiting
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// Run the oldest waiting job, if any.
    async fn process_received_jobs(&self) {
        if let Some(id) = self.state.received().await.into_iter().next() {
            self.run_job(id).await;
        }
    }

    /// Explore the scenario of one job and store the outcome.
    pub async fn run_job(&self, id: Uuid) {
        let Some(record) = self.state.start(id).await else {
            debug!("Job {} is no longer waiting", id);
            return;
        };

        info!("📋 Envisioning scenario '{}' for job {}", record.scenario.name, id);

        let envisioner = ParallelEnvisioner::with_config(record.config.clone());
        let scenario = &record.scenario;

        match envisioner.envision(&scenario.initial, &scenario.rules).await {
            Ok(result) => {
                if let Some(truncation) = &result.truncation {
                    warn!("⚠️ Job {} truncated: {:?}", id, truncation.reason);
                }
                let (states, transitions) = (result.stats.states, result.stats.transitions);
                if self.state.complete(id, result).await {
                    info!(
                        "✅ Job {} complete with {} states and {} transitions",
                        id, states, transitions
                    );
                } else {
                    info!("🛑 Job {} was cancelled, dropping its result", id);
                }
            }
            Err(e) => {
                error!("❌ Envisioning failed for job {}: {}", id, e);
                self.state.fail(id, e.to_string()).await;
            }
        }
    }
}
