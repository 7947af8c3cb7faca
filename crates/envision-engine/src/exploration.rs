//! Bookkeeping shared by the engines: work queue, graph registration,
//! counters and resource guards.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use envision_core::{EnvisionError, Result, RuleSet, State, StateId};
use envision_graph::{NodeStatus, StateGraph, IMPLIED};
use tracing::{info, warn};

use crate::envisioner::{EnvisionConfig, EnvisionStats, Envisionment, Truncation, TruncationReason};
use crate::expansion::{Budget, Expansion};

/// One exploration run in progress.
pub(crate) struct Exploration {
    config: EnvisionConfig,
    graph: StateGraph,
    stats: EnvisionStats,
    queue: VecDeque<StateId>,
    started: Instant,
    truncated: Option<TruncationReason>,
}

impl Exploration {
    /// Validate the rules and seed the queue with the initial state.
    pub fn start(initial: &State, rules: &RuleSet, config: EnvisionConfig) -> Result<Self> {
        rules.validate(initial)?;

        info!(
            "Starting envisioning from {} with {} rules",
            initial.readable_id(),
            rules.len()
        );

        let root = initial.snapshot();
        let mut queue = VecDeque::new();
        queue.push_back(root.id());

        let mut graph = StateGraph::new();
        graph.insert(root, NodeStatus::Pending);

        Ok(Self {
            config,
            graph,
            stats: EnvisionStats::default(),
            queue,
            started: Instant::now(),
            truncated: None,
        })
    }

    /// Limits handed to every expansion of this run.
    ///
    /// The graph never holds more than `max_states` nodes, so a branching
    /// with more distinct successors than that is bound to truncate.
    pub fn budget(&self) -> Budget {
        Budget {
            deadline: self
                .started
                .checked_add(Duration::from_millis(self.config.max_duration_ms)),
            max_successors: Some(self.config.max_states),
        }
    }

    /// Pop the next state to expand, or `None` when done or stopped.
    pub fn next(&mut self) -> Option<(StateId, State)> {
        if !self.may_continue() {
            return None;
        }
        let id = self.queue.pop_front()?;
        let state = self.graph.get(&id)?.clone();
        Some((id, state))
    }

    /// Take the whole current frontier.
    pub fn drain_level(&mut self) -> Vec<(StateId, State)> {
        if !self.may_continue() {
            return Vec::new();
        }
        let ids: Vec<StateId> = self.queue.drain(..).collect();
        ids.into_iter()
            .filter_map(|id| self.graph.get(&id).cloned().map(|state| (id, state)))
            .collect()
    }

    /// Register the expansion of `source`.
    ///
    /// A diverging closure is counted and leaves the source unexpanded; any
    /// other error aborts the run. A branching cut short by the deadline is
    /// discarded and the source stays pending.
    pub fn record(&mut self, source: &StateId, outcome: Result<Expansion>) -> Result<()> {
        if self.truncated.is_some() {
            return Ok(());
        }

        let expansion = match outcome {
            Ok(expansion) => expansion,
            Err(err @ EnvisionError::ClosureDiverged { .. }) => {
                warn!("Leaving {} unexpanded: {}", source, err);
                self.stats.diverged += 1;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let cut_short = expansion.branching.cut_short;
        if cut_short == Some(TruncationReason::Deadline) {
            warn!(
                "Envisioning exceeded max duration of {}ms while branching from {}, returning partial graph",
                self.config.max_duration_ms, source
            );
            self.truncated = cut_short;
            return Ok(());
        }

        // A branching cut short by the successor limit holds more distinct
        // states than the graph may, so registering it stops the run.
        self.register_expansion(source, expansion);
        Ok(())
    }

    fn register_expansion(&mut self, source: &StateId, expansion: Expansion) {
        self.graph.mark_expanded(source);

        let closed_id = expansion.closed.id();
        let origin = if &closed_id == source {
            closed_id
        } else if self.graph.contains(&closed_id) {
            // Already expanded or queued; its successors come from there.
            self.link(source.clone(), IMPLIED.to_string(), closed_id);
            return;
        } else {
            if !self.register(expansion.closed, NodeStatus::Expanded) {
                return;
            }
            self.link(source.clone(), IMPLIED.to_string(), closed_id.clone());
            closed_id
        };

        self.stats.discontinuities += expansion.branching.discontinuities;
        self.stats.violations += expansion.branching.violations;

        for successor in expansion.branching.successors {
            let target = successor.state.id();
            if !self.graph.contains(&target) {
                if !self.register(successor.state, NodeStatus::Pending) {
                    return;
                }
                self.queue.push_back(target.clone());
            }
            self.link(origin.clone(), successor.label, target);
        }
    }

    /// Close the run and hand out the result.
    pub fn finish(mut self) -> Envisionment {
        self.stats.states = self.graph.node_count();
        self.stats.transitions = self.graph.edge_count();
        self.stats.elapsed_ms = self.started.elapsed().as_millis() as u64;

        let truncation = self.truncated.map(|reason| Truncation {
            reason,
            unexpanded: self.graph.pending().count(),
        });

        let envisionment = Envisionment {
            graph: self.graph,
            stats: self.stats,
            truncation,
        };
        envisionment.report(self.config.verbosity);
        envisionment
    }

    fn may_continue(&mut self) -> bool {
        if self.truncated.is_some() {
            return false;
        }
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        if elapsed_ms >= self.config.max_duration_ms {
            warn!(
                "Envisioning exceeded max duration of {}ms, returning partial graph",
                self.config.max_duration_ms
            );
            self.truncated = Some(TruncationReason::Deadline);
            return false;
        }
        true
    }

    fn register(&mut self, state: State, status: NodeStatus) -> bool {
        if self.graph.node_count() >= self.config.max_states {
            warn!(
                "Envisioning reached max states limit of {}, returning partial graph",
                self.config.max_states
            );
            self.truncated = Some(TruncationReason::MaxStates);
            return false;
        }
        self.graph.insert(state, status)
    }

    fn link(&mut self, source: StateId, label: String, target: StateId) {
        let implied = label == IMPLIED;
        if self.graph.add_edge(source, label, target) && implied {
            self.stats.implied_transitions += 1;
        }
    }
}
