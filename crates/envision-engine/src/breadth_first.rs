//! Sequential breadth-first envisioner.

use async_trait::async_trait;
use envision_core::{Result, RuleSet, State};
use tracing::debug;

use crate::envisioner::{EnvisionConfig, Envisioner, Envisionment};
use crate::exploration::Exploration;
use crate::expansion::Expander;

/// Breadth-first closure-and-branch envisioner.
///
/// Processes one work queue to exhaustion. Every state id is expanded at
/// most once, so the run is bounded by the product of the quantity spaces.
pub struct BreadthFirstEnvisioner {
    config: EnvisionConfig,
}

impl BreadthFirstEnvisioner {
    /// Create a new envisioner with default configuration.
    pub fn new() -> Self {
        Self {
            config: EnvisionConfig::default(),
        }
    }

    /// Create a new envisioner with custom configuration.
    pub fn with_config(config: EnvisionConfig) -> Self {
        Self { config }
    }

    /// Run the exploration on the calling thread.
    pub fn explore(&self, initial: &State, rules: &RuleSet) -> Result<Envisionment> {
        let expander = Expander::new(rules.clone(), self.config.closure_iterations);
        let mut exploration = Exploration::start(initial, rules, self.config.clone())?;
        let budget = exploration.budget();

        while let Some((id, state)) = exploration.next() {
            debug!("Expanding {}", id);
            let outcome = expander.expand(&state, &budget);
            exploration.record(&id, outcome)?;
        }

        Ok(exploration.finish())
    }
}

impl Default for BreadthFirstEnvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Envisioner for BreadthFirstEnvisioner {
    async fn envision(&self, initial: &State, rules: &RuleSet) -> Result<Envisionment> {
        self.explore(initial, rules)
    }

    fn config(&self) -> &EnvisionConfig {
        &self.config
    }

    fn set_config(&mut self, config: EnvisionConfig) {
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envisioner::{TruncationReason, Verbosity};
    use std::collections::BTreeSet;
    use std::time::Instant;

    use envision_core::{
        Direction, EnvisionError, Entity, Landmark, QuantityRef, QuantitySpaces, Relationship,
        StateId,
    };
    use envision_graph::{NodeStatus, IMPLIED};
    use envision_scenario::builtin;

    fn quiet() -> EnvisionConfig {
        EnvisionConfig {
            verbosity: Verbosity::Quiet,
            ..EnvisionConfig::default()
        }
    }

    fn minimal() -> Envisionment {
        let scenario = builtin::tap_container_drain().unwrap();
        BreadthFirstEnvisioner::with_config(quiet())
            .explore(&scenario.initial, &scenario.rules)
            .unwrap()
    }

    fn has_edge(result: &Envisionment, source: &str, label: &str, target: &str) -> bool {
        result.graph.edges().any(|t| {
            t.source == StateId::new(source) && t.label == label && t.target == StateId::new(target)
        })
    }

    #[test]
    fn test_minimal_chain() {
        let result = minimal();

        // (inflow; volume; outflow) as (magnitude, derivative) digit pairs.
        assert!(has_edge(&result, "232222", IMPLIED, "332222"));
        assert!(has_edge(&result, "332222", "I+", "332322"));
        assert!(has_edge(&result, "332322", IMPLIED, "333322"));
        assert!(has_edge(&result, "333322", "P+", "333323"));
        assert!(has_edge(&result, "333323", IMPLIED, "333333"));
        assert!(!result.is_truncated());
    }

    fn reachable(result: &Envisionment, from: &StateId) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::from([from.clone()]);
        let mut frontier = vec![from.clone()];
        while let Some(current) = frontier.pop() {
            for edge in result.graph.successors(&current) {
                if seen.insert(edge.target.clone()) {
                    frontier.push(edge.target.clone());
                }
            }
        }
        seen
    }

    #[test]
    fn test_minimal_settles_into_saturation() {
        let result = minimal();

        // inflow (+,+), volume (max,0), outflow (max,0)
        let saturated = StateId::new("334242");
        assert!(result.graph.contains(&saturated));
        assert_eq!(result.graph.status(&saturated), Some(NodeStatus::Expanded));

        // Filling and draining stay ambiguous at max, so saturation is a
        // closed cycle through 334242 rather than an absorbing node.
        assert!(result.graph.terminal_nodes().is_empty());
        for id in reachable(&result, &saturated) {
            assert!(reachable(&result, &id).contains(&saturated), "{} never returns", id);
        }
        for (id, _) in result.graph.nodes() {
            assert!(reachable(&result, id).contains(&saturated), "{} never saturates", id);
        }
    }

    #[test]
    fn test_pinned_states_settle_by_closure() {
        let result = minimal();

        for (id, state) in result.graph.nodes() {
            if !state.quantities().any(|(_, q)| q.is_pinned()) {
                continue;
            }
            let exits: Vec<_> = result.graph.successors(id).collect();
            assert_eq!(exits.len(), 1, "{}", id);
            assert!(exits[0].is_implied());
            let settled = result.graph.get(&exits[0].target).unwrap();
            assert!(settled.quantities().all(|(_, q)| !q.is_pinned()));
        }
    }

    #[test]
    fn test_minimal_counts() {
        let result = minimal();
        assert_eq!(result.stats.states, 34);
        assert_eq!(result.stats.transitions, 64);
        assert_eq!(result.stats.violations, 19);
    }

    #[test]
    fn test_correspondence_snap_at_start_keeps_exploring() {
        let scenario = builtin::tap_container_drain().unwrap();
        let spaces = QuantitySpaces::standard();
        let initial = State::new(vec![
            Entity::new("tap", "tap")
                .with_standard_quantity(&spaces, "inflow", Landmark::Plus, Landmark::Zero)
                .unwrap(),
            Entity::new("container", "container")
                .with_standard_quantity(&spaces, "volume", Landmark::Max, Landmark::Zero)
                .unwrap(),
            Entity::new("drain", "drain")
                .with_standard_quantity(&spaces, "outflow", Landmark::Zero, Landmark::Zero)
                .unwrap(),
        ]);

        let result = BreadthFirstEnvisioner::with_config(quiet())
            .explore(&initial, &scenario.rules)
            .unwrap();

        let start = initial.id();
        assert!(result.graph.node_count() > 1);
        assert_eq!(result.graph.status(&start), Some(NodeStatus::Expanded));
        assert_eq!(result.stats.discontinuities, 0);
        assert!(has_edge(&result, start.as_str(), IMPLIED, "324242"));
        assert!(!result.is_truncated());
    }

    #[test]
    fn test_minimal_has_no_discontinuities() {
        let result = minimal();
        assert_eq!(result.stats.discontinuities, 0);
        assert_eq!(result.stats.diverged, 0);
    }

    #[test]
    fn test_every_transition_is_continuous() {
        // Holds for the built-in scenario, whose closures never snap.
        let result = minimal();
        for edge in result.graph.edges() {
            let source = result.graph.get(&edge.source).unwrap();
            let target = result.graph.get(&edge.target).unwrap();
            assert!(target.check_continuity(source).is_ok(), "{:?}", edge);
        }
    }

    #[test]
    fn test_deterministic() {
        let first = minimal();
        let second = minimal();
        assert_eq!(first.graph.fingerprint(), second.graph.fingerprint());
        assert_eq!(first.stats.states, second.stats.states);
    }

    #[test]
    fn test_bounded_by_space_product() {
        let result = minimal();
        // inflow 2x3, volume 3x3, outflow 3x3.
        assert!(result.stats.states <= 6 * 9 * 9);
        assert_eq!(result.stats.states, result.graph.node_count());
    }

    #[test]
    fn test_ids_match_states() {
        let result = minimal();
        let mut readable = std::collections::BTreeSet::new();
        for (id, state) in result.graph.nodes() {
            assert_eq!(&state.id(), id);
            assert!(readable.insert(state.readable_id()));
        }
    }

    #[test]
    fn test_closure_fixpoint_of_expanded_nodes() {
        let scenario = builtin::tap_container_drain().unwrap();
        let expander = Expander::new(scenario.rules.clone(), 16);
        let result = minimal();

        for edge in result.graph.edges().filter(|e| e.is_implied()) {
            let closed = result.graph.get(&edge.target).unwrap();
            assert_eq!(expander.close(closed).unwrap().id(), closed.id());
        }
    }

    #[test]
    fn test_truncation_by_state_count() {
        let scenario = builtin::tub_with_pressure().unwrap();
        let config = EnvisionConfig {
            max_states: 50,
            ..quiet()
        };
        let result = BreadthFirstEnvisioner::with_config(config)
            .explore(&scenario.initial, &scenario.rules)
            .unwrap();

        let truncation = result.truncation.clone().unwrap();
        assert_eq!(truncation.reason, TruncationReason::MaxStates);
        assert_eq!(result.graph.node_count(), 50);
        for edge in result.graph.edges() {
            assert!(result.graph.contains(&edge.source));
            assert!(result.graph.contains(&edge.target));
        }
    }

    #[test]
    fn test_truncation_by_deadline() {
        let scenario = builtin::tap_container_drain().unwrap();
        let config = EnvisionConfig {
            max_duration_ms: 0,
            ..quiet()
        };
        let result = BreadthFirstEnvisioner::with_config(config)
            .explore(&scenario.initial, &scenario.rules)
            .unwrap();

        assert_eq!(result.truncation.unwrap().reason, TruncationReason::Deadline);
        assert_eq!(result.graph.node_count(), 1);
    }

    /// Tanks that are each both filled and drained. Every tank quadruples
    /// the branching of the first expansion.
    fn contested_tanks(count: usize) -> (State, RuleSet) {
        let spaces = QuantitySpaces::standard();
        let mut entities = vec![
            Entity::new("tap", "tap")
                .with_standard_quantity(&spaces, "inflow", Landmark::Plus, Landmark::Zero)
                .unwrap(),
            Entity::new("drain", "drain")
                .with_standard_quantity(&spaces, "outflow", Landmark::Plus, Landmark::Zero)
                .unwrap(),
        ];
        let mut inter = Vec::new();
        for i in 0..count {
            let tank = format!("tank{}", i);
            entities.push(
                Entity::new(tank.as_str(), "container")
                    .with_standard_quantity(&spaces, "volume", Landmark::Plus, Landmark::Plus)
                    .unwrap(),
            );
            inter.push(Relationship::influence(
                QuantityRef::new("tap", "inflow"),
                QuantityRef::new(tank.as_str(), "volume"),
                Direction::Positive,
            ));
            inter.push(Relationship::influence(
                QuantityRef::new("drain", "outflow"),
                QuantityRef::new(tank.as_str(), "volume"),
                Direction::Negative,
            ));
        }
        (State::new(entities), RuleSet::new(inter, vec![]))
    }

    #[test]
    fn test_wide_branching_stops_at_deadline() {
        let (initial, rules) = contested_tanks(14);
        let config = EnvisionConfig {
            max_states: usize::MAX,
            max_duration_ms: 50,
            ..quiet()
        };

        let started = Instant::now();
        let result = BreadthFirstEnvisioner::with_config(config)
            .explore(&initial, &rules)
            .unwrap();

        assert!(started.elapsed().as_secs() < 10);
        let truncation = result.truncation.unwrap();
        assert_eq!(truncation.reason, TruncationReason::Deadline);
        assert_eq!(result.graph.status(&initial.id()), Some(NodeStatus::Pending));
        assert_eq!(result.graph.node_count(), 1);
    }

    #[test]
    fn test_wide_branching_stops_at_state_count() {
        let (initial, rules) = contested_tanks(14);
        let config = EnvisionConfig {
            max_states: 100,
            ..quiet()
        };

        let result = BreadthFirstEnvisioner::with_config(config)
            .explore(&initial, &rules)
            .unwrap();

        assert_eq!(result.truncation.unwrap().reason, TruncationReason::MaxStates);
        assert_eq!(result.graph.node_count(), 100);
    }

    #[test]
    fn test_misconfigured_rules_fail_fast() {
        let scenario = builtin::tap_container_drain().unwrap();
        let mut rules = scenario.rules.clone();
        rules.inter.push(Relationship::influence(
            QuantityRef::new("tap", "inflow"),
            QuantityRef::new("bathtub", "volume"),
            Direction::Positive,
        ));

        let err = BreadthFirstEnvisioner::new()
            .explore(&scenario.initial, &rules)
            .unwrap_err();
        assert!(matches!(err, EnvisionError::UnknownQuantity { .. }));
    }

    #[tokio::test]
    async fn test_envisioner_trait() {
        let scenario = builtin::tap_container_drain().unwrap();
        let mut envisioner = BreadthFirstEnvisioner::new();
        envisioner.set_config(quiet());
        assert_eq!(envisioner.config().verbosity, Verbosity::Quiet);

        let result = envisioner
            .envision(&scenario.initial, &scenario.rules)
            .await
            .unwrap();
        assert_eq!(result.graph.fingerprint(), minimal().graph.fingerprint());
    }
}
