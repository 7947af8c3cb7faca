//! The state graph: an arena of states keyed by canonical id.

use std::collections::{BTreeMap, BTreeSet};

use envision_core::{State, StateId};
use serde::Serialize;

/// Exploration status of a registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Queued, not yet expanded.
    Pending,
    /// Closure and branching done.
    Expanded,
}

/// A registered state.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    /// The state itself. Never mutated after registration.
    pub state: State,

    /// Where the node is in the exploration.
    pub status: NodeStatus,
}

/// A labelled transition between two registered states.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Transition {
    /// Source state id.
    pub source: StateId,

    /// Relation label (`I+`, `P+,C+`, `implied`, ...).
    pub label: String,

    /// Target state id.
    pub target: StateId,
}

/// Label for transitions produced by closure.
pub const IMPLIED: &str = "implied";

impl Transition {
    /// Create a transition.
    pub fn new(source: StateId, label: impl Into<String>, target: StateId) -> Self {
        Self {
            source,
            label: label.into(),
            target,
        }
    }

    /// Whether this transition was produced by closure.
    pub fn is_implied(&self) -> bool {
        self.label == IMPLIED
    }
}

/// Directed multigraph of qualitative states.
///
/// States are referred to by id everywhere, so the graph holds no
/// references between nodes and serializes as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StateGraph {
    initial: Option<StateId>,
    nodes: BTreeMap<StateId, Node>,
    edges: BTreeSet<Transition>,
}

impl StateGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the first registered state.
    pub fn initial(&self) -> Option<&StateId> {
        self.initial.as_ref()
    }

    /// Check-and-insert. Returns true if the id was not known before;
    /// an existing node is left untouched.
    pub fn insert(&mut self, state: State, status: NodeStatus) -> bool {
        let id = state.id();
        if self.nodes.contains_key(&id) {
            return false;
        }
        tracing::trace!(id = %id, "registering state");
        if self.initial.is_none() {
            self.initial = Some(id.clone());
        }
        self.nodes.insert(id, Node { state, status });
        true
    }

    /// Mark a node as expanded.
    pub fn mark_expanded(&mut self, id: &StateId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.status = NodeStatus::Expanded;
        }
    }

    /// Record a transition. Self-loops and duplicates are ignored; returns
    /// true if the edge is new.
    pub fn add_edge(&mut self, source: StateId, label: impl Into<String>, target: StateId) -> bool {
        if source == target {
            return false;
        }
        self.edges.insert(Transition::new(source, label, target))
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &StateId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a registered state.
    pub fn get(&self, id: &StateId) -> Option<&State> {
        self.nodes.get(id).map(|n| &n.state)
    }

    /// Status of a registered state.
    pub fn status(&self, id: &StateId) -> Option<NodeStatus> {
        self.nodes.get(id).map(|n| n.status)
    }

    /// `(id, state)` pairs in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (&StateId, &State)> {
        self.nodes.iter().map(|(id, node)| (id, &node.state))
    }

    /// `(source, label, target)` triples in sorted order.
    pub fn edges(&self) -> impl Iterator<Item = &Transition> {
        self.edges.iter()
    }

    /// Ids still waiting for expansion.
    pub fn pending(&self) -> impl Iterator<Item = &StateId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.status == NodeStatus::Pending)
            .map(|(id, _)| id)
    }

    /// Number of registered states.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of transitions.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Outgoing transitions of a state.
    pub fn successors<'a>(&'a self, id: &'a StateId) -> impl Iterator<Item = &'a Transition> {
        self.edges.iter().filter(move |t| &t.source == id)
    }

    /// Incoming transitions of a state.
    pub fn predecessors<'a>(&'a self, id: &'a StateId) -> impl Iterator<Item = &'a Transition> {
        self.edges.iter().filter(move |t| &t.target == id)
    }

    /// Expanded states with no outgoing transitions.
    pub fn terminal_nodes(&self) -> Vec<&StateId> {
        let with_exits: BTreeSet<&StateId> = self.edges.iter().map(|t| &t.source).collect();
        self.nodes
            .iter()
            .filter(|(id, n)| n.status == NodeStatus::Expanded && !with_exits.contains(id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Shortest transition path from the initial state to `target`.
    pub fn path_to(&self, target: &StateId) -> Option<Vec<&Transition>> {
        let start = self.initial.as_ref()?;
        if !self.contains(target) {
            return None;
        }

        let mut parent: BTreeMap<&StateId, &Transition> = BTreeMap::new();
        let mut seen: BTreeSet<&StateId> = BTreeSet::from([start]);
        let mut frontier = std::collections::VecDeque::from([start]);

        while let Some(current) = frontier.pop_front() {
            if current == target {
                break;
            }
            for edge in self.successors(current) {
                if seen.insert(&edge.target) {
                    parent.insert(&edge.target, edge);
                    frontier.push_back(&edge.target);
                }
            }
        }

        let mut path = Vec::new();
        let mut cursor = target;
        while cursor != start {
            let edge = parent.get(cursor).copied()?;
            path.push(edge);
            cursor = &edge.source;
        }
        path.reverse();
        Some(path)
    }
}
