//! Graph digests: a content fingerprint and a counting summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::store::StateGraph;

/// Counts describing an explored graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Registered states.
    pub nodes: usize,

    /// Recorded transitions.
    pub edges: usize,

    /// Transitions produced by closure.
    pub implied_edges: usize,

    /// Expanded states without successors.
    pub terminal_nodes: Vec<String>,

    /// Edge count per individual relation label.
    pub labels: BTreeMap<String, usize>,

    /// Content fingerprint of the whole graph.
    pub fingerprint: String,
}

impl StateGraph {
    /// SHA-256 over the sorted node ids and edge triples. Two graphs with the
    /// same nodes and edges always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (id, _) in self.nodes() {
            hasher.update(id.as_str().as_bytes());
            hasher.update(b"\n");
        }
        for edge in self.edges() {
            hasher.update(format!("{} {} {}\n", edge.source, edge.label, edge.target).as_bytes());
        }
        hex_encode(hasher.finalize())
    }

    /// Summarize the graph.
    pub fn summary(&self) -> GraphSummary {
        let mut labels: BTreeMap<String, usize> = BTreeMap::new();
        for edge in self.edges() {
            for label in edge.label.split(',') {
                *labels.entry(label.to_string()).or_default() += 1;
            }
        }

        GraphSummary {
            nodes: self.node_count(),
            edges: self.edge_count(),
            implied_edges: self.edges().filter(|e| e.is_implied()).count(),
            terminal_nodes: self.terminal_nodes().iter().map(|id| id.to_string()).collect(),
            labels,
            fingerprint: self.fingerprint(),
        }
    }
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
}
