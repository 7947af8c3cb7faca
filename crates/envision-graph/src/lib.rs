//! # Envision Graph
//!
//! State-transition graph produced by envisioning, keyed by canonical state id.

pub mod store;
pub mod summary;

pub use store::{Node, NodeStatus, StateGraph, Transition, IMPLIED};
pub use summary::GraphSummary;
