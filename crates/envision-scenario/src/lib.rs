//! # Envision Scenario
//!
//! Scenario construction for the envisioning engine: built-in models and
//! declarative JSON definitions, both validated before exploration.

pub mod builtin;
pub mod definition;
pub mod scenario;

pub use definition::{
    EntityDefinition, QuantityDefinition, RuleDefinition, ScenarioDefinition, SpaceDefinition,
};
pub use scenario::{Scenario, ScenarioBuilder};
