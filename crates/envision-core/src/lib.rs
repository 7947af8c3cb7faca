//! # Envision Core
//!
//! Core primitives for qualitative envisioning.
//!
//! This crate provides the fundamental building blocks:
//! - [`Landmark`] and [`QuantitySpace`] - Ordinal scales
//! - [`Quantity`] and [`Entity`] - The modelled system
//! - [`State`] - A snapshot of every quantity with a canonical [`StateId`]
//! - [`Relationship`] and [`RuleSet`] - Causal rules
//! - [`EnvisionError`] - Error types

pub mod entity;
pub mod error;
pub mod landmark;
pub mod ordinal;
pub mod quantity;
pub mod relationship;
pub mod space;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use entity::Entity;
pub use error::{EnvisionError, Result};
pub use landmark::{Landmark, GLOBAL_SCALE};
pub use ordinal::OrdinalValue;
pub use quantity::{Contribution, Quantity};
pub use relationship::{RelationKind, Relationship, RuleOutcome, RuleScope, RuleSet};
pub use space::{QuantitySpace, QuantitySpaces, DERIVATIVE_SPACE};
pub use state::{QuantityRef, State, StateId};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::entity::Entity;
    pub use crate::error::{EnvisionError, Result};
    pub use crate::landmark::Landmark;
    pub use crate::relationship::{RelationKind, Relationship, RuleSet};
    pub use crate::space::{QuantitySpace, QuantitySpaces};
    pub use crate::state::{QuantityRef, State, StateId};
    pub use crate::types::{Direction, Sign};
}
