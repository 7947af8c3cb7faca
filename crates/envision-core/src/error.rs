//! Error types for qualitative envisioning.

use thiserror::Error;

/// Main error type for envisioning operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvisionError {
    /// A landmark is not a member of the quantity space it was assigned to.
    #[error("Invalid value '{value}' for quantity space '{space}'")]
    InvalidValue { value: String, space: String },

    /// A quantity space definition is malformed.
    #[error("Invalid quantity space '{name}': {reason}")]
    InvalidQuantitySpace { name: String, reason: String },

    /// No quantity space is registered under this name.
    #[error("Unknown quantity space: {0}")]
    UnknownQuantitySpace(String),

    /// The relation label does not name a known relationship kind.
    #[error("Unknown relationship kind: {0}")]
    UnknownRelationshipKind(String),

    /// A rule references an entity or quantity the state does not contain.
    #[error("Unknown quantity: {entity}.{quantity}")]
    UnknownQuantity { entity: String, quantity: String },

    /// A relationship was placed in the wrong rule list.
    #[error("Relationship {label} cannot be used as an {expected} rule")]
    MisplacedRelationship { label: String, expected: String },

    /// A facet moved more than one landmark between two states.
    #[error("Discontinuity in {entity}.{quantity} {facet}: {from} -> {to}")]
    Discontinuity {
        entity: String,
        quantity: String,
        facet: String,
        from: String,
        to: String,
    },

    /// Closure did not reach a fixpoint within the iteration cap.
    #[error("Closure of state {state_id} did not converge after {iterations} passes")]
    ClosureDiverged { state_id: String, iterations: usize },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnvisionError {
    /// Returns true if this error means the scenario itself is malformed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EnvisionError::InvalidValue { .. }
                | EnvisionError::InvalidQuantitySpace { .. }
                | EnvisionError::UnknownQuantitySpace(_)
                | EnvisionError::UnknownRelationshipKind(_)
                | EnvisionError::UnknownQuantity { .. }
                | EnvisionError::MisplacedRelationship { .. }
        )
    }

    /// Returns true if exploration may drop the offending candidate and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EnvisionError::Discontinuity { .. } | EnvisionError::ClosureDiverged { .. }
        )
    }
}

/// Convenience Result type for envisioning operations.
pub type Result<T> = std::result::Result<T, EnvisionError>;

impl From<serde_json::Error> for EnvisionError {
    fn from(err: serde_json::Error) -> Self {
        EnvisionError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = EnvisionError::UnknownQuantitySpace("viscosity".to_string());
        assert!(err.is_configuration());
        assert!(!err.is_recoverable());

        let err = EnvisionError::Discontinuity {
            entity: "drain".to_string(),
            quantity: "outflow".to_string(),
            facet: "magnitude".to_string(),
            from: "0".to_string(),
            to: "max".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Discontinuity in drain.outflow magnitude: 0 -> max"
        );
    }
}
