//! Quantity spaces: the ordered landmark sequences valid for a physical role.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EnvisionError, Result};
use crate::landmark::Landmark;

/// Name of the space every derivative ranges over.
pub const DERIVATIVE_SPACE: &str = "derivative";

/// A finite ordered sequence of landmarks, a subsequence of the global scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitySpace {
    /// Name of the physical role (e.g. "volume").
    pub name: String,

    /// Landmarks in ascending order.
    pub landmarks: Vec<Landmark>,
}

impl QuantitySpace {
    /// Create a quantity space, checking that it is a strictly ascending
    /// subsequence of the global scale.
    pub fn new(name: impl Into<String>, landmarks: Vec<Landmark>) -> Result<Self> {
        let name = name.into();
        if landmarks.is_empty() {
            return Err(EnvisionError::InvalidQuantitySpace {
                name,
                reason: "space has no landmarks".to_string(),
            });
        }
        if landmarks.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EnvisionError::InvalidQuantitySpace {
                name,
                reason: "landmarks must be strictly ascending on the global scale".to_string(),
            });
        }
        Ok(Self { name, landmarks })
    }

    /// The `{-, 0, +}` space shared by all derivatives.
    pub fn derivative() -> Self {
        Self {
            name: DERIVATIVE_SPACE.to_string(),
            landmarks: vec![Landmark::Minus, Landmark::Zero, Landmark::Plus],
        }
    }

    /// Position of a landmark within this space.
    pub fn index_of(&self, landmark: Landmark) -> Option<usize> {
        self.landmarks.iter().position(|l| *l == landmark)
    }

    /// Check membership.
    pub fn contains(&self, landmark: Landmark) -> bool {
        self.index_of(landmark).is_some()
    }

    /// Number of landmarks.
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Always false for a validated space.
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Registry of named quantity spaces for a scenario.
#[derive(Debug, Clone, Default)]
pub struct QuantitySpaces {
    spaces: BTreeMap<String, Arc<QuantitySpace>>,
}

impl QuantitySpaces {
    /// Create an empty registry (the derivative space is always present).
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.insert(QuantitySpace::derivative());
        registry
    }

    /// Registry with the spaces of the tap/container/drain domain.
    pub fn standard() -> Self {
        use Landmark::{Max, Plus, Zero};

        let mut registry = Self::new();
        registry.insert(QuantitySpace {
            name: "inflow".to_string(),
            landmarks: vec![Zero, Plus],
        });
        for name in ["outflow", "volume", "height", "pressure"] {
            registry.insert(QuantitySpace {
                name: name.to_string(),
                landmarks: vec![Zero, Plus, Max],
            });
        }
        registry
    }

    /// Register (or replace) a space.
    pub fn insert(&mut self, space: QuantitySpace) -> Arc<QuantitySpace> {
        let space = Arc::new(space);
        self.spaces.insert(space.name.clone(), space.clone());
        space
    }

    /// Register a user-defined space. The derivative space is reserved.
    pub fn register(&mut self, space: QuantitySpace) -> Result<Arc<QuantitySpace>> {
        if space.name == DERIVATIVE_SPACE {
            return Err(EnvisionError::InvalidQuantitySpace {
                name: space.name,
                reason: "the derivative space is built in and cannot be redefined".to_string(),
            });
        }
        Ok(self.insert(space))
    }

    /// Look up a space by name.
    pub fn get(&self, name: &str) -> Result<Arc<QuantitySpace>> {
        self.spaces
            .get(name)
            .cloned()
            .ok_or_else(|| EnvisionError::UnknownQuantitySpace(name.to_string()))
    }

    /// The shared derivative space.
    pub fn derivative(&self) -> Arc<QuantitySpace> {
        self.spaces
            .get(DERIVATIVE_SPACE)
            .cloned()
            .unwrap_or_else(|| Arc::new(QuantitySpace::derivative()))
    }

    /// Names of all registered spaces.
    pub fn names(&self) -> Vec<&str> {
        self.spaces.keys().map(String::as_str).collect()
    }
}
