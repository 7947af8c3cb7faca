//! Landmarks and the global ordinal scale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnvisionError, Result};

/// A named qualitative value on the global scale `min < - < 0 < + < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Landmark {
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "max")]
    Max,
}

/// The global landmark scale every quantity space is a subsequence of.
pub const GLOBAL_SCALE: [Landmark; 5] = [
    Landmark::Min,
    Landmark::Minus,
    Landmark::Zero,
    Landmark::Plus,
    Landmark::Max,
];

impl Landmark {
    /// Position of this landmark on the global scale.
    pub fn global_index(self) -> usize {
        match self {
            Landmark::Min => 0,
            Landmark::Minus => 1,
            Landmark::Zero => 2,
            Landmark::Plus => 3,
            Landmark::Max => 4,
        }
    }

    /// The landmark at a global-scale position.
    pub fn from_global_index(index: usize) -> Option<Self> {
        GLOBAL_SCALE.get(index).copied()
    }

    /// The symbol used in readable ids and scenario files.
    pub fn symbol(self) -> &'static str {
        match self {
            Landmark::Min => "min",
            Landmark::Minus => "-",
            Landmark::Zero => "0",
            Landmark::Plus => "+",
            Landmark::Max => "max",
        }
    }

    /// Returns true for point landmarks (`min`, `0`, `max`).
    ///
    /// A quantity resting on a point with a non-zero derivative leaves it
    /// immediately; `-` and `+` are open intervals that take time to cross.
    pub fn is_point(self) -> bool {
        matches!(self, Landmark::Min | Landmark::Zero | Landmark::Max)
    }

    /// Global-scale distance between two landmarks.
    pub fn distance(self, other: Landmark) -> usize {
        self.global_index().abs_diff(other.global_index())
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Landmark {
    type Err = EnvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "min" => Ok(Landmark::Min),
            "-" => Ok(Landmark::Minus),
            "0" => Ok(Landmark::Zero),
            "+" => Ok(Landmark::Plus),
            "max" => Ok(Landmark::Max),
            other => Err(EnvisionError::InvalidValue {
                value: other.to_string(),
                space: "global".to_string(),
            }),
        }
    }
}
