//! Common types used across the envisioning crates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::landmark::Landmark;

/// Qualitative sign of a derivative or of a buffered step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

/// Result of adding two signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    /// The sum has a single sign.
    Determinate(Sign),
    /// Opposite non-zero signs: the sum could be either.
    Ambiguous,
}

impl Sign {
    /// Qualitative addition table over `{-, 0, +}`.
    pub fn add(self, other: Sign) -> Combination {
        use Sign::*;
        match (self, other) {
            (Negative, Positive) | (Positive, Negative) => Combination::Ambiguous,
            (Zero, s) | (s, Zero) => Combination::Determinate(s),
            (s, _) => Combination::Determinate(s),
        }
    }

    /// Sign of a landmark read as a derivative value.
    pub fn of_landmark(landmark: Landmark) -> Self {
        match landmark.global_index() {
            0 | 1 => Sign::Negative,
            2 => Sign::Zero,
            _ => Sign::Positive,
        }
    }

    /// The integer step this sign stands for.
    pub fn as_step(self) -> i8 {
        match self {
            Sign::Negative => -1,
            Sign::Zero => 0,
            Sign::Positive => 1,
        }
    }

    /// Sign of an integer.
    pub fn of_step(step: i8) -> Self {
        match step {
            s if s < 0 => Sign::Negative,
            0 => Sign::Zero,
            _ => Sign::Positive,
        }
    }
}

impl Combination {
    /// Fold another sign into this combination. Ambiguity is absorbing.
    pub fn then(self, sign: Sign) -> Combination {
        match self {
            Combination::Determinate(current) => current.add(sign),
            Combination::Ambiguous => Combination::Ambiguous,
        }
    }
}

/// Direction of a signed relationship (`+` or `-` variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// The unit step this direction contributes.
    pub fn sign(self) -> Sign {
        match self {
            Direction::Positive => Sign::Positive,
            Direction::Negative => Sign::Negative,
        }
    }

    /// `+` or `-`, as used in relation labels.
    pub fn symbol(self) -> &'static str {
        match self {
            Direction::Positive => "+",
            Direction::Negative => "-",
        }
    }
}

/// The two ordinal facets of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Magnitude,
    Derivative,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Magnitude => f.write_str("magnitude"),
            Facet::Derivative => f.write_str("derivative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addition_table() {
        use Sign::*;
        assert_eq!(Negative.add(Negative), Combination::Determinate(Negative));
        assert_eq!(Negative.add(Zero), Combination::Determinate(Negative));
        assert_eq!(Zero.add(Negative), Combination::Determinate(Negative));
        assert_eq!(Zero.add(Zero), Combination::Determinate(Zero));
        assert_eq!(Zero.add(Positive), Combination::Determinate(Positive));
        assert_eq!(Positive.add(Zero), Combination::Determinate(Positive));
        assert_eq!(Positive.add(Positive), Combination::Determinate(Positive));
        assert_eq!(Negative.add(Positive), Combination::Ambiguous);
        assert_eq!(Positive.add(Negative), Combination::Ambiguous);
    }

    #[test]
    fn test_ambiguity_is_absorbing() {
        let combined = Combination::Determinate(Sign::Positive)
            .then(Sign::Negative)
            .then(Sign::Positive);
        assert_eq!(combined, Combination::Ambiguous);
    }

    #[test]
    fn test_landmark_signs() {
        assert_eq!(Sign::of_landmark(Landmark::Minus), Sign::Negative);
        assert_eq!(Sign::of_landmark(Landmark::Zero), Sign::Zero);
        assert_eq!(Sign::of_landmark(Landmark::Plus), Sign::Positive);
        assert_eq!(Sign::of_step(-3), Sign::Negative);
    }
}
