//! Quantities: a magnitude/derivative pair plus the per-round contribution buffer.

use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{EnvisionError, Result};
use crate::landmark::Landmark;
use crate::ordinal::OrdinalValue;
use crate::relationship::RelationKind;
use crate::space::QuantitySpace;
use crate::types::{Combination, Facet, Sign};

/// A proposed derivative step, tagged with the relation that proposed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    /// Relation kind that produced the step.
    pub relation: RelationKind,

    /// Unit step (`+1` or `-1`).
    pub step: Sign,
}

/// A physical quantity with a magnitude and a derivative.
#[derive(Debug, Clone)]
pub struct Quantity {
    name: Arc<str>,
    magnitude: OrdinalValue,
    derivative: OrdinalValue,
    buffer: Vec<Contribution>,
    delta: i8,
}

impl Quantity {
    /// Create a quantity from its space, the derivative space and starting landmarks.
    pub fn new(
        name: impl Into<Arc<str>>,
        space: Arc<QuantitySpace>,
        derivative_space: Arc<QuantitySpace>,
        magnitude: Landmark,
        derivative: Landmark,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            magnitude: OrdinalValue::new(space, magnitude)?,
            derivative: OrdinalValue::new(derivative_space, derivative)?,
            buffer: Vec::new(),
            delta: 0,
        })
    }

    /// Name of the quantity within its entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current magnitude.
    pub fn magnitude(&self) -> &OrdinalValue {
        &self.magnitude
    }

    /// Current derivative.
    pub fn derivative(&self) -> &OrdinalValue {
        &self.derivative
    }

    /// Mutable magnitude, for committing rules.
    pub fn magnitude_mut(&mut self) -> &mut OrdinalValue {
        &mut self.magnitude
    }

    /// Mutable derivative, for committing rules.
    pub fn derivative_mut(&mut self) -> &mut OrdinalValue {
        &mut self.derivative
    }

    /// Sign of the current derivative.
    pub fn direction(&self) -> Sign {
        Sign::of_landmark(self.derivative.value())
    }

    /// Signed rate carried into the current round.
    pub fn delta(&self) -> i8 {
        self.delta
    }

    /// Contributions buffered this round.
    pub fn contributions(&self) -> &[Contribution] {
        &self.buffer
    }

    /// Clear the buffer and latch the delta for a new round.
    pub fn reset_round(&mut self) {
        self.buffer.clear();
        self.delta = self.direction().as_step();
    }

    /// Buffer a proposed derivative step. The derivative is not touched.
    pub fn accept(&mut self, relation: RelationKind, step: Sign) {
        if step != Sign::Zero {
            self.buffer.push(Contribution { relation, step });
        }
    }

    /// Combine the buffered steps into the set of candidate derivatives.
    ///
    /// Opposite steps do not cancel: both outcomes are returned so the
    /// engine can branch on them.
    pub fn resolve_derivative(&self) -> Vec<Landmark> {
        let Some(first) = self.buffer.first() else {
            return vec![self.derivative.value()];
        };
        let combined = self.buffer[1..]
            .iter()
            .fold(Combination::Determinate(first.step), |acc, c| acc.then(c.step));

        match combined {
            Combination::Determinate(sign) => vec![self.derivative.stepped(sign).value()],
            Combination::Ambiguous => {
                let down = self.derivative.stepped(Sign::Negative).value();
                let up = self.derivative.stepped(Sign::Positive).value();
                if down == up {
                    vec![down]
                } else {
                    vec![down, up]
                }
            }
        }
    }

    /// Step the magnitude in the direction of the derivative, if there is room.
    /// Returns true if the magnitude moved.
    pub fn apply_consequence(&mut self) -> bool {
        let sign = self.direction();
        self.magnitude.step(sign)
    }

    /// True when the magnitude rests on a point landmark while the derivative
    /// pushes it off, which happens without any time passing.
    pub fn has_implied_consequence(&self) -> bool {
        let sign = self.direction();
        self.magnitude.value().is_point() && self.magnitude.has_room(sign)
    }

    /// True when the magnitude sits on the bound of its space while the
    /// derivative still points past it.
    pub fn is_pinned(&self) -> bool {
        let sign = self.direction();
        sign != Sign::Zero && self.magnitude.value().is_point() && !self.magnitude.has_room(sign)
    }

    /// Bring a pinned derivative to rest. Returns true if it changed.
    pub fn settle(&mut self) -> Result<bool> {
        if !self.is_pinned() {
            return Ok(false);
        }
        self.derivative.replace(Landmark::Zero)?;
        Ok(true)
    }

    /// Magnitudes reachable by the end of a round: an interval value with a
    /// non-zero derivative may stay or reach the next landmark.
    pub fn magnitude_options(&self) -> Vec<Landmark> {
        let current = self.magnitude.value();
        let sign = self.direction();
        if !current.is_point() && self.magnitude.has_room(sign) {
            vec![current, self.magnitude.stepped(sign).value()]
        } else {
            vec![current]
        }
    }

    /// Check that neither facet moved more than one global landmark since `previous`.
    pub fn check_continuity(&self, previous: &Quantity, entity: &str) -> Result<()> {
        let facets = [
            (Facet::Magnitude, previous.magnitude.value(), self.magnitude.value()),
            (Facet::Derivative, previous.derivative.value(), self.derivative.value()),
        ];
        for (facet, from, to) in facets {
            if from.distance(to) > 1 {
                return Err(EnvisionError::Discontinuity {
                    entity: entity.to_string(),
                    quantity: self.name.to_string(),
                    facet: facet.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Same magnitude and derivative as another quantity.
    pub fn same_values(&self, other: &Quantity) -> bool {
        self.magnitude == other.magnitude && self.derivative == other.derivative
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=({}, {})", self.name, self.magnitude, self.derivative)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Quantity", 4)?;
        state.serialize_field("name", &*self.name)?;
        state.serialize_field("space", &self.magnitude.space().name)?;
        state.serialize_field("magnitude", &self.magnitude.value())?;
        state.serialize_field("derivative", &self.derivative.value())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::QuantitySpaces;

    fn quantity(space: &str, magnitude: Landmark, derivative: Landmark) -> Quantity {
        let spaces = QuantitySpaces::standard();
        Quantity::new(
            space,
            spaces.get(space).unwrap(),
            spaces.derivative(),
            magnitude,
            derivative,
        )
        .unwrap()
    }

    #[test]
    fn test_accept_does_not_touch_derivative() {
        let mut volume = quantity("volume", Landmark::Zero, Landmark::Zero);
        volume.accept(RelationKind::InfluencePositive, Sign::Positive);
        assert_eq!(volume.derivative().value(), Landmark::Zero);
        assert_eq!(volume.contributions().len(), 1);
    }

    #[test]
    fn test_resolve_without_contributions_keeps_derivative() {
        let volume = quantity("volume", Landmark::Plus, Landmark::Minus);
        assert_eq!(volume.resolve_derivative(), vec![Landmark::Minus]);
    }

    #[test]
    fn test_resolve_determinate() {
        let mut volume = quantity("volume", Landmark::Zero, Landmark::Zero);
        volume.accept(RelationKind::InfluencePositive, Sign::Positive);
        volume.accept(RelationKind::ProportionPositive, Sign::Positive);
        assert_eq!(volume.resolve_derivative(), vec![Landmark::Plus]);
    }

    #[test]
    fn test_resolve_ambiguous_branches() {
        let mut volume = quantity("volume", Landmark::Plus, Landmark::Zero);
        volume.accept(RelationKind::InfluencePositive, Sign::Positive);
        volume.accept(RelationKind::InfluenceNegative, Sign::Negative);
        assert_eq!(
            volume.resolve_derivative(),
            vec![Landmark::Minus, Landmark::Plus]
        );

        let mut rising = quantity("volume", Landmark::Plus, Landmark::Plus);
        rising.accept(RelationKind::InfluencePositive, Sign::Positive);
        rising.accept(RelationKind::InfluenceNegative, Sign::Negative);
        assert_eq!(rising.resolve_derivative(), vec![Landmark::Zero, Landmark::Plus]);
    }

    #[test]
    fn test_reset_round_clears_buffer_and_latches_delta() {
        let mut volume = quantity("volume", Landmark::Plus, Landmark::Minus);
        volume.accept(RelationKind::InfluencePositive, Sign::Positive);
        volume.reset_round();
        assert!(volume.contributions().is_empty());
        assert_eq!(volume.delta(), -1);
    }

    #[test]
    fn test_apply_consequence_saturates() {
        let mut volume = quantity("volume", Landmark::Plus, Landmark::Plus);
        assert!(volume.apply_consequence());
        assert_eq!(volume.magnitude().value(), Landmark::Max);
        assert!(!volume.apply_consequence());

        let mut still = quantity("volume", Landmark::Plus, Landmark::Zero);
        assert!(!still.apply_consequence());
    }

    #[test]
    fn test_implied_and_interval_options() {
        let leaving_zero = quantity("volume", Landmark::Zero, Landmark::Plus);
        assert!(leaving_zero.has_implied_consequence());
        assert_eq!(leaving_zero.magnitude_options(), vec![Landmark::Zero]);

        let in_interval = quantity("volume", Landmark::Plus, Landmark::Plus);
        assert!(!in_interval.has_implied_consequence());
        assert_eq!(
            in_interval.magnitude_options(),
            vec![Landmark::Plus, Landmark::Max]
        );

        let inflow_ceiling = quantity("inflow", Landmark::Plus, Landmark::Plus);
        assert_eq!(inflow_ceiling.magnitude_options(), vec![Landmark::Plus]);
    }

    #[test]
    fn test_settle_at_bound() {
        let mut full = quantity("outflow", Landmark::Max, Landmark::Plus);
        assert!(full.is_pinned());
        assert!(full.settle().unwrap());
        assert_eq!(full.derivative().value(), Landmark::Zero);
        assert!(!full.settle().unwrap());

        let mut empty = quantity("volume", Landmark::Zero, Landmark::Minus);
        assert!(empty.settle().unwrap());
        assert_eq!(empty.derivative().value(), Landmark::Zero);

        // Interval values are never pinned, even at the top of the space.
        let inflow = quantity("inflow", Landmark::Plus, Landmark::Plus);
        assert!(!inflow.is_pinned());

        let draining = quantity("volume", Landmark::Max, Landmark::Minus);
        assert!(!draining.is_pinned());
    }

    #[test]
    fn test_continuity() {
        let before = quantity("outflow", Landmark::Zero, Landmark::Plus);
        let after = quantity("outflow", Landmark::Plus, Landmark::Plus);
        assert!(after.check_continuity(&before, "drain").is_ok());

        let jump = quantity("outflow", Landmark::Max, Landmark::Plus);
        let err = jump.check_continuity(&before, "drain").unwrap_err();
        assert!(err.is_recoverable());
    }
}
