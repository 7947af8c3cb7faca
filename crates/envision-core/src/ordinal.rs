//! Ordinal values: a position on a finite landmark scale.

use std::fmt;
use std::sync::Arc;

use crate::error::{EnvisionError, Result};
use crate::landmark::Landmark;
use crate::space::QuantitySpace;
use crate::types::Sign;

/// A scalar positioned on a quantity space.
///
/// The index is always a valid position in the space; stepping past either
/// end saturates silently.
#[derive(Debug, Clone)]
pub struct OrdinalValue {
    space: Arc<QuantitySpace>,
    index: usize,
}

impl OrdinalValue {
    /// Create a value, failing with `InvalidValue` if the landmark is not in the space.
    pub fn new(space: Arc<QuantitySpace>, value: Landmark) -> Result<Self> {
        let index = space.index_of(value).ok_or_else(|| EnvisionError::InvalidValue {
            value: value.to_string(),
            space: space.name.clone(),
        })?;
        Ok(Self { space, index })
    }

    /// Current landmark.
    pub fn value(&self) -> Landmark {
        self.space.landmarks[self.index]
    }

    /// Index within the own space.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index on the global scale.
    pub fn global_index(&self) -> usize {
        self.value().global_index()
    }

    /// The space this value ranges over.
    pub fn space(&self) -> &QuantitySpace {
        &self.space
    }

    /// At the floor of the space.
    pub fn is_min(&self) -> bool {
        self.index == 0
    }

    /// At the ceiling of the space.
    pub fn is_max(&self) -> bool {
        self.index + 1 == self.space.len()
    }

    /// Whether a step in this direction would move the value.
    pub fn has_room(&self, sign: Sign) -> bool {
        match sign {
            Sign::Positive => !self.is_max(),
            Sign::Negative => !self.is_min(),
            Sign::Zero => false,
        }
    }

    /// Move one landmark in the given direction; a no-op at the bounds.
    /// Returns true if the value changed.
    pub fn step(&mut self, sign: Sign) -> bool {
        if !self.has_room(sign) {
            return false;
        }
        match sign {
            Sign::Positive => self.index += 1,
            Sign::Negative => self.index -= 1,
            Sign::Zero => {}
        }
        true
    }

    /// Copy of this value stepped once in the given direction.
    pub fn stepped(&self, sign: Sign) -> Self {
        let mut next = self.clone();
        next.step(sign);
        next
    }

    /// Unconditional overwrite, used when committing a resolved branch or a
    /// forced correspondence.
    pub fn replace(&mut self, value: Landmark) -> Result<()> {
        self.index = self.space.index_of(value).ok_or_else(|| EnvisionError::InvalidValue {
            value: value.to_string(),
            space: self.space.name.clone(),
        })?;
        Ok(())
    }
}

impl PartialEq for OrdinalValue {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl Eq for OrdinalValue {}

impl PartialEq<Landmark> for OrdinalValue {
    fn eq(&self, other: &Landmark) -> bool {
        self.value() == *other
    }
}

impl fmt::Display for OrdinalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::QuantitySpaces;

    fn volume(value: Landmark) -> OrdinalValue {
        let spaces = QuantitySpaces::standard();
        OrdinalValue::new(spaces.get("volume").unwrap(), value).unwrap()
    }

    #[test]
    fn test_rejects_foreign_landmark() {
        let spaces = QuantitySpaces::standard();
        let err = OrdinalValue::new(spaces.get("inflow").unwrap(), Landmark::Max).unwrap_err();
        assert!(matches!(err, EnvisionError::InvalidValue { .. }));
    }

    #[test]
    fn test_saturating_steps() {
        let mut value = volume(Landmark::Zero);
        assert!(value.is_min());
        assert!(!value.step(Sign::Negative));
        assert_eq!(value, Landmark::Zero);

        assert!(value.step(Sign::Positive));
        assert!(value.step(Sign::Positive));
        assert_eq!(value, Landmark::Max);
        assert!(value.is_max());

        assert!(!value.step(Sign::Positive));
        assert_eq!(value.index(), 2);
        assert_eq!(value.global_index(), 4);
    }

    #[test]
    fn test_replace() {
        let mut value = volume(Landmark::Zero);
        value.replace(Landmark::Max).unwrap();
        assert_eq!(value, Landmark::Max);
        assert!(value.replace(Landmark::Minus).is_err());
        assert_eq!(value, Landmark::Max);
    }
}
