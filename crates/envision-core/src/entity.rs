//! Entities: named groupings of quantities under a physical role.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::Result;
use crate::landmark::Landmark;
use crate::quantity::Quantity;
use crate::space::QuantitySpaces;

/// A named bundle of quantities (a tap, a container, a drain, ...).
///
/// Name and role are shared between all copies of a state; only the
/// quantity values differ from state to state.
#[derive(Debug, Clone)]
pub struct Entity {
    name: Arc<str>,
    role: Arc<str>,
    quantities: Vec<Quantity>,
}

impl Entity {
    /// Create an entity with no quantities.
    pub fn new(name: impl Into<Arc<str>>, role: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            quantities: Vec::new(),
        }
    }

    /// Add a quantity (builder style).
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantities.push(quantity);
        self
    }

    /// Add a quantity whose space is named after the quantity itself.
    pub fn with_standard_quantity(
        self,
        spaces: &QuantitySpaces,
        name: &str,
        magnitude: Landmark,
        derivative: Landmark,
    ) -> Result<Self> {
        let quantity = Quantity::new(
            name,
            spaces.get(name)?,
            spaces.derivative(),
            magnitude,
            derivative,
        )?;
        Ok(self.with_quantity(quantity))
    }

    /// Entity name (e.g. "tap").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical role (e.g. "container").
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Quantities in declared order.
    pub fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }

    /// Mutable quantities in declared order.
    pub fn quantities_mut(&mut self) -> &mut [Quantity] {
        &mut self.quantities
    }

    /// Look up a quantity by name.
    pub fn quantity(&self, name: &str) -> Option<&Quantity> {
        self.quantities.iter().find(|q| q.name() == name)
    }

    /// Position of a quantity in declared order.
    pub fn quantity_index(&self, name: &str) -> Option<usize> {
        self.quantities.iter().position(|q| q.name() == name)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Entity", 3)?;
        state.serialize_field("name", &*self.name)?;
        state.serialize_field("role", &*self.role)?;
        state.serialize_field("quantities", &self.quantities)?;
        state.end()
    }
}
