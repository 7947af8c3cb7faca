//! States: an ordered bundle of entities with a value-derived identity.

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;

use crate::entity::Entity;
use crate::error::{EnvisionError, Result};
use crate::quantity::Quantity;

/// Canonical identity of a state.
///
/// Built from the global-scale (magnitude, derivative) indices of every
/// quantity in declared entity/quantity order, so equal ids always mean
/// equal values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    /// Wrap a raw id string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a quantity by entity and quantity name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
pub struct QuantityRef {
    /// Entity name.
    pub entity: String,

    /// Quantity name within the entity.
    pub quantity: String,
}

impl QuantityRef {
    /// Create a reference.
    pub fn new(entity: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            quantity: quantity.into(),
        }
    }
}

impl fmt::Display for QuantityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.quantity)
    }
}

/// A qualitative state of the whole system.
#[derive(Debug, Clone)]
pub struct State {
    entities: Vec<Entity>,
}

impl State {
    /// Create a state from entities in their fixed declared order.
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Add an entity (builder style).
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Entities in declared order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Every quantity with the name of its entity, in declared order.
    pub fn quantities(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.entities
            .iter()
            .flat_map(|e| e.quantities().iter().map(move |q| (e.name(), q)))
    }

    /// Mutable access to every quantity in declared order.
    pub fn quantities_mut(&mut self) -> impl Iterator<Item = &mut Quantity> {
        self.entities.iter_mut().flat_map(|e| e.quantities_mut().iter_mut())
    }

    /// Number of quantities across all entities.
    pub fn quantity_count(&self) -> usize {
        self.entities.iter().map(|e| e.quantities().len()).sum()
    }

    /// Canonical id, a pure function of the quantity values.
    pub fn id(&self) -> StateId {
        let mut raw = String::with_capacity(self.quantity_count() * 2);
        for (_, quantity) in self.quantities() {
            raw.push(digit(quantity.magnitude().global_index()));
            raw.push(digit(quantity.derivative().global_index()));
        }
        StateId(raw)
    }

    /// Human-readable id, for diagnostics only.
    pub fn readable_id(&self) -> String {
        self.quantities()
            .map(|(entity, quantity)| format!("{}.{}", entity, quantity))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Deep copy with every per-round buffer cleared. The only way the
    /// engine derives a successor from a state.
    pub fn snapshot(&self) -> State {
        let mut copy = self.clone();
        copy.reset_round();
        copy
    }

    /// Clear all buffers and latch deltas for a new round.
    pub fn reset_round(&mut self) {
        for quantity in self.quantities_mut() {
            quantity.reset_round();
        }
    }

    /// Resolve a reference to its (entity, quantity) position.
    pub fn locate(&self, reference: &QuantityRef) -> Result<(usize, usize)> {
        self.entities
            .iter()
            .position(|e| e.name() == reference.entity)
            .and_then(|ei| {
                self.entities[ei]
                    .quantity_index(&reference.quantity)
                    .map(|qi| (ei, qi))
            })
            .ok_or_else(|| EnvisionError::UnknownQuantity {
                entity: reference.entity.clone(),
                quantity: reference.quantity.clone(),
            })
    }

    /// Look up a quantity.
    pub fn quantity(&self, reference: &QuantityRef) -> Result<&Quantity> {
        let (ei, qi) = self.locate(reference)?;
        Ok(&self.entities[ei].quantities()[qi])
    }

    /// Look up a quantity mutably.
    pub fn quantity_mut(&mut self, reference: &QuantityRef) -> Result<&mut Quantity> {
        let (ei, qi) = self.locate(reference)?;
        Ok(&mut self.entities[ei].quantities_mut()[qi])
    }

    /// Check every quantity against the same quantity in `previous`.
    pub fn check_continuity(&self, previous: &State) -> Result<()> {
        for ((entity, next), (_, prev)) in self.quantities().zip(previous.quantities()) {
            next.check_continuity(prev, entity)?;
        }
        Ok(())
    }
}

fn digit(index: usize) -> char {
    char::from_digit(index as u32, 10).unwrap_or('?')
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.readable_id())
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("State", 3)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("readable_id", &self.readable_id())?;
        state.serialize_field("entities", &self.entities)?;
        state.end()
    }
}
