//! Declarative scenario definitions, as accepted over the wire.
//!
//! ```json
//! {
//!   "name": "leaky-tank",
//!   "entities": [
//!     { "name": "container", "role": "container",
//!       "quantities": [{ "name": "volume", "magnitude": "max", "derivative": "0" }] }
//!   ],
//!   "rules": [{ "kind": "A-", "source": "container.volume" }]
//! }
//! ```

use envision_core::{
    EnvisionError, Entity, Landmark, Quantity, QuantityRef, QuantitySpace, QuantitySpaces,
    RelationKind, Relationship, Result,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scenario::Scenario;

/// A custom quantity space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceDefinition {
    /// Space name, referenced by quantities.
    pub name: String,

    /// Landmark symbols in ascending order (`min`, `-`, `0`, `+`, `max`).
    pub landmarks: Vec<String>,
}

/// A quantity and its starting values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityDefinition {
    /// Quantity name within its entity.
    pub name: String,

    /// Space name; defaults to the quantity name.
    #[serde(default)]
    pub space: Option<String>,

    /// Starting magnitude symbol.
    #[serde(default = "zero")]
    pub magnitude: String,

    /// Starting derivative symbol.
    #[serde(default = "zero")]
    pub derivative: String,
}

/// An entity and its quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity name.
    pub name: String,

    /// Physical role; defaults to the name.
    #[serde(default)]
    pub role: Option<String>,

    /// Quantities in declared order.
    pub quantities: Vec<QuantityDefinition>,
}

/// A rule written with its relation label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Relation label (`I+`, `P-`, `VC_max`, ...).
    pub kind: String,

    /// Source quantity as `entity.quantity`.
    pub source: String,

    /// Target quantity; omitted for `C±` and `A±`.
    #[serde(default)]
    pub target: Option<String>,

    /// Value correspondences only: hold in both directions.
    #[serde(default)]
    pub bidirectional: bool,
}

/// A complete scenario definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario name.
    pub name: String,

    /// Description.
    #[serde(default)]
    pub description: String,

    /// Extra quantity spaces on top of the standard ones.
    #[serde(default)]
    pub spaces: Vec<SpaceDefinition>,

    /// Entities in declared order.
    pub entities: Vec<EntityDefinition>,

    /// Rules; routed to the inter or intra list by kind.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,

    /// Add `C+`/`C-` for every quantity.
    #[serde(default = "enabled")]
    pub consequences: bool,
}

fn zero() -> String {
    Landmark::Zero.symbol().to_string()
}

fn enabled() -> bool {
    true
}

impl ScenarioDefinition {
    /// Parse a definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve every name and symbol and build a validated scenario.
    pub fn build(&self) -> Result<Scenario> {
        let mut spaces = QuantitySpaces::standard();
        for space in &self.spaces {
            let landmarks = space
                .landmarks
                .iter()
                .map(|s| s.parse::<Landmark>())
                .collect::<Result<Vec<_>>>()?;
            spaces.register(QuantitySpace::new(&space.name, landmarks)?)?;
        }

        let mut builder = Scenario::builder()
            .name(&self.name)
            .description(&self.description);

        for entity in &self.entities {
            let mut built = Entity::new(
                entity.name.as_str(),
                entity.role.as_deref().unwrap_or(&entity.name),
            );
            for quantity in &entity.quantities {
                let space = spaces.get(quantity.space.as_deref().unwrap_or(&quantity.name))?;
                built = built.with_quantity(Quantity::new(
                    quantity.name.as_str(),
                    space,
                    spaces.derivative(),
                    quantity.magnitude.parse()?,
                    quantity.derivative.parse()?,
                )?);
            }
            builder = builder.entity(built);
        }

        for rule in &self.rules {
            builder = builder.rule(rule.build()?);
        }
        if self.consequences {
            builder = builder.with_consequences();
        }

        let scenario = builder.build()?;
        info!(
            "Built scenario '{}' with {} quantities and {} rules",
            scenario.name,
            scenario.initial.quantity_count(),
            scenario.rules.len()
        );
        Ok(scenario)
    }
}

impl RuleDefinition {
    fn build(&self) -> Result<Relationship> {
        let kind: RelationKind = self.kind.parse()?;
        let source = parse_ref(&self.source)?;
        let target = match &self.target {
            Some(target) => parse_ref(target)?,
            None => source.clone(),
        };

        let rule = Relationship::from_kind(kind, source, target);
        Ok(if self.bidirectional {
            rule.bidirectional()
        } else {
            rule
        })
    }
}

fn parse_ref(raw: &str) -> Result<QuantityRef> {
    raw.split_once('.')
        .filter(|(entity, quantity)| !entity.is_empty() && !quantity.is_empty())
        .map(|(entity, quantity)| QuantityRef::new(entity, quantity))
        .ok_or_else(|| EnvisionError::UnknownQuantity {
            entity: raw.to_string(),
            quantity: String::new(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TANK: &str = r#"{
        "name": "leaky-tank",
        "description": "A full tank with a leak",
        "entities": [
            { "name": "container", "quantities": [{ "name": "volume", "magnitude": "max" }] },
            { "name": "hole", "role": "drain",
              "quantities": [{ "name": "leak", "space": "outflow", "magnitude": "max" }] }
        ],
        "rules": [
            { "kind": "I-", "source": "hole.leak", "target": "container.volume" },
            { "kind": "P+", "source": "container.volume", "target": "hole.leak" },
            { "kind": "VC_0", "source": "container.volume", "target": "hole.leak", "bidirectional": true }
        ]
    }"#;

    #[test]
    fn test_build_from_json() {
        let scenario = ScenarioDefinition::from_json(TANK).unwrap().build().unwrap();
        assert_eq!(scenario.name, "leaky-tank");
        assert_eq!(scenario.initial.entities()[1].role(), "drain");
        assert_eq!(scenario.initial.id().as_str(), "4242");
        assert_eq!(scenario.rules.inter.len(), 2);
        // Four consequences plus the correspondence.
        assert_eq!(scenario.rules.intra.len(), 5);
    }

    #[test]
    fn test_custom_space() {
        let json = r#"{
            "name": "thermostat",
            "spaces": [{ "name": "temperature", "landmarks": ["min", "-", "0", "+", "max"] }],
            "entities": [{ "name": "room", "quantities": [{ "name": "temperature", "magnitude": "-" }] }],
            "consequences": false
        }"#;
        let scenario = ScenarioDefinition::from_json(json).unwrap().build().unwrap();
        assert!(scenario.rules.is_empty());
        assert_eq!(scenario.initial.id().as_str(), "12");
    }

    #[test]
    fn test_configuration_errors() {
        let mut definition = ScenarioDefinition::from_json(TANK).unwrap();
        definition.rules[0].kind = "X+".to_string();
        assert_eq!(
            definition.build().unwrap_err(),
            EnvisionError::UnknownRelationshipKind("X+".to_string())
        );

        let mut definition = ScenarioDefinition::from_json(TANK).unwrap();
        definition.entities[0].quantities[0].magnitude = "-".to_string();
        assert!(matches!(definition.build().unwrap_err(), EnvisionError::InvalidValue { .. }));

        let mut definition = ScenarioDefinition::from_json(TANK).unwrap();
        definition.entities[0].quantities[0].space = Some("depth".to_string());
        assert_eq!(
            definition.build().unwrap_err(),
            EnvisionError::UnknownQuantitySpace("depth".to_string())
        );

        let mut definition = ScenarioDefinition::from_json(TANK).unwrap();
        definition.rules[1].source = "volume".to_string();
        assert!(definition.build().unwrap_err().is_configuration());
    }

    #[test]
    fn test_derivative_space_cannot_be_redefined() {
        let json = r#"{
            "name": "hijack",
            "spaces": [{ "name": "derivative", "landmarks": ["0", "max"] }],
            "entities": [{ "name": "container", "quantities": [{ "name": "volume" }] }]
        }"#;
        let err = ScenarioDefinition::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, EnvisionError::InvalidQuantitySpace { ref name, .. } if name == "derivative"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_json() {
        let err = ScenarioDefinition::from_json("{ \"name\": 3 }").unwrap_err();
        assert!(matches!(err, EnvisionError::Serialization(_)));
    }
}
