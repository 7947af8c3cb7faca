//! Scenarios: an initial state plus the rule lists it evolves under.

use envision_core::{Direction, Entity, QuantityRef, Relationship, Result, RuleScope, RuleSet, State};
use serde::Serialize;

/// A ready-to-explore scenario. Always validated on construction.
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    /// Short identifier (e.g. "tap-container-drain").
    pub name: String,

    /// One-line description.
    pub description: String,

    /// Initial state.
    pub initial: State,

    /// Ordered inter- and intra-entity rules.
    pub rules: RuleSet,
}

impl Scenario {
    /// Create a new ScenarioBuilder.
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::new()
    }
}

/// Builder for scenarios.
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    name: Option<String>,
    description: String,
    entities: Vec<Entity>,
    rules: Vec<Relationship>,
    consequences: bool,
}

impl ScenarioBuilder {
    /// Create a new ScenarioBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scenario name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an entity. Entities keep the order they are added in.
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a rule. It is routed to the inter or intra list by its kind.
    pub fn rule(mut self, rule: Relationship) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add `C+` and `C-` for every quantity, ahead of the other intra rules.
    pub fn with_consequences(mut self) -> Self {
        self.consequences = true;
        self
    }

    /// Build and validate the scenario.
    pub fn build(self) -> Result<Scenario> {
        let initial = State::new(self.entities);

        let mut intra = Vec::new();
        if self.consequences {
            for (entity, quantity) in initial.quantities() {
                let target = QuantityRef::new(entity, quantity.name());
                intra.push(Relationship::consequence(target.clone(), Direction::Positive));
                intra.push(Relationship::consequence(target, Direction::Negative));
            }
        }

        let mut inter = Vec::new();
        for rule in self.rules {
            match rule.scope() {
                RuleScope::Inter => inter.push(rule),
                RuleScope::Intra => intra.push(rule),
            }
        }

        let rules = RuleSet::new(inter, intra);
        rules.validate(&initial)?;

        Ok(Scenario {
            name: self.name.unwrap_or_else(|| "custom".to_string()),
            description: self.description,
            initial,
            rules,
        })
    }
}
