//! Causal relationships between quantities.
//!
//! Every relationship exposes one behavioural method, [`Relationship::apply`],
//! dispatched on the variant:
//! - Consequence, Action and ValueCorrespondence commit directly to the state
//!   they are given.
//! - Influence and Proportion only buffer a contribution on the target
//!   derivative; the engine resolves all buffers of a round together.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnvisionError, Result};
use crate::landmark::Landmark;
use crate::state::{QuantityRef, State};
use crate::types::{Direction, Sign};

/// Relation labels, used as edge labels in the state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "C+")]
    ConsequencePositive,
    #[serde(rename = "C-")]
    ConsequenceNegative,
    #[serde(rename = "A+")]
    ActionPositive,
    #[serde(rename = "A-")]
    ActionNegative,
    #[serde(rename = "I+")]
    InfluencePositive,
    #[serde(rename = "I-")]
    InfluenceNegative,
    #[serde(rename = "P+")]
    ProportionPositive,
    #[serde(rename = "P-")]
    ProportionNegative,
    #[serde(rename = "VC_max")]
    CorrespondenceMax,
    #[serde(rename = "VC_0")]
    CorrespondenceZero,
}

impl RelationKind {
    /// All kinds, in label order.
    pub const ALL: [RelationKind; 10] = [
        RelationKind::ConsequencePositive,
        RelationKind::ConsequenceNegative,
        RelationKind::ActionPositive,
        RelationKind::ActionNegative,
        RelationKind::InfluencePositive,
        RelationKind::InfluenceNegative,
        RelationKind::ProportionPositive,
        RelationKind::ProportionNegative,
        RelationKind::CorrespondenceMax,
        RelationKind::CorrespondenceZero,
    ];

    /// The label as written in scenarios and on graph edges.
    pub fn label(self) -> &'static str {
        match self {
            RelationKind::ConsequencePositive => "C+",
            RelationKind::ConsequenceNegative => "C-",
            RelationKind::ActionPositive => "A+",
            RelationKind::ActionNegative => "A-",
            RelationKind::InfluencePositive => "I+",
            RelationKind::InfluenceNegative => "I-",
            RelationKind::ProportionPositive => "P+",
            RelationKind::ProportionNegative => "P-",
            RelationKind::CorrespondenceMax => "VC_max",
            RelationKind::CorrespondenceZero => "VC_0",
        }
    }

    /// Consequence label for a magnitude moving in `sign`'s direction.
    pub fn consequence(sign: Sign) -> Option<Self> {
        match sign {
            Sign::Positive => Some(RelationKind::ConsequencePositive),
            Sign::Negative => Some(RelationKind::ConsequenceNegative),
            Sign::Zero => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RelationKind {
    type Err = EnvisionError;

    fn from_str(s: &str) -> Result<Self> {
        RelationKind::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| EnvisionError::UnknownRelationshipKind(s.to_string()))
    }
}

/// Which rule list a relationship belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Closure rules: Consequence and ValueCorrespondence.
    Intra,
    /// Round rules: Influence, Proportion and Action.
    Inter,
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleScope::Intra => f.write_str("intra-entity"),
            RuleScope::Inter => f.write_str("inter-entity"),
        }
    }
}

/// What a relationship did when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Preconditions not met; nothing happened.
    NotApplicable,
    /// A magnitude or derivative was changed directly.
    Committed,
    /// A contribution was buffered on a derivative.
    Buffered,
}

/// A causal rule over one or two quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Relationship {
    /// Derivative drives the own magnitude.
    Consequence {
        quantity: QuantityRef,
        direction: Direction,
    },

    /// External operator command on a derivative.
    Action {
        quantity: QuantityRef,
        direction: Direction,
    },

    /// Non-zero source magnitude pushes the target derivative.
    Influence {
        source: QuantityRef,
        target: QuantityRef,
        direction: Direction,
    },

    /// Source rate of change propagates to the target derivative.
    Proportion {
        source: QuantityRef,
        target: QuantityRef,
        direction: Direction,
    },

    /// Source at a landmark forces the target to the same landmark.
    ValueCorrespondence {
        source: QuantityRef,
        target: QuantityRef,
        landmark: Landmark,
        #[serde(default)]
        bidirectional: bool,
    },
}

impl Relationship {
    /// `C+` / `C-` on a quantity.
    pub fn consequence(quantity: QuantityRef, direction: Direction) -> Self {
        Relationship::Consequence { quantity, direction }
    }

    /// `A+` / `A-` on a quantity.
    pub fn action(quantity: QuantityRef, direction: Direction) -> Self {
        Relationship::Action { quantity, direction }
    }

    /// `I+` / `I-` from source to target.
    pub fn influence(source: QuantityRef, target: QuantityRef, direction: Direction) -> Self {
        Relationship::Influence {
            source,
            target,
            direction,
        }
    }

    /// `P+` / `P-` from source to target.
    pub fn proportion(source: QuantityRef, target: QuantityRef, direction: Direction) -> Self {
        Relationship::Proportion {
            source,
            target,
            direction,
        }
    }

    /// `VC_max` from source to target.
    pub fn correspondence_max(source: QuantityRef, target: QuantityRef) -> Self {
        Relationship::ValueCorrespondence {
            source,
            target,
            landmark: Landmark::Max,
            bidirectional: false,
        }
    }

    /// `VC_0` from source to target.
    pub fn correspondence_zero(source: QuantityRef, target: QuantityRef) -> Self {
        Relationship::ValueCorrespondence {
            source,
            target,
            landmark: Landmark::Zero,
            bidirectional: false,
        }
    }

    /// Make a value correspondence hold in both directions. No effect on other kinds.
    pub fn bidirectional(mut self) -> Self {
        if let Relationship::ValueCorrespondence { bidirectional, .. } = &mut self {
            *bidirectional = true;
        }
        self
    }

    /// Build a relationship from its label. Reflexive kinds ignore `target`.
    pub fn from_kind(kind: RelationKind, source: QuantityRef, target: QuantityRef) -> Self {
        use Direction::{Negative, Positive};
        match kind {
            RelationKind::ConsequencePositive => Self::consequence(source, Positive),
            RelationKind::ConsequenceNegative => Self::consequence(source, Negative),
            RelationKind::ActionPositive => Self::action(source, Positive),
            RelationKind::ActionNegative => Self::action(source, Negative),
            RelationKind::InfluencePositive => Self::influence(source, target, Positive),
            RelationKind::InfluenceNegative => Self::influence(source, target, Negative),
            RelationKind::ProportionPositive => Self::proportion(source, target, Positive),
            RelationKind::ProportionNegative => Self::proportion(source, target, Negative),
            RelationKind::CorrespondenceMax => Self::correspondence_max(source, target),
            RelationKind::CorrespondenceZero => Self::correspondence_zero(source, target),
        }
    }

    /// The relation label.
    pub fn kind(&self) -> RelationKind {
        use Direction::{Negative, Positive};
        match self {
            Relationship::Consequence { direction: Positive, .. } => RelationKind::ConsequencePositive,
            Relationship::Consequence { direction: Negative, .. } => RelationKind::ConsequenceNegative,
            Relationship::Action { direction: Positive, .. } => RelationKind::ActionPositive,
            Relationship::Action { direction: Negative, .. } => RelationKind::ActionNegative,
            Relationship::Influence { direction: Positive, .. } => RelationKind::InfluencePositive,
            Relationship::Influence { direction: Negative, .. } => RelationKind::InfluenceNegative,
            Relationship::Proportion { direction: Positive, .. } => RelationKind::ProportionPositive,
            Relationship::Proportion { direction: Negative, .. } => RelationKind::ProportionNegative,
            Relationship::ValueCorrespondence { landmark: Landmark::Zero, .. } => {
                RelationKind::CorrespondenceZero
            }
            Relationship::ValueCorrespondence { .. } => RelationKind::CorrespondenceMax,
        }
    }

    /// Which rule list this relationship belongs in.
    pub fn scope(&self) -> RuleScope {
        match self {
            Relationship::Consequence { .. } | Relationship::ValueCorrespondence { .. } => {
                RuleScope::Intra
            }
            Relationship::Action { .. }
            | Relationship::Influence { .. }
            | Relationship::Proportion { .. } => RuleScope::Inter,
        }
    }

    /// Whether this is an exogenous operator command.
    pub fn is_action(&self) -> bool {
        matches!(self, Relationship::Action { .. })
    }

    /// The quantity read by the rule.
    pub fn source(&self) -> &QuantityRef {
        match self {
            Relationship::Consequence { quantity, .. } | Relationship::Action { quantity, .. } => {
                quantity
            }
            Relationship::Influence { source, .. }
            | Relationship::Proportion { source, .. }
            | Relationship::ValueCorrespondence { source, .. } => source,
        }
    }

    /// The quantity written by the rule.
    pub fn target(&self) -> &QuantityRef {
        match self {
            Relationship::Consequence { quantity, .. } | Relationship::Action { quantity, .. } => {
                quantity
            }
            Relationship::Influence { target, .. }
            | Relationship::Proportion { target, .. }
            | Relationship::ValueCorrespondence { target, .. } => target,
        }
    }

    /// Check references and landmarks against a state before exploration starts.
    pub fn validate(&self, state: &State) -> Result<()> {
        let source = state.quantity(self.source())?;
        let target = state.quantity(self.target())?;

        if let Relationship::ValueCorrespondence { landmark, .. } = self {
            for quantity in [source, target] {
                let space = quantity.magnitude().space();
                if !space.contains(*landmark) {
                    return Err(EnvisionError::InvalidValue {
                        value: landmark.to_string(),
                        space: space.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply the rule to a working state.
    pub fn apply(&self, state: &mut State) -> Result<RuleOutcome> {
        let kind = self.kind();
        match self {
            Relationship::Consequence { quantity, direction } => {
                let q = state.quantity_mut(quantity)?;
                if q.direction() != direction.sign() {
                    return Ok(RuleOutcome::NotApplicable);
                }
                if q.has_implied_consequence() {
                    q.apply_consequence();
                    return Ok(RuleOutcome::Committed);
                }
                // Saturated at a bound: the rate comes to rest.
                if q.settle()? {
                    return Ok(RuleOutcome::Committed);
                }
                Ok(RuleOutcome::NotApplicable)
            }

            Relationship::Action { quantity, direction } => {
                let derivative = state.quantity_mut(quantity)?.derivative_mut();
                if derivative.step(direction.sign()) {
                    return Ok(RuleOutcome::Committed);
                }
                Ok(RuleOutcome::NotApplicable)
            }

            Relationship::Influence {
                source,
                target,
                direction,
            } => {
                if state.quantity(source)?.magnitude().value() == Landmark::Zero {
                    return Ok(RuleOutcome::NotApplicable);
                }
                state.quantity_mut(target)?.accept(kind, direction.sign());
                Ok(RuleOutcome::Buffered)
            }

            Relationship::Proportion {
                source,
                target,
                direction,
            } => {
                let delta = state.quantity(source)?.delta();
                if delta == 0 {
                    return Ok(RuleOutcome::NotApplicable);
                }
                let step = Sign::of_step(delta * direction.sign().as_step());
                state.quantity_mut(target)?.accept(kind, step);
                Ok(RuleOutcome::Buffered)
            }

            Relationship::ValueCorrespondence {
                source,
                target,
                landmark,
                bidirectional,
            } => {
                let mut outcome = force(state, source, target, *landmark)?;
                if *bidirectional && force(state, target, source, *landmark)? == RuleOutcome::Committed {
                    outcome = RuleOutcome::Committed;
                }
                Ok(outcome)
            }
        }
    }

    /// Whether the state satisfies this rule as a constraint. Only value
    /// correspondences can be violated.
    pub fn is_satisfied(&self, state: &State) -> Result<bool> {
        let Relationship::ValueCorrespondence {
            source,
            target,
            landmark,
            bidirectional,
        } = self
        else {
            return Ok(true);
        };

        let source_at = state.quantity(source)?.magnitude().value() == *landmark;
        let target_at = state.quantity(target)?.magnitude().value() == *landmark;
        Ok((!source_at || target_at) && (!*bidirectional || !target_at || source_at))
    }
}

fn force(
    state: &mut State,
    from: &QuantityRef,
    to: &QuantityRef,
    landmark: Landmark,
) -> Result<RuleOutcome> {
    if state.quantity(from)?.magnitude().value() != landmark {
        return Ok(RuleOutcome::NotApplicable);
    }
    let target = state.quantity_mut(to)?.magnitude_mut();
    if target.value() == landmark {
        return Ok(RuleOutcome::NotApplicable);
    }
    target.replace(landmark)?;
    Ok(RuleOutcome::Committed)
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope() {
            RuleScope::Intra if self.source() == self.target() => {
                write!(f, "{}({})", self.kind(), self.source())
            }
            _ => write!(f, "{}({} -> {})", self.kind(), self.source(), self.target()),
        }
    }
}

/// The two ordered rule lists a scenario hands to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Round rules: Influence, Proportion, Action.
    pub inter: Vec<Relationship>,

    /// Closure rules: Consequence, ValueCorrespondence.
    pub intra: Vec<Relationship>,
}

impl RuleSet {
    /// Create a rule set.
    pub fn new(inter: Vec<Relationship>, intra: Vec<Relationship>) -> Self {
        Self { inter, intra }
    }

    /// Check every rule against the initial state and its list placement.
    pub fn validate(&self, state: &State) -> Result<()> {
        for (rules, scope) in [(&self.inter, RuleScope::Inter), (&self.intra, RuleScope::Intra)] {
            for rule in rules {
                if rule.scope() != scope {
                    return Err(EnvisionError::MisplacedRelationship {
                        label: rule.kind().to_string(),
                        expected: scope.to_string(),
                    });
                }
                rule.validate(state)?;
            }
        }
        Ok(())
    }

    /// Rules that buffer contributions during aggregation.
    pub fn aggregating(&self) -> impl Iterator<Item = &Relationship> {
        self.inter.iter().filter(|r| !r.is_action())
    }

    /// Operator actions, each a discrete branch.
    pub fn actions(&self) -> impl Iterator<Item = &Relationship> {
        self.inter.iter().filter(|r| r.is_action())
    }

    /// Value correspondences among the closure rules.
    pub fn correspondences(&self) -> impl Iterator<Item = &Relationship> {
        self.intra
            .iter()
            .filter(|r| matches!(r, Relationship::ValueCorrespondence { .. }))
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.inter.len() + self.intra.len()
    }

    /// True if there are no rules at all.
    pub fn is_empty(&self) -> bool {
        self.inter.is_empty() && self.intra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::space::QuantitySpaces;

    fn q(entity: &str, quantity: &str) -> QuantityRef {
        QuantityRef::new(entity, quantity)
    }

    fn system(inflow: (Landmark, Landmark), volume: (Landmark, Landmark), outflow: (Landmark, Landmark)) -> State {
        let spaces = QuantitySpaces::standard();
        State::new(vec![
            Entity::new("tap", "tap")
                .with_standard_quantity(&spaces, "inflow", inflow.0, inflow.1)
                .unwrap(),
            Entity::new("container", "container")
                .with_standard_quantity(&spaces, "volume", volume.0, volume.1)
                .unwrap(),
            Entity::new("drain", "drain")
                .with_standard_quantity(&spaces, "outflow", outflow.0, outflow.1)
                .unwrap(),
        ])
    }

    use Landmark::{Max, Minus, Plus, Zero};

    #[test]
    fn test_kind_labels_round_trip() {
        for kind in RelationKind::ALL {
            assert_eq!(kind.label().parse::<RelationKind>().unwrap(), kind);
        }
        let err = "Q+".parse::<RelationKind>().unwrap_err();
        assert_eq!(err, EnvisionError::UnknownRelationshipKind("Q+".to_string()));
    }

    #[test]
    fn test_consequence_leaves_point() {
        let mut state = system((Zero, Plus), (Zero, Zero), (Zero, Zero));
        let rule = Relationship::consequence(q("tap", "inflow"), Direction::Positive);

        assert_eq!(rule.apply(&mut state).unwrap(), RuleOutcome::Committed);
        assert_eq!(state.quantity(&q("tap", "inflow")).unwrap().magnitude().value(), Plus);

        // Now inside the top interval of {0, +}.
        assert_eq!(rule.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);
    }

    #[test]
    fn test_consequence_settles_at_bound() {
        let mut state = system((Plus, Plus), (Max, Plus), (Max, Plus));
        let fill = Relationship::consequence(q("container", "volume"), Direction::Positive);

        assert_eq!(fill.apply(&mut state).unwrap(), RuleOutcome::Committed);
        let volume = state.quantity(&q("container", "volume")).unwrap();
        assert_eq!(volume.magnitude().value(), Max);
        assert_eq!(volume.derivative().value(), Zero);
        assert_eq!(fill.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);

        // The opposite rule never touches a quantity moving the other way.
        let drain = Relationship::consequence(q("drain", "outflow"), Direction::Negative);
        assert_eq!(drain.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);
        assert_eq!(state.quantity(&q("drain", "outflow")).unwrap().derivative().value(), Plus);
    }

    #[test]
    fn test_consequence_waits_inside_interval() {
        let mut state = system((Plus, Plus), (Plus, Plus), (Zero, Zero));
        let rule = Relationship::consequence(q("container", "volume"), Direction::Positive);
        assert_eq!(rule.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);
    }

    #[test]
    fn test_action_steps_and_clamps() {
        let mut state = system((Plus, Zero), (Zero, Zero), (Zero, Zero));
        let open = Relationship::action(q("tap", "inflow"), Direction::Positive);

        assert_eq!(open.apply(&mut state).unwrap(), RuleOutcome::Committed);
        assert_eq!(state.quantity(&q("tap", "inflow")).unwrap().derivative().value(), Plus);
        assert_eq!(open.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);
    }

    #[test]
    fn test_influence_buffers_only() {
        let mut state = system((Plus, Zero), (Zero, Zero), (Zero, Zero));
        let rule = Relationship::influence(q("tap", "inflow"), q("container", "volume"), Direction::Positive);

        assert_eq!(rule.apply(&mut state).unwrap(), RuleOutcome::Buffered);
        let volume = state.quantity(&q("container", "volume")).unwrap();
        assert_eq!(volume.derivative().value(), Zero);
        assert_eq!(volume.contributions()[0].step, Sign::Positive);
        assert_eq!(volume.contributions()[0].relation, RelationKind::InfluencePositive);

        let drain = Relationship::influence(q("drain", "outflow"), q("container", "volume"), Direction::Negative);
        assert_eq!(drain.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);
    }

    #[test]
    fn test_proportion_follows_delta() {
        let rule = Relationship::proportion(q("container", "volume"), q("drain", "outflow"), Direction::Positive);

        let mut rising = system((Plus, Plus), (Plus, Plus), (Zero, Zero));
        rising.reset_round();
        assert_eq!(rule.apply(&mut rising).unwrap(), RuleOutcome::Buffered);
        assert_eq!(
            rising.quantity(&q("drain", "outflow")).unwrap().contributions()[0].step,
            Sign::Positive
        );

        let mut falling = system((Plus, Plus), (Plus, Minus), (Plus, Zero));
        falling.reset_round();
        rule.apply(&mut falling).unwrap();
        assert_eq!(
            falling.quantity(&q("drain", "outflow")).unwrap().contributions()[0].step,
            Sign::Negative
        );

        let mut steady = system((Plus, Plus), (Plus, Zero), (Plus, Zero));
        steady.reset_round();
        assert_eq!(rule.apply(&mut steady).unwrap(), RuleOutcome::NotApplicable);
    }

    #[test]
    fn test_negative_proportion_inverts() {
        let rule = Relationship::proportion(q("container", "volume"), q("drain", "outflow"), Direction::Negative);
        let mut state = system((Plus, Plus), (Plus, Plus), (Plus, Zero));
        state.reset_round();
        rule.apply(&mut state).unwrap();
        assert_eq!(
            state.quantity(&q("drain", "outflow")).unwrap().contributions()[0].step,
            Sign::Negative
        );
    }

    #[test]
    fn test_correspondence_forces_and_filters() {
        let rule = Relationship::correspondence_max(q("container", "volume"), q("drain", "outflow"));
        let mut state = system((Plus, Plus), (Max, Zero), (Plus, Zero));

        assert!(!rule.is_satisfied(&state).unwrap());
        assert_eq!(rule.apply(&mut state).unwrap(), RuleOutcome::Committed);
        assert_eq!(state.quantity(&q("drain", "outflow")).unwrap().magnitude().value(), Max);
        assert!(rule.is_satisfied(&state).unwrap());
        assert_eq!(rule.apply(&mut state).unwrap(), RuleOutcome::NotApplicable);
    }

    #[test]
    fn test_bidirectional_correspondence() {
        let one_way = Relationship::correspondence_zero(q("container", "volume"), q("drain", "outflow"));
        let both_ways = one_way.clone().bidirectional();
        let state = system((Plus, Plus), (Plus, Zero), (Zero, Zero));

        assert!(one_way.is_satisfied(&state).unwrap());
        assert!(!both_ways.is_satisfied(&state).unwrap());

        let mut forced = state.snapshot();
        assert_eq!(both_ways.apply(&mut forced).unwrap(), RuleOutcome::Committed);
        assert_eq!(forced.quantity(&q("container", "volume")).unwrap().magnitude().value(), Zero);
    }

    #[test]
    fn test_rule_set_validation() {
        let state = system((Zero, Plus), (Zero, Zero), (Zero, Zero));
        let misplaced = RuleSet::new(
            vec![Relationship::consequence(q("tap", "inflow"), Direction::Positive)],
            vec![],
        );
        assert!(matches!(
            misplaced.validate(&state).unwrap_err(),
            EnvisionError::MisplacedRelationship { .. }
        ));

        let dangling = RuleSet::new(
            vec![Relationship::influence(q("tap", "inflow"), q("sink", "volume"), Direction::Positive)],
            vec![],
        );
        assert!(dangling.validate(&state).unwrap_err().is_configuration());

        let bad_landmark = RuleSet::new(
            vec![],
            vec![Relationship::correspondence_max(q("tap", "inflow"), q("container", "volume"))],
        );
        assert!(matches!(
            bad_landmark.validate(&state).unwrap_err(),
            EnvisionError::InvalidValue { .. }
        ));
    }
}
