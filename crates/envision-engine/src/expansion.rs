//! Per-state expansion: closure, aggregation, resolution, materialization
//! and re-filtering.
//!
//! Everything here is a pure function of the popped state, the rule set and
//! a [`Budget`], which is what lets the engines expand states in any order or
//! in parallel.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use envision_core::{
    EnvisionError, Landmark, RelationKind, Result, RuleOutcome, RuleSet, Sign, State, StateId,
};
use tracing::debug;

use crate::envisioner::TruncationReason;

/// A candidate that survived re-filtering.
#[derive(Debug, Clone)]
pub struct Successor {
    /// The successor state.
    pub state: State,

    /// Relation label of the transition into it.
    pub label: String,
}

/// Successors of a closed state plus the candidates that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Branching {
    /// Surviving candidates, in a deterministic order.
    pub successors: Vec<Successor>,

    /// Candidates dropped for jumping a landmark.
    pub discontinuities: usize,

    /// Candidates dropped by a value correspondence.
    pub violations: usize,

    /// Set when the budget ran out before every combination was tried.
    pub cut_short: Option<TruncationReason>,
}

/// Closure of a state and the branching from it.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// The closure fixpoint.
    pub closed: State,

    /// Branching from the closed state.
    pub branching: Branching,
}

/// Resource limits a single expansion must respect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Budget {
    /// Stop enumerating once this instant has passed.
    pub deadline: Option<Instant>,

    /// Stop once more distinct successors than this have been admitted.
    pub max_successors: Option<usize>,
}

impl Budget {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self::default()
    }

    fn exceeded(&self, admitted: usize) -> Option<TruncationReason> {
        if self.max_successors.is_some_and(|max| admitted > max) {
            return Some(TruncationReason::MaxStates);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(TruncationReason::Deadline);
        }
        None
    }
}

/// One option per quantity: (derivative, magnitude).
type Choice = (Landmark, Landmark);

/// Expands states under a fixed rule set.
#[derive(Debug, Clone)]
pub struct Expander {
    rules: RuleSet,
    closure_iterations: usize,
}

impl Expander {
    /// Create an expander.
    pub fn new(rules: RuleSet, closure_iterations: usize) -> Self {
        Self {
            rules,
            closure_iterations,
        }
    }

    /// The rule set in use.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Close a state and branch from the result.
    ///
    /// Closure moves are implied and exempt from continuity: a consequence
    /// leaves a point landmark by one step and a value correspondence snaps
    /// unconditionally. Fails with a recoverable error if closure does not
    /// converge; any other error comes from a malformed rule set.
    pub fn expand(&self, state: &State, budget: &Budget) -> Result<Expansion> {
        let closed = self.close(state)?;
        let branching = self.branch(&closed, budget)?;
        Ok(Expansion { closed, branching })
    }

    /// Apply the intra-entity rules until a full pass changes nothing.
    pub fn close(&self, state: &State) -> Result<State> {
        let mut current = state.snapshot();
        for _ in 0..self.closure_iterations {
            let before = current.id();
            for rule in &self.rules.intra {
                rule.apply(&mut current)?;
            }
            if current.id() == before {
                return Ok(current);
            }
        }

        Err(EnvisionError::ClosureDiverged {
            state_id: state.id().to_string(),
            iterations: self.closure_iterations,
        })
    }

    /// Enumerate the successors of a closed state.
    ///
    /// Combinations are generated lazily and the budget is checked before
    /// each one, so a wide product stops early with `cut_short` set.
    pub fn branch(&self, closed: &State, budget: &Budget) -> Result<Branching> {
        let mut round = closed.snapshot();
        for rule in self.rules.aggregating() {
            rule.apply(&mut round)?;
        }

        let options: Vec<Vec<Choice>> = round
            .quantities()
            .map(|(_, q)| {
                let magnitudes = q.magnitude_options();
                q.resolve_derivative()
                    .into_iter()
                    .flat_map(|d| magnitudes.iter().map(move |m| (d, *m)))
                    .collect()
            })
            .collect();

        let closed_id = closed.id();
        let mut branching = Branching::default();
        let mut admitted: HashSet<StateId> = HashSet::new();

        for combination in Combinations::new(&options) {
            if let Some(reason) = budget.exceeded(admitted.len()) {
                debug!("Branching from {} cut short: {:?}", closed.readable_id(), reason);
                branching.cut_short = Some(reason);
                return Ok(branching);
            }
            let mut candidate = closed.snapshot();
            for (quantity, (derivative, magnitude)) in candidate.quantities_mut().zip(&combination) {
                quantity.derivative_mut().replace(*derivative)?;
                quantity.magnitude_mut().replace(*magnitude)?;
            }
            let id = candidate.id();
            if id == closed_id {
                continue;
            }
            let label = label_for(&round, &candidate);
            if self.admit(closed, candidate, label, &mut branching)? {
                admitted.insert(id);
            }
        }

        for action in self.rules.actions() {
            let mut candidate = closed.snapshot();
            if action.apply(&mut candidate)? == RuleOutcome::Committed {
                self.admit(closed, candidate, action.kind().label().to_string(), &mut branching)?;
            }
        }

        Ok(branching)
    }

    /// Re-filter a candidate: continuity first, then value correspondences.
    /// Returns true if the candidate was kept.
    fn admit(
        &self,
        closed: &State,
        candidate: State,
        label: String,
        branching: &mut Branching,
    ) -> Result<bool> {
        if let Err(err) = candidate.check_continuity(closed) {
            debug!("Dropping {}: {}", candidate.readable_id(), err);
            branching.discontinuities += 1;
            return Ok(false);
        }

        for rule in self.rules.correspondences() {
            if !rule.is_satisfied(&candidate)? {
                debug!("Dropping {}: violates {}", candidate.readable_id(), rule);
                branching.violations += 1;
                return Ok(false);
            }
        }

        branching.successors.push(Successor {
            state: candidate,
            label,
        });
        Ok(true)
    }
}

/// Odometer over one option per quantity, in lexicographic order with the
/// last quantity turning fastest.
struct Combinations<'a> {
    options: &'a [Vec<Choice>],
    cursor: Option<Vec<usize>>,
}

impl<'a> Combinations<'a> {
    fn new(options: &'a [Vec<Choice>]) -> Self {
        let cursor = if options.iter().any(Vec::is_empty) {
            None
        } else {
            Some(vec![0; options.len()])
        };
        Self { options, cursor }
    }
}

impl Iterator for Combinations<'_> {
    type Item = Vec<Choice>;

    fn next(&mut self) -> Option<Vec<Choice>> {
        let cursor = self.cursor.as_mut()?;
        let combination = cursor
            .iter()
            .zip(self.options)
            .map(|(&i, choices)| choices[i])
            .collect();

        let mut exhausted = true;
        for position in (0..cursor.len()).rev() {
            cursor[position] += 1;
            if cursor[position] < self.options[position].len() {
                exhausted = false;
                break;
            }
            cursor[position] = 0;
        }
        if exhausted {
            self.cursor = None;
        }

        Some(combination)
    }
}

/// Labels of the contributions that changed a derivative plus `C+`/`C-` for
/// every magnitude that moved.
fn label_for(round: &State, candidate: &State) -> String {
    let mut kinds = BTreeSet::new();
    for ((_, before), (_, after)) in round.quantities().zip(candidate.quantities()) {
        if before.derivative() != after.derivative() {
            kinds.extend(before.contributions().iter().map(|c| c.relation));
        }
        let from = before.magnitude().global_index();
        let to = after.magnitude().global_index();
        if from != to {
            let sign = Sign::of_step(if to > from { 1 } else { -1 });
            kinds.extend(RelationKind::consequence(sign));
        }
    }
    kinds
        .into_iter()
        .map(RelationKind::label)
        .collect::<Vec<_>>()
        .join(",")
}
