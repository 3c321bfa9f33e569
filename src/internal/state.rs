// SPDX-License-Identifier: MPL-2.0

//! Mutable solver state: the clause store, accumulated constraints, the
//! implication graph, and the decision stack with its snapshots.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, info};

use crate::clause::Clause;
use crate::constraint::Constraint;
use crate::error::SolveFailure;
use crate::package::{PackageDep, PackageId, PackageRef};
use crate::term::Term;
use crate::type_aliases::{FnvIndexMap, FnvIndexSet, Map, Set};

/// How a term relates to the current partial assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Satisfaction {
    /// Every completion of the assignment satisfies the term.
    Satisfied,
    /// Some completions satisfy it, some do not.
    Satisfiable,
    /// No completion satisfies it.
    Unsatisfiable,
}

/// What examining a clause under the current assignment yields.
#[derive(Clone, Debug)]
pub(crate) enum UnitPropagation {
    /// The clause holds already, or more than one term is still open.
    Settled,
    /// Exactly one term can still be satisfied; it must be.
    Unit(Term),
    /// Every term is unsatisfiable.
    Contradiction,
}

/// The terms that forced a derived term, and the clause they came from.
#[derive(Clone, Debug)]
struct Implication {
    terms: FnvIndexSet<Term>,
    cause: Arc<Clause>,
}

/// All mutable state of one solve.
///
/// Clauses grow monotonically; everything else is checkpointed per decision
/// and rewound by backjumping. The order-sensitive collections are
/// insertion-ordered so that two solves over the same oracle answers take
/// identical paths.
pub(crate) struct State {
    /// Every clause, in insertion order.
    clauses: FnvIndexSet<Arc<Clause>>,
    /// Clauses indexed by each package name their terms mention.
    clauses_by_name: FnvIndexMap<String, Vec<Arc<Clause>>>,
    /// The decision stack. Index 0 is the root package itself.
    decisions: Vec<PackageId>,
    decisions_by_name: Map<String, PackageId>,
    /// Accumulated per-package constraints for undecided packages.
    constraints: FnvIndexMap<String, Constraint>,
    /// Snapshot of `constraints` taken before each decision.
    constraints_stack: Vec<FnvIndexMap<String, Constraint>>,
    /// For each derived term, the reason it was forced.
    implications: FnvIndexMap<Term, Implication>,
    implications_stack: Vec<FnvIndexMap<Term, Implication>>,
    /// Bumped on every backjump, so callers can notice rewinds that happen
    /// inside nested propagation.
    generation: u64,
}

impl State {
    pub(crate) fn new() -> Self {
        Self {
            clauses: FnvIndexSet::default(),
            clauses_by_name: FnvIndexMap::default(),
            decisions: Vec::new(),
            decisions_by_name: Map::default(),
            constraints: FnvIndexMap::default(),
            constraints_stack: Vec::new(),
            implications: FnvIndexMap::default(),
            implications_stack: Vec::new(),
            generation: 0,
        }
    }

    pub(crate) fn decisions(&self) -> &[PackageId] {
        &self.decisions
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn clauses(&self) -> impl Iterator<Item = &Arc<Clause>> {
        self.clauses.iter()
    }

    /// The clauses mentioning a package name, cloned so callers can iterate
    /// while propagation mutates the store.
    pub(crate) fn clauses_for(&self, name: &str) -> Vec<Arc<Clause>> {
        self.clauses_by_name
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// The first accumulated positive constraint that still needs a
    /// decision. Positives whose set became empty are skipped: nothing can
    /// be selected for them, and any clause that truly requires one
    /// conflicts on its own.
    pub(crate) fn first_positive_constraint(&self) -> Option<&PackageDep> {
        self.constraints.values().find_map(|constraint| match constraint {
            Constraint::Positive(dep) if !dep.constraint.is_empty() => Some(dep),
            _ => None,
        })
    }

    /// Checkpoints the rewindable state and records a decision.
    ///
    /// The selection subsumes whatever constraint had accumulated for the
    /// package, so the constraint entry is dropped from the working map.
    pub(crate) fn push_decision(&mut self, id: PackageId) {
        info!("selecting {id}");
        self.constraints_stack.push(self.constraints.clone());
        self.implications_stack.push(self.implications.clone());
        self.constraints.shift_remove(&id.package.name);
        self.decisions_by_name
            .insert(id.package.name.clone(), id.clone());
        self.decisions.push(id);
    }

    /// Relates one term to the current assignment.
    pub(crate) fn satisfaction(&self, term: &Term) -> Satisfaction {
        let name = &term.package().name;
        if let Some(id) = self.decisions_by_name.get(name) {
            return if term.dep().allows(id) != term.is_negative() {
                Satisfaction::Satisfied
            } else {
                Satisfaction::Unsatisfiable
            };
        }
        let Some(constraint) = self.constraints.get(name) else {
            return Satisfaction::Satisfiable;
        };
        match constraint {
            Constraint::Positive(dep) => {
                if dep.constraint.is_empty() {
                    // Nothing can be selected for this package any more.
                    return if term.is_negative() {
                        Satisfaction::Satisfied
                    } else {
                        Satisfaction::Unsatisfiable
                    };
                }
                if term.is_negative() {
                    if term.dep().allows_all(dep) {
                        Satisfaction::Unsatisfiable
                    } else {
                        Satisfaction::Satisfiable
                    }
                } else if term.dep().allows_all(dep) {
                    Satisfaction::Satisfied
                } else if term.dep().allows_any(dep) {
                    Satisfaction::Satisfiable
                } else {
                    Satisfaction::Unsatisfiable
                }
            }
            Constraint::Negative(deps) => {
                if deps.iter().any(|dep| dep.allows_all(term.dep())) {
                    if term.is_negative() {
                        Satisfaction::Satisfied
                    } else {
                        Satisfaction::Unsatisfiable
                    }
                } else {
                    Satisfaction::Satisfiable
                }
            }
        }
    }

    /// Computes what a clause forces under the current assignment.
    ///
    /// When exactly one term is still open, the remaining terms are recorded
    /// as its implication before it is returned, so conflicts can later be
    /// traced back through them.
    pub(crate) fn unit_to_propagate(&mut self, clause: &Arc<Clause>) -> UnitPropagation {
        let mut unit: Option<&Term> = None;
        for term in clause.terms() {
            match self.satisfaction(term) {
                Satisfaction::Satisfied => return UnitPropagation::Settled,
                Satisfaction::Unsatisfiable => {}
                Satisfaction::Satisfiable => match unit {
                    None => unit = Some(term),
                    Some(_) => return UnitPropagation::Settled,
                },
            }
        }
        let Some(unit) = unit.cloned() else {
            return UnitPropagation::Contradiction;
        };
        let entry = self
            .implications
            .entry(unit.clone())
            .or_insert_with(|| Implication {
                terms: FnvIndexSet::default(),
                cause: clause.clone(),
            });
        entry.cause = clause.clone();
        for term in clause.terms() {
            if term != &unit {
                entry.terms.insert(term.clone());
            }
        }
        UnitPropagation::Unit(unit)
    }

    /// Inserts a clause and works out its consequences.
    ///
    /// Returns `Ok(false)` when a conflict forced a backjump, in which case
    /// the caller must restart scheduling from the rewound state.
    pub(crate) fn add_clause(&mut self, clause: Arc<Clause>) -> Result<bool, SolveFailure> {
        debug!("adding clause {clause}");
        if self.clauses.insert(clause.clone()) {
            for name in clause.package_names() {
                self.clauses_by_name
                    .entry(name.to_string())
                    .or_default()
                    .push(clause.clone());
            }
        }
        self.reexamine(&clause)
    }

    /// Re-evaluates one clause, propagating a derived unit or resolving a
    /// contradiction. Returns `Ok(false)` when a backjump happened.
    pub(crate) fn reexamine(&mut self, clause: &Arc<Clause>) -> Result<bool, SolveFailure> {
        match self.unit_to_propagate(clause) {
            UnitPropagation::Settled => Ok(true),
            UnitPropagation::Unit(unit) => self.propagate_unit(unit),
            UnitPropagation::Contradiction => {
                // Keep rewinding until the clause is satisfiable again; each
                // round removes at least one decision, so this terminates.
                loop {
                    let refs = self.transitive_implicator_refs(clause.terms());
                    let Some(index) = self.latest_decision_in(&refs) else {
                        return Err(SolveFailure::new(self.contradiction_root(clause)));
                    };
                    self.backjump(index);
                    match self.unit_to_propagate(clause) {
                        UnitPropagation::Settled => return Ok(false),
                        UnitPropagation::Unit(unit) => {
                            self.propagate_unit(unit)?;
                            return Ok(false);
                        }
                        UnitPropagation::Contradiction => continue,
                    }
                }
            }
        }
    }

    /// Derives everything that follows from newly-forced `seed`.
    ///
    /// Works through a FIFO list of forced terms. Each one folds into the
    /// package's accumulated constraint; when that changes, every clause
    /// mentioning the package is re-examined for new units or
    /// contradictions. A contradiction learns a clause and backjumps, and
    /// propagation reports `Ok(false)` so the caller reschedules.
    pub(crate) fn propagate_unit(&mut self, seed: Term) -> Result<bool, SolveFailure> {
        let mut pending = VecDeque::new();
        pending.push_back(seed);
        while let Some(term) = pending.pop_front() {
            let name = term.package().name.clone();
            let next = match self.constraints.get(&name) {
                None => Constraint::from_term(&term),
                Some(old) => {
                    let next = old.with_term(&term);
                    if &next == old {
                        continue;
                    }
                    next
                }
            };
            debug!("constraint on {name} is now {next:?}");
            self.constraints.insert(name.clone(), next);
            for clause in self.clauses_for(&name) {
                match self.unit_to_propagate(&clause) {
                    UnitPropagation::Settled => {}
                    UnitPropagation::Unit(unit) => pending.push_back(unit),
                    UnitPropagation::Contradiction => {
                        self.resolve_conflict(&term, &clause)?;
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Handles a contradiction discovered while propagating `term`.
    ///
    /// The learned clause is the disjunction of `term`'s recorded reasons
    /// and the conflicting clause's other terms; the solver then backjumps
    /// to the most recent decision among the transitive implicators and
    /// inserts the learned clause into the rewound state.
    fn resolve_conflict(&mut self, term: &Term, clause: &Arc<Clause>) -> Result<(), SolveFailure> {
        info!("conflict in {clause} while propagating {term}");
        let entry = self
            .implications
            .get(term)
            .expect("a propagated term always has a recorded reason")
            .clone();
        let mut implicators: Vec<Term> = entry.terms.iter().cloned().collect();
        for other in clause.terms() {
            if other.package().name != term.package().name && !implicators.contains(other) {
                implicators.push(other.clone());
            }
        }
        let refs = self.transitive_implicator_refs(&implicators);
        let learned = Clause::derived(implicators, clause.clone(), entry.cause.clone());
        let Some(index) = self.latest_decision_in(&refs) else {
            let root = match learned {
                Some(learned) => Arc::new(learned),
                None => clause.clone(),
            };
            return Err(SolveFailure::new(root));
        };
        self.backjump(index);
        if let Some(learned) = learned {
            info!("learned {learned}");
            let _ = self.add_clause(Arc::new(learned))?;
        }
        Ok(())
    }

    /// The package refs reachable from `seed` through the implication
    /// graph. A term expands through every implication recorded for its
    /// package, whatever shape the recorded term has.
    fn transitive_implicator_refs(&self, seed: &[Term]) -> Set<PackageRef> {
        let mut visited: FnvIndexSet<Term> = seed.iter().cloned().collect();
        let mut pending: VecDeque<Term> = visited.iter().cloned().collect();
        let mut refs = Set::default();
        while let Some(term) = pending.pop_front() {
            refs.insert(term.package().clone());
            for (key, entry) in &self.implications {
                if key.package() == term.package() {
                    for reason in &entry.terms {
                        if visited.insert(reason.clone()) {
                            pending.push_back(reason.clone());
                        }
                    }
                }
            }
        }
        refs
    }

    /// Index of the most recent decision about any of `refs`.
    fn latest_decision_in(&self, refs: &Set<PackageRef>) -> Option<usize> {
        self.decisions
            .iter()
            .rposition(|id| refs.contains(&id.package))
    }

    /// Rewinds to the state captured just before decision `index` was made.
    fn backjump(&mut self, index: usize) {
        info!(
            "backjumping from {} decisions to {index}",
            self.decisions.len()
        );
        let removed: Vec<String> = self.decisions[index..]
            .iter()
            .map(|id| id.package.name.clone())
            .collect();
        for name in removed {
            self.decisions_by_name.remove(&name);
        }
        self.decisions.truncate(index);
        self.constraints_stack.truncate(index + 1);
        self.constraints = self
            .constraints_stack
            .pop()
            .expect("snapshots stay aligned with decisions");
        self.implications_stack.truncate(index + 1);
        self.implications = self
            .implications_stack
            .pop()
            .expect("snapshots stay aligned with decisions");
        self.generation += 1;
    }

    /// The failure root for a clause that contradicts the root level: the
    /// clause itself, paired with the most recent recorded reason about one
    /// of its packages so the proof names both sides of the disagreement.
    fn contradiction_root(&self, clause: &Arc<Clause>) -> Arc<Clause> {
        let about = |want_positive: bool| {
            self.implications
                .iter()
                .rev()
                .find(|(key, _)| {
                    clause.terms().iter().any(|term| {
                        term.is_negative() != want_positive && term.package() == key.package()
                    })
                })
                .map(|(_, entry)| entry.cause.clone())
        };
        // Prefer explaining why the clause's consequent is out of reach.
        let reason = about(true).or_else(|| about(false));
        match reason {
            Some(other) if !Arc::ptr_eq(&other, clause) => {
                Arc::new(Clause::contradiction(clause.clone(), other))
            }
            _ => clause.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Cause;

    fn dep(name: &str, constraint: &str) -> PackageDep {
        PackageDep::hosted(name, constraint.parse().unwrap())
    }

    fn id(name: &str, version: &str) -> PackageId {
        PackageId::hosted(name, version.parse().unwrap())
    }

    fn requirement(name: &str, constraint: &str) -> Arc<Clause> {
        Arc::new(Clause::requirement(
            dep(name, constraint),
            crate::package::PackageRef::hosted("root"),
        ))
    }

    #[test]
    fn satisfaction_against_decisions() {
        let mut state = State::new();
        state.push_decision(id("root", "0.0.0"));
        state.push_decision(id("foo", "1.2.0"));
        assert_eq!(
            state.satisfaction(&Term::positive(dep("foo", "^1.0.0"))),
            Satisfaction::Satisfied
        );
        assert_eq!(
            state.satisfaction(&Term::positive(dep("foo", "^2.0.0"))),
            Satisfaction::Unsatisfiable
        );
        assert_eq!(
            state.satisfaction(&Term::negative(dep("foo", "^2.0.0"))),
            Satisfaction::Satisfied
        );
        assert_eq!(
            state.satisfaction(&Term::negative(dep("foo", "^1.0.0"))),
            Satisfaction::Unsatisfiable
        );
        assert_eq!(
            state.satisfaction(&Term::positive(dep("bar", "any"))),
            Satisfaction::Satisfiable
        );
    }

    #[test]
    fn satisfaction_against_positive_constraints() {
        let mut state = State::new();
        state.push_decision(id("root", "0.0.0"));
        state
            .add_clause(requirement("foo", "^1.0.0"))
            .unwrap();
        assert_eq!(
            state.satisfaction(&Term::positive(dep("foo", ">=1.0.0"))),
            Satisfaction::Satisfied
        );
        assert_eq!(
            state.satisfaction(&Term::positive(dep("foo", ">=1.5.0 <1.7.0"))),
            Satisfaction::Satisfiable
        );
        assert_eq!(
            state.satisfaction(&Term::positive(dep("foo", "^2.0.0"))),
            Satisfaction::Unsatisfiable
        );
        assert_eq!(
            state.satisfaction(&Term::negative(dep("foo", ">=1.0.0"))),
            Satisfaction::Unsatisfiable
        );
        assert_eq!(
            state.satisfaction(&Term::negative(dep("foo", ">=1.5.0"))),
            Satisfaction::Satisfiable
        );
    }

    #[test]
    fn propagation_narrows_constraints() {
        let mut state = State::new();
        state.push_decision(id("root", "0.0.0"));
        state.add_clause(requirement("foo", ">=1.0.0")).unwrap();
        state
            .add_clause(Arc::new(Clause::prohibition(
                dep("foo", ">=2.0.0"),
                Cause::NoVersions,
            )))
            .unwrap();
        let Some(remaining) = state.first_positive_constraint() else {
            panic!("expected a positive constraint on foo");
        };
        assert_eq!(remaining.constraint, ">=1.0.0 <2.0.0".parse().unwrap());
    }

    #[test]
    fn backjump_restores_snapshots() {
        let mut state = State::new();
        state.push_decision(id("root", "0.0.0"));
        state.add_clause(requirement("foo", "^1.0.0")).unwrap();
        let before = state.constraints.clone();
        state.push_decision(id("foo", "1.0.0"));
        state.push_decision(id("bar", "1.0.0"));
        assert_eq!(state.decisions().len(), 3);
        state.backjump(1);
        assert_eq!(state.decisions().len(), 1);
        assert_eq!(state.constraints, before);
        assert!(state.decisions_by_name.get("foo").is_none());
        assert!(state.decisions_by_name.get("bar").is_none());
    }
}
