// SPDX-License-Identifier: MPL-2.0

//! Per-package accumulated constraints, built up by unit propagation.

use crate::package::PackageDep;
use crate::term::Term;

/// The running state derived for one package name.
///
/// Either a single positive obligation (the intersection of everything the
/// package must satisfy) or a list of forbidden subranges, one per package
/// tuple, when only negative evidence has arrived so far.
///
/// `with_term` returns a value equal to `self` exactly when the term taught
/// us nothing; callers rely on that to cut propagation short.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// The intersection of every positive obligation seen so far.
    Positive(PackageDep),
    /// Forbidden subranges, one entry per package tuple.
    Negative(Vec<PackageDep>),
}

impl Constraint {
    pub(crate) fn from_term(term: &Term) -> Self {
        if term.is_negative() {
            Self::Negative(vec![term.dep().clone()])
        } else {
            Self::Positive(term.dep().clone())
        }
    }

    /// The package name all deps in this constraint share.
    pub fn name(&self) -> &str {
        match self {
            Self::Positive(dep) => &dep.package.name,
            Self::Negative(deps) => &deps[0].package.name,
        }
    }

    /// Folds one more term into the accumulated state.
    ///
    /// The term must be about the same package name. A term about a
    /// different instance of that name (another source or description) is
    /// independent of a positive constraint, which already fixes the
    /// instance.
    pub(crate) fn with_term(&self, term: &Term) -> Self {
        debug_assert_eq!(self.name(), term.package().name);
        match self {
            Self::Positive(dep) => {
                if !dep.same_package(term.dep()) {
                    return self.clone();
                }
                if term.is_negative() {
                    let rest = dep.constraint.difference(&term.dep().constraint);
                    Self::Positive(dep.with_constraint(rest))
                } else {
                    let both = dep.constraint.intersect(&term.dep().constraint);
                    if both.is_empty() {
                        Self::Positive(dep.with_constraint(both))
                    } else {
                        Self::Positive(term.dep().with_constraint(both))
                    }
                }
            }
            Self::Negative(deps) => {
                let matched = deps.iter().position(|dep| dep.same_package(term.dep()));
                if term.is_negative() {
                    let mut deps = deps.clone();
                    match matched {
                        Some(i) => {
                            let wider = deps[i]
                                .constraint
                                .union(&term.dep().constraint);
                            deps[i] = deps[i].with_constraint(wider);
                        }
                        None => deps.push(term.dep().clone()),
                    }
                    Self::Negative(deps)
                } else {
                    match matched {
                        Some(i) => {
                            let rest = term.dep().constraint.difference(&deps[i].constraint);
                            Self::Positive(term.dep().with_constraint(rest))
                        }
                        None => Self::Positive(term.dep().clone()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageDep, PackageRef};

    fn dep(name: &str, constraint: &str) -> PackageDep {
        PackageDep::hosted(name, constraint.parse().unwrap())
    }

    fn git_dep(name: &str, constraint: &str) -> PackageDep {
        PackageDep::new(
            PackageRef::new(name, "git", "https://example.com/repo"),
            constraint.parse().unwrap(),
        )
    }

    #[test]
    fn positive_and_positive_intersect() {
        let constraint = Constraint::Positive(dep("foo", ">=1.0.0"));
        let next = constraint.with_term(&Term::positive(dep("foo", "<2.0.0")));
        assert_eq!(next, Constraint::Positive(dep("foo", ">=1.0.0 <2.0.0")));
    }

    #[test]
    fn positive_and_negative_subtract() {
        let constraint = Constraint::Positive(dep("foo", "any"));
        let next = constraint.with_term(&Term::negative(dep("foo", ">=1.0.0")));
        assert_eq!(next, Constraint::Positive(dep("foo", "<1.0.0")));
    }

    #[test]
    fn positive_ignores_other_instances() {
        let constraint = Constraint::Positive(dep("foo", "^1.0.0"));
        let next = constraint.with_term(&Term::positive(git_dep("foo", "^2.0.0")));
        assert_eq!(next, constraint);
    }

    #[test]
    fn negatives_accumulate_and_union() {
        let constraint = Constraint::Negative(vec![dep("foo", "^1.0.0")]);
        let more = constraint.with_term(&Term::negative(dep("foo", "^2.0.0")));
        assert_eq!(
            more,
            Constraint::Negative(vec![dep("foo", ">=1.0.0 <3.0.0")])
        );
        let other_instance = constraint.with_term(&Term::negative(git_dep("foo", "any")));
        assert_eq!(
            other_instance,
            Constraint::Negative(vec![dep("foo", "^1.0.0"), git_dep("foo", "any")])
        );
    }

    #[test]
    fn negative_flips_to_positive_minus_forbidden() {
        let constraint = Constraint::Negative(vec![dep("foo", "^1.0.0")]);
        let next = constraint.with_term(&Term::positive(dep("foo", ">=1.0.0")));
        assert_eq!(next, Constraint::Positive(dep("foo", ">=2.0.0")));
    }

    proptest::proptest! {
        /// Folding the same term in twice never learns anything new, for
        /// any shape of constraint and term.
        #[test]
        fn with_term_is_idempotent_for_arbitrary_constraints(
            base in semver_sets::testing::constraint_strategy(),
            term_set in semver_sets::testing::constraint_strategy(),
            negative in proptest::prelude::any::<bool>(),
        ) {
            let constraint = Constraint::Positive(PackageDep::hosted("foo", base));
            let term = if negative {
                Term::negative(PackageDep::hosted("foo", term_set))
            } else {
                Term::positive(PackageDep::hosted("foo", term_set))
            };
            let once = constraint.with_term(&term);
            proptest::prop_assert_eq!(once.with_term(&term), once.clone());
        }
    }

    #[test]
    fn with_term_is_idempotent() {
        let cases = [
            (
                Constraint::Positive(dep("foo", "any")),
                Term::negative(dep("foo", "^1.0.0")),
            ),
            (
                Constraint::Positive(dep("foo", ">=1.0.0")),
                Term::positive(dep("foo", "<3.0.0")),
            ),
            (
                Constraint::Negative(vec![dep("foo", "^1.0.0")]),
                Term::negative(dep("foo", "^3.0.0")),
            ),
        ];
        for (constraint, term) in cases {
            let once = constraint.with_term(&term);
            assert_eq!(once.with_term(&term), once);
        }
    }
}
