// SPDX-License-Identifier: MPL-2.0

//! Clauses: disjunctions of terms that every assignment must satisfy.

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use semver_sets::VersionConstraint;

use crate::package::{PackageDep, PackageRef};
use crate::term::Term;

/// Which SDK a prohibition was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdkKind {
    /// The Dart SDK.
    Dart,
    /// The Flutter SDK.
    Flutter,
}

impl Display for SdkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dart => write!(f, "Dart"),
            Self::Flutter => write!(f, "Flutter"),
        }
    }
}

/// Why a clause holds. External causes come from the world outside the
/// solver; `Conflict` marks a clause learned by resolving two others, and
/// carries the derivation used for failure explanation.
#[derive(Clone, Debug)]
pub enum Cause {
    /// A requirement of the root package.
    Root(PackageRef),
    /// A dependency stated by some package's manifest.
    Dependency,
    /// The oracle knows the package but has no version in the range.
    NoVersions,
    /// The oracle does not know the package at all.
    UnknownPackage,
    /// Versions were ruled out by an SDK constraint. `constraint` is the
    /// range of SDK versions the packages ask for; `None` means they require
    /// an SDK that is not available at all.
    Sdk {
        /// Which SDK rejected the versions.
        kind: SdkKind,
        /// The SDK versions the packages ask for.
        constraint: Option<VersionConstraint>,
    },
    /// Learned by resolving `conflict` against `other`.
    Conflict {
        /// The clause that became unsatisfiable.
        conflict: Arc<Clause>,
        /// The clause whose propagation set up the contradiction.
        other: Arc<Clause>,
    },
}

/// A disjunction of terms. At least one term must hold in any complete
/// assignment.
///
/// Equality and hashing cover the terms only: two clauses stating the same
/// disjunction are the same clause no matter how they were derived.
#[derive(Clone, Debug)]
pub struct Clause {
    terms: Arc<[Term]>,
    cause: Cause,
}

impl Clause {
    /// A root requirement: some version of `dep` must be selected.
    pub fn requirement(dep: PackageDep, root: PackageRef) -> Self {
        Self {
            terms: Arc::from([Term::positive(dep)]),
            cause: Cause::Root(root),
        }
    }

    /// A prohibition: no version of `dep` may be selected.
    pub fn prohibition(dep: PackageDep, cause: Cause) -> Self {
        Self {
            terms: Arc::from([Term::negative(dep)]),
            cause,
        }
    }

    /// A dependency edge: selecting from `depender` implies selecting from
    /// `target`. An impossible target collapses into a prohibition of the
    /// depender.
    pub fn dependency(depender: PackageDep, target: PackageDep) -> Self {
        let terms: Arc<[Term]> = if target.constraint.is_empty() {
            Arc::from([Term::negative(depender)])
        } else {
            Arc::from([Term::negative(depender), Term::positive(target)])
        };
        Self {
            terms,
            cause: Cause::Dependency,
        }
    }

    /// A clause learned from a conflict, by the rule of resolution.
    ///
    /// Terms about the same package merge into one, so the learned clause
    /// never lists a package twice. Returns `None` when the merge produces a
    /// term that always holds, making the whole clause a tautology not worth
    /// keeping.
    pub(crate) fn derived(
        terms: impl IntoIterator<Item = Term>,
        conflict: Arc<Clause>,
        other: Arc<Clause>,
    ) -> Option<Self> {
        let mut merged: Vec<Term> = Vec::new();
        for term in terms {
            match merged
                .iter_mut()
                .find(|existing| existing.package() == term.package())
            {
                Some(existing) => *existing = merge(existing, &term)?,
                None => merged.push(term),
            }
        }
        Some(Self {
            terms: merged.into(),
            cause: Cause::Conflict { conflict, other },
        })
    }

    /// A termless clause wrapping a contradiction, used as the root of a
    /// failure proof when a freshly added clause cannot be satisfied at the
    /// root level.
    pub(crate) fn contradiction(conflict: Arc<Clause>, other: Arc<Clause>) -> Self {
        Self {
            terms: Arc::from([]),
            cause: Cause::Conflict { conflict, other },
        }
    }

    /// The terms of the disjunction.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Why this clause holds.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The distinct package names this clause mentions.
    pub(crate) fn package_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.terms.len());
        for term in self.terms.iter() {
            let name = term.package().name.as_str();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Merges two terms about the same package into the single term their
/// disjunction denotes. `None` means the disjunction always holds.
fn merge(a: &Term, b: &Term) -> Option<Term> {
    let merged = match (a.is_negative(), b.is_negative()) {
        (false, false) => Term::positive(
            a.dep()
                .with_constraint(a.dep().constraint.union(&b.dep().constraint)),
        ),
        (true, true) => {
            let both = a.dep().constraint.intersect(&b.dep().constraint);
            if both.is_empty() {
                return None;
            }
            Term::negative(a.dep().with_constraint(both))
        }
        // `not x or y` is `not (x minus y)`.
        (true, false) => {
            let rest = a.dep().constraint.difference(&b.dep().constraint);
            if rest.is_empty() {
                return None;
            }
            Term::negative(a.dep().with_constraint(rest))
        }
        (false, true) => {
            let rest = b.dep().constraint.difference(&a.dep().constraint);
            if rest.is_empty() {
                return None;
            }
            Term::negative(b.dep().with_constraint(rest))
        }
    };
    Some(merged)
}

impl PartialEq for Clause {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Eq for Clause {}

impl Hash for Clause {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.terms.hash(state);
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "false");
        }
        let mut sep = "";
        for term in self.terms.iter() {
            write!(f, "{sep}{term}")?;
            sep = " or ";
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageDep;

    fn dep(name: &str, constraint: &str) -> PackageDep {
        PackageDep::hosted(name, constraint.parse().unwrap())
    }

    fn external(dep_: PackageDep) -> Arc<Clause> {
        Arc::new(Clause::prohibition(dep_, Cause::NoVersions))
    }

    #[test]
    fn derived_merges_same_package_terms() {
        let a = external(dep("a", "any"));
        let b = external(dep("b", "any"));
        let clause = Clause::derived(
            vec![
                Term::negative(dep("foo", ">=2.0.0")),
                Term::positive(dep("foo", "^1.0.0")),
            ],
            a,
            b,
        )
        .unwrap();
        // `not >=2.0.0 or ^1.0.0` collapses to `not >=2.0.0`.
        assert_eq!(clause.terms().len(), 1);
        assert!(clause.terms()[0].is_negative());
        assert_eq!(
            clause.terms()[0].dep().constraint,
            ">=2.0.0".parse().unwrap()
        );
    }

    #[test]
    fn derived_detects_tautologies() {
        let a = external(dep("a", "any"));
        let b = external(dep("b", "any"));
        let clause = Clause::derived(
            vec![
                Term::negative(dep("foo", "^1.0.0")),
                Term::positive(dep("foo", "any")),
            ],
            a,
            b,
        );
        assert!(clause.is_none());
    }

    #[test]
    fn equality_ignores_causes() {
        let left = Clause::prohibition(dep("foo", "^1.0.0"), Cause::NoVersions);
        let right = Clause::prohibition(dep("foo", "^1.0.0"), Cause::UnknownPackage);
        assert_eq!(left, right);
    }

    #[test]
    fn impossible_dependency_prohibits_the_depender() {
        let clause = Clause::dependency(
            dep("foo", "^1.0.0"),
            PackageDep::hosted("bar", semver_sets::VersionConstraint::empty()),
        );
        assert_eq!(clause.terms().len(), 1);
        assert!(clause.terms()[0].is_negative());
    }
}
