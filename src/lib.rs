// SPDX-License-Identifier: MPL-2.0

//! Semantic-versioning dependency resolution by conflict-driven clause
//! learning.
//!
//! Given a root package with dependencies and an oracle that can list and
//! describe the versions of any package, solving either selects exactly one
//! concrete version per reachable package such that every transitive
//! dependency constraint holds, or proves that no such assignment exists
//! and renders the proof as a numbered, human-readable explanation:
//!
//! ```txt
//! Because every version of bar depends on foo >=2.0.0 and root depends on
//! bar ^1.0.0, foo >=2.0.0 is required.
//! So, because root depends on foo ^1.0.0, version solving failed.
//! ```
//!
//! Internally the solver runs unit propagation over *clauses*, which are
//! disjunctions of signed per-package range predicates, keeping one
//! accumulated constraint per package. Selecting a version is a decision;
//! a clause whose terms all become unsatisfiable is a conflict, which
//! learns a new clause by resolution and jumps back to the most recent
//! decision that contributed to it. Constraints written into clauses are
//! first *maximized* against the versions that actually exist, so
//! differences and unions of ranges never leave gaps no real version falls
//! into.
//!
//! # Example
//!
//! ```
//! use pubsolve::{
//!     resolve, OfflineOracle, PackageDep, PackageId, Pubspec, SdkEnv, SolveMode,
//! };
//!
//! let mut oracle = OfflineOracle::new(SolveMode::Get);
//! oracle.add(
//!     "foo",
//!     "1.0.0".parse().unwrap(),
//!     Pubspec::new(vec![PackageDep::hosted("bar", "^1.0.0".parse().unwrap())]),
//! );
//! oracle.add("bar", "1.2.0".parse().unwrap(), Pubspec::default());
//!
//! let root = PackageId::hosted("app", "0.1.0".parse().unwrap());
//! let manifest = Pubspec::new(vec![PackageDep::hosted("foo", "any".parse().unwrap())]);
//! let sdk = SdkEnv::new("3.0.0".parse().unwrap());
//!
//! let result = resolve(&oracle, &sdk, SolveMode::Get, root, manifest).unwrap();
//! assert_eq!(result.version_of("foo"), Some(&"1.0.0".parse().unwrap()));
//! assert_eq!(result.version_of("bar"), Some(&"1.2.0".parse().unwrap()));
//! ```
//!
//! # The oracle
//!
//! [`VersionOracle`] is the only connection to the outside world: it lists
//! the versions of a package (best-first for the solve mode) and returns
//! the [`Pubspec`] of any listed version. [`OfflineOracle`] is an
//! in-memory implementation for tests and prefetched registries. Real
//! implementations usually cache network answers; the solver additionally
//! memoizes every answer itself, so each question is asked at most once
//! per solve.
//!
//! Oracle calls and the [`should_cancel`](VersionOracle::should_cancel)
//! hook, invoked once per decision, are the only points at which the
//! solver yields to its caller; everything else is synchronous and
//! deterministic.
//!
//! # Failures
//!
//! When no assignment exists, [`resolve`] returns
//! [`SolveError::NoSolution`] carrying a [`SolveFailure`]. Its `Display`
//! implementation walks the conflict derivation and prints the proof,
//! numbering only the intermediate conclusions that are referenced more
//! than once. Every other error kind (packages that do not exist, versions
//! ruled out by SDK constraints, empty ranges) is recovered internally by
//! learning a prohibition and trying the next candidate.

#![warn(missing_docs)]

mod clause;
mod constraint;
mod error;
mod normalize;
mod oracle;
mod package;
mod pubspec;
mod report;
mod solver;
mod term;
mod type_aliases;

mod internal;

pub use clause::{Cause, Clause, SdkKind};
pub use constraint::Constraint;
pub use error::{SolveError, SolveFailure};
pub use oracle::{OfflineOracle, PackageVersions, VersionOracle};
pub use package::{PackageDep, PackageId, PackageRef};
pub use pubspec::{Pubspec, SdkEnv};
pub use solver::{resolve, SolveMode, SolveResult};
pub use term::Term;
pub use type_aliases::{Map, Set};

pub use semver::Version;
pub use semver_sets::{ConstraintParseError, VersionConstraint, VersionRange, VersionUnion};
