// SPDX-License-Identifier: MPL-2.0

//! Set algebra over semantic versions.
//!
//! This crate provides the version primitives used by version solving:
//! contiguous [`VersionRange`]s with optional inclusive or exclusive bounds,
//! disjoint [`VersionUnion`]s of such ranges, and the [`VersionConstraint`]
//! type that closes both under the usual set operations (intersection,
//! union, difference, subset and overlap tests).
//!
//! # Canonical representations
//!
//! Constraints are always kept in a canonical form: unions are sorted,
//! disjoint, and never contain two ranges that touch. As a consequence
//! structural equality (`Eq`) coincides with set equality, which the solver
//! relies on when it compares derived constraints to decide whether
//! anything new was learned.
//!
//! Versions themselves come from the [`semver`] crate and keep its total
//! ordering, including pre-release precedence.

mod constraint;
mod range;
mod version;

#[cfg(any(test, feature = "proptest"))]
pub mod testing;

pub use constraint::{ConstraintParseError, VersionConstraint, VersionUnion};
pub use range::VersionRange;
pub use semver::Version;
pub use version::{antiprioritize, is_pre_release, next_breaking, prioritize};
