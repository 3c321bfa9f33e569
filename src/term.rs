// SPDX-License-Identifier: MPL-2.0

//! A signed predicate over the versions of one package.

use std::fmt::{self, Display};

use crate::package::{PackageDep, PackageRef};

/// One signed package-range predicate.
///
/// A positive term is satisfied by an assignment that selects a version its
/// dependency allows; a negative term is satisfied when no such selection is
/// made.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    dep: PackageDep,
    negative: bool,
}

impl Term {
    /// A term satisfied by selecting a version `dep` allows.
    pub fn positive(dep: PackageDep) -> Self {
        Self {
            dep,
            negative: false,
        }
    }

    /// A term satisfied by *not* selecting any version `dep` allows.
    pub fn negative(dep: PackageDep) -> Self {
        Self {
            dep,
            negative: true,
        }
    }

    /// The dependency the term is about.
    pub fn dep(&self) -> &PackageDep {
        &self.dep
    }

    /// Whether the term is the negation of its dependency.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// The package the term is about.
    pub fn package(&self) -> &PackageRef {
        &self.dep.package
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "not {}", self.dep)
        } else {
            write!(f, "{}", self.dep)
        }
    }
}
