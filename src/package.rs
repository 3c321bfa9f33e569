// SPDX-License-Identifier: MPL-2.0

//! Package identity: names, sources, constrained dependencies, and concrete
//! selections.

use std::fmt::{self, Display};

use semver::Version;
use semver_sets::VersionConstraint;

/// Identity of a package independent of any version: its name, the source
/// kind it is fetched from, and the source-specific description (such as a
/// registry URL).
///
/// Two refs with the same name but different sources or descriptions are
/// different packages that happen to collide on the name; at most one of
/// them can be selected in an assignment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageRef {
    /// The package name.
    pub name: String,
    /// The source kind the package comes from, such as `hosted` or `git`.
    pub source: String,
    /// Source-specific detail, such as a registry URL or repository.
    pub description: String,
}

impl PackageRef {
    /// A ref on an explicit source.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            description: description.into(),
        }
    }

    /// A ref on the default hosted source.
    pub fn hosted(name: impl Into<String>) -> Self {
        Self::new(name, "hosted", "")
    }
}

impl Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A dependency: a package ref together with the versions it accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageDep {
    /// The package depended on.
    pub package: PackageRef,
    /// The versions that satisfy the dependency.
    pub constraint: VersionConstraint,
}

impl PackageDep {
    /// A dependency on an explicit source.
    pub fn new(package: PackageRef, constraint: VersionConstraint) -> Self {
        Self {
            package,
            constraint,
        }
    }

    /// A dependency on the default hosted source.
    pub fn hosted(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self::new(PackageRef::hosted(name), constraint)
    }

    /// The same dependency with a different constraint.
    pub fn with_constraint(&self, constraint: VersionConstraint) -> Self {
        Self {
            package: self.package.clone(),
            constraint,
        }
    }

    /// Whether `self` and `other` talk about the same package, regardless of
    /// their constraints.
    pub fn same_package(&self, other: &PackageDep) -> bool {
        self.package == other.package
    }

    /// Whether a concrete selection satisfies this dependency.
    pub fn allows(&self, id: &PackageId) -> bool {
        self.package == id.package && self.constraint.allows(&id.version)
    }

    /// Whether every selection satisfying `other` also satisfies `self`.
    pub fn allows_all(&self, other: &PackageDep) -> bool {
        self.package == other.package && self.constraint.allows_all(&other.constraint)
    }

    /// Whether some selection satisfies both dependencies.
    pub fn allows_any(&self, other: &PackageDep) -> bool {
        self.package == other.package && self.constraint.allows_any(&other.constraint)
    }
}

impl Display for PackageDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.package, self.constraint)
    }
}

/// A concrete selection: a package ref pinned to one version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageId {
    /// The package selected.
    pub package: PackageRef,
    /// The selected version.
    pub version: Version,
}

impl PackageId {
    /// An id on an explicit source.
    pub fn new(package: PackageRef, version: Version) -> Self {
        Self { package, version }
    }

    /// An id on the default hosted source.
    pub fn hosted(name: impl Into<String>, version: Version) -> Self {
        Self::new(PackageRef::hosted(name), version)
    }
}

impl Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.package, self.version)
    }
}
