// SPDX-License-Identifier: MPL-2.0

//! The oracle the solver consults for versions and manifests.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::error::Error;

use semver::Version;

use crate::package::{PackageId, PackageRef};
use crate::pubspec::Pubspec;
use crate::solver::SolveMode;
use crate::type_aliases::Map;

/// What the oracle knows about a package's versions.
#[derive(Clone, Debug)]
pub enum PackageVersions {
    /// The oracle has never heard of the package.
    Unknown,
    /// Every existing version, ordered best-first for the oracle's solve
    /// mode.
    Available(Vec<PackageId>),
}

/// Enumerates and describes the versions that exist.
///
/// Implementations are expected to be idempotent: repeated calls for the
/// same ref must return the same versions in the same order within one
/// solve, and are cheap to memoize. The solver caches every answer, so an
/// oracle is asked about each ref and id at most once per solve.
pub trait VersionOracle {
    /// The error type for oracle failures other than a missing package.
    type Err: Error + 'static;

    /// Lists all versions of a package, best-first for the solve mode this
    /// oracle serves: highest stable release first when getting or
    /// upgrading, lowest first when downgrading.
    fn versions(&self, package: &PackageRef) -> Result<PackageVersions, Self::Err>;

    /// Returns the manifest of a version previously listed by
    /// [`versions`](Self::versions).
    fn describe(&self, id: &PackageId) -> Result<Pubspec, Self::Err>;

    /// Called once per decision-loop iteration. Returning an error stops
    /// the solve; the error comes back as
    /// [`SolveError::Cancelled`](crate::SolveError::Cancelled). Oracle calls
    /// and this hook are the only points where the solver yields to its
    /// caller.
    fn should_cancel(&self) -> Result<(), Self::Err> {
        Ok(())
    }
}

/// An oracle over dependency information held entirely in memory.
///
/// Intended for tests and for callers that prefetch their registry: register
/// every version with [`add`](Self::add) or [`add_from`](Self::add_from),
/// then hand the oracle to [`resolve`](crate::resolve).
#[derive(Debug, Clone)]
pub struct OfflineOracle {
    mode: SolveMode,
    packages: Map<PackageRef, BTreeMap<Version, Pubspec>>,
}

impl OfflineOracle {
    /// An empty oracle answering with the given mode's preference order.
    pub fn new(mode: SolveMode) -> Self {
        Self {
            mode,
            packages: Map::default(),
        }
    }

    /// Registers a version of a hosted package.
    pub fn add(&mut self, name: impl Into<String>, version: Version, pubspec: Pubspec) {
        self.add_from(PackageRef::hosted(name), version, pubspec);
    }

    /// Registers a version of a package on an explicit source.
    pub fn add_from(&mut self, package: PackageRef, version: Version, pubspec: Pubspec) {
        self.packages
            .entry(package)
            .or_default()
            .insert(version, pubspec);
    }

    /// Lists the registered packages.
    pub fn packages(&self) -> impl Iterator<Item = &PackageRef> {
        self.packages.keys()
    }
}

impl VersionOracle for OfflineOracle {
    type Err = Infallible;

    fn versions(&self, package: &PackageRef) -> Result<PackageVersions, Infallible> {
        let Some(versions) = self.packages.get(package) else {
            return Ok(PackageVersions::Unknown);
        };
        let mut ids: Vec<PackageId> = versions
            .keys()
            .map(|version| PackageId::new(package.clone(), version.clone()))
            .collect();
        ids.sort_by(|a, b| self.mode.compare(&b.version, &a.version));
        Ok(PackageVersions::Available(ids))
    }

    fn describe(&self, id: &PackageId) -> Result<Pubspec, Infallible> {
        let pubspec = self
            .packages
            .get(&id.package)
            .and_then(|versions| versions.get(&id.version))
            .unwrap_or_else(|| panic!("describe called for unregistered {id}"));
        Ok(pubspec.clone())
    }
}
