// SPDX-License-Identifier: MPL-2.0

//! The decision loop driving version solving.
//!
//! Solving alternates between unit propagation (worked out by the solver
//! state) and decisions: pick the next package that still needs a version,
//! ask the oracle what exists, select the best allowed version, and turn
//! its manifest into clauses. Conflicts along the way learn new clauses and
//! rewind the decision stack; the loop ends when no package needs a
//! decision (success) or a conflict reaches the root (failure, rendered as
//! a numbered proof).

use std::cmp::Ordering;
use std::sync::Arc;

use log::{debug, info};

use semver::Version;
use semver_sets::{antiprioritize, prioritize, VersionConstraint, VersionRange};

use crate::clause::{Cause, Clause, SdkKind};
use crate::error::{SolveError, SolveFailure};
use crate::internal::{Satisfaction, State};
use crate::normalize::Normalizer;
use crate::oracle::{PackageVersions, VersionOracle};
use crate::package::{PackageDep, PackageId, PackageRef};
use crate::pubspec::{Pubspec, SdkEnv};
use crate::term::Term;
use crate::type_aliases::{FnvIndexMap, Map};

/// What kind of solve is being run; decides which versions are preferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveMode {
    /// Resolve against what a fresh checkout would get.
    Get,
    /// Prefer the newest versions everywhere.
    Upgrade,
    /// Prefer the oldest versions that still satisfy everything.
    Downgrade,
}

impl SolveMode {
    /// The priority ordering between two versions; greater is preferred.
    pub fn compare(&self, a: &Version, b: &Version) -> Ordering {
        match self {
            Self::Get | Self::Upgrade => prioritize(a, b),
            Self::Downgrade => antiprioritize(a, b),
        }
    }
}

/// A successful resolution.
#[derive(Clone, Debug)]
pub struct SolveResult {
    /// The root package the solve ran for.
    pub root: PackageId,
    /// Every selected package, root first, in decision order.
    pub decisions: Vec<PackageId>,
    /// The manifest of every selected package.
    pub pubspecs: Map<String, Arc<Pubspec>>,
    /// For each selected dependency, all versions the oracle knows of it,
    /// ascending.
    pub available_versions: Map<String, Vec<Version>>,
}

impl SolveResult {
    /// The selected version of a package, if one was selected.
    pub fn version_of(&self, name: &str) -> Option<&Version> {
        self.decisions
            .iter()
            .find(|id| id.package.name == name)
            .map(|id| &id.version)
    }
}

/// Finds versions for the root package's transitive dependencies, or
/// explains why none exist.
///
/// The oracle's answers fully determine the outcome: two solves over the
/// same oracle produce identical decisions or an identical failure proof.
pub fn resolve<O: VersionOracle>(
    oracle: &O,
    sdk: &SdkEnv,
    mode: SolveMode,
    root: PackageId,
    root_pubspec: Pubspec,
) -> Result<SolveResult, SolveError<O::Err>> {
    Solver {
        cache: OracleCache {
            oracle,
            packages: FnvIndexMap::default(),
        },
        sdk,
        mode,
        state: State::new(),
        root,
        root_pubspec: Arc::new(root_pubspec),
    }
    .solve()
}

struct Solver<'a, O: VersionOracle> {
    cache: OracleCache<'a, O>,
    sdk: &'a SdkEnv,
    mode: SolveMode,
    state: State,
    root: PackageId,
    root_pubspec: Arc<Pubspec>,
}

impl<O: VersionOracle> Solver<'_, O> {
    fn solve(&mut self) -> Result<SolveResult, SolveError<O::Err>> {
        self.check_root_sdk()?;
        self.state.push_decision(self.root.clone());
        let root_deps = self.root_pubspec.dependencies.clone();
        for dep in root_deps {
            let target = self.cache.maximize(&dep).map_err(SolveError::Oracle)?;
            let clause = Clause::requirement(target, self.root.package.clone());
            self.state
                .add_clause(Arc::new(clause))
                .map_err(SolveError::NoSolution)?;
        }
        loop {
            self.cache
                .oracle
                .should_cancel()
                .map_err(SolveError::Cancelled)?;
            let Some(id) = self.next_candidate()? else {
                info!("version solving succeeded");
                return self.build_result();
            };
            self.select_version(id)?;
        }
    }

    /// The root package must itself work under the current SDKs before any
    /// dependency is worth looking at.
    fn check_root_sdk(&self) -> Result<(), SolveError<O::Err>> {
        let root_dep = PackageDep::new(
            self.root.package.clone(),
            VersionConstraint::exact(self.root.version.clone()),
        );
        let fail = |cause| {
            Err(SolveError::NoSolution(SolveFailure::new(Arc::new(
                Clause::prohibition(root_dep.clone(), cause),
            ))))
        };
        if !self.root_pubspec.dart_sdk.allows(&self.sdk.dart) {
            return fail(Cause::Sdk {
                kind: SdkKind::Dart,
                constraint: Some(self.root_pubspec.dart_sdk.clone()),
            });
        }
        if let Some(constraint) = &self.root_pubspec.flutter_sdk {
            match &self.sdk.flutter {
                None => {
                    return fail(Cause::Sdk {
                        kind: SdkKind::Flutter,
                        constraint: None,
                    })
                }
                Some(flutter) if !constraint.allows(flutter) => {
                    return fail(Cause::Sdk {
                        kind: SdkKind::Flutter,
                        constraint: Some(constraint.clone()),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Picks the next package id to decide on, or `None` when the
    /// assignment is complete.
    ///
    /// Accumulated positive constraints come first, in the order they
    /// appeared. After those, any satisfiable positive term of an
    /// unsatisfied clause is a candidate; among them the one allowing the
    /// highest versions wins. Failed lookups learn prohibitions and rescan.
    fn next_candidate(&mut self) -> Result<Option<PackageId>, SolveError<O::Err>> {
        loop {
            if let Some(dep) = self.state.first_positive_constraint().cloned() {
                match self.best_version_for(&dep)? {
                    Some(id) => return Ok(Some(id)),
                    None => continue,
                }
            }
            let Some(term) = self.best_open_term() else {
                return Ok(None);
            };
            match self.best_version_for(term.dep())? {
                Some(id) => return Ok(Some(id)),
                None => continue,
            }
        }
    }

    /// Scans unsatisfied clauses for their satisfiable positive terms and
    /// keeps the one whose dependency allows the highest versions.
    fn best_open_term(&self) -> Option<Term> {
        let mut best: Option<Term> = None;
        for clause in self.state.clauses() {
            let mut open = Vec::new();
            let mut satisfied = false;
            for term in clause.terms() {
                match self.state.satisfaction(term) {
                    Satisfaction::Satisfied => {
                        satisfied = true;
                        break;
                    }
                    Satisfaction::Satisfiable if !term.is_negative() => open.push(term),
                    _ => {}
                }
            }
            if satisfied {
                continue;
            }
            for term in open {
                let exceeds = match &best {
                    None => true,
                    Some(best) => upper_bound_exceeds(term.dep(), best.dep()),
                };
                if exceeds {
                    best = Some(term.clone());
                }
            }
        }
        best
    }

    /// Asks the oracle for the best allowed version of `dep`.
    ///
    /// A package the oracle has never heard of prohibits every instance of
    /// it; a known package with nothing in range prohibits just the
    /// requested range. Either way the caller rescans for candidates.
    fn best_version_for(
        &mut self,
        dep: &PackageDep,
    ) -> Result<Option<PackageId>, SolveError<O::Err>> {
        let Some(ids) = self.cache.ids(&dep.package).map_err(SolveError::Oracle)? else {
            info!("{} doesn't exist", dep.package.name);
            let clause = Clause::prohibition(
                dep.with_constraint(VersionConstraint::any()),
                Cause::UnknownPackage,
            );
            self.state
                .add_clause(Arc::new(clause))
                .map_err(SolveError::NoSolution)?;
            return Ok(None);
        };
        match ids.iter().find(|id| dep.constraint.allows(&id.version)) {
            Some(id) => Ok(Some(id.clone())),
            None => {
                info!("no versions of {dep}");
                let clause = Clause::prohibition(dep.clone(), Cause::NoVersions);
                self.state
                    .add_clause(Arc::new(clause))
                    .map_err(SolveError::NoSolution)?;
                Ok(None)
            }
        }
    }

    /// Makes `id` the next decision: gate on SDK constraints, re-examine
    /// the clauses that mention it, and add its dependency edges.
    ///
    /// Any conflict along the way rewinds the stack; this then returns
    /// early so the decision loop reschedules from the rewound state.
    fn select_version(&mut self, id: PackageId) -> Result<(), SolveError<O::Err>> {
        let pubspec = self.cache.pubspec(&id).map_err(SolveError::Oracle)?;
        if !self.validate_sdk(&id, &pubspec)? {
            return Ok(());
        }
        self.state.push_decision(id.clone());
        let generation = self.state.generation();
        for clause in self.state.clauses_for(&id.package.name) {
            if !self
                .state
                .reexamine(&clause)
                .map_err(SolveError::NoSolution)?
            {
                return Ok(());
            }
        }
        for dep in pubspec.dependencies.clone() {
            let depender = self.dep_where(&id, |neighbor| {
                neighbor.dependencies.iter().any(|candidate| {
                    candidate.package == dep.package
                        && candidate.constraint.allows_all(&dep.constraint)
                        && dep.constraint.allows_all(&candidate.constraint)
                })
            })?;
            let target = self.cache.maximize(&dep).map_err(SolveError::Oracle)?;
            let clause = Clause::dependency(depender, target);
            if !self
                .state
                .add_clause(Arc::new(clause))
                .map_err(SolveError::NoSolution)?
                || self.state.generation() != generation
            {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Checks `id`'s manifest against the current SDKs. Each violated
    /// constraint learns a prohibition spanning the whole adjacent run of
    /// versions sharing the problem, and the candidate is skipped.
    fn validate_sdk(
        &mut self,
        id: &PackageId,
        pubspec: &Pubspec,
    ) -> Result<bool, SolveError<O::Err>> {
        let mut passed = true;
        if !pubspec.dart_sdk.allows(&self.sdk.dart) {
            info!(
                "{id} needs Dart SDK {} but {} is running",
                pubspec.dart_sdk, self.sdk.dart
            );
            let sdk = self.sdk.dart.clone();
            let run = self.dep_where(id, move |neighbor| !neighbor.dart_sdk.allows(&sdk))?;
            let clause = Clause::prohibition(
                run,
                Cause::Sdk {
                    kind: SdkKind::Dart,
                    constraint: Some(pubspec.dart_sdk.clone()),
                },
            );
            self.state
                .add_clause(Arc::new(clause))
                .map_err(SolveError::NoSolution)?;
            passed = false;
        }
        if let Some(constraint) = &pubspec.flutter_sdk {
            let violation = match &self.sdk.flutter {
                None => Some(None),
                Some(flutter) if !constraint.allows(flutter) => Some(Some(flutter.clone())),
                Some(_) => None,
            };
            if let Some(flutter) = violation {
                info!("{id} cannot run under the current Flutter SDK");
                let run = self.dep_where(id, move |neighbor| {
                    match (&flutter, &neighbor.flutter_sdk) {
                        (_, None) => false,
                        (None, Some(_)) => true,
                        (Some(version), Some(required)) => !required.allows(version),
                    }
                })?;
                let clause = Clause::prohibition(
                    run,
                    Cause::Sdk {
                        kind: SdkKind::Flutter,
                        constraint: self.sdk.flutter.as_ref().map(|_| constraint.clone()),
                    },
                );
                self.state
                    .add_clause(Arc::new(clause))
                    .map_err(SolveError::NoSolution)?;
                passed = false;
            }
        }
        Ok(passed)
    }

    /// The widest dependency on `id`'s package covering the contiguous run
    /// of versions around `id` whose manifests satisfy `pred`.
    ///
    /// Generalizing from one version to its whole run keeps the clause set
    /// compact: one clause rules out a range instead of a single version.
    /// The constraint takes the most compact shape that covers exactly the
    /// run. `pred` must hold for `id` itself.
    fn dep_where<F>(&mut self, id: &PackageId, pred: F) -> Result<PackageDep, SolveError<O::Err>>
    where
        F: Fn(&Pubspec) -> bool,
    {
        let base = self.cache.base(&id.package).map_err(SolveError::Oracle)?;
        let position = base.partition_point(|version| version < &id.version);
        debug_assert!(base.get(position) == Some(&id.version));
        let mut low = position;
        while low > 0 {
            let neighbor = PackageId::new(id.package.clone(), base[low - 1].clone());
            if pred(&*self.cache.pubspec(&neighbor).map_err(SolveError::Oracle)?) {
                low -= 1;
            } else {
                break;
            }
        }
        let mut high = position;
        while high + 1 < base.len() {
            let neighbor = PackageId::new(id.package.clone(), base[high + 1].clone());
            if pred(&*self.cache.pubspec(&neighbor).map_err(SolveError::Oracle)?) {
                high += 1;
            } else {
                break;
            }
        }
        let constraint = if low == 0 && high + 1 == base.len() {
            VersionConstraint::any()
        } else if high + 1 == base.len() {
            VersionRange::at_least(base[low].clone()).into()
        } else if low == 0 {
            VersionRange::below(base[high + 1].clone()).into()
        } else if low == high {
            VersionConstraint::exact(base[low].clone())
        } else {
            let compatible = VersionConstraint::compatible_with(base[low].clone());
            if compatible.allows(&base[high]) && !compatible.allows(&base[high + 1]) {
                compatible
            } else {
                VersionRange::between(base[low].clone(), base[high + 1].clone()).into()
            }
        };
        debug!(
            "versions {} of {} share the property of {id}",
            constraint, id.package.name
        );
        Ok(PackageDep::new(id.package.clone(), constraint))
    }

    fn build_result(&mut self) -> Result<SolveResult, SolveError<O::Err>> {
        let decisions = self.state.decisions().to_vec();
        let mut pubspecs = Map::default();
        let mut available_versions = Map::default();
        for id in &decisions {
            if id == &self.root {
                pubspecs.insert(id.package.name.clone(), self.root_pubspec.clone());
                continue;
            }
            pubspecs.insert(
                id.package.name.clone(),
                self.cache.pubspec(id).map_err(SolveError::Oracle)?,
            );
            available_versions.insert(
                id.package.name.clone(),
                self.cache.base(&id.package).map_err(SolveError::Oracle)?,
            );
        }
        Ok(SolveResult {
            root: self.root.clone(),
            decisions,
            pubspecs,
            available_versions,
        })
    }
}

/// Whether `a`'s constraint reaches higher versions than `b`'s, comparing
/// the upper bounds of their last ranges.
fn upper_bound_exceeds(a: &PackageDep, b: &PackageDep) -> bool {
    match (a.constraint.ranges().last(), b.constraint.ranges().last()) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(range_a), Some(range_b)) => match (range_a.max(), range_b.max()) {
            (None, None) => false,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(max_a), Some(max_b)) => match max_a.cmp(max_b) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => range_a.include_max() && !range_b.include_max(),
            },
        },
    }
}

/// Memoizes oracle answers and owns the per-package normalizers.
struct OracleCache<'a, O: VersionOracle> {
    oracle: &'a O,
    packages: FnvIndexMap<PackageRef, CachedPackage>,
}

struct CachedPackage {
    /// Ids best-first for the solve mode, or `None` for unknown packages.
    ids: Option<Arc<[PackageId]>>,
    /// Existing versions, ascending.
    base: Vec<Version>,
    normalizer: Normalizer,
    pubspecs: Map<Version, Arc<Pubspec>>,
}

impl<O: VersionOracle> OracleCache<'_, O> {
    fn package(&mut self, package: &PackageRef) -> Result<&mut CachedPackage, O::Err> {
        if !self.packages.contains_key(package) {
            let ids: Option<Arc<[PackageId]>> = match self.oracle.versions(package)? {
                PackageVersions::Unknown => None,
                PackageVersions::Available(ids) => Some(ids.into()),
            };
            let mut base: Vec<Version> = ids
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|id| id.version.clone())
                .collect();
            base.sort();
            let entry = CachedPackage {
                ids,
                normalizer: Normalizer::new(base.clone()),
                base,
                pubspecs: Map::default(),
            };
            self.packages.insert(package.clone(), entry);
        }
        Ok(self
            .packages
            .get_mut(package)
            .expect("the cache entry was just inserted"))
    }

    /// All ids of a package, best-first, or `None` when unknown.
    fn ids(&mut self, package: &PackageRef) -> Result<Option<Arc<[PackageId]>>, O::Err> {
        Ok(self.package(package)?.ids.clone())
    }

    /// All existing versions of a package, ascending.
    fn base(&mut self, package: &PackageRef) -> Result<Vec<Version>, O::Err> {
        Ok(self.package(package)?.base.clone())
    }

    fn pubspec(&mut self, id: &PackageId) -> Result<Arc<Pubspec>, O::Err> {
        let oracle = self.oracle;
        let entry = self.package(&id.package)?;
        if let Some(pubspec) = entry.pubspecs.get(&id.version) {
            return Ok(pubspec.clone());
        }
        let pubspec = Arc::new(oracle.describe(id)?);
        entry.pubspecs.insert(id.version.clone(), pubspec.clone());
        Ok(pubspec)
    }

    /// Rewrites `dep`'s constraint against its package's base, when the
    /// package is known, so every clause term is in maximal form.
    fn maximize(&mut self, dep: &PackageDep) -> Result<PackageDep, O::Err> {
        let entry = self.package(&dep.package)?;
        if entry.ids.is_none() {
            return Ok(dep.clone());
        }
        Ok(dep.with_constraint(entry.normalizer.maximize(&dep.constraint)))
    }
}
