// SPDX-License-Identifier: MPL-2.0

//! Constraint maximization: rewriting ranges against the versions that
//! actually exist.
//!
//! Relative to a package's *base* (the ordered list of its concrete
//! versions), a constraint is maximal when no equivalent constraint covers
//! the same subset of the base with fewer ranges. Normalizing every range's
//! upper bound to the least existing version above it makes adjacent ranges
//! meet instead of leaving gaps no real version falls into, so later set
//! operations produce canonical results.

use semver::Version;
use semver_sets::{VersionConstraint, VersionRange};

use crate::type_aliases::{Map, Set};

/// Rewrites ranges for one package against that package's base.
#[derive(Debug)]
pub(crate) struct Normalizer {
    /// Existing versions, ascending.
    base: Vec<Version>,
    /// Cache of `lower_bound_index` results.
    lower_bounds: Map<Version, usize>,
    /// Ranges this normalizer already produced, so re-normalizing is O(1).
    normalized: Set<VersionRange>,
}

impl Normalizer {
    pub(crate) fn new(base: Vec<Version>) -> Self {
        debug_assert!(base.windows(2).all(|pair| pair[0] < pair[1]));
        Self {
            base,
            lower_bounds: Map::default(),
            normalized: Set::default(),
        }
    }

    /// Index of the least base version `>= version`.
    fn lower_bound_index(&mut self, version: &Version) -> usize {
        if let Some(&index) = self.lower_bounds.get(version) {
            return index;
        }
        let index = self.base.partition_point(|existing| existing < version);
        self.lower_bounds.insert(version.clone(), index);
        index
    }

    /// The smallest base version strictly greater than every version in
    /// `range`, or `None` when the range reaches past the base.
    fn strict_least_upper_bound(&mut self, range: &VersionRange) -> Option<Version> {
        let max = range.max()?;
        let index = self.lower_bound_index(max);
        match self.base.get(index) {
            None => None,
            Some(bound) if !range.include_max() || bound != max => Some(bound.clone()),
            Some(_) => self.base.get(index + 1).cloned(),
        }
    }

    /// Rewrites the upper bound of `range` to the least existing version
    /// above it. Idempotent; unbounded ranges pass through unchanged.
    fn normalize_range(&mut self, range: &VersionRange) -> VersionRange {
        if range.max().is_none() || self.normalized.contains(range) {
            return range.clone();
        }
        let raised = self.strict_least_upper_bound(range);
        let result = VersionRange::new(range.min().cloned(), range.include_min(), raised, false)
            .expect("raising an upper bound cannot empty the range");
        self.normalized.insert(result.clone());
        result
    }

    /// Rewrites every range of `constraint` and rebuilds the union, merging
    /// ranges whose gap contains no existing version.
    pub(crate) fn maximize(&mut self, constraint: &VersionConstraint) -> VersionConstraint {
        VersionConstraint::from_ranges(
            constraint
                .ranges()
                .to_vec()
                .into_iter()
                .map(|range| self.normalize_range(&range)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn base() -> Normalizer {
        Normalizer::new(vec![v("1.0.0"), v("2.0.0"), v("3.0.0")])
    }

    fn c(s: &str) -> VersionConstraint {
        s.parse().unwrap()
    }

    #[test]
    fn caret_keeps_its_shape() {
        assert_eq!(base().maximize(&c("^1.0.0")), c(">=1.0.0 <2.0.0"));
    }

    #[test]
    fn adjacent_exact_versions_fuse() {
        let result = base().maximize(&VersionConstraint::union_of(vec![c("1.0.0"), c("2.0.0")]));
        assert_eq!(result, c(">=1.0.0 <3.0.0"));
    }

    #[test]
    fn gaps_with_real_versions_stay() {
        let result = base().maximize(&VersionConstraint::union_of(vec![c("1.0.0"), c("3.0.0")]));
        assert_eq!(
            result,
            VersionConstraint::union_of(vec![c(">=1.0.0 <2.0.0"), c(">=3.0.0")])
        );
        assert_eq!(result.to_string(), ">=1.0.0 <2.0.0 or >=3.0.0");
    }

    #[test]
    fn ranges_past_the_base_become_unbounded() {
        assert_eq!(base().maximize(&c(">=2.5.0 <3.5.0")), c(">=2.5.0"));
    }

    #[test]
    fn maximize_is_idempotent() {
        let mut normalizer = base();
        let once = normalizer.maximize(&c("^1.0.0"));
        let twice = normalizer.maximize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn covered_versions_are_preserved() {
        let mut normalizer = base();
        let inputs = [c("^1.0.0"), c("<=2.0.0"), c("1.0.0"), c(">1.0.0 <3.0.0")];
        for input in inputs {
            let output = normalizer.maximize(&input);
            for version in [v("1.0.0"), v("2.0.0"), v("3.0.0")] {
                assert_eq!(
                    input.allows(&version),
                    output.allows(&version),
                    "{input} vs {output} at {version}"
                );
            }
        }
    }
}
