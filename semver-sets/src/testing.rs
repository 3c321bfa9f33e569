// SPDX-License-Identifier: MPL-2.0

//! Proptest strategies for versions and constraints.

use proptest::prelude::*;
use semver::Version;

use crate::{VersionConstraint, VersionRange};

/// A strategy for versions drawn from a small grid, so that generated
/// constraints overlap often enough to exercise the set operations.
pub fn version_strategy() -> impl Strategy<Value = Version> {
    (0u64..5, 0u64..5, 0u64..3).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

/// A strategy for constraints.
///
/// Generates constraints from a random vector of deltas between bounds.
/// Each bound is randomly inclusive or exclusive, and the first may be
/// unbounded, mirroring every shape a constraint can take.
pub fn constraint_strategy() -> impl Strategy<Value = VersionConstraint> {
    (
        any::<bool>(),
        prop::collection::vec((1u64..4, any::<bool>()), 1..8),
    )
        .prop_map(|(start_unbounded, deltas)| to_constraint(start_unbounded, deltas))
}

fn to_constraint(start_unbounded: bool, deltas: Vec<(u64, bool)>) -> VersionConstraint {
    let mut ranges = Vec::new();
    let mut start: Option<(Option<Version>, bool)> = if start_unbounded {
        Some((None, false))
    } else {
        None
    };
    let mut at = 0u64;
    for (delta, inclusive) in deltas {
        at += delta;
        let bound = Version::new(at, 0, 0);
        match start.take() {
            Some((min, include_min)) => {
                ranges.push(
                    VersionRange::try_new(min, include_min, Some(bound), inclusive)
                        .expect("bounds are strictly increasing"),
                );
            }
            None => start = Some((Some(bound), inclusive)),
        }
    }
    if let Some((min, include_min)) = start {
        ranges.push(
            VersionRange::try_new(min, include_min, None, false)
                .expect("a range without an upper bound is never empty"),
        );
    }
    VersionConstraint::from_ranges(ranges)
}
