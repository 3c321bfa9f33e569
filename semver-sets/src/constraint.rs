// SPDX-License-Identifier: MPL-2.0

//! Constraints over versions: the closure of ranges under set operations.

use std::error::Error;
use std::fmt::{self, Display};
use std::str::FromStr;

use semver::Version;

use crate::range::VersionRange;

/// A union of two or more ranges.
///
/// Always sorted, disjoint, and non-adjacent; a union never collapses to a
/// single range or to the empty set (those are [`VersionConstraint`]
/// variants of their own).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VersionUnion {
    ranges: Vec<VersionRange>,
}

impl VersionUnion {
    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }
}

impl Display for VersionUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for range in &self.ranges {
            write!(f, "{sep}{range}")?;
            sep = " or ";
        }
        Ok(())
    }
}

/// A set of versions, closed under intersection, union, and difference.
///
/// The representation is canonical: equal sets compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VersionConstraint {
    Empty,
    Range(VersionRange),
    Union(VersionUnion),
}

impl VersionConstraint {
    /// The set containing no versions.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// The set containing every version.
    pub fn any() -> Self {
        Self::Range(VersionRange::any())
    }

    /// The set containing exactly `version`.
    pub fn exact(version: Version) -> Self {
        Self::Range(VersionRange::exact(version))
    }

    /// All versions compatible with `version` under caret semantics.
    pub fn compatible_with(version: Version) -> Self {
        Self::Range(VersionRange::compatible_with(version))
    }

    /// The ordered ranges making up the set.
    pub fn ranges(&self) -> &[VersionRange] {
        match self {
            Self::Empty => &[],
            Self::Range(range) => std::slice::from_ref(range),
            Self::Union(union) => union.ranges(),
        }
    }

    /// Builds the canonical constraint covering exactly the given ranges.
    ///
    /// Overlapping and touching ranges are merged, so the result's shape
    /// depends only on the set of versions covered.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = VersionRange>,
    {
        let mut ranges: Vec<VersionRange> = ranges.into_iter().collect();
        ranges.sort();
        let mut merged: Vec<VersionRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            let mergeable = matches!(
                merged.last(),
                Some(last) if last.allows_any(&range) || last.adjacent_below(&range)
            );
            if mergeable {
                let last = merged.last_mut().unwrap();
                if range.allows_higher(last) {
                    last.max = range.max;
                    last.include_max = range.include_max;
                }
            } else {
                merged.push(range);
            }
        }
        match merged.len() {
            0 => Self::Empty,
            1 => Self::Range(merged.pop().unwrap()),
            _ => Self::Union(VersionUnion { ranges: merged }),
        }
    }

    /// The union of several constraints.
    pub fn union_of<I>(constraints: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self::from_ranges(
            constraints
                .into_iter()
                .flat_map(|c| c.ranges().to_vec()),
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Whether the set contains every version.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Range(range) if *range == VersionRange::any())
    }

    /// Whether the set pins exactly one version.
    pub fn as_exact(&self) -> Option<&Version> {
        match self {
            Self::Range(range) => range.as_exact(),
            _ => None,
        }
    }

    /// Whether `version` is in the set.
    pub fn allows(&self, version: &Version) -> bool {
        self.ranges().iter().any(|range| range.allows(version))
    }

    /// Whether `self` contains every version `other` contains.
    pub fn allows_all(&self, other: &Self) -> bool {
        let mut ours = self.ranges().iter();
        let mut current = ours.next();
        'theirs: for their_range in other.ranges() {
            while let Some(our_range) = current {
                if our_range.strictly_lower(their_range) {
                    current = ours.next();
                    continue;
                }
                if our_range.allows_all(their_range) {
                    continue 'theirs;
                }
                return false;
            }
            return false;
        }
        true
    }

    /// Whether the two sets share at least one version.
    pub fn allows_any(&self, other: &Self) -> bool {
        let mut ours = self.ranges().iter().peekable();
        let mut theirs = other.ranges().iter().peekable();
        while let (Some(a), Some(b)) = (ours.peek(), theirs.peek()) {
            if a.strictly_lower(b) {
                ours.next();
            } else if b.strictly_lower(a) {
                theirs.next();
            } else {
                return true;
            }
        }
        false
    }

    /// The versions contained in both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut pieces = Vec::new();
        for a in self.ranges() {
            for b in other.ranges() {
                if let Some(piece) = a.intersect(b) {
                    pieces.push(piece);
                }
            }
        }
        Self::from_ranges(pieces)
    }

    /// The versions contained in either set.
    pub fn union(&self, other: &Self) -> Self {
        Self::from_ranges(
            self.ranges()
                .iter()
                .chain(other.ranges())
                .cloned(),
        )
    }

    /// The versions contained in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let mut result = Vec::new();
        for range in self.ranges() {
            let mut pieces = vec![range.clone()];
            for cut in other.ranges() {
                let mut remaining = Vec::with_capacity(pieces.len());
                for piece in &pieces {
                    remaining.extend(piece.subtract(cut));
                }
                pieces = remaining;
            }
            result.extend(pieces);
        }
        Self::from_ranges(result)
    }
}

impl From<VersionRange> for VersionConstraint {
    fn from(range: VersionRange) -> Self {
        Self::Range(range)
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "none"),
            Self::Range(range) => write!(f, "{range}"),
            Self::Union(union) => write!(f, "{union}"),
        }
    }
}

/// Error produced when parsing a constraint from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintParseError {
    input: String,
    reason: String,
}

impl Display for ConstraintParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version constraint \"{}\": {}", self.input, self.reason)
    }
}

impl Error for ConstraintParseError {}

impl FromStr for VersionConstraint {
    type Err = ConstraintParseError;

    /// Parses `"any"`, caret forms (`"^1.2.3"`), bare versions (exact), and
    /// space-separated comparator lists (`">=1.0.0 <2.0.0"`), which
    /// intersect.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = |reason: &str| ConstraintParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(error("empty string"));
        }
        if trimmed == "any" {
            return Ok(Self::any());
        }
        let mut result = Self::any();
        for token in trimmed.split_whitespace() {
            let (op, rest) = if let Some(rest) = token.strip_prefix("^") {
                ("^", rest)
            } else if let Some(rest) = token.strip_prefix(">=") {
                (">=", rest)
            } else if let Some(rest) = token.strip_prefix("<=") {
                ("<=", rest)
            } else if let Some(rest) = token.strip_prefix(">") {
                (">", rest)
            } else if let Some(rest) = token.strip_prefix("<") {
                ("<", rest)
            } else if let Some(rest) = token.strip_prefix("=") {
                ("=", rest)
            } else {
                ("=", token)
            };
            let version: Version = rest
                .parse()
                .map_err(|_| error("expected a semantic version after the operator"))?;
            let piece = match op {
                "^" => VersionRange::compatible_with(version),
                ">=" => VersionRange::at_least(version),
                ">" => VersionRange {
                    min: Some(version),
                    include_min: false,
                    max: None,
                    include_max: false,
                },
                "<" => VersionRange::below(version),
                "<=" => VersionRange {
                    min: None,
                    include_min: false,
                    max: Some(version),
                    include_max: true,
                },
                _ => VersionRange::exact(version),
            };
            result = result.intersect(&Self::Range(piece));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn c(s: &str) -> VersionConstraint {
        s.parse().unwrap()
    }

    #[test]
    fn parsing_round_trips() {
        assert_eq!(c("any"), VersionConstraint::any());
        assert_eq!(c("1.0.0"), VersionConstraint::exact(v("1.0.0")));
        assert_eq!(
            c("^1.2.0"),
            VersionConstraint::compatible_with(v("1.2.0"))
        );
        assert_eq!(
            c(">=1.0.0 <2.0.0"),
            VersionRange::between(v("1.0.0"), v("2.0.0")).into()
        );
        assert_eq!(c(">=1.0.0 <2.0.0").to_string(), ">=1.0.0 <2.0.0");
        assert!("nonsense".parse::<VersionConstraint>().is_err());
    }

    #[test]
    fn from_ranges_merges_overlap_and_adjacency() {
        let merged = VersionConstraint::from_ranges(vec![
            VersionRange::between(v("1.0.0"), v("2.0.0")),
            VersionRange::between(v("2.0.0"), v("3.0.0")),
        ]);
        assert_eq!(
            merged,
            VersionRange::between(v("1.0.0"), v("3.0.0")).into()
        );

        let gapped = VersionConstraint::from_ranges(vec![
            VersionRange::between(v("1.0.0"), v("2.0.0")),
            VersionRange::at_least(v("3.0.0")),
        ]);
        assert_eq!(gapped.ranges().len(), 2);
        assert_eq!(gapped.to_string(), ">=1.0.0 <2.0.0 or >=3.0.0");
    }

    #[test]
    fn intersect_unions() {
        let a = c(">=1.0.0 <2.0.0").union(&c(">=3.0.0 <4.0.0"));
        let b = c(">=1.5.0 <3.5.0");
        assert_eq!(
            a.intersect(&b),
            VersionConstraint::union_of(vec![
                c(">=1.5.0 <2.0.0"),
                c(">=3.0.0 <3.5.0"),
            ])
        );
        assert!(a.intersect(&c(">=2.0.0 <3.0.0")).is_empty());
    }

    #[test]
    fn difference_carves_holes() {
        let all = c(">=1.0.0 <4.0.0");
        let hole = c(">=2.0.0 <3.0.0");
        let carved = all.difference(&hole);
        assert!(carved.allows(&v("1.5.0")));
        assert!(!carved.allows(&v("2.5.0")));
        assert!(carved.allows(&v("3.0.0")));
        assert_eq!(carved.ranges().len(), 2);
        assert!(all.difference(&VersionConstraint::any()).is_empty());
        assert_eq!(all.difference(&VersionConstraint::empty()), all);
    }

    #[test]
    fn subset_tests_across_unions() {
        let union = c(">=1.0.0 <2.0.0").union(&c(">=3.0.0"));
        assert!(union.allows_all(&c("^1.0.0")));
        assert!(union.allows_all(&c(">=3.5.0 <4.0.0")));
        assert!(!union.allows_all(&c(">=1.5.0 <3.5.0")));
        assert!(union.allows_any(&c(">=2.0.0 <3.5.0")));
        assert!(!union.allows_any(&c(">=2.0.0 <3.0.0")));
    }

    #[test]
    fn exact_singletons_subtract_cleanly() {
        let exact = VersionConstraint::exact(v("2.0.0"));
        let carved = VersionConstraint::any().difference(&exact);
        assert!(!carved.allows(&v("2.0.0")));
        assert!(carved.allows(&v("1.9.9")));
        assert!(carved.allows(&v("2.0.1")));
        // Re-adding the hole restores the full set.
        assert!(carved.union(&exact).is_any());
    }
}
