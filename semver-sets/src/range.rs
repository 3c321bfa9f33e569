// SPDX-License-Identifier: MPL-2.0

//! A contiguous interval of semantic versions.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use semver::Version;

use crate::version::next_breaking;

/// A contiguous, possibly unbounded interval of versions.
///
/// `None` bounds extend to infinity in that direction. A range is never
/// empty: constructors refuse bounds that cross, and set operations that
/// would produce an empty interval return `None` instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub(crate) min: Option<Version>,
    pub(crate) include_min: bool,
    pub(crate) max: Option<Version>,
    pub(crate) include_max: bool,
}

impl VersionRange {
    /// The range containing every version.
    pub fn any() -> Self {
        Self {
            min: None,
            include_min: false,
            max: None,
            include_max: false,
        }
    }

    /// The range containing exactly `version`.
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            include_min: true,
            max: Some(version),
            include_max: true,
        }
    }

    /// `>= version`.
    pub fn at_least(version: Version) -> Self {
        Self {
            min: Some(version),
            include_min: true,
            max: None,
            include_max: false,
        }
    }

    /// `< version`.
    pub fn below(version: Version) -> Self {
        Self {
            min: None,
            include_min: false,
            max: Some(version),
            include_max: false,
        }
    }

    /// `>= min < max`. Panics if the bounds cross.
    pub fn between(min: Version, max: Version) -> Self {
        assert!(min < max, "version range bounds must not cross");
        Self {
            min: Some(min),
            include_min: true,
            max: Some(max),
            include_max: false,
        }
    }

    /// All versions compatible with `version` under caret semantics.
    pub fn compatible_with(version: Version) -> Self {
        let max = next_breaking(&version);
        Self::between(version, max)
    }

    /// Builds a range from explicit bounds, if they describe a non-empty
    /// interval.
    pub fn new(
        min: Option<Version>,
        include_min: bool,
        max: Option<Version>,
        include_max: bool,
    ) -> Option<Self> {
        Self::try_new(min, include_min, max, include_max)
    }

    /// Builds a range if the bounds describe a non-empty interval.
    pub(crate) fn try_new(
        min: Option<Version>,
        include_min: bool,
        max: Option<Version>,
        include_max: bool,
    ) -> Option<Self> {
        if let (Some(min_v), Some(max_v)) = (&min, &max) {
            match min_v.cmp(max_v) {
                Ordering::Greater => return None,
                Ordering::Equal if !(include_min && include_max) => return None,
                _ => {}
            }
        }
        Some(Self {
            min,
            include_min,
            max,
            include_max,
        })
    }

    pub fn min(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    pub fn include_min(&self) -> bool {
        self.include_min
    }

    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    pub fn include_max(&self) -> bool {
        self.include_max
    }

    /// Whether the range pins exactly one version.
    pub fn as_exact(&self) -> Option<&Version> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if min == max => Some(min),
            _ => None,
        }
    }

    /// Whether `version` lies inside the range.
    pub fn allows(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            match version.cmp(min) {
                Ordering::Less => return false,
                Ordering::Equal if !self.include_min => return false,
                _ => {}
            }
        }
        if let Some(max) = &self.max {
            match version.cmp(max) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.include_max => return false,
                _ => {}
            }
        }
        true
    }

    /// Whether `self` reaches below everything `other` reaches.
    pub(crate) fn allows_lower(&self, other: &Self) -> bool {
        match (&self.min, &other.min) {
            (None, None) => false,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => self.include_min && !other.include_min,
            },
        }
    }

    /// Whether `self` reaches above everything `other` reaches.
    pub(crate) fn allows_higher(&self, other: &Self) -> bool {
        match (&self.max, &other.max) {
            (None, None) => false,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => self.include_max && !other.include_max,
            },
        }
    }

    /// Whether every version in `self` is below every version in `other`.
    pub(crate) fn strictly_lower(&self, other: &Self) -> bool {
        let (Some(max), Some(min)) = (&self.max, &other.min) else {
            return false;
        };
        match max.cmp(min) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => !(self.include_max && other.include_min),
        }
    }

    pub(crate) fn strictly_higher(&self, other: &Self) -> bool {
        other.strictly_lower(self)
    }

    /// Whether `self` ends exactly where `other` begins, with no overlap and
    /// no gap, so their union is a single range.
    pub(crate) fn adjacent_below(&self, other: &Self) -> bool {
        match (&self.max, &other.min) {
            (Some(max), Some(min)) => max == min && self.include_max != other.include_min,
            _ => false,
        }
    }

    /// Whether `self` contains every version `other` contains.
    pub fn allows_all(&self, other: &Self) -> bool {
        !other.allows_lower(self) && !other.allows_higher(self)
    }

    /// Whether the two ranges share at least one version.
    pub fn allows_any(&self, other: &Self) -> bool {
        !other.strictly_lower(self) && !other.strictly_higher(self)
    }

    /// The versions contained in both ranges, if any.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let (min, include_min) = if self.allows_lower(other) {
            (other.min.clone(), other.include_min)
        } else {
            (self.min.clone(), self.include_min)
        };
        let (max, include_max) = if self.allows_higher(other) {
            (other.max.clone(), other.include_max)
        } else {
            (self.max.clone(), self.include_max)
        };
        Self::try_new(min, include_min, max, include_max)
    }

    /// The pieces of `self` not contained in `other` (zero, one, or two).
    pub(crate) fn subtract(&self, other: &Self) -> Vec<Self> {
        if !self.allows_any(other) {
            return vec![self.clone()];
        }
        let mut pieces = Vec::new();
        if self.allows_lower(other) {
            if let Some(bound) = &other.min {
                pieces.push(Self {
                    min: self.min.clone(),
                    include_min: self.include_min,
                    max: Some(bound.clone()),
                    include_max: !other.include_min,
                });
            }
        }
        if self.allows_higher(other) {
            if let Some(bound) = &other.max {
                pieces.push(Self {
                    min: Some(bound.clone()),
                    include_min: !other.include_max,
                    max: self.max.clone(),
                    include_max: self.include_max,
                });
            }
        }
        pieces
    }
}

/// Ranges order by lower bound, then upper bound, with unbounded ends
/// sorting outward and inclusive bounds reaching further than exclusive
/// ones at the same version.
impl Ord for VersionRange {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_min = match (&self.min, &other.min) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .cmp(b)
                .then_with(|| other.include_min.cmp(&self.include_min)),
        };
        by_min.then_with(|| match (&self.max, &other.max) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a
                .cmp(b)
                .then_with(|| self.include_max.cmp(&other.include_max)),
        })
    }
}

impl PartialOrd for VersionRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "any"),
            (Some(min), Some(max)) if min == max => write!(f, "{min}"),
            _ => {
                let mut sep = "";
                if let Some(min) = &self.min {
                    let op = if self.include_min { ">=" } else { ">" };
                    write!(f, "{op}{min}")?;
                    sep = " ";
                }
                if let Some(max) = &self.max {
                    let op = if self.include_max { "<=" } else { "<" };
                    write!(f, "{sep}{op}{max}")?;
                }
                Ok(())
            }
        }
    }
}
