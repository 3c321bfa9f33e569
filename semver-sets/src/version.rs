// SPDX-License-Identifier: MPL-2.0

//! Orderings and arithmetic on [`Version`] used when picking versions.

use std::cmp::Ordering;

use semver::Version;

/// Whether the version carries a pre-release tag.
pub fn is_pre_release(v: &Version) -> bool {
    !v.pre.is_empty()
}

/// The smallest version whose selection would be a breaking change from `v`.
///
/// Caret semantics: `2.3.4` breaks at `3.0.0`, while in the `0.x` line the
/// minor number is breaking, so `0.3.4` breaks at `0.4.0`.
pub fn next_breaking(v: &Version) -> Version {
    if v.major > 0 {
        Version::new(v.major + 1, 0, 0)
    } else {
        Version::new(0, v.minor + 1, 0)
    }
}

/// Ordering used to pick versions when getting or upgrading.
///
/// The greatest version under this ordering is the preferred one: stable
/// releases beat pre-releases, then higher versions beat lower ones.
pub fn prioritize(a: &Version, b: &Version) -> Ordering {
    (!is_pre_release(a))
        .cmp(&!is_pre_release(b))
        .then_with(|| a.cmp(b))
}

/// Ordering used to pick versions when downgrading: stable releases still
/// beat pre-releases, but lower versions beat higher ones.
pub fn antiprioritize(a: &Version, b: &Version) -> Ordering {
    (!is_pre_release(a))
        .cmp(&!is_pre_release(b))
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn next_breaking_majors() {
        assert_eq!(next_breaking(&v("1.2.3")), v("2.0.0"));
        assert_eq!(next_breaking(&v("0.2.3")), v("0.3.0"));
        assert_eq!(next_breaking(&v("0.0.7")), v("0.1.0"));
    }

    #[test]
    fn prioritize_prefers_stable_then_highest() {
        let mut versions = vec![v("1.0.0"), v("2.0.0-alpha"), v("1.5.0"), v("2.0.0")];
        versions.sort_by(|a, b| prioritize(b, a));
        assert_eq!(
            versions,
            vec![v("2.0.0"), v("1.5.0"), v("1.0.0"), v("2.0.0-alpha")]
        );
    }

    #[test]
    fn antiprioritize_prefers_stable_then_lowest() {
        let mut versions = vec![v("1.0.0"), v("0.9.0-beta"), v("1.5.0")];
        versions.sort_by(|a, b| antiprioritize(b, a));
        assert_eq!(versions, vec![v("1.0.0"), v("1.5.0"), v("0.9.0-beta")]);
    }
}
