// SPDX-License-Identifier: MPL-2.0

//! Package manifests and the SDK environment they are checked against.

use semver::Version;
use semver_sets::VersionConstraint;

use crate::package::PackageDep;

/// The manifest of one package version: its dependencies and the SDK
/// versions it supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pubspec {
    /// The packages this version depends on.
    pub dependencies: Vec<PackageDep>,
    /// The Dart SDK versions this package works with.
    pub dart_sdk: VersionConstraint,
    /// The Flutter SDK versions this package works with, if it requires
    /// Flutter at all.
    pub flutter_sdk: Option<VersionConstraint>,
}

impl Pubspec {
    /// A manifest with the given dependencies and no SDK requirements.
    pub fn new(dependencies: Vec<PackageDep>) -> Self {
        Self {
            dependencies,
            dart_sdk: VersionConstraint::any(),
            flutter_sdk: None,
        }
    }

    /// Restricts the manifest to the given Dart SDK versions.
    pub fn with_dart_sdk(mut self, constraint: VersionConstraint) -> Self {
        self.dart_sdk = constraint;
        self
    }

    /// Makes the manifest require Flutter at the given versions.
    pub fn with_flutter_sdk(mut self, constraint: VersionConstraint) -> Self {
        self.flutter_sdk = Some(constraint);
        self
    }
}

impl Default for Pubspec {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// The SDK versions available where resolution runs.
#[derive(Clone, Debug)]
pub struct SdkEnv {
    /// The running Dart SDK version.
    pub dart: Version,
    /// `None` when no Flutter SDK is installed.
    pub flutter: Option<Version>,
}

impl SdkEnv {
    /// An environment with only a Dart SDK.
    pub fn new(dart: Version) -> Self {
        Self {
            dart,
            flutter: None,
        }
    }

    /// Adds a Flutter SDK to the environment.
    pub fn with_flutter(mut self, flutter: Version) -> Self {
        self.flutter = Some(flutter);
        self
    }

    /// Whether a Flutter SDK is installed at all.
    pub fn flutter_available(&self) -> bool {
        self.flutter.is_some()
    }
}
