// SPDX-License-Identifier: MPL-2.0

//! This bench monitors the performance of backjumping and constraint
//! accumulation.
//!
//! Dependencies are constructed so that the newest versions of a deep chain
//! all conflict with one of the root's own requirements, forcing the solver
//! to walk back through every version before finding the one that works.

use criterion::*;
use pubsolve::{
    resolve, OfflineOracle, PackageDep, PackageId, Pubspec, SdkEnv, SolveMode, Version,
};

fn version(minor: u64) -> Version {
    Version::new(1, minor, 0)
}

fn exact_dep(name: String, minor: u64) -> PackageDep {
    PackageDep::hosted(name, pubsolve::VersionConstraint::exact(version(minor)))
}

/// Each version `1.v.0` of every chain member depends on the next member at
/// exactly `1.v.0`, and the last member pins `anchor 1.v.0`, while the root
/// pins `anchor 1.0.0`. Only the oldest chain entry point resolves.
fn chained_singletons(c: &mut Criterion, package_count: u64, version_count: u64) {
    let mut oracle = OfflineOracle::new(SolveMode::Get);

    oracle.add("p1", version(0), Pubspec::default());
    for n in 1..package_count {
        for v in 1..version_count {
            oracle.add(
                format!("p{n}"),
                version(v),
                Pubspec::new(vec![exact_dep(format!("p{}", n + 1), v)]),
            );
        }
    }
    for v in 1..version_count {
        oracle.add(
            format!("p{package_count}"),
            version(v),
            Pubspec::new(vec![exact_dep("anchor".to_string(), v)]),
        );
    }
    for v in 0..version_count {
        oracle.add("anchor", version(v), Pubspec::default());
    }

    let sdk = SdkEnv::new(Version::new(3, 0, 0));
    let manifest = Pubspec::new(vec![
        PackageDep::hosted("p1", "any".parse().unwrap()),
        exact_dep("anchor".to_string(), 0),
    ]);

    c.bench_function("chained_singletons", |b| {
        b.iter(|| {
            let root = PackageId::hosted("root", Version::new(1, 0, 0));
            let _ = resolve(&oracle, &sdk, SolveMode::Get, root, manifest.clone());
        })
    });
}

/// Like `chained_singletons`, but every dependency is a `>=` range, so the
/// accumulated constraints stay wide and intersection work dominates.
fn chained_ranges(c: &mut Criterion, package_count: u64, version_count: u64) {
    let mut oracle = OfflineOracle::new(SolveMode::Get);

    oracle.add("p1", version(0), Pubspec::default());
    for n in 1..package_count {
        for v in 1..version_count {
            let floor = pubsolve::VersionRange::at_least(version(version_count - v));
            oracle.add(
                format!("p{n}"),
                version(v),
                Pubspec::new(vec![PackageDep::hosted(format!("p{}", n + 1), floor.into())]),
            );
        }
    }
    for v in 1..version_count {
        oracle.add(format!("p{package_count}"), version(v), Pubspec::default());
    }

    let sdk = SdkEnv::new(Version::new(3, 0, 0));
    let manifest = Pubspec::new(vec![PackageDep::hosted("p1", "any".parse().unwrap())]);

    c.bench_function("chained_ranges", |b| {
        b.iter(|| {
            let root = PackageId::hosted("root", Version::new(1, 0, 0));
            let _ = resolve(&oracle, &sdk, SolveMode::Get, root, manifest.clone());
        })
    });
}

fn bench_group(c: &mut Criterion) {
    chained_singletons(c, 20, 40);
    chained_ranges(c, 5, 40);
}

criterion_group!(benches, bench_group);
criterion_main!(benches);
