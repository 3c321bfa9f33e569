// SPDX-License-Identifier: MPL-2.0

//! Errors surfaced by resolution.

use std::error::Error;
use std::fmt::{self, Display};
use std::sync::Arc;

use thiserror::Error;

use crate::clause::Clause;
use crate::report;

/// Why a solve stopped without a solution.
///
/// Only [`SolveError::NoSolution`] is a resolution failure; the other
/// variants pass the oracle's own errors through unchanged.
#[derive(Error, Debug)]
pub enum SolveError<E: Error + 'static> {
    /// No assignment satisfies the constraints. Display the inner failure
    /// for the full proof.
    #[error("version solving failed")]
    NoSolution(#[source] SolveFailure),

    /// The oracle failed for a reason other than a missing package.
    #[error("the package oracle failed")]
    Oracle(#[source] E),

    /// The caller cancelled solving from the oracle's cancellation hook.
    #[error("version solving was cancelled")]
    Cancelled(#[source] E),
}

/// Proof that no assignment exists, rooted at the incompatibility that
/// finally contradicted the root package.
///
/// The [`Display`] impl renders the numbered, human-readable proof.
#[derive(Debug, Clone)]
pub struct SolveFailure {
    root: Arc<Clause>,
}

impl SolveFailure {
    pub(crate) fn new(root: Arc<Clause>) -> Self {
        Self { root }
    }

    /// The clause whose derivation explains the failure.
    pub fn root(&self) -> &Clause {
        &self.root
    }
}

impl Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", report::render(&self.root))
    }
}

impl Error for SolveFailure {}
