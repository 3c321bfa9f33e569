// SPDX-License-Identifier: MPL-2.0

//! Non-public solver internals.

pub(crate) mod state;

pub(crate) use state::{Satisfaction, State};
