// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::Location;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// What the analyzer could prove about the condition of a check.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheckVerdict {
    /// The condition is a constant zero: the check traps whenever it is reached.
    AlwaysFails,
    /// The condition is a non-zero constant: the check can never trap.
    AlwaysHolds,
    /// The condition depends on runtime values.
    Unknown,
}

impl CheckVerdict {
    pub fn from_constant(value: Option<bool>) -> Self {
        match value {
            Some(true) => CheckVerdict::AlwaysHolds,
            Some(false) => CheckVerdict::AlwaysFails,
            None => CheckVerdict::Unknown,
        }
    }
}

/// A call to one of the check functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSite {
    /// Location of the callee name.
    pub location: Location,
    /// The name used at the call site, e.g., `dynamic_check`.
    pub callee: String,
    /// The condition as written in the source.
    pub condition: String,
    pub verdict: CheckVerdict,
}
