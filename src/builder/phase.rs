// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Builder phases. Transitions only move forward.

use crate::error::PhaseError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Declaring,
    PreconditionsCommitted,
    Applying,
    ApplicationsCommitted,
    Asserted,
}

impl Phase {
    /// Fails unless the current phase is one of `allowed`.
    pub fn require(self, operation: &'static str, allowed: &[Phase]) -> Result<(), PhaseError> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(PhaseError::OutOfOrder { operation, phase: self })
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Declaring => "Declaring",
            Phase::PreconditionsCommitted => "PreconditionsCommitted",
            Phase::Applying => "Applying",
            Phase::ApplicationsCommitted => "ApplicationsCommitted",
            Phase::Asserted => "Asserted",
        })
    }
}
