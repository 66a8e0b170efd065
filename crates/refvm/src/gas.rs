// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Gas schedule and metering.

use crate::error::{ActorError, ActorResult};
use tvx_core::types::receipt::ExitCode;

/// Charged before anything else for carrying the message.
pub const MESSAGE_BASE: i64 = 1_000;
pub const PER_PARAM_BYTE: i64 = 10;
pub const METHOD_INVOCATION: i64 = 500;
pub const VALUE_TRANSFER: i64 = 600;
pub const CREATE_ACTOR: i64 = 2_000;
pub const STATE_READ: i64 = 200;
pub const STATE_WRITE: i64 = 400;

/// Gas to include a message with `params_len` bytes of parameters.
pub fn inclusion_cost(params_len: usize) -> i64 {
    MESSAGE_BASE.saturating_add(PER_PARAM_BYTE.saturating_mul(params_len as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasTracker {
    limit: i64,
    used: i64,
}

impl GasTracker {
    pub fn new(limit: i64, used: i64) -> Self {
        Self { limit, used }
    }

    pub fn charge(&mut self, amount: i64, what: &str) -> ActorResult<()> {
        let left = self.limit - self.used;
        if amount > left {
            self.used = self.limit;
            return Err(ActorError::exit(
                ExitCode::SYS_ERR_OUT_OF_GAS,
                format!("{} needs {} gas, {} left", what, amount, left),
            ));
        }
        self.used += amount;
        Ok(())
    }

    pub fn used(&self) -> i64 {
        self.used
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_pins_to_limit() {
        let mut gas = GasTracker::new(1_000, 900);
        assert!(gas.charge(100, "read").is_ok());
        assert_eq!(gas.used(), 1_000);
        match gas.charge(1, "write") {
            Err(ActorError::Exit { code, .. }) => assert_eq!(code, ExitCode::SYS_ERR_OUT_OF_GAS),
            other => panic!("expected out of gas, got {:?}", other),
        }
        assert_eq!(gas.used(), gas.limit());
    }
}
