// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Message receipts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit outcome of an applied message. Numbering follows the Filecoin exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExitCode(pub u32);

impl ExitCode {
    pub const OK: ExitCode = ExitCode(0);
    pub const SYS_ERR_SENDER_INVALID: ExitCode = ExitCode(1);
    pub const SYS_ERR_SENDER_STATE_INVALID: ExitCode = ExitCode(2);
    pub const SYS_ERR_INVALID_METHOD: ExitCode = ExitCode(3);
    pub const SYS_ERR_INVALID_RECEIVER: ExitCode = ExitCode(5);
    pub const SYS_ERR_INSUFFICIENT_FUNDS: ExitCode = ExitCode(6);
    pub const SYS_ERR_OUT_OF_GAS: ExitCode = ExitCode(7);
    pub const SYS_ERR_FORBIDDEN: ExitCode = ExitCode(8);
    pub const SYS_ERR_ILLEGAL_ACTOR: ExitCode = ExitCode(9);
    pub const SYS_ERR_ILLEGAL_ARGUMENT: ExitCode = ExitCode(10);
    pub const ERR_ILLEGAL_ARGUMENT: ExitCode = ExitCode(16);
    pub const ERR_NOT_FOUND: ExitCode = ExitCode(17);
    pub const ERR_FORBIDDEN: ExitCode = ExitCode(18);
    pub const ERR_INSUFFICIENT_FUNDS: ExitCode = ExitCode(19);
    pub const ERR_ILLEGAL_STATE: ExitCode = ExitCode(20);
    pub const ERR_SERIALIZATION: ExitCode = ExitCode(21);

    pub fn is_success(self) -> bool {
        self == ExitCode::OK
    }

    fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "Ok",
            1 => "SysErrSenderInvalid",
            2 => "SysErrSenderStateInvalid",
            3 => "SysErrInvalidMethod",
            5 => "SysErrInvalidReceiver",
            6 => "SysErrInsufficientFunds",
            7 => "SysErrOutOfGas",
            8 => "SysErrForbidden",
            9 => "SysErrIllegalActor",
            10 => "SysErrIllegalArgument",
            16 => "ErrIllegalArgument",
            17 => "ErrNotFound",
            18 => "ErrForbidden",
            19 => "ErrInsufficientFunds",
            20 => "ErrIllegalState",
            21 => "ErrSerialization",
            _ => return None,
        })
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "ExitCode({})", self.0),
        }
    }
}

/// Outcome of one applied message. Produced once per message, in message order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub exit_code: ExitCode,
    pub return_data: Vec<u8>,
    pub gas_used: i64,
}

impl Receipt {
    pub fn new(exit_code: ExitCode, return_data: Vec<u8>, gas_used: i64) -> Self {
        Self { exit_code, return_data, gas_used }
    }

    /// Receipt for a message rejected before execution.
    pub fn failed(exit_code: ExitCode, gas_used: i64) -> Self {
        Self::new(exit_code, Vec::new(), gas_used)
    }
}
