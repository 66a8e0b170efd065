// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use thiserror::Error;
use tvx_core::error::{StoreError, VmFault};
use tvx_core::types::receipt::ExitCode;

/// Why a single message stopped.
///
/// `Exit` becomes that message's receipt and the VM moves on. `Fatal` aborts
/// the whole application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    #[error("{code}: {msg}")]
    Exit { code: ExitCode, msg: String },
    #[error(transparent)]
    Fatal(#[from] VmFault),
}

impl ActorError {
    pub fn exit(code: ExitCode, msg: impl Into<String>) -> Self {
        ActorError::Exit { code, msg: msg.into() }
    }
}

impl From<StoreError> for ActorError {
    fn from(e: StoreError) -> Self {
        ActorError::Fatal(VmFault::Rejected(e.to_string()))
    }
}

pub type ActorResult<T> = std::result::Result<T, ActorError>;
