// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Vector generators, grouped by the VM behaviour they pin down.

pub mod address_resolution;
pub mod chaos_state;
pub mod nonce;
pub mod randomness;

use crate::runner::VectorSpec;
use serde::Serialize;
use tvx_core::codec::serialize_params;
use tvx_core::error::StoreError;
use tvx_core::types::message::MessageDefaults;

pub const FUNDS: u64 = 1_000_000_000_000;

/// Gas fields shared by every suite.
pub fn defaults() -> MessageDefaults {
    MessageDefaults::new(1_000_000_000, 1u64, 200u64)
}

/// Method parameters in the canonical codec.
pub fn params<T: Serialize>(value: &T) -> tvx_core::Result<Vec<u8>> {
    Ok(serialize_params(value).map_err(StoreError::from)?)
}

pub fn all() -> Vec<VectorSpec> {
    [
        address_resolution::VECTORS,
        nonce::VECTORS,
        randomness::VECTORS,
        chaos_state::VECTORS,
    ]
    .concat()
}
