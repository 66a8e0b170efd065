// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical binary encoding for block payloads, method parameters and return values.
//!
//! bincode standard configuration: fixed field order, varint lengths, no padding.
//! The same value always encodes to the same bytes.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn serialize_params<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a value, rejecting trailing bytes.
pub fn deserialize_params<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let (value, read) = bincode::serde::decode_from_slice::<T, _>(bytes, bincode::config::standard())
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    if read != bytes.len() {
        return Err(CodecError::Decode(format!(
            "{} trailing bytes after value",
            bytes.len() - read
        )));
    }
    Ok(value)
}
