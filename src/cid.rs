// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Content identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// BLAKE3 digest of an encoded block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cid(pub [u8; 32]);

impl Cid {
    pub const LEN: usize = 32;

    /// Identifier of a raw block.
    pub fn of(block: &[u8]) -> Self {
        Cid(*blake3::hash(block).as_bytes())
    }

    /// Identifier of builtin actor code. Code is named, never stored as a block.
    pub fn builtin(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tvx/builtin/");
        hasher.update(name.as_bytes());
        Cid(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", hex::encode(&self.0[..8]))
    }
}

impl FromStr for Cid {
    type Err = hex::FromHexError;

    /// Lowercase hex only, so each cid has one text form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((index, c)) = s.char_indices().find(|(_, c)| c.is_ascii_uppercase()) {
            return Err(hex::FromHexError::InvalidHexCharacter { c, index });
        }
        let mut out = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Cid(out))
    }
}
