// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block framing.
//!
//! ```text
//! [u32 LE] link count
//! [32 bytes] * link count   cids referenced by the payload
//! [..]      payload
//! ```
//!
//! The identifier of a block is the BLAKE3 digest of the whole frame.

use crate::cid::Cid;
use crate::error::CorruptArchive;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Values that reference other blocks.
///
/// Anything stored inside a [`crate::CanonicalStore`] reports its links so
/// snapshots carry the referenced blocks along with the trie.
pub trait Linked {
    fn links(&self) -> Vec<Cid> {
        Vec::new()
    }
}

impl Linked for Vec<u8> {}
impl Linked for u64 {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub links: Vec<Cid>,
    pub payload: Vec<u8>,
}

impl Block {
    pub fn new(links: Vec<Cid>, payload: Vec<u8>) -> Self {
        Self { links, payload }
    }

    /// A block with no links and no payload. Head of actors without state.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.links.len() * Cid::LEN + self.payload.len());
        out.extend_from_slice(&(self.links.len() as u32).to_le_bytes());
        for link in &self.links {
            out.extend_from_slice(link.as_bytes());
        }
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn cid(&self) -> Cid {
        Cid::of(&self.encode())
    }

    /// Parses a frame. `cid` only labels errors.
    pub fn decode(cid: &Cid, bytes: &[u8]) -> Result<Self, CorruptArchive> {
        let malformed = |reason: &str| CorruptArchive::MalformedBlock { cid: *cid, reason: reason.to_string() };

        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| malformed("missing link count"))? as usize;
        if count.saturating_mul(Cid::LEN) > bytes.len() - 4 {
            return Err(malformed("link count exceeds block length"));
        }

        let mut links = Vec::with_capacity(count);
        for _ in 0..count {
            let mut link = [0u8; Cid::LEN];
            cursor.read_exact(&mut link).map_err(|_| malformed("truncated link"))?;
            links.push(Cid(link));
        }

        let payload = bytes[cursor.position() as usize..].to_vec();
        Ok(Self { links, payload })
    }
}
