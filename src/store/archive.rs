// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Self-contained block archives.
//!
//! Binary layout (all integers little-endian):
//! ```text
//! [4]  magic "TVXA"
//! [u32] format version
//! [u32] root count, then 32-byte root cids
//! [u32] block count, then per block: [32] cid, [u32] length, bytes
//! [u64] CRC-64 of everything above
//! ```
//!
//! Blocks appear in depth-first pre-order from the roots, each once, so the
//! same roots over the same blocks always produce the same bytes.

use crate::cid::Cid;
use crate::config::{ARCHIVE_MAGIC, ARCHIVE_VERSION};
use crate::error::CorruptArchive;
use crate::store::block::Block;
use crate::store::blockstore::{Blockstore, MemoryBlockstore};
use byteorder::{LittleEndian, ReadBytesExt};
use crc64fast::Digest;
use rustc_hash::FxHashSet;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, PartialEq, Eq)]
pub struct Archive {
    roots: Vec<Cid>,
    blocks: Vec<(Cid, Arc<[u8]>)>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("roots", &self.roots)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

fn truncated(_: io::Error) -> CorruptArchive {
    CorruptArchive::Truncated
}

impl Archive {
    /// Captures every block reachable from `roots`.
    ///
    /// Fails with `MissingBlock` if the store does not hold the full closure.
    pub fn snapshot<B: Blockstore + ?Sized>(store: &B, roots: &[Cid]) -> Result<Self, CorruptArchive> {
        let mut seen = FxHashSet::default();
        let mut blocks = Vec::new();
        let mut stack: Vec<Cid> = roots.iter().rev().copied().collect();

        while let Some(cid) = stack.pop() {
            if !seen.insert(cid) {
                continue;
            }
            let bytes = store.get(&cid).ok_or(CorruptArchive::MissingBlock { cid })?;
            let block = Block::decode(&cid, &bytes)?;
            stack.extend(block.links.iter().rev().copied());
            blocks.push((cid, bytes));
        }

        debug!(roots = roots.len(), blocks = blocks.len(), "Archive snapshot");
        Ok(Self { roots: roots.to_vec(), blocks })
    }

    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&Cid, &[u8])> {
        self.blocks.iter().map(|(cid, bytes)| (cid, &bytes[..]))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains_root(&self, cid: &Cid) -> bool {
        self.roots.contains(cid)
    }

    /// Checks block hashes, that every declared root is present and that
    /// every link resolves inside the archive.
    pub fn verify(&self) -> Result<(), CorruptArchive> {
        let mut present = FxHashSet::default();
        for (cid, bytes) in &self.blocks {
            if Cid::of(bytes) != *cid {
                return Err(CorruptArchive::HashMismatch { cid: *cid });
            }
            present.insert(*cid);
        }
        for root in &self.roots {
            if !present.contains(root) {
                return Err(CorruptArchive::MissingBlock { cid: *root });
            }
        }
        for (cid, bytes) in &self.blocks {
            for link in Block::decode(cid, bytes)?.links {
                if !present.contains(&link) {
                    return Err(CorruptArchive::MissingBlock { cid: link });
                }
            }
        }
        Ok(())
    }

    /// Fails unless `root` is one of the declared roots.
    pub fn require_root(&self, root: &Cid) -> Result<(), CorruptArchive> {
        if self.contains_root(root) {
            Ok(())
        } else {
            Err(CorruptArchive::RootNotIncluded { cid: *root })
        }
    }

    /// Copies every block into `store`, verifying the archive first.
    pub fn load_into<B: Blockstore + ?Sized>(&self, store: &mut B) -> Result<(), CorruptArchive> {
        self.verify()?;
        for (cid, bytes) in &self.blocks {
            store.put_keyed(*cid, bytes.clone());
        }
        debug!(blocks = self.blocks.len(), "Archive loaded");
        Ok(())
    }

    pub fn into_store(self) -> Result<MemoryBlockstore, CorruptArchive> {
        let mut store = MemoryBlockstore::new();
        self.load_into(&mut store)?;
        Ok(store)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(ARCHIVE_MAGIC);
        out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.roots.len() as u32).to_le_bytes());
        for root in &self.roots {
            out.extend_from_slice(root.as_bytes());
        }
        out.extend_from_slice(&(self.blocks.len() as u32).to_le_bytes());
        for (cid, bytes) in &self.blocks {
            out.extend_from_slice(cid.as_bytes());
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        }

        let mut digest = Digest::new();
        digest.write(&out);
        out.extend_from_slice(&digest.sum64().to_le_bytes());
        out
    }

    /// Parses and fully verifies an archive. Nothing is repaired.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CorruptArchive> {
        if data.len() < ARCHIVE_MAGIC.len() || &data[..ARCHIVE_MAGIC.len()] != ARCHIVE_MAGIC {
            return Err(CorruptArchive::BadMagic);
        }
        if data.len() < ARCHIVE_MAGIC.len() + 4 + 8 {
            return Err(CorruptArchive::Truncated);
        }

        let (body, trailer) = data.split_at(data.len() - 8);
        let mut rdr = Cursor::new(body);
        rdr.set_position(ARCHIVE_MAGIC.len() as u64);

        let version = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        if version != ARCHIVE_VERSION {
            return Err(CorruptArchive::UnsupportedVersion(version));
        }

        let expected = u64::from_le_bytes(trailer.try_into().map_err(|_| CorruptArchive::Truncated)?);
        let mut digest = Digest::new();
        digest.write(body);
        let found = digest.sum64();
        if expected != found {
            return Err(CorruptArchive::ChecksumMismatch { expected, found });
        }

        let root_count = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        let mut roots = Vec::new();
        for _ in 0..root_count {
            roots.push(read_cid(&mut rdr)?);
        }

        let block_count = rdr.read_u32::<LittleEndian>().map_err(truncated)?;
        let mut blocks = Vec::new();
        for _ in 0..block_count {
            let cid = read_cid(&mut rdr)?;
            let len = rdr.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            let remaining = body.len() - rdr.position() as usize;
            if len > remaining {
                return Err(CorruptArchive::Truncated);
            }
            let mut bytes = vec![0u8; len];
            rdr.read_exact(&mut bytes).map_err(truncated)?;
            blocks.push((cid, Arc::from(bytes)));
        }

        let consumed = rdr.position() as usize;
        if consumed != body.len() {
            return Err(CorruptArchive::TrailingBytes(body.len() - consumed));
        }

        let archive = Self { roots, blocks };
        archive.verify()?;
        Ok(archive)
    }
}

fn read_cid(rdr: &mut Cursor<&[u8]>) -> Result<Cid, CorruptArchive> {
    let mut out = [0u8; Cid::LEN];
    rdr.read_exact(&mut out).map_err(truncated)?;
    Ok(Cid(out))
}
