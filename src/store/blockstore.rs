// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block storage backends.
//!
//! `SharedBlockstore` holds fixture blocks read concurrently by many builder
//! sessions. Each session writes into its own `SessionStore` overlay, so no
//! session ever observes another session's writes.

use crate::cid::Cid;
use crate::store::block::Block;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub trait Blockstore {
    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>>;

    /// Stores bytes under a cid the caller has already verified.
    fn put_keyed(&mut self, cid: Cid, bytes: Arc<[u8]>);

    fn has(&self, cid: &Cid) -> bool {
        self.get(cid).is_some()
    }

    fn put(&mut self, block: &Block) -> Cid {
        let bytes = block.encode();
        let cid = Cid::of(&bytes);
        self.put_keyed(cid, bytes.into());
        cid
    }
}

impl<B: Blockstore + ?Sized> Blockstore for &mut B {
    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>> {
        (**self).get(cid)
    }

    fn put_keyed(&mut self, cid: Cid, bytes: Arc<[u8]>) {
        (**self).put_keyed(cid, bytes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBlockstore {
    blocks: FxHashMap<Cid, Arc<[u8]>>,
}

impl MemoryBlockstore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Blockstore for MemoryBlockstore {
    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>> {
        self.blocks.get(cid).cloned()
    }

    fn put_keyed(&mut self, cid: Cid, bytes: Arc<[u8]>) {
        self.blocks.entry(cid).or_insert(bytes);
    }
}

/// Thread-safe block pool for fixtures shared across sessions.
///
/// Blocks are immutable once inserted; inserting never changes what an
/// existing cid resolves to.
#[derive(Debug, Clone, Default)]
pub struct SharedBlockstore {
    inner: Arc<RwLock<MemoryBlockstore>>,
}

impl SharedBlockstore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, block: &Block) -> Cid {
        self.inner.write().put(block)
    }

    /// Opens an isolated session over this pool.
    pub fn session(&self) -> SessionStore {
        SessionStore::over(self.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Blockstore for SharedBlockstore {
    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>> {
        self.inner.read().get(cid)
    }

    fn put_keyed(&mut self, cid: Cid, bytes: Arc<[u8]>) {
        self.inner.write().put_keyed(cid, bytes)
    }
}

/// Copy-on-write overlay: reads fall through to the shared base, writes stay local.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    base: Option<SharedBlockstore>,
    local: MemoryBlockstore,
}

impl SessionStore {
    /// A session with no shared fixtures.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn over(base: SharedBlockstore) -> Self {
        Self { base: Some(base), local: MemoryBlockstore::new() }
    }

    /// Number of blocks written by this session.
    pub fn local_len(&self) -> usize {
        self.local.len()
    }
}

impl Blockstore for SessionStore {
    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>> {
        self.local
            .get(cid)
            .or_else(|| self.base.as_ref().and_then(|base| base.get(cid)))
    }

    fn put_keyed(&mut self, cid: Cid, bytes: Arc<[u8]>) {
        if self.base.as_ref().map_or(false, |base| base.has(&cid)) {
            return;
        }
        self.local.put_keyed(cid, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_writes_are_private() {
        let shared = SharedBlockstore::new();
        let fixture = shared.insert(&Block::new(Vec::new(), b"fixture".to_vec()));

        let mut a = shared.session();
        let b = shared.session();
        let written = a.put(&Block::new(Vec::new(), b"session a".to_vec()));

        assert!(a.has(&fixture));
        assert!(b.has(&fixture));
        assert!(a.has(&written));
        assert!(!b.has(&written));
        assert!(!shared.has(&written));
    }

    #[test]
    fn test_fixture_blocks_not_duplicated_locally() {
        let shared = SharedBlockstore::new();
        let block = Block::new(Vec::new(), b"x".to_vec());
        shared.insert(&block);
        let mut session = shared.session();
        session.put(&block);
        assert_eq!(session.local_len(), 0);
    }
}
