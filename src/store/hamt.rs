// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical hash-array-mapped trie.
//!
//! Placement is a function of key content only:
//! - the BLAKE3 digest of a key, read MSB first in 5-bit groups, picks the
//!   slot at each level;
//! - a slot whose key set has at most [`HAMT_BUCKET_SIZE`] members is a bucket
//!   sorted by key, otherwise it links to a child node;
//! - deletes collapse any child that falls back to bucket size.
//!
//! So the trie shape, every encoded node block, and the root cid depend only
//! on the current `{key: value}` contents, never on mutation history.
//! [`CanonicalStore::load`] checks all of these rules and rejects violations
//! instead of repairing them.

use crate::cid::Cid;
use crate::codec;
use crate::config::{HAMT_BIT_WIDTH, HAMT_BUCKET_SIZE};
use crate::error::{CorruptArchive, StoreError};
use crate::store::archive::Archive;
use crate::store::block::{Block, Linked};
use crate::store::blockstore::{Blockstore, MemoryBlockstore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

type KeyHash = [u8; 32];

const HASH_BITS: usize = 256;
const MAX_DEPTH: usize = HASH_BITS / HAMT_BIT_WIDTH as usize;

fn key_hash(key: &[u8]) -> KeyHash {
    *blake3::hash(key).as_bytes()
}

/// Slot index of `hash` at `depth`.
fn slot_index(hash: &KeyHash, depth: usize) -> Result<u32, StoreError> {
    if depth >= MAX_DEPTH {
        return Err(StoreError::HashDepthExhausted(depth));
    }
    let start = depth * HAMT_BIT_WIDTH as usize;
    let mut index = 0u32;
    for bit in start..start + HAMT_BIT_WIDTH as usize {
        let set = (hash[bit / 8] >> (7 - bit % 8)) & 1;
        index = (index << 1) | set as u32;
    }
    Ok(index)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pointer<V> {
    /// Sorted by key, 1..=HAMT_BUCKET_SIZE entries.
    Bucket(Vec<(Vec<u8>, V)>),
    Link(Box<Node<V>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node<V> {
    bitmap: u32,
    pointers: Vec<Pointer<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self { bitmap: 0, pointers: Vec::new() }
    }
}

// Payload layouts. Child cids are the leading block links, in pointer order.
#[derive(Serialize)]
struct NodeOut<'a, V> {
    bitmap: u32,
    pointers: Vec<PointerOut<'a, V>>,
}

#[derive(Serialize)]
enum PointerOut<'a, V> {
    Bucket(&'a [(Vec<u8>, V)]),
    Link,
}

#[derive(Deserialize)]
struct NodeIn<V> {
    bitmap: u32,
    pointers: Vec<PointerIn<V>>,
}

#[derive(Deserialize)]
enum PointerIn<V> {
    Bucket(Vec<(Vec<u8>, V)>),
    Link,
}

impl<V> Node<V> {
    fn position(&self, index: u32) -> usize {
        (self.bitmap & ((1u32 << index) - 1)).count_ones() as usize
    }

    fn has(&self, index: u32) -> bool {
        self.bitmap & (1u32 << index) != 0
    }

    fn entry_count(&self) -> usize {
        self.pointers
            .iter()
            .map(|p| match p {
                Pointer::Bucket(entries) => entries.len(),
                Pointer::Link(child) => child.entry_count(),
            })
            .sum()
    }

    fn has_links(&self) -> bool {
        self.pointers.iter().any(|p| matches!(p, Pointer::Link(_)))
    }

    /// Moves every entry of a link-free node into one sorted bucket.
    fn into_bucket(self) -> Vec<(Vec<u8>, V)> {
        let mut entries: Vec<(Vec<u8>, V)> = self
            .pointers
            .into_iter()
            .flat_map(|p| match p {
                Pointer::Bucket(entries) => entries,
                Pointer::Link(_) => Vec::new(),
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn get(&self, hash: &KeyHash, key: &[u8], depth: usize) -> Result<Option<&V>, StoreError> {
        let index = slot_index(hash, depth)?;
        if !self.has(index) {
            return Ok(None);
        }
        match &self.pointers[self.position(index)] {
            Pointer::Bucket(entries) => Ok(entries
                .binary_search_by(|(k, _)| k.as_slice().cmp(key))
                .ok()
                .map(|i| &entries[i].1)),
            Pointer::Link(child) => child.get(hash, key, depth + 1),
        }
    }
}

impl<V: Clone> Node<V> {
    fn put(&mut self, hash: &KeyHash, key: Vec<u8>, value: V, depth: usize) -> Result<Option<V>, StoreError> {
        let index = slot_index(hash, depth)?;
        let pos = self.position(index);

        if !self.has(index) {
            self.bitmap |= 1u32 << index;
            self.pointers.insert(pos, Pointer::Bucket(vec![(key, value)]));
            return Ok(None);
        }

        match &mut self.pointers[pos] {
            Pointer::Link(child) => child.put(hash, key, value, depth + 1),
            Pointer::Bucket(entries) => {
                match entries.binary_search_by(|(k, _)| k.as_slice().cmp(&key)) {
                    Ok(i) => Ok(Some(std::mem::replace(&mut entries[i].1, value))),
                    Err(i) if entries.len() < HAMT_BUCKET_SIZE => {
                        entries.insert(i, (key, value));
                        Ok(None)
                    }
                    Err(_) => {
                        let mut child = Node::default();
                        for (k, v) in std::mem::take(entries) {
                            child.put(&key_hash(&k), k, v, depth + 1)?;
                        }
                        child.put(hash, key, value, depth + 1)?;
                        self.pointers[pos] = Pointer::Link(Box::new(child));
                        Ok(None)
                    }
                }
            }
        }
    }

    fn delete(&mut self, hash: &KeyHash, key: &[u8], depth: usize) -> Result<Option<V>, StoreError> {
        let index = slot_index(hash, depth)?;
        if !self.has(index) {
            return Ok(None);
        }
        let pos = self.position(index);

        let removed = match &mut self.pointers[pos] {
            Pointer::Bucket(entries) => {
                match entries.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
                    Ok(i) => Some(entries.remove(i).1),
                    Err(_) => None,
                }
            }
            Pointer::Link(child) => child.delete(hash, key, depth + 1)?,
        };
        if removed.is_none() {
            return Ok(None);
        }

        match &mut self.pointers[pos] {
            Pointer::Bucket(entries) if entries.is_empty() => {
                self.pointers.remove(pos);
                self.bitmap &= !(1u32 << index);
            }
            Pointer::Link(child) if !child.has_links() && child.entry_count() <= HAMT_BUCKET_SIZE => {
                let child = std::mem::take(child.as_mut());
                self.pointers[pos] = Pointer::Bucket(child.into_bucket());
            }
            _ => {}
        }
        Ok(removed)
    }
}

impl<V: Serialize + Linked> Node<V> {
    /// Encodes this subtree bottom-up, handing each block to `sink`.
    fn write(&self, sink: &mut dyn FnMut(Cid, Vec<u8>)) -> Result<Cid, StoreError> {
        let mut links = Vec::new();
        let mut value_links = Vec::new();
        let mut pointers = Vec::with_capacity(self.pointers.len());

        for pointer in &self.pointers {
            match pointer {
                Pointer::Link(child) => {
                    links.push(child.write(sink)?);
                    pointers.push(PointerOut::Link);
                }
                Pointer::Bucket(entries) => {
                    for (_, value) in entries {
                        value_links.extend(value.links());
                    }
                    pointers.push(PointerOut::Bucket(entries));
                }
            }
        }
        links.extend(value_links);

        let payload = codec::serialize_params(&NodeOut { bitmap: self.bitmap, pointers })?;
        let bytes = Block::new(links, payload).encode();
        let cid = Cid::of(&bytes);
        sink(cid, bytes);
        Ok(cid)
    }
}

impl<V: DeserializeOwned + Linked> Node<V> {
    /// Reads and validates the node at `cid`. `path` holds the slot indices
    /// taken from the root, one per level above this node.
    fn read<B: Blockstore + ?Sized>(store: &B, cid: &Cid, path: &mut Vec<u32>) -> Result<(Self, usize), StoreError> {
        let depth = path.len();
        let bytes = store.get(cid).ok_or(CorruptArchive::MissingBlock { cid: *cid })?;
        if Cid::of(&bytes) != *cid {
            return Err(CorruptArchive::HashMismatch { cid: *cid }.into());
        }
        let block = Block::decode(cid, &bytes)?;
        let node: NodeIn<V> = codec::deserialize_params(&block.payload)
            .map_err(|e| CorruptArchive::MalformedBlock { cid: *cid, reason: e.to_string() })?;
        let non_canonical = |reason: String| -> StoreError { CorruptArchive::NonCanonical { cid: *cid, reason }.into() };

        if node.bitmap.count_ones() as usize != node.pointers.len() {
            return Err(non_canonical(format!(
                "bitmap has {} slots but node has {} pointers",
                node.bitmap.count_ones(),
                node.pointers.len()
            )));
        }
        if depth > 0 && node.pointers.is_empty() {
            return Err(non_canonical("empty child node".to_string()));
        }

        let child_count = node.pointers.iter().filter(|p| matches!(p, PointerIn::Link)).count();
        if block.links.len() < child_count {
            return Err(CorruptArchive::MalformedBlock {
                cid: *cid,
                reason: format!("{} child pointers but {} links", child_count, block.links.len()),
            }
            .into());
        }
        let mut children = block.links[..child_count].iter();
        let mut value_links = Vec::new();

        let slots = (0..(1u32 << HAMT_BIT_WIDTH)).filter(|i| node.bitmap & (1u32 << i) != 0);
        let mut pointers = Vec::with_capacity(node.pointers.len());
        let mut count = 0usize;

        for (index, pointer) in slots.zip(node.pointers) {
            match pointer {
                PointerIn::Link => {
                    let child_cid = children.next().ok_or_else(|| non_canonical("missing child link".into()))?;
                    path.push(index);
                    let (child, child_len) = Node::read(store, child_cid, path)?;
                    path.pop();
                    if child_len <= HAMT_BUCKET_SIZE && !child.has_links() {
                        return Err(non_canonical(format!(
                            "slot {} links a child holding only {} entries",
                            index, child_len
                        )));
                    }
                    count += child_len;
                    pointers.push(Pointer::Link(Box::new(child)));
                }
                PointerIn::Bucket(entries) => {
                    if entries.is_empty() || entries.len() > HAMT_BUCKET_SIZE {
                        return Err(non_canonical(format!("slot {} bucket holds {} entries", index, entries.len())));
                    }
                    if entries.windows(2).any(|w| w[0].0 >= w[1].0) {
                        return Err(non_canonical(format!("slot {} bucket is not sorted by key", index)));
                    }
                    for (key, value) in &entries {
                        let hash = key_hash(key);
                        for (level, expected) in path.iter().chain(std::iter::once(&index)).enumerate() {
                            if slot_index(&hash, level)? != *expected {
                                return Err(non_canonical(format!(
                                    "key {} stored at level {} slot {} but hashes elsewhere",
                                    hex::encode(key),
                                    depth,
                                    index
                                )));
                            }
                        }
                        value_links.extend(value.links());
                    }
                    count += entries.len();
                    pointers.push(Pointer::Bucket(entries));
                }
            }
        }

        if block.links[child_count..] != value_links[..] {
            return Err(CorruptArchive::MalformedBlock {
                cid: *cid,
                reason: "value links do not match the block link list".to_string(),
            }
            .into());
        }

        Ok((Node { bitmap: node.bitmap, pointers }, count))
    }
}

/// Content-addressed map with a history-independent root.
///
/// The map lives in memory; [`flush`](Self::flush) writes its node blocks
/// into a [`Blockstore`] and [`load`](Self::load) reads them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalStore<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for CanonicalStore<V> {
    fn default() -> Self {
        Self { root: Node::default(), len: 0 }
    }
}

impl<V> CanonicalStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A missing key is `Ok(None)`, not an error.
    pub fn get(&self, key: &[u8]) -> Result<Option<&V>, StoreError> {
        self.root.get(&key_hash(key), key, 0)
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Entries in trie order. The order depends only on the contents.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter { stack: vec![self.root.pointers.iter()], bucket: (&[] as &[(Vec<u8>, V)]).iter() }
    }

    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &V) -> Result<(), E>,
    {
        for (key, value) in self.iter() {
            f(key, value)?;
        }
        Ok(())
    }
}

impl<V: Clone> CanonicalStore<V> {
    /// Inserts or replaces, returning the previous value.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: V) -> Result<Option<V>, StoreError> {
        let key = key.into();
        let previous = self.root.put(&key_hash(&key), key, value, 0)?;
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Removes a key, leaving the trie exactly as if it had never been inserted.
    pub fn delete(&mut self, key: &[u8]) -> Result<Option<V>, StoreError> {
        let removed = self.root.delete(&key_hash(key), key, 0)?;
        if removed.is_some() {
            self.len -= 1;
        }
        Ok(removed)
    }
}

impl<V: Serialize + Linked> CanonicalStore<V> {
    /// Identifier of the current contents, computed without storing anything.
    pub fn root(&self) -> Result<Cid, StoreError> {
        self.root.write(&mut |_, _| {})
    }

    /// Writes every node block into `store` and returns the root.
    pub fn flush<B: Blockstore + ?Sized>(&self, store: &mut B) -> Result<Cid, StoreError> {
        self.root.write(&mut |cid, bytes| store.put_keyed(cid, bytes.into()))
    }

    /// Flushes into `store` and captures everything reachable from the root,
    /// including blocks referenced by values.
    pub fn snapshot<B: Blockstore + ?Sized>(&self, store: &mut B) -> Result<Archive, StoreError> {
        let root = self.flush(store)?;
        Ok(Archive::snapshot(&*store, &[root])?)
    }
}

impl<V: DeserializeOwned + Linked> CanonicalStore<V> {
    /// Reads the trie at `root`, validating canonical form.
    pub fn load<B: Blockstore + ?Sized>(store: &B, root: &Cid) -> Result<Self, StoreError> {
        let (node, len) = Node::read(store, root, &mut Vec::new())?;
        debug!(root = %root, entries = len, "Loaded canonical store");
        Ok(Self { root: node, len })
    }

    /// Loads the first root of a self-contained archive.
    pub fn from_archive(archive: &Archive) -> Result<Self, StoreError> {
        let root = archive
            .roots()
            .first()
            .copied()
            .ok_or(CorruptArchive::Truncated)?;
        let mut store = MemoryBlockstore::new();
        archive.load_into(&mut store)?;
        Self::load(&store, &root)
    }
}

/// Lazy iterator over `(key, value)` pairs in trie order.
pub struct Iter<'a, V> {
    stack: Vec<std::slice::Iter<'a, Pointer<V>>>,
    bucket: std::slice::Iter<'a, (Vec<u8>, V)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.bucket.next() {
                return Some((key.as_slice(), value));
            }
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(Pointer::Bucket(entries)) => self.bucket = entries.iter(),
                Some(Pointer::Link(child)) => self.stack.push(child.pointers.iter()),
            }
        }
    }
}
