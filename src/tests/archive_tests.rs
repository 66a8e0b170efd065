// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::cid::Cid;
use crate::error::CorruptArchive;
use crate::state::tree::StateTree;
use crate::store::archive::Archive;
use crate::store::block::Block;
use crate::store::blockstore::{Blockstore, MemoryBlockstore};
use crc64fast::Digest;

fn reseal(body: &[u8]) -> Vec<u8> {
    let mut digest = Digest::new();
    digest.write(body);
    let mut out = body.to_vec();
    out.extend_from_slice(&digest.sum64().to_le_bytes());
    out
}

fn body(bytes: &[u8]) -> Vec<u8> {
    bytes[..bytes.len() - 8].to_vec()
}

fn genesis_archive() -> (Archive, Cid) {
    let mut store = MemoryBlockstore::new();
    let tree = StateTree::genesis(&mut store).unwrap();
    let root = tree.flush(&mut store).unwrap();
    (Archive::snapshot(&store, &[root]).unwrap(), root)
}

/// Offset of the first block's payload bytes for a single-root archive.
const FIRST_BLOCK_BYTES: usize = 4 + 4 + 4 + 32 + 4 + 32 + 4;

#[test]
fn test_state_tree_survives_archive() {
    let (archive, root) = genesis_archive();
    let decoded = Archive::from_bytes(&archive.to_bytes()).unwrap();
    let store = decoded.into_store().unwrap();
    let tree = StateTree::load(&store, &root).unwrap();
    assert_eq!(tree.root().unwrap(), root);
}

#[test]
fn test_bad_magic() {
    let (archive, _) = genesis_archive();
    let mut bytes = archive.to_bytes();
    bytes[0] = b'X';
    assert_eq!(Archive::from_bytes(&bytes), Err(CorruptArchive::BadMagic));
    assert_eq!(Archive::from_bytes(b"TV"), Err(CorruptArchive::BadMagic));
}

#[test]
fn test_unsupported_version() {
    let (archive, _) = genesis_archive();
    let mut bytes = body(&archive.to_bytes());
    bytes[4..8].copy_from_slice(&9u32.to_le_bytes());
    assert_eq!(Archive::from_bytes(&reseal(&bytes)), Err(CorruptArchive::UnsupportedVersion(9)));
}

#[test]
fn test_checksum_mismatch() {
    let (archive, _) = genesis_archive();
    let mut bytes = archive.to_bytes();
    bytes[FIRST_BLOCK_BYTES] ^= 0xff;
    assert!(matches!(Archive::from_bytes(&bytes), Err(CorruptArchive::ChecksumMismatch { .. })));
}

#[test]
fn test_tampered_block_fails_hash_check() {
    let (archive, root) = genesis_archive();
    let mut bytes = body(&archive.to_bytes());
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let result = Archive::from_bytes(&reseal(&bytes));
    assert!(matches!(result, Err(CorruptArchive::HashMismatch { .. })));

    // The root block itself comes first.
    let mut bytes = body(&archive.to_bytes());
    bytes[FIRST_BLOCK_BYTES + 4] ^= 0x01;
    assert_eq!(Archive::from_bytes(&reseal(&bytes)), Err(CorruptArchive::HashMismatch { cid: root }));
}

#[test]
fn test_missing_referenced_block() {
    let mut store = MemoryBlockstore::new();
    let child = store.put(&Block::new(Vec::new(), b"child".to_vec()));
    let root = store.put(&Block::new(vec![child], b"parent".to_vec()));
    let archive = Archive::snapshot(&store, &[root]).unwrap();

    // Drop the trailing child block and fix up the block count.
    let mut bytes = body(&archive.to_bytes());
    let child_len = Block::new(Vec::new(), b"child".to_vec()).encode().len();
    bytes.truncate(bytes.len() - (32 + 4 + child_len));
    let count_at = 4 + 4 + 4 + 32;
    bytes[count_at..count_at + 4].copy_from_slice(&1u32.to_le_bytes());

    assert_eq!(Archive::from_bytes(&reseal(&bytes)), Err(CorruptArchive::MissingBlock { cid: child }));
}

#[test]
fn test_truncated_and_trailing() {
    let (archive, _) = genesis_archive();
    let full = body(&archive.to_bytes());

    let cut = &full[..full.len() - 3];
    assert_eq!(Archive::from_bytes(&reseal(cut)), Err(CorruptArchive::Truncated));

    let mut extra = full.clone();
    extra.extend_from_slice(&[0, 0]);
    assert_eq!(Archive::from_bytes(&reseal(&extra)), Err(CorruptArchive::TrailingBytes(2)));
}

#[test]
fn test_require_root() {
    let (archive, root) = genesis_archive();
    assert!(archive.require_root(&root).is_ok());
    let other = Cid::of(b"other");
    assert_eq!(archive.require_root(&other), Err(CorruptArchive::RootNotIncluded { cid: other }));
}
