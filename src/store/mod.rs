// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Content-addressed storage.
//!
//! Every block is framed (see [`block`]) so reachability can be walked
//! without knowing what the payload encodes.

pub mod block;
pub mod blockstore;
pub mod hamt;
pub mod archive;

pub use archive::Archive;
pub use block::{Block, Linked};
pub use blockstore::{Blockstore, MemoryBlockstore, SessionStore, SharedBlockstore};
pub use hamt::CanonicalStore;
