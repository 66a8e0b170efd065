// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants and per-session settings.

use crate::types::message::MessageDefaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bits of the key hash consumed per trie level.
pub const HAMT_BIT_WIDTH: u32 = 5;

/// Entries held inline in one trie slot before it splits into a child node.
pub const HAMT_BUCKET_SIZE: usize = 3;

pub const ARCHIVE_MAGIC: &[u8; 4] = b"TVXA";
pub const ARCHIVE_VERSION: u32 = 1;

/// Version written into every state-root block.
pub const STATE_TREE_VERSION: u32 = 1;

pub const VECTOR_FORMAT_VERSION: u32 = 1;
pub const VECTOR_CLASS: &str = "message";

/// Settings for one builder session.
///
/// Passed explicitly into each [`crate::Builder`]; there is no process-wide default state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Gas fields applied to any message that omits them.
    pub defaults: MessageDefaults,
    /// Epoch at which the preconditions are taken and every message is applied.
    pub epoch: i64,
    /// Upper bound on the VM call made by `commit_applies`.
    pub deadline: Option<Duration>,
    /// Stop assertion evaluation at the first failing predicate.
    pub fail_fast: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            defaults: MessageDefaults::default(),
            epoch: 0,
            deadline: None,
            fail_fast: false,
        }
    }
}
