// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! tvx-core: deterministic conformance test vectors over a canonical,
//! content-addressed state tree.
//!
//! A vector is authored in phases (declare actors, commit, append messages,
//! apply through a VM, assert) and persisted as a structured document whose
//! embedded archive reproduces the exact pre- and post-state trees.

pub mod config;
pub mod error;
pub mod cid;
pub mod codec;
pub mod types;
pub mod store;
pub mod state;
pub mod schema;
pub mod driver;
pub mod builder;
pub mod assert;

pub use assert::{AssertionEngine, Predicate, ReceiptCheck};
pub use builder::{Applied, Builder, Phase};
pub use cid::Cid;
pub use config::SessionConfig;
pub use driver::{ApplyOutcome, ApplyRequest, CancelToken, ExecutionDriver, Vm};
pub use error::{BuilderError, Result};
pub use schema::{Metadata, Vector};
pub use state::StateTree;
pub use store::{Archive, Blockstore, CanonicalStore, SessionStore, SharedBlockstore};

#[cfg(test)]
mod tests;
