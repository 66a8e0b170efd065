// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.
//!
//! None of these are retried anywhere in the crate: a deterministic failure
//! reproduces identically, so each error returns to the immediate caller.

use crate::builder::Phase;
use crate::cid::Cid;
use crate::types::address::Address;
use crate::types::randomness::RandomnessKind;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Integrity violation found while reading an archive or walking a store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorruptArchive {
    #[error("Invalid magic bytes in archive header")]
    BadMagic,
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),
    #[error("Archive truncated")]
    Truncated,
    #[error("Archive has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("Checksum mismatch: expected {expected:#018x}, found {found:#018x}")]
    ChecksumMismatch { expected: u64, found: u64 },
    #[error("Block {cid} does not hash to its identifier")]
    HashMismatch { cid: Cid },
    #[error("Block {cid} is referenced but missing")]
    MissingBlock { cid: Cid },
    #[error("Block {cid} is malformed: {reason}")]
    MalformedBlock { cid: Cid, reason: String },
    #[error("Block {cid} is not in canonical form: {reason}")]
    NonCanonical { cid: Cid, reason: String },
    #[error("Root {cid} is not declared by the archive")]
    RootNotIncluded { cid: Cid },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Corrupt(#[from] CorruptArchive),
    #[error("Key hash exhausted at depth {0}")]
    HashDepthExhausted(usize),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failure to read or write the persisted vector document.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Missing or unknown fields, wrong JSON types, integers that overflow their declared width.
    #[error("Invalid vector document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported vector format version: {0}")]
    UnsupportedFormat(u32),
    #[error("Unsupported vector class: {0}")]
    UnsupportedClass(String),
    #[error("Field {field}: malformed blob: {reason}")]
    InvalidBlob { field: &'static str, reason: String },
    #[error("Field {field}: invalid integer {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("Field {field}: invalid address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("Field {field}: invalid cid {value:?}")]
    InvalidCid { field: &'static str, value: String },
    #[error("Archive decompression failed: {0}")]
    Decompression(io::Error),
    #[error(transparent)]
    Archive(#[from] CorruptArchive),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{messages} applied messages but {receipts} receipts")]
    ReceiptCountMismatch { messages: usize, receipts: usize },
    #[error("Declared state root {declared} does not match recomputed root {recomputed}")]
    RootMismatch { declared: Cid, recomputed: Cid },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Builder operation invoked out of order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error("{operation} is not permitted in phase {phase}")]
    OutOfOrder { operation: &'static str, phase: Phase },
    #[error("{operation} rejected: session halted after a failed {failed}")]
    Halted { operation: &'static str, failed: &'static str },
}

/// Invalid actor or message declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("Sender {0} is not a committed actor")]
    UnknownSender(Address),
    #[error("Message {index} has no {field} and no session default")]
    MissingGasField { index: usize, field: &'static str },
    #[error("Gas limit must be positive, got {0}")]
    NonPositiveGasLimit(i64),
    #[error("Actor head {0} is not present in the session store")]
    MissingHead(Cid),
    #[error("Address {0} is already declared")]
    DuplicateAddress(Address),
    #[error("Address {0} cannot be used as a robust actor address")]
    UnsupportedAddress(Address),
    #[error("Nonce sequence for {0} is exhausted")]
    NonceOverflow(Address),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The external VM rejected or crashed during message application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmFault {
    #[error("VM rejected the application: {0}")]
    Rejected(String),
    #[error("VM returned {found} receipts for {expected} messages")]
    ReceiptCountMismatch { expected: usize, found: usize },
    #[error("VM returned an unusable post-state archive: {0}")]
    InvalidPostArchive(CorruptArchive),
    #[error("No pinned randomness for {kind} dst={dst} epoch={epoch}")]
    UnpinnedRandomness { kind: RandomnessKind, dst: i64, epoch: i64 },
    #[error("VM crashed: {0}")]
    Crashed(String),
    #[error("VM observed cancellation")]
    Cancelled,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("VM application exceeded its deadline of {deadline:?}")]
pub struct ExecutionTimeout {
    pub deadline: Duration,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error(transparent)]
    Vm(#[from] VmFault),
    #[error(transparent)]
    Timeout(#[from] ExecutionTimeout),
}

/// A declared predicate that did not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{predicate}{}: expected {expected}, observed {observed}", at_message(.message))]
pub struct AssertionError {
    pub message: Option<usize>,
    pub predicate: String,
    pub expected: String,
    pub observed: String,
}

fn at_message(message: &Option<usize>) -> String {
    match message {
        Some(index) => format!(" (message {})", index),
        None => String::new(),
    }
}

/// Every predicate failure of one evaluation, in declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailures(pub Vec<AssertionError>);

impl fmt::Display for AssertionFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} assertion(s) failed", self.0.len())?;
        for failure in &self.0 {
            write!(f, "\n  - {}", failure)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Vm(#[from] VmFault),
    #[error(transparent)]
    Timeout(#[from] ExecutionTimeout),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Assertions(#[from] AssertionFailures),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<DriverError> for BuilderError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Vm(fault) => BuilderError::Vm(fault),
            DriverError::Timeout(timeout) => BuilderError::Timeout(timeout),
        }
    }
}

impl From<CorruptArchive> for BuilderError {
    fn from(e: CorruptArchive) -> Self {
        BuilderError::Store(StoreError::Corrupt(e))
    }
}

pub type Result<T> = std::result::Result<T, BuilderError>;
