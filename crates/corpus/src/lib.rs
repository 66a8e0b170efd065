// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Generates vector corpora in parallel over isolated builder sessions.

pub mod error;
pub mod runner;
pub mod suites;

pub use error::{CorpusError, Result};
pub use runner::{CorpusRunner, CorpusSummary, GeneratedVector, VectorFailure, VectorSpec};
