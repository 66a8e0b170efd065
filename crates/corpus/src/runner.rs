// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Corpus runner.
//!
//! Each vector gets its own builder session layered over one shared fixture
//! store, so sessions see the same fixtures and never each other's writes.
//! A failing vector is recorded and the rest of the corpus carries on.

use crate::error::{CorpusError, Result};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tvx_core::driver::{ApplyRequest, ExecutionDriver, Vm};
use tvx_core::schema::{self, Metadata, Vector};
use tvx_core::store::{Archive, SharedBlockstore};
use tvx_core::{Builder, SessionConfig};

/// Declares a vector on a fresh session and leaves it at
/// `ApplicationsCommitted`; the runner seals it.
pub type Generator = fn(&mut Builder) -> tvx_core::Result<()>;

#[derive(Clone, Copy)]
pub struct VectorSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub generate: Generator,
}

impl VectorSpec {
    pub const fn new(id: &'static str, description: &'static str, generate: Generator) -> Self {
        Self { id, description, generate }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedVector {
    pub vector: Vector,
    /// The persisted document bytes.
    pub encoded: Vec<u8>,
}

#[derive(Debug)]
pub struct VectorFailure {
    pub id: String,
    pub error: CorpusError,
}

/// Outcome of a corpus run, both lists in input order.
#[derive(Debug, Default)]
pub struct CorpusSummary {
    pub passed: Vec<GeneratedVector>,
    pub failed: Vec<VectorFailure>,
}

impl CorpusSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Writes every passed vector to `dir/<id>.json`.
    pub fn write_all(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for generated in &self.passed {
            let path = dir.join(format!("{}.json", generated.vector.metadata.id));
            fs::write(&path, &generated.encoded)?;
        }
        Ok(self.passed.len())
    }
}

pub struct CorpusRunner {
    vm: Arc<dyn Vm>,
    config: SessionConfig,
    fixtures: SharedBlockstore,
    replay: bool,
}

impl CorpusRunner {
    pub fn new(vm: Arc<dyn Vm>, config: SessionConfig) -> Self {
        Self { vm, config, fixtures: SharedBlockstore::new(), replay: false }
    }

    /// Blocks every session may read but none may change.
    pub fn with_fixtures(mut self, fixtures: SharedBlockstore) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Decode and re-execute each vector after encoding it.
    pub fn with_replay(mut self, replay: bool) -> Self {
        self.replay = replay;
        self
    }

    pub fn fixtures(&self) -> &SharedBlockstore {
        &self.fixtures
    }

    pub fn run(&self, specs: &[VectorSpec]) -> CorpusSummary {
        let results: Vec<std::result::Result<GeneratedVector, VectorFailure>> = specs
            .par_iter()
            .map(|spec| {
                self.run_one(spec).map_err(|error| {
                    warn!(id = spec.id, error = %error, "Vector failed");
                    VectorFailure { id: spec.id.to_string(), error }
                })
            })
            .collect();

        let mut summary = CorpusSummary::default();
        for result in results {
            match result {
                Ok(generated) => summary.passed.push(generated),
                Err(failure) => summary.failed.push(failure),
            }
        }
        info!(passed = summary.passed.len(), failed = summary.failed.len(), "Corpus complete");
        summary
    }

    fn run_one(&self, spec: &VectorSpec) -> Result<GeneratedVector> {
        let metadata = Metadata::new(spec.id)
            .description(spec.description)
            .generator("tvx-corpus", env!("CARGO_PKG_VERSION"));
        let mut builder = Builder::with_fixtures(metadata, self.config.clone(), Arc::clone(&self.vm), &self.fixtures);
        (spec.generate)(&mut builder)?;
        let vector = builder.finish()?;
        let encoded = schema::encode(&vector)?;

        if self.replay {
            replay(Arc::clone(&self.vm), &schema::decode(&encoded)?)?;
        }
        debug!(id = spec.id, bytes = encoded.len(), "Vector generated");
        Ok(GeneratedVector { vector, encoded })
    }
}

/// Re-executes `vector` from its own archive and checks that the receipts and
/// post root match what it records.
pub fn replay(vm: Arc<dyn Vm>, vector: &Vector) -> Result<()> {
    let store = vector.archive.clone().into_store()?;
    let request = ApplyRequest {
        epoch: vector.epoch,
        pre_root: vector.pre_root,
        pre_archive: Archive::snapshot(&store, &[vector.pre_root])?,
        messages: vector.messages.clone(),
        randomness: vector.randomness.clone(),
    };
    let outcome = ExecutionDriver::new(vm, None).apply(request)?;

    if outcome.receipts != vector.receipts {
        let at = outcome
            .receipts
            .iter()
            .zip(&vector.receipts)
            .position(|(got, want)| got != want)
            .unwrap_or(outcome.receipts.len().min(vector.receipts.len()));
        return Err(CorpusError::ReplayDiverged(format!("receipt {} differs", at)));
    }
    if outcome.post_root != vector.post_root {
        return Err(CorpusError::ReplayDiverged(format!(
            "post root {} instead of {}",
            outcome.post_root, vector.post_root
        )));
    }
    Ok(())
}
