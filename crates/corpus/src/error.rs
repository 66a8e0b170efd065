// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io;
use thiserror::Error;
use tvx_core::error::{BuilderError, CorruptArchive, DriverError, SchemaError};

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Archive(#[from] CorruptArchive),
    #[error("Replay diverged: {0}")]
    ReplayDiverged(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CorpusError>;
