// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Reference in-process VM for building and replaying vectors.
//!
//! Implements the system, init, account and chaos actors over the
//! `tvx-core` state tree. Execution is single threaded and deterministic.

pub mod error;
pub mod gas;
pub mod chaos;
pub mod vm;

pub use chaos::{MutateStateParams, RandomnessParams, ResolveAddressResponse};
pub use error::{ActorError, ActorResult};
pub use vm::ReferenceVm;
