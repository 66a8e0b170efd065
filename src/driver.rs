// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Execution driver.
//!
//! One blocking VM call per vector. Messages go to the VM in append order and
//! are never split or reordered. With a deadline the call runs on its own
//! thread; on expiry the cancel token is raised and the vector fails with
//! [`ExecutionTimeout`] while the VM unwinds and drops what it holds.

use crate::cid::Cid;
use crate::error::{DriverError, ExecutionTimeout, VmFault};
use crate::store::archive::Archive;
use crate::types::message::Message;
use crate::types::randomness::Randomness;
use crate::types::receipt::Receipt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Everything the VM needs to apply a vector's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub epoch: i64,
    pub pre_root: Cid,
    /// Self-contained; the VM must not need any other block.
    pub pre_archive: Archive,
    pub messages: Vec<Message>,
    pub randomness: Randomness,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// One per message, in message order.
    pub receipts: Vec<Receipt>,
    pub post_root: Cid,
    pub post_archive: Archive,
}

/// Raised by the driver when the deadline elapses. VMs poll it between units
/// of work and return [`VmFault::Cancelled`] once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), VmFault> {
        if self.is_cancelled() {
            Err(VmFault::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The consumed VM interface.
pub trait Vm: Send + Sync {
    fn apply_messages(&self, request: &ApplyRequest, cancel: &CancelToken) -> Result<ApplyOutcome, VmFault>;
}

pub struct ExecutionDriver {
    vm: Arc<dyn Vm>,
    deadline: Option<Duration>,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl ExecutionDriver {
    pub fn new(vm: Arc<dyn Vm>, deadline: Option<Duration>) -> Self {
        Self { vm, deadline }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Runs the VM and validates what it returns.
    pub fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, DriverError> {
        let expected = request.messages.len();
        let started = Instant::now();

        let outcome = match self.deadline {
            None => self.apply_inline(&request),
            Some(deadline) => self.apply_bounded(request, deadline),
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    DriverError::Timeout(t) => error!(deadline = ?t.deadline, "VM application timed out"),
                    DriverError::Vm(fault) => warn!(error = %fault, "VM fault"),
                }
                return Err(e);
            }
        };

        validate(&outcome, expected)?;
        info!(
            messages = expected,
            post_root = %outcome.post_root,
            elapsed = ?started.elapsed(),
            "VM application complete"
        );
        Ok(outcome)
    }

    fn apply_inline(&self, request: &ApplyRequest) -> Result<ApplyOutcome, DriverError> {
        let cancel = CancelToken::new();
        match panic::catch_unwind(AssertUnwindSafe(|| self.vm.apply_messages(request, &cancel))) {
            Ok(result) => Ok(result?),
            Err(payload) => Err(VmFault::Crashed(panic_message(payload)).into()),
        }
    }

    fn apply_bounded(&self, request: ApplyRequest, deadline: Duration) -> Result<ApplyOutcome, DriverError> {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let vm = Arc::clone(&self.vm);
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name("tvx-vm".to_string())
            .spawn(move || {
                let result = vm.apply_messages(&request, &token);
                // The receiver is gone after a timeout.
                let _ = tx.send(result);
            })
            .map_err(|e| VmFault::Crashed(format!("failed to start VM thread: {}", e)))?;

        match rx.recv_timeout(deadline) {
            Ok(result) => Ok(result?),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                cancel.cancel();
                Err(ExecutionTimeout { deadline }.into())
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let reason = match handle.join() {
                    Err(payload) => panic_message(payload),
                    Ok(()) => "VM thread exited without a result".to_string(),
                };
                Err(VmFault::Crashed(reason).into())
            }
        }
    }
}

fn validate(outcome: &ApplyOutcome, expected: usize) -> Result<(), VmFault> {
    if outcome.receipts.len() != expected {
        return Err(VmFault::ReceiptCountMismatch { expected, found: outcome.receipts.len() });
    }
    outcome
        .post_archive
        .require_root(&outcome.post_root)
        .and_then(|_| outcome.post_archive.verify())
        .map_err(VmFault::InvalidPostArchive)
}
