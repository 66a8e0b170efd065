// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-crate VMs for exercising the builder and driver.

use crate::codec;
use crate::driver::{ApplyOutcome, ApplyRequest, CancelToken, Vm};
use crate::error::VmFault;
use crate::state::tree::StateTree;
use crate::store::archive::Archive;
use crate::types::receipt::{ExitCode, Receipt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Minimal PCG generator for reproducible operation histories.
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed, inc: 1 }
    }

    pub fn next_u32(&mut self) -> u32 {
        let oldstate = self.state;
        self.state = oldstate.wrapping_mul(6364136223846793005).wrapping_add(self.inc);
        let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
        let rot = (oldstate >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

fn vm_error(e: impl std::fmt::Display) -> VmFault {
    VmFault::Rejected(e.to_string())
}

/// Bumps each sender's nonce and returns the method number as the receipt value.
pub struct EchoVm;

impl Vm for EchoVm {
    fn apply_messages(&self, request: &ApplyRequest, cancel: &CancelToken) -> Result<ApplyOutcome, VmFault> {
        let mut store = request.pre_archive.clone().into_store().map_err(VmFault::InvalidPostArchive)?;
        let mut tree = StateTree::load(&store, &request.pre_root).map_err(vm_error)?;

        let mut receipts = Vec::new();
        for message in &request.messages {
            cancel.check()?;
            let (id, state) = tree
                .resolve(&message.from)
                .map_err(vm_error)?
                .ok_or_else(|| vm_error(format!("unknown sender {}", message.from)))?;
            let mut state = state.clone();
            state.nonce += 1;
            tree.set_actor(id, state).map_err(vm_error)?;

            let ret = codec::serialize_params(&message.method).map_err(vm_error)?;
            receipts.push(Receipt::new(ExitCode::OK, ret, 100));
        }

        let post_root = tree.flush(&mut store).map_err(vm_error)?;
        let post_archive = Archive::snapshot(&store, &[post_root]).map_err(VmFault::InvalidPostArchive)?;
        Ok(ApplyOutcome { receipts, post_root, post_archive })
    }
}

/// Returns one receipt fewer than there are messages.
pub struct ShortVm;

impl Vm for ShortVm {
    fn apply_messages(&self, request: &ApplyRequest, cancel: &CancelToken) -> Result<ApplyOutcome, VmFault> {
        let mut outcome = EchoVm.apply_messages(request, cancel)?;
        outcome.receipts.pop();
        Ok(outcome)
    }
}

/// Returns a post archive that does not contain the post root.
pub struct DanglingRootVm;

impl Vm for DanglingRootVm {
    fn apply_messages(&self, request: &ApplyRequest, cancel: &CancelToken) -> Result<ApplyOutcome, VmFault> {
        let outcome = EchoVm.apply_messages(request, cancel)?;
        Ok(ApplyOutcome {
            receipts: outcome.receipts,
            post_root: outcome.post_root,
            post_archive: request.pre_archive.clone(),
        })
    }
}

pub struct PanicVm;

impl Vm for PanicVm {
    fn apply_messages(&self, _: &ApplyRequest, _: &CancelToken) -> Result<ApplyOutcome, VmFault> {
        panic!("interpreter invariant broken")
    }
}

/// Spins until cancelled. `released` is set once the VM has let go of its work.
pub struct StallingVm {
    pub released: Arc<AtomicBool>,
}

impl StallingVm {
    pub fn new() -> Self {
        Self { released: Arc::new(AtomicBool::new(false)) }
    }
}

struct ReleaseOnDrop(Arc<AtomicBool>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Vm for StallingVm {
    fn apply_messages(&self, _: &ApplyRequest, cancel: &CancelToken) -> Result<ApplyOutcome, VmFault> {
        let _held = ReleaseOnDrop(Arc::clone(&self.released));
        loop {
            cancel.check()?;
            thread::sleep(Duration::from_millis(5));
        }
    }
}

/// Polls `flag` for up to two seconds.
pub fn wait_for(flag: &AtomicBool) -> bool {
    for _ in 0..400 {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

pub fn echo() -> Arc<dyn Vm> {
    init_tracing();
    Arc::new(EchoVm)
}

/// Routes log output through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tvx_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
