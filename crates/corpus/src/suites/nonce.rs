// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{defaults, FUNDS};
use crate::runner::VectorSpec;
use tvx_core::assert::ExitCodeIs;
use tvx_core::types::address::KeyScheme;
use tvx_core::types::builtin::BURNT_FUNDS_ACTOR_ADDR;
use tvx_core::types::message::MessageSpec;
use tvx_core::types::receipt::ExitCode;
use tvx_core::{Builder, Result};

pub const VECTORS: &[VectorSpec] = &[
    VectorSpec::new("nonce_sequential", "automatic nonces apply in append order", sequential),
    VectorSpec::new("nonce_gap", "a nonce ahead of the sender is rejected", gap),
    VectorSpec::new("nonce_duplicate", "a reused nonce is rejected", duplicate),
];

/// Sends one token per nonce from a fresh account to the burnt funds actor.
fn sends(v: &mut Builder, nonces: &[Option<u64>]) -> Result<()> {
    v.set_message_defaults(defaults())?;
    let alice = v.account(KeyScheme::Secp256k1, FUNDS)?;
    v.commit_preconditions()?;
    for nonce in nonces {
        let spec = MessageSpec::send(alice.address.clone(), BURNT_FUNDS_ACTOR_ADDR, 1u64);
        v.push_message(match nonce {
            Some(n) => spec.nonce(*n),
            None => spec,
        })?;
    }
    v.commit_applies()?;
    Ok(())
}

fn sequential(v: &mut Builder) -> Result<()> {
    sends(v, &[None, None, None])?;
    v.expect_every_receipt(ExitCodeIs(ExitCode::OK))
}

fn gap(v: &mut Builder) -> Result<()> {
    sends(v, &[Some(1), Some(0), Some(1)])?;
    v.expect_exit_code(0, ExitCode::SYS_ERR_SENDER_STATE_INVALID)?;
    v.expect_exit_code(1, ExitCode::OK)?;
    v.expect_exit_code(2, ExitCode::OK)
}

fn duplicate(v: &mut Builder) -> Result<()> {
    sends(v, &[Some(0), Some(0)])?;
    v.expect_exit_code(0, ExitCode::OK)?;
    v.expect_exit_code(1, ExitCode::SYS_ERR_SENDER_STATE_INVALID)
}
