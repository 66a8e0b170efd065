// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{defaults, params, FUNDS};
use crate::runner::VectorSpec;
use tvx_core::types::address::KeyScheme;
use tvx_core::types::builtin::CHAOS_ACTOR_ADDR;
use tvx_core::types::message::MessageSpec;
use tvx_core::types::randomness::{RandomnessKind, RandomnessRule};
use tvx_core::types::receipt::ExitCode;
use tvx_core::{Builder, Result};
use tvx_refvm::chaos::METHOD_BEACON_RANDOMNESS;
use tvx_refvm::RandomnessParams;

pub const VECTORS: &[VectorSpec] = &[
    VectorSpec::new("randomness_beacon_pinned", "beacon randomness answered from the pinned table", beacon),
    VectorSpec::new("randomness_chain_no_entropy", "chain randomness with absent entropy", chain_without_entropy),
];

fn draw(v: &mut Builder, rule: RandomnessRule, ret: &[u8]) -> Result<()> {
    v.set_message_defaults(defaults())?;
    let alice = v.account(KeyScheme::Secp256k1, FUNDS)?;
    let request = RandomnessParams {
        kind: rule.kind,
        dst: rule.dst,
        epoch: rule.epoch,
        entropy: rule.entropy_bytes().to_vec(),
    };
    v.pin_randomness(rule, ret.to_vec())?;
    v.commit_preconditions()?;

    v.push_message(MessageSpec::raw(alice.address, CHAOS_ACTOR_ADDR, METHOD_BEACON_RANDOMNESS, params(&request)?))?;
    v.commit_applies()?;
    v.expect_exit_code(0, ExitCode::OK)?;
    v.expect_return(0, ret.to_vec())
}

fn beacon(v: &mut Builder) -> Result<()> {
    let rule = RandomnessRule::new(RandomnessKind::Beacon, 5, 10, Some(b"hello world!".to_vec()));
    draw(v, rule, b"super random")
}

fn chain_without_entropy(v: &mut Builder) -> Result<()> {
    let rule = RandomnessRule::new(RandomnessKind::Chain, 99, 68_592, None);
    draw(v, rule, b"another random value")
}
