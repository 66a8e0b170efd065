// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{defaults, params, FUNDS};
use crate::runner::VectorSpec;
use tvx_core::assert::{ExitCodeIs, Returns};
use tvx_core::store::Block;
use tvx_core::types::actor::Actor;
use tvx_core::types::address::{Address, KeyScheme};
use tvx_core::types::builtin::{BuiltinActor, CHAOS_ACTOR_ADDR, SYSTEM_ACTOR_ADDR};
use tvx_core::types::message::MessageSpec;
use tvx_core::types::receipt::ExitCode;
use tvx_core::{Builder, Result};
use tvx_refvm::chaos::METHOD_RESOLVE_ADDRESS;
use tvx_refvm::ResolveAddressResponse;

pub const VECTORS: &[VectorSpec] = &[
    VectorSpec::new("actor_resolution_id_identity", "id address resolves to itself", id_identity),
    VectorSpec::new("actor_resolution_invalid_id", "unassigned id address resolves to itself", invalid_id),
    VectorSpec::new("actor_resolution_nonexistent", "unknown actor address resolves to the system sentinel", nonexistent),
    VectorSpec::new("actor_resolution_secp_existent", "secp256k1 account resolves to its id", secp_existent),
    VectorSpec::new("actor_resolution_bls_existent", "bls account resolves to its id", bls_existent),
    VectorSpec::new("actor_resolution_actor_existent", "registered actor address resolves to its id", actor_existent),
];

/// One ResolveAddress call from a fresh account, expected to succeed.
fn resolve(
    v: &mut Builder,
    scheme: KeyScheme,
    target: fn(&Actor) -> Address,
    want: fn(&Actor) -> ResolveAddressResponse,
) -> Result<()> {
    v.set_message_defaults(defaults())?;
    let alice = v.account(scheme, FUNDS)?;
    v.commit_preconditions()?;

    let params = params(&target(&alice))?;
    v.push_message(MessageSpec::raw(alice.id_address(), CHAOS_ACTOR_ADDR, METHOD_RESOLVE_ADDRESS, params).nonce(0))?;
    v.commit_applies()?;

    v.expect_every_receipt(ExitCodeIs(ExitCode::OK))?;
    v.expect_every_receipt(Returns(want(&alice)))
}

fn own_id(alice: &Actor) -> ResolveAddressResponse {
    ResolveAddressResponse { resolved: alice.id_address(), is_id_address: true }
}

fn id_identity(v: &mut Builder) -> Result<()> {
    resolve(v, KeyScheme::Secp256k1, |_| SYSTEM_ACTOR_ADDR, |_| ResolveAddressResponse {
        resolved: SYSTEM_ACTOR_ADDR,
        is_id_address: true,
    })
}

fn invalid_id(v: &mut Builder) -> Result<()> {
    resolve(v, KeyScheme::Secp256k1, |_| Address::new_id(77), |_| ResolveAddressResponse {
        resolved: Address::new_id(77),
        is_id_address: true,
    })
}

fn nonexistent(v: &mut Builder) -> Result<()> {
    resolve(v, KeyScheme::Secp256k1, |_| Address::new_actor(b"invalid"), |_| ResolveAddressResponse {
        resolved: SYSTEM_ACTOR_ADDR,
        is_id_address: false,
    })
}

fn secp_existent(v: &mut Builder) -> Result<()> {
    resolve(v, KeyScheme::Secp256k1, Actor::id_address, own_id)
}

fn bls_existent(v: &mut Builder) -> Result<()> {
    resolve(v, KeyScheme::Bls, |alice| alice.address.clone(), own_id)
}

fn actor_existent(v: &mut Builder) -> Result<()> {
    v.set_message_defaults(defaults())?;
    let alice = v.account(KeyScheme::Secp256k1, FUNDS)?;
    let head = v.put_block(&Block::empty())?;
    let robust = Address::new_actor(b"registered chaos");
    let target = v.actor(BuiltinActor::Chaos.code(), Some(robust.clone()), 0u64, head)?;
    v.commit_preconditions()?;

    v.push_message(MessageSpec::raw(alice.address, CHAOS_ACTOR_ADDR, METHOD_RESOLVE_ADDRESS, params(&robust)?))?;
    v.commit_applies()?;

    v.expect_exit_code(0, ExitCode::OK)?;
    v.expect_return(0, own_id(&target))
}
