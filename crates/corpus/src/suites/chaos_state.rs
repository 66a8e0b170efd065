// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{defaults, params, FUNDS};
use crate::runner::VectorSpec;
use tvx_core::assert::ExitCodeIs;
use tvx_core::types::address::KeyScheme;
use tvx_core::types::builtin::CHAOS_ACTOR_ADDR;
use tvx_core::types::message::MessageSpec;
use tvx_core::types::receipt::ExitCode;
use tvx_core::{Builder, Result};
use tvx_refvm::chaos::METHOD_MUTATE_STATE;
use tvx_refvm::MutateStateParams;

pub const VECTORS: &[VectorSpec] = &[
    VectorSpec::new("chaos_state_overwrite", "put, overwrite and delete one key", overwrite),
    VectorSpec::new("chaos_state_reinsert", "delete and reinsert among neighbours", reinsert),
];

type Op<'a> = (&'a str, Option<&'a str>);

fn mutate(v: &mut Builder, ops: &[Op<'_>]) -> Result<()> {
    v.set_message_defaults(defaults())?;
    let alice = v.account(KeyScheme::Bls, FUNDS)?;
    v.commit_preconditions()?;
    for (key, value) in ops {
        let p = MutateStateParams { key: key.as_bytes().to_vec(), value: value.map(|v| v.as_bytes().to_vec()) };
        v.push_message(MessageSpec::raw(alice.address.clone(), CHAOS_ACTOR_ADDR, METHOD_MUTATE_STATE, params(&p)?))?;
    }
    v.commit_applies()?;
    v.expect_every_receipt(ExitCodeIs(ExitCode::OK))
}

fn overwrite(v: &mut Builder) -> Result<()> {
    mutate(v, &[("k", Some("1")), ("k", Some("2")), ("k", None)])?;
    v.expect_return(0, None::<Vec<u8>>)?;
    v.expect_return(1, Some(b"1".to_vec()))?;
    v.expect_return(2, Some(b"2".to_vec()))
}

fn reinsert(v: &mut Builder) -> Result<()> {
    let ops: Vec<Op<'_>> = vec![
        ("a", Some("1")),
        ("b", Some("2")),
        ("c", Some("3")),
        ("d", Some("4")),
        ("b", None),
        ("b", Some("2")),
    ];
    mutate(v, &ops)?;
    v.expect_return(4, Some(b"2".to_vec()))?;
    v.expect_return(5, None::<Vec<u8>>)
}
