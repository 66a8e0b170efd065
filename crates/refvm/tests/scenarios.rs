// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;
use tvx_core::assert::ExitCodeIs;
use tvx_core::codec::serialize_params;
use tvx_core::driver::{ApplyRequest, ExecutionDriver};
use tvx_core::error::{BuilderError, VmFault};
use tvx_core::schema::{self, Metadata, Vector};
use tvx_core::store::{Archive, Block, CanonicalStore};
use tvx_core::types::address::{Address, KeyScheme};
use tvx_core::types::builtin::{BuiltinActor, BURNT_FUNDS_ACTOR_ID, CHAOS_ACTOR_ADDR, CHAOS_ACTOR_ID, SYSTEM_ACTOR_ADDR};
use tvx_core::types::message::{MessageDefaults, MessageSpec};
use tvx_core::types::randomness::{RandomnessKind, RandomnessRule};
use tvx_core::types::receipt::ExitCode;
use tvx_core::types::token::TokenAmount;
use tvx_core::{Builder, SessionConfig};
use tvx_refvm::chaos::{METHOD_BEACON_RANDOMNESS, METHOD_MUTATE_STATE, METHOD_RESOLVE_ADDRESS};
use tvx_refvm::{MutateStateParams, RandomnessParams, ReferenceVm, ResolveAddressResponse};

const FUNDS: u64 = 1_000_000_000_000;

fn session(id: &str) -> Builder {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let config = SessionConfig { defaults: MessageDefaults::new(1_000_000_000, 1u64, 200u64), ..SessionConfig::default() };
    Builder::new(Metadata::new(id), config, Arc::new(ReferenceVm::new()))
}

/// One ResolveAddress call from a fresh secp256k1 account.
fn resolve(id: &str, target: impl FnOnce(&Address) -> Address) -> Vector {
    let mut b = session(id);
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    b.commit_preconditions().unwrap();
    let params = serialize_params(&target(&alice.address)).unwrap();
    b.push_message(MessageSpec::raw(alice.id_address(), CHAOS_ACTOR_ADDR, METHOD_RESOLVE_ADDRESS, params).nonce(0))
        .unwrap();
    b.commit_applies().unwrap();
    b.expect_every_receipt(ExitCodeIs(ExitCode::OK)).unwrap();
    b.finish().unwrap()
}

fn resolved(vector: &Vector) -> ResolveAddressResponse {
    tvx_core::codec::deserialize_params(&vector.receipts[0].return_data).unwrap()
}

fn chaos_head(vector: &Vector) -> tvx_core::Cid {
    vector.post_state().unwrap().get_actor(CHAOS_ACTOR_ID).unwrap().unwrap().head
}

/// Re-executes a decoded vector and checks it lands where it says.
fn replay(vector: &Vector) {
    let store = vector.archive.clone().into_store().unwrap();
    let request = ApplyRequest {
        epoch: vector.epoch,
        pre_root: vector.pre_root,
        pre_archive: Archive::snapshot(&store, &[vector.pre_root]).unwrap(),
        messages: vector.messages.clone(),
        randomness: vector.randomness.clone(),
    };
    let outcome = ExecutionDriver::new(Arc::new(ReferenceVm::new()), None).apply(request).unwrap();
    assert_eq!(outcome.receipts, vector.receipts);
    assert_eq!(outcome.post_root, vector.post_root);
}

#[test]
fn test_resolve_system_address() {
    let vector = resolve("resolve-system", |_| SYSTEM_ACTOR_ADDR);
    assert_eq!(resolved(&vector), ResolveAddressResponse { resolved: SYSTEM_ACTOR_ADDR, is_id_address: true });
    replay(&vector);
}

#[test]
fn test_resolve_unknown_actor_address() {
    let vector = resolve("resolve-missing", |_| Address::new_actor(b"invalid"));
    assert_eq!(resolved(&vector), ResolveAddressResponse { resolved: SYSTEM_ACTOR_ADDR, is_id_address: false });
}

#[test]
fn test_unassigned_id_resolves_to_itself() {
    let vector = resolve("resolve-id-77", |_| Address::new_id(77));
    assert_eq!(resolved(&vector), ResolveAddressResponse { resolved: Address::new_id(77), is_id_address: true });
}

#[test]
fn test_resolve_key_address_of_sender() {
    let vector = resolve("resolve-secp", |own| own.clone());
    assert_eq!(
        resolved(&vector),
        ResolveAddressResponse { resolved: Address::new_id(100), is_id_address: true }
    );
}

#[test]
fn test_resolve_registered_actor_address() {
    let mut b = session("resolve-actor-hash");
    let alice = b.account(KeyScheme::Bls, FUNDS).unwrap();
    let head = b.put_block(&Block::empty()).unwrap();
    let robust = Address::new_actor(b"registered");
    let other = b.actor(BuiltinActor::Chaos.code(), Some(robust.clone()), 0u64, head).unwrap();
    b.commit_preconditions().unwrap();
    b.push_message(MessageSpec::raw(alice.address, CHAOS_ACTOR_ADDR, METHOD_RESOLVE_ADDRESS, serialize_params(&robust).unwrap()))
        .unwrap();
    b.commit_applies().unwrap();
    b.expect_return(0, ResolveAddressResponse { resolved: other.id_address(), is_id_address: true }).unwrap();
    b.finish().unwrap();
}

#[test]
fn test_pinned_beacon_randomness() {
    let mut b = session("beacon");
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    b.pin_randomness(
        RandomnessRule::new(RandomnessKind::Beacon, 5, 10, Some(b"hello world!".to_vec())),
        b"super random".to_vec(),
    )
    .unwrap();
    b.commit_preconditions().unwrap();
    let params = RandomnessParams { kind: RandomnessKind::Beacon, dst: 5, epoch: 10, entropy: b"hello world!".to_vec() };
    b.push_message(MessageSpec::raw(alice.address, CHAOS_ACTOR_ADDR, METHOD_BEACON_RANDOMNESS, serialize_params(&params).unwrap()))
        .unwrap();
    b.commit_applies().unwrap();
    b.expect_return(0, b"super random".to_vec()).unwrap();
    let vector = b.finish().unwrap();

    let decoded = schema::decode(&schema::encode(&vector).unwrap()).unwrap();
    assert_eq!(
        decoded.randomness.lookup(RandomnessKind::Beacon, 5, 10, b"hello world!"),
        Some(&b"super random"[..])
    );
    replay(&decoded);
}

#[test]
fn test_unpinned_randomness_faults() {
    let mut b = session("unpinned");
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    b.commit_preconditions().unwrap();
    let params = RandomnessParams { kind: RandomnessKind::Chain, dst: 1, epoch: 2, entropy: Vec::new() };
    b.push_message(MessageSpec::raw(alice.address, CHAOS_ACTOR_ADDR, METHOD_BEACON_RANDOMNESS, serialize_params(&params).unwrap()))
        .unwrap();
    match b.commit_applies() {
        Err(BuilderError::Vm(VmFault::UnpinnedRandomness { kind: RandomnessKind::Chain, dst: 1, epoch: 2 })) => {}
        other => panic!("expected unpinned randomness, got {:?}", other),
    }
}

#[test]
fn test_nonce_ordering() {
    let mut b = session("nonces");
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    b.commit_preconditions().unwrap();
    for nonce in [0, 2, 1] {
        b.push_message(MessageSpec::send(alice.address.clone(), CHAOS_ACTOR_ADDR, 0u64).nonce(nonce)).unwrap();
    }
    b.commit_applies().unwrap();
    b.expect_exit_code(0, ExitCode::OK).unwrap();
    b.expect_exit_code(1, ExitCode::SYS_ERR_SENDER_STATE_INVALID).unwrap();
    b.expect_exit_code(2, ExitCode::OK).unwrap();
    let vector = b.finish().unwrap();

    let post = vector.post_state().unwrap();
    assert_eq!(post.resolve(&alice.address).unwrap().unwrap().1.nonce, 2);
    assert_eq!(vector.receipts[1].gas_used, 0);
}

#[test]
fn test_gas_is_burnt_and_value_moves() {
    let mut b = session("transfer");
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    let bob = Address::new_key(KeyScheme::Bls, b"bob, not yet on chain");
    b.commit_preconditions().unwrap();
    b.push_message(MessageSpec::send(alice.address.clone(), bob.clone(), 5_000u64)).unwrap();
    b.commit_applies().unwrap();
    b.expect_exit_code(0, ExitCode::OK).unwrap();
    let vector = b.finish().unwrap();

    let gas_used = vector.receipts[0].gas_used;
    let fee = TokenAmount::from(200u64).times_gas(gas_used);
    let post = vector.post_state().unwrap();
    let (_, bob_state) = post.resolve(&bob).unwrap().unwrap();
    assert_eq!(bob_state.balance, TokenAmount::from(5_000u64));
    assert_eq!(bob_state.code, BuiltinActor::Account.code());
    let (_, alice_state) = post.resolve(&alice.address).unwrap().unwrap();
    assert_eq!(&alice_state.balance + &fee, TokenAmount::from(FUNDS - 5_000));
    assert_eq!(post.get_actor(BURNT_FUNDS_ACTOR_ID).unwrap().unwrap().balance, fee);
}

#[test]
fn test_failed_transfer_reverts() {
    let mut b = session("overdraw");
    let alice = b.account(KeyScheme::Secp256k1, 300_000_000_000u64).unwrap();
    let bob = Address::new_key(KeyScheme::Secp256k1, b"bob");
    b.commit_preconditions().unwrap();
    b.push_message(MessageSpec::send(alice.address.clone(), bob.clone(), 200_000_000_000u64)).unwrap();
    b.commit_applies().unwrap();
    b.expect_exit_code(0, ExitCode::SYS_ERR_INSUFFICIENT_FUNDS).unwrap();
    let vector = b.finish().unwrap();

    let post = vector.post_state().unwrap();
    assert!(post.resolve(&bob).unwrap().is_none());
    let (_, alice_state) = post.resolve(&alice.address).unwrap().unwrap();
    assert_eq!(alice_state.nonce, 1);
}

#[test]
fn test_gas_limit_below_inclusion_cost() {
    let mut b = session("no-gas");
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    b.commit_preconditions().unwrap();
    b.push_message(MessageSpec::send(alice.address, CHAOS_ACTOR_ADDR, 0u64).gas_limit(10)).unwrap();
    b.commit_applies().unwrap();
    b.expect_exit_code(0, ExitCode::SYS_ERR_OUT_OF_GAS).unwrap();
    let vector = b.finish().unwrap();
    assert_eq!(vector.post_root, vector.pre_root);
}

fn mutations(id: &str, ops: &[(&str, Option<&str>)]) -> Vector {
    let mut b = session(id);
    let alice = b.account(KeyScheme::Secp256k1, FUNDS).unwrap();
    b.commit_preconditions().unwrap();
    for (key, value) in ops {
        let params = MutateStateParams { key: key.as_bytes().to_vec(), value: value.map(|v| v.as_bytes().to_vec()) };
        b.push_message(MessageSpec::raw(
            alice.address.clone(),
            CHAOS_ACTOR_ADDR,
            METHOD_MUTATE_STATE,
            serialize_params(&params).unwrap(),
        ))
        .unwrap();
    }
    b.commit_applies().unwrap();
    b.expect_every_receipt(ExitCodeIs(ExitCode::OK)).unwrap();
    b.finish().unwrap()
}

#[test]
fn test_chaos_put_then_delete_restores_head() {
    let vector = mutations("chaos-roundtrip", &[("k", Some("v")), ("k", None)]);
    assert_eq!(chaos_head(&vector), CanonicalStore::<Vec<u8>>::new().root().unwrap());
    replay(&vector);
}

#[test]
fn test_chaos_head_ignores_history() {
    let direct = mutations("chaos-direct", &[("a", Some("1")), ("b", Some("2"))]);
    let detour = mutations(
        "chaos-detour",
        &[("c", Some("3")), ("b", Some("2")), ("a", Some("0")), ("c", None), ("a", Some("1"))],
    );
    assert_eq!(chaos_head(&direct), chaos_head(&detour));

    let mut expected = CanonicalStore::new();
    expected.put(b"a".to_vec(), b"1".to_vec()).unwrap();
    expected.put(b"b".to_vec(), b"2".to_vec()).unwrap();
    assert_eq!(chaos_head(&direct), expected.root().unwrap());
}
