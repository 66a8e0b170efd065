// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The chaos actor: methods that poke at VM internals from inside a message.

use crate::error::{ActorError, ActorResult};
use crate::gas;
use crate::vm::Invocation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tvx_core::codec;
use tvx_core::error::VmFault;
use tvx_core::state::StateTree;
use tvx_core::store::CanonicalStore;
use tvx_core::types::actor::ActorState;
use tvx_core::types::address::{ActorId, Address};
use tvx_core::types::builtin::SYSTEM_ACTOR_ADDR;
use tvx_core::types::message::MethodNum;
use tvx_core::types::randomness::RandomnessKind;
use tvx_core::types::receipt::ExitCode;

pub const METHOD_RESOLVE_ADDRESS: MethodNum = 4;
pub const METHOD_BEACON_RANDOMNESS: MethodNum = 5;
pub const METHOD_MUTATE_STATE: MethodNum = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveAddressResponse {
    pub resolved: Address,
    pub is_id_address: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessParams {
    pub kind: RandomnessKind,
    pub dst: i64,
    pub epoch: i64,
    pub entropy: Vec<u8>,
}

/// Puts `value` under `key` in the chaos actor's own table, or deletes the
/// key when `value` is `None`. Returns the previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateStateParams {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

pub fn invoke(inv: &mut Invocation<'_>, receiver: ActorId, method: MethodNum, params: &[u8]) -> ActorResult<Vec<u8>> {
    match method {
        METHOD_RESOLVE_ADDRESS => {
            let address: Address = decode(params)?;
            inv.gas.charge(gas::STATE_READ, "address lookup")?;
            encode(&resolve_address(inv.tree, address)?)
        }
        METHOD_BEACON_RANDOMNESS => {
            let p: RandomnessParams = decode(params)?;
            let value = inv
                .randomness
                .lookup(p.kind, p.dst, p.epoch, &p.entropy)
                .ok_or(VmFault::UnpinnedRandomness { kind: p.kind, dst: p.dst, epoch: p.epoch })?;
            encode(&value.to_vec())
        }
        METHOD_MUTATE_STATE => {
            let p: MutateStateParams = decode(params)?;
            encode(&mutate_state(inv, receiver, p)?)
        }
        other => Err(ActorError::exit(
            ExitCode::SYS_ERR_INVALID_METHOD,
            format!("chaos actor has no method {}", other),
        )),
    }
}

/// Id addresses resolve to themselves whether or not an actor holds them.
/// Unknown robust addresses resolve to the system address.
fn resolve_address(tree: &StateTree, address: Address) -> ActorResult<ResolveAddressResponse> {
    if address.is_id() {
        return Ok(ResolveAddressResponse { resolved: address, is_id_address: true });
    }
    Ok(match tree.lookup_id(&address)? {
        Some(id) => ResolveAddressResponse { resolved: Address::new_id(id), is_id_address: true },
        None => ResolveAddressResponse { resolved: SYSTEM_ACTOR_ADDR, is_id_address: false },
    })
}

fn mutate_state(inv: &mut Invocation<'_>, receiver: ActorId, p: MutateStateParams) -> ActorResult<Option<Vec<u8>>> {
    let state = inv
        .tree
        .get_actor(receiver)?
        .cloned()
        .ok_or_else(|| ActorError::exit(ExitCode::ERR_NOT_FOUND, format!("actor {} vanished", receiver)))?;

    inv.gas.charge(gas::STATE_READ, "chaos state read")?;
    let mut table = CanonicalStore::<Vec<u8>>::load(&*inv.store, &state.head)
        .map_err(|e| ActorError::exit(ExitCode::ERR_ILLEGAL_STATE, format!("chaos state unreadable: {}", e)))?;
    let previous = match p.value {
        Some(value) => table.put(p.key, value)?,
        None => table.delete(&p.key)?,
    };

    inv.gas.charge(gas::STATE_WRITE, "chaos state write")?;
    let head = table.flush(&mut *inv.store)?;
    inv.tree.set_actor(receiver, ActorState { head, ..state })?;
    Ok(previous)
}

fn decode<T: DeserializeOwned>(params: &[u8]) -> ActorResult<T> {
    codec::deserialize_params(params).map_err(|e| ActorError::exit(ExitCode::ERR_SERIALIZATION, e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> ActorResult<Vec<u8>> {
    codec::serialize_params(value).map_err(|e| VmFault::Rejected(format!("return encoding: {}", e)).into())
}
