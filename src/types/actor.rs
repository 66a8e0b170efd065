// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Actors.

use crate::cid::Cid;
use crate::store::block::Linked;
use crate::types::address::{ActorId, Address};
use crate::types::token::TokenAmount;
use serde::{Deserialize, Serialize};

/// Actor record as stored in the state tree, keyed by id address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorState {
    pub code: Cid,
    /// Root block of the actor's own state.
    pub head: Cid,
    /// Next expected message nonce when this actor sends.
    pub nonce: u64,
    pub balance: TokenAmount,
}

impl Linked for ActorState {
    fn links(&self) -> Vec<Cid> {
        vec![self.head]
    }
}

/// State head of an account actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub address: Address,
}

/// An actor declared by a builder session. Frozen once preconditions are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    /// Robust address, or the id address for actors declared without one.
    pub address: Address,
    pub balance: TokenAmount,
    pub code: Cid,
    pub head: Cid,
}

impl Actor {
    pub fn id_address(&self) -> Address {
        Address::new_id(self.id)
    }
}
