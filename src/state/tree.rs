// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! State tree: actors by id plus robust address resolution.
//!
//! Root block layout: links `[actors root, addresses root]`, payload
//! `{version, next_id}` in the canonical codec.

use crate::cid::Cid;
use crate::codec;
use crate::config::STATE_TREE_VERSION;
use crate::error::{CorruptArchive, StoreError};
use crate::store::block::Block;
use crate::store::blockstore::Blockstore;
use crate::store::hamt::CanonicalStore;
use crate::types::actor::{AccountState, ActorState};
use crate::types::address::{ActorId, Address};
use crate::types::builtin::{
    BuiltinActor, BURNT_FUNDS_ACTOR_ID, CHAOS_ACTOR_ID, FIRST_NON_SINGLETON_ID, INIT_ACTOR_ID, SYSTEM_ACTOR_ID,
};
use crate::types::token::TokenAmount;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct RootPayload {
    version: u32,
    next_id: ActorId,
}

fn actor_key(id: ActorId) -> Vec<u8> {
    Address::new_id(id).to_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTree {
    actors: CanonicalStore<ActorState>,
    addresses: CanonicalStore<ActorId>,
    next_id: ActorId,
}

impl Default for StateTree {
    fn default() -> Self {
        Self {
            actors: CanonicalStore::new(),
            addresses: CanonicalStore::new(),
            next_id: FIRST_NON_SINGLETON_ID,
        }
    }
}

impl StateTree {
    /// An empty tree. Ids are allocated from [`FIRST_NON_SINGLETON_ID`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree holding the singleton actors, with their heads written to `store`.
    pub fn genesis<B: Blockstore + ?Sized>(store: &mut B) -> Result<Self, StoreError> {
        let mut tree = Self::new();
        let empty_head = store.put(&Block::empty());
        let chaos_head = CanonicalStore::<Vec<u8>>::new().flush(store)?;
        let burnt_head = Self::account_head(store, &Address::new_id(BURNT_FUNDS_ACTOR_ID))?;

        let singletons = [
            (SYSTEM_ACTOR_ID, BuiltinActor::System, empty_head),
            (INIT_ACTOR_ID, BuiltinActor::Init, empty_head),
            (CHAOS_ACTOR_ID, BuiltinActor::Chaos, chaos_head),
            (BURNT_FUNDS_ACTOR_ID, BuiltinActor::Account, burnt_head),
        ];
        for (id, builtin, head) in singletons {
            tree.set_actor(
                id,
                ActorState { code: builtin.code(), head, nonce: 0, balance: TokenAmount::zero() },
            )?;
        }
        Ok(tree)
    }

    /// Writes the state block of an account actor owning `address`.
    pub fn account_head<B: Blockstore + ?Sized>(store: &mut B, address: &Address) -> Result<Cid, StoreError> {
        let payload = codec::serialize_params(&AccountState { address: address.clone() })?;
        Ok(store.put(&Block::new(Vec::new(), payload)))
    }

    pub fn get_actor(&self, id: ActorId) -> Result<Option<&ActorState>, StoreError> {
        self.actors.get(&actor_key(id))
    }

    pub fn set_actor(&mut self, id: ActorId, state: ActorState) -> Result<(), StoreError> {
        self.actors.put(actor_key(id), state)?;
        Ok(())
    }

    pub fn delete_actor(&mut self, id: ActorId) -> Result<Option<ActorState>, StoreError> {
        self.actors.delete(&actor_key(id))
    }

    /// Id addresses map to themselves; anything else goes through the
    /// address table.
    pub fn lookup_id(&self, address: &Address) -> Result<Option<ActorId>, StoreError> {
        match address {
            Address::Id(id) => Ok(Some(*id)),
            other => Ok(self.addresses.get(&other.to_bytes())?.copied()),
        }
    }

    pub fn register_address(&mut self, address: &Address, id: ActorId) -> Result<(), StoreError> {
        self.addresses.put(address.to_bytes(), id)?;
        Ok(())
    }

    /// Resolves `address` to an existing actor.
    pub fn resolve(&self, address: &Address) -> Result<Option<(ActorId, &ActorState)>, StoreError> {
        let Some(id) = self.lookup_id(address)? else {
            return Ok(None);
        };
        Ok(self.get_actor(id)?.map(|state| (id, state)))
    }

    pub fn allocate_id(&mut self) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Ensures later allocations start at or after `next`.
    pub fn reserve_ids(&mut self, next: ActorId) {
        self.next_id = self.next_id.max(next);
    }

    pub fn next_id(&self) -> ActorId {
        self.next_id
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Actors in canonical trie order.
    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &ActorState)> {
        self.actors
            .iter()
            .filter_map(|(key, state)| Address::from_bytes(key).ok()?.id().map(|id| (id, state)))
    }

    fn root_block(&self, actors: Cid, addresses: Cid) -> Result<Block, StoreError> {
        let payload = codec::serialize_params(&RootPayload { version: STATE_TREE_VERSION, next_id: self.next_id })?;
        Ok(Block::new(vec![actors, addresses], payload))
    }

    /// Identifier of the whole tree, computed without storing anything.
    pub fn root(&self) -> Result<Cid, StoreError> {
        Ok(self.root_block(self.actors.root()?, self.addresses.root()?)?.cid())
    }

    pub fn flush<B: Blockstore + ?Sized>(&self, store: &mut B) -> Result<Cid, StoreError> {
        let actors = self.actors.flush(store)?;
        let addresses = self.addresses.flush(store)?;
        let root = store.put(&self.root_block(actors, addresses)?);
        debug!(root = %root, actors = self.actors.len(), "State tree flushed");
        Ok(root)
    }

    /// Reads the tree at `root`. Both tries are validated for canonical form.
    pub fn load<B: Blockstore + ?Sized>(store: &B, root: &Cid) -> Result<Self, StoreError> {
        let bytes = store.get(root).ok_or(CorruptArchive::MissingBlock { cid: *root })?;
        if Cid::of(&bytes) != *root {
            return Err(CorruptArchive::HashMismatch { cid: *root }.into());
        }
        let block = Block::decode(root, &bytes)?;
        let malformed = |reason: String| -> StoreError { CorruptArchive::MalformedBlock { cid: *root, reason }.into() };

        let [actors_root, addresses_root] = block.links.as_slice() else {
            return Err(malformed(format!("state root has {} links, expected 2", block.links.len())));
        };
        let payload: RootPayload = codec::deserialize_params(&block.payload).map_err(|e| malformed(e.to_string()))?;
        if payload.version != STATE_TREE_VERSION {
            return Err(malformed(format!("unsupported state tree version {}", payload.version)));
        }

        Ok(Self {
            actors: CanonicalStore::load(store, actors_root)?,
            addresses: CanonicalStore::load(store, addresses_root)?,
            next_id: payload.next_id,
        })
    }
}
