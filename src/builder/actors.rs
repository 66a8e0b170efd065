// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Actor declarations.

use crate::cid::Cid;
use crate::error::{ConstructionError, StoreError};
use crate::state::tree::StateTree;
use crate::store::blockstore::Blockstore;
use crate::types::actor::{Actor, ActorState};
use crate::types::address::{ActorId, Address, KeyScheme};
use crate::types::builtin::{BuiltinActor, FIRST_NON_SINGLETON_ID};
use crate::types::token::TokenAmount;
use rustc_hash::FxHashSet;

/// Actors declared in one session, in declaration order.
///
/// Ids are handed out sequentially from [`FIRST_NON_SINGLETON_ID`], so the
/// same declarations always produce the same ids.
#[derive(Debug, Clone)]
pub struct ActorSet {
    actors: Vec<Actor>,
    robust: FxHashSet<Address>,
    next_id: ActorId,
}

impl Default for ActorSet {
    fn default() -> Self {
        Self { actors: Vec::new(), robust: FxHashSet::default(), next_id: FIRST_NON_SINGLETON_ID }
    }
}

impl ActorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An account whose key is derived from its id.
    pub fn account<B: Blockstore + ?Sized>(
        &mut self,
        store: &mut B,
        scheme: KeyScheme,
        balance: TokenAmount,
    ) -> Result<Actor, ConstructionError> {
        let seed = format!("tvx/account/{}", self.next_id);
        self.account_with_key(store, scheme, seed.as_bytes(), balance)
    }

    pub fn account_with_key<B: Blockstore + ?Sized>(
        &mut self,
        store: &mut B,
        scheme: KeyScheme,
        public_key: &[u8],
        balance: TokenAmount,
    ) -> Result<Actor, ConstructionError> {
        let address = Address::new_key(scheme, public_key);
        self.check_address(&address)?;
        let head = StateTree::account_head(store, &address)?;
        self.declare(BuiltinActor::Account.code(), Some(address), balance, head)
    }

    /// An arbitrary actor. `head` must already be in `store`.
    pub fn actor<B: Blockstore + ?Sized>(
        &mut self,
        store: &B,
        code: Cid,
        address: Option<Address>,
        balance: TokenAmount,
        head: Cid,
    ) -> Result<Actor, ConstructionError> {
        if !store.has(&head) {
            return Err(ConstructionError::MissingHead(head));
        }
        if let Some(address) = &address {
            self.check_address(address)?;
        }
        self.declare(code, address, balance, head)
    }

    fn check_address(&self, address: &Address) -> Result<(), ConstructionError> {
        if address.is_id() {
            return Err(ConstructionError::UnsupportedAddress(address.clone()));
        }
        if self.robust.contains(address) {
            return Err(ConstructionError::DuplicateAddress(address.clone()));
        }
        Ok(())
    }

    fn declare(&mut self, code: Cid, address: Option<Address>, balance: TokenAmount, head: Cid) -> Result<Actor, ConstructionError> {
        let id = self.next_id;
        self.next_id += 1;
        let address = match address {
            Some(robust) => {
                self.robust.insert(robust.clone());
                robust
            }
            None => Address::new_id(id),
        };
        let actor = Actor { id, address, balance, code, head };
        self.actors.push(actor.clone());
        Ok(actor)
    }

    /// Writes every declared actor into `tree`.
    pub fn commit(&self, tree: &mut StateTree) -> Result<(), StoreError> {
        for actor in &self.actors {
            tree.set_actor(
                actor.id,
                ActorState {
                    code: actor.code,
                    head: actor.head,
                    nonce: 0,
                    balance: actor.balance.clone(),
                },
            )?;
            if !actor.address.is_id() {
                tree.register_address(&actor.address, actor.id)?;
            }
        }
        tree.reserve_ids(self.next_id);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::blockstore::MemoryBlockstore;
    use crate::store::block::Block;

    #[test]
    fn test_ids_are_sequential() {
        let mut store = MemoryBlockstore::new();
        let mut set = ActorSet::new();
        let a = set.account(&mut store, KeyScheme::Secp256k1, TokenAmount::from(1u64)).unwrap();
        let b = set.account(&mut store, KeyScheme::Bls, TokenAmount::from(2u64)).unwrap();
        assert_eq!((a.id, b.id), (100, 101));
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn test_rejects_bad_declarations() {
        let mut store = MemoryBlockstore::new();
        let mut set = ActorSet::new();
        let missing = Cid::of(b"absent");
        assert_eq!(
            set.actor(&store, BuiltinActor::Account.code(), None, TokenAmount::zero(), missing),
            Err(ConstructionError::MissingHead(missing))
        );

        let head = store.put(&Block::empty());
        let id = Address::new_id(7);
        assert_eq!(
            set.actor(&store, BuiltinActor::Account.code(), Some(id.clone()), TokenAmount::zero(), head),
            Err(ConstructionError::UnsupportedAddress(id))
        );

        let key = Address::new_key(KeyScheme::Secp256k1, b"k");
        set.actor(&store, BuiltinActor::Account.code(), Some(key.clone()), TokenAmount::zero(), head)
            .unwrap();
        assert_eq!(
            set.account_with_key(&mut store, KeyScheme::Secp256k1, b"k", TokenAmount::zero()),
            Err(ConstructionError::DuplicateAddress(key))
        );
    }
}
