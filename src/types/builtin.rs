// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Builtin actor code and singleton addresses.

use crate::cid::Cid;
use crate::types::address::{ActorId, Address};

pub const SYSTEM_ACTOR_ID: ActorId = 0;
pub const SYSTEM_ACTOR_ADDR: Address = Address::new_id(SYSTEM_ACTOR_ID);

pub const INIT_ACTOR_ID: ActorId = 1;
pub const INIT_ACTOR_ADDR: Address = Address::new_id(INIT_ACTOR_ID);

pub const CHAOS_ACTOR_ID: ActorId = 98;
pub const CHAOS_ACTOR_ADDR: Address = Address::new_id(CHAOS_ACTOR_ID);

pub const BURNT_FUNDS_ACTOR_ID: ActorId = 99;
pub const BURNT_FUNDS_ACTOR_ADDR: Address = Address::new_id(BURNT_FUNDS_ACTOR_ID);

/// First id handed to declared actors.
pub const FIRST_NON_SINGLETON_ID: ActorId = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinActor {
    System,
    Init,
    Account,
    Chaos,
}

impl BuiltinActor {
    pub const ALL: [BuiltinActor; 4] = [
        BuiltinActor::System,
        BuiltinActor::Init,
        BuiltinActor::Account,
        BuiltinActor::Chaos,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinActor::System => "tvx/1/system",
            BuiltinActor::Init => "tvx/1/init",
            BuiltinActor::Account => "tvx/1/account",
            BuiltinActor::Chaos => "tvx/1/chaos",
        }
    }

    pub fn code(self) -> Cid {
        Cid::builtin(self.name())
    }

    pub fn from_code(code: &Cid) -> Option<Self> {
        Self::ALL.into_iter().find(|actor| actor.code() == *code)
    }
}
