// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Vector data model: addresses, amounts, messages, receipts, randomness, actors.

pub mod address;
pub mod token;
pub mod message;
pub mod receipt;
pub mod randomness;
pub mod actor;
pub mod builtin;

pub use address::{ActorId, Address, KeyScheme};
pub use actor::{AccountState, Actor, ActorState};
pub use builtin::BuiltinActor;
pub use message::{Message, MessageDefaults, MessageSpec, MethodNum};
pub use randomness::{Randomness, RandomnessKind, RandomnessMatch, RandomnessRule};
pub use receipt::{ExitCode, Receipt};
pub use token::TokenAmount;

/// Unsigned decimal with no sign, separators or leading zeros. The only text
/// form the codec writes, so the only one it reads.
pub(crate) fn is_canonical_decimal(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) && (text == "0" || !text.starts_with('0'))
}

/// Lowercase hex, as written by `hex::encode`.
pub(crate) fn is_canonical_hex(text: &str) -> bool {
    !text.bytes().any(|b| b.is_ascii_uppercase())
}
