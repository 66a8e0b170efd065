// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Messages and the session defaults applied to them.

use crate::cid::Cid;
use crate::codec;
use crate::error::CodecError;
use crate::types::address::Address;
use crate::types::token::TokenAmount;
use serde::{Deserialize, Serialize};

pub type MethodNum = u64;

/// Plain value transfer.
pub const METHOD_SEND: MethodNum = 0;
pub const METHOD_CONSTRUCTOR: MethodNum = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub method: MethodNum,
    pub params: Vec<u8>,
    pub nonce: u64,
    pub value: TokenAmount,
    pub gas_limit: i64,
    pub gas_premium: TokenAmount,
    pub gas_fee_cap: TokenAmount,
}

impl Message {
    /// Funds the sender must hold for the message to be applied at all.
    pub fn required_funds(&self) -> TokenAmount {
        &self.value + &self.gas_fee_cap.times_gas(self.gas_limit)
    }

    pub fn cid(&self) -> Result<Cid, CodecError> {
        Ok(Cid::of(&codec::serialize_params(self)?))
    }
}

/// Gas fields filled into any message that omits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDefaults {
    pub gas_limit: Option<i64>,
    pub gas_premium: Option<TokenAmount>,
    pub gas_fee_cap: Option<TokenAmount>,
}

impl MessageDefaults {
    pub fn new(gas_limit: i64, gas_premium: impl Into<TokenAmount>, gas_fee_cap: impl Into<TokenAmount>) -> Self {
        Self {
            gas_limit: Some(gas_limit),
            gas_premium: Some(gas_premium.into()),
            gas_fee_cap: Some(gas_fee_cap.into()),
        }
    }
}

/// A message as declared by a generator, before defaults and nonces are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub from: Address,
    pub to: Address,
    pub method: MethodNum,
    pub params: Vec<u8>,
    /// `None` takes the sender's next nonce in append order.
    pub nonce: Option<u64>,
    pub value: TokenAmount,
    pub gas_limit: Option<i64>,
    pub gas_premium: Option<TokenAmount>,
    pub gas_fee_cap: Option<TokenAmount>,
}

impl MessageSpec {
    pub fn raw(from: Address, to: Address, method: MethodNum, params: Vec<u8>) -> Self {
        Self {
            from,
            to,
            method,
            params,
            nonce: None,
            value: TokenAmount::zero(),
            gas_limit: None,
            gas_premium: None,
            gas_fee_cap: None,
        }
    }

    pub fn send(from: Address, to: Address, value: impl Into<TokenAmount>) -> Self {
        Self::raw(from, to, METHOD_SEND, Vec::new()).value(value)
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn value(mut self, value: impl Into<TokenAmount>) -> Self {
        self.value = value.into();
        self
    }

    pub fn gas_limit(mut self, gas_limit: i64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_premium(mut self, premium: impl Into<TokenAmount>) -> Self {
        self.gas_premium = Some(premium.into());
        self
    }

    pub fn gas_fee_cap(mut self, fee_cap: impl Into<TokenAmount>) -> Self {
        self.gas_fee_cap = Some(fee_cap.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_funds() {
        let msg = Message {
            from: Address::new_id(100),
            to: Address::new_id(101),
            method: METHOD_SEND,
            params: Vec::new(),
            nonce: 0,
            value: TokenAmount::from(5u64),
            gas_limit: 1_000,
            gas_premium: TokenAmount::from(1u64),
            gas_fee_cap: TokenAmount::from(200u64),
        };
        assert_eq!(msg.required_funds(), TokenAmount::from(200_005u64));
    }

    #[test]
    fn test_spec_builder_keeps_unset_fields_open() {
        let spec = MessageSpec::send(Address::new_id(100), Address::new_id(101), 7u64).gas_limit(10);
        assert_eq!(spec.value, TokenAmount::from(7u64));
        assert_eq!(spec.gas_limit, Some(10));
        assert_eq!(spec.gas_premium, None);
        assert_eq!(spec.nonce, None);
    }
}
