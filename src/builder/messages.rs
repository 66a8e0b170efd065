// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The ordered message sequence of a vector.

use crate::error::ConstructionError;
use crate::state::tree::StateTree;
use crate::types::address::ActorId;
use crate::types::message::{Message, MessageDefaults, MessageSpec};
use rustc_hash::FxHashMap;

/// Messages in application order.
///
/// Gas fields missing from a [`MessageSpec`] come from the session defaults;
/// a missing nonce is the sender's next one in append order.
#[derive(Debug, Clone, Default)]
pub struct MessageSet {
    defaults: MessageDefaults,
    messages: Vec<Message>,
    next_nonce: FxHashMap<ActorId, u64>,
}

impl MessageSet {
    pub fn new(defaults: MessageDefaults) -> Self {
        Self { defaults, messages: Vec::new(), next_nonce: FxHashMap::default() }
    }

    pub fn defaults(&self) -> &MessageDefaults {
        &self.defaults
    }

    pub fn set_defaults(&mut self, defaults: MessageDefaults) {
        self.defaults = defaults;
    }

    /// Resolves and appends `spec`. The sender must exist in `committed`.
    pub fn push(&mut self, spec: MessageSpec, committed: &StateTree) -> Result<&Message, ConstructionError> {
        let index = self.messages.len();
        let (sender, state) = committed
            .resolve(&spec.from)?
            .ok_or_else(|| ConstructionError::UnknownSender(spec.from.clone()))?;

        let gas_limit = spec
            .gas_limit
            .or(self.defaults.gas_limit)
            .ok_or(ConstructionError::MissingGasField { index, field: "gas_limit" })?;
        if gas_limit <= 0 {
            return Err(ConstructionError::NonPositiveGasLimit(gas_limit));
        }
        let gas_premium = spec
            .gas_premium
            .or_else(|| self.defaults.gas_premium.clone())
            .ok_or(ConstructionError::MissingGasField { index, field: "gas_premium" })?;
        let gas_fee_cap = spec
            .gas_fee_cap
            .or_else(|| self.defaults.gas_fee_cap.clone())
            .ok_or(ConstructionError::MissingGasField { index, field: "gas_fee_cap" })?;

        let expected = self.next_nonce.get(&sender).copied().unwrap_or(state.nonce);
        let nonce = spec.nonce.unwrap_or(expected);
        let following = nonce
            .checked_add(1)
            .ok_or_else(|| ConstructionError::NonceOverflow(spec.from.clone()))?;
        self.next_nonce.insert(sender, following);

        self.messages.push(Message {
            from: spec.from,
            to: spec.to,
            method: spec.method,
            params: spec.params,
            nonce,
            value: spec.value,
            gas_limit,
            gas_premium,
            gas_fee_cap,
        });
        Ok(&self.messages[index])
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
