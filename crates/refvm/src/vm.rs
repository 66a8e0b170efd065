// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Message application.
//!
//! Per message: charge inclusion gas, validate the sender, escrow
//! `gas_fee_cap * gas_limit`, bump the nonce, then run the call against a
//! checkpoint of the tree. A failed call restores the checkpoint. Gas actually
//! used is burnt and the rest of the escrow refunded.

use crate::chaos;
use crate::error::{ActorError, ActorResult};
use crate::gas::{self, GasTracker};
use tracing::{debug, info};
use tvx_core::driver::{ApplyOutcome, ApplyRequest, CancelToken, Vm};
use tvx_core::error::{StoreError, VmFault};
use tvx_core::state::StateTree;
use tvx_core::store::archive::Archive;
use tvx_core::store::blockstore::MemoryBlockstore;
use tvx_core::types::actor::ActorState;
use tvx_core::types::address::{ActorId, Address};
use tvx_core::types::builtin::{BuiltinActor, BURNT_FUNDS_ACTOR_ID};
use tvx_core::types::message::{Message, METHOD_SEND};
use tvx_core::types::randomness::Randomness;
use tvx_core::types::receipt::{ExitCode, Receipt};
use tvx_core::types::token::TokenAmount;

fn fatal(e: StoreError) -> VmFault {
    VmFault::Rejected(e.to_string())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceVm;

impl ReferenceVm {
    pub fn new() -> Self {
        Self
    }

    fn apply_message(
        &self,
        store: &mut MemoryBlockstore,
        tree: &mut StateTree,
        request: &ApplyRequest,
        cancel: &CancelToken,
        message: &Message,
    ) -> Result<Receipt, VmFault> {
        let inclusion = gas::inclusion_cost(message.params.len());
        if message.gas_limit < inclusion {
            return Ok(Receipt::failed(ExitCode::SYS_ERR_OUT_OF_GAS, 0));
        }

        let Some((sender_id, sender)) = tree.resolve(&message.from).map_err(fatal)? else {
            return Ok(Receipt::failed(ExitCode::SYS_ERR_SENDER_INVALID, 0));
        };
        if BuiltinActor::from_code(&sender.code) != Some(BuiltinActor::Account) {
            return Ok(Receipt::failed(ExitCode::SYS_ERR_SENDER_INVALID, 0));
        }
        if message.nonce != sender.nonce {
            return Ok(Receipt::failed(ExitCode::SYS_ERR_SENDER_STATE_INVALID, 0));
        }
        let escrow = message.gas_fee_cap.times_gas(message.gas_limit);
        let (Some(balance), Some(nonce)) = (sender.balance.checked_sub(&escrow), sender.nonce.checked_add(1)) else {
            return Ok(Receipt::failed(ExitCode::SYS_ERR_SENDER_STATE_INVALID, 0));
        };
        let sender = ActorState { balance, nonce, ..sender.clone() };
        tree.set_actor(sender_id, sender).map_err(fatal)?;

        let checkpoint = tree.clone();
        let mut inv = Invocation {
            store: &mut *store,
            tree: &mut *tree,
            gas: GasTracker::new(message.gas_limit, inclusion),
            randomness: &request.randomness,
            epoch: request.epoch,
            cancel,
        };
        let result = inv.send(sender_id, message);
        let gas_used = inv.gas.used();

        let (exit_code, ret) = match result {
            Ok(ret) => (ExitCode::OK, ret),
            Err(ActorError::Exit { code, msg }) => {
                debug!(exit_code = %code, reason = %msg, "Message reverted");
                *tree = checkpoint;
                (code, Vec::new())
            }
            Err(ActorError::Fatal(fault)) => return Err(fault),
        };

        let unused = message.gas_limit - gas_used;
        credit(tree, sender_id, &message.gas_fee_cap.times_gas(unused)).map_err(fatal)?;
        credit(tree, BURNT_FUNDS_ACTOR_ID, &message.gas_fee_cap.times_gas(gas_used)).map_err(fatal)?;
        Ok(Receipt::new(exit_code, ret, gas_used))
    }
}

impl Vm for ReferenceVm {
    fn apply_messages(&self, request: &ApplyRequest, cancel: &CancelToken) -> Result<ApplyOutcome, VmFault> {
        let mut store = request
            .pre_archive
            .clone()
            .into_store()
            .map_err(|e| VmFault::Rejected(format!("pre-state archive: {}", e)))?;
        let mut tree = StateTree::load(&store, &request.pre_root).map_err(fatal)?;

        let mut receipts = Vec::with_capacity(request.messages.len());
        for (index, message) in request.messages.iter().enumerate() {
            cancel.check()?;
            let receipt = self.apply_message(&mut store, &mut tree, request, cancel, message)?;
            debug!(index, exit_code = %receipt.exit_code, gas_used = receipt.gas_used, "Message applied");
            receipts.push(receipt);
        }

        let post_root = tree.flush(&mut store).map_err(fatal)?;
        let post_archive = Archive::snapshot(&store, &[post_root]).map_err(VmFault::InvalidPostArchive)?;
        info!(messages = receipts.len(), epoch = request.epoch, post_root = %post_root, "Reference VM applied messages");
        Ok(ApplyOutcome { receipts, post_root, post_archive })
    }
}

fn credit(tree: &mut StateTree, id: ActorId, amount: &TokenAmount) -> Result<(), StoreError> {
    if amount.is_zero() {
        return Ok(());
    }
    if let Some(state) = tree.get_actor(id)?.cloned() {
        tree.set_actor(id, ActorState { balance: &state.balance + amount, ..state })?;
    }
    Ok(())
}

/// Mutable view of the world for the duration of one message.
pub struct Invocation<'a> {
    pub store: &'a mut MemoryBlockstore,
    pub tree: &'a mut StateTree,
    pub gas: GasTracker,
    pub randomness: &'a Randomness,
    pub epoch: i64,
    pub cancel: &'a CancelToken,
}

impl Invocation<'_> {
    fn send(&mut self, from: ActorId, message: &Message) -> ActorResult<Vec<u8>> {
        self.gas.charge(gas::METHOD_INVOCATION, "method invocation")?;
        let to = self.resolve_or_create(&message.to)?;

        if !message.value.is_zero() {
            self.gas.charge(gas::VALUE_TRANSFER, "value transfer")?;
            self.transfer(from, to, &message.value)?;
        }
        self.cancel.check()?;
        if message.method == METHOD_SEND {
            return Ok(Vec::new());
        }

        let code = match self.tree.get_actor(to)? {
            Some(state) => state.code,
            None => return Err(ActorError::exit(ExitCode::SYS_ERR_INVALID_RECEIVER, format!("actor {} missing", to))),
        };
        match BuiltinActor::from_code(&code) {
            Some(BuiltinActor::Chaos) => chaos::invoke(self, to, message.method, &message.params),
            Some(builtin) => Err(ActorError::exit(
                ExitCode::SYS_ERR_INVALID_METHOD,
                format!("{} has no method {}", builtin.name(), message.method),
            )),
            None => Err(ActorError::exit(ExitCode::SYS_ERR_ILLEGAL_ACTOR, format!("unknown code {}", code))),
        }
    }

    /// Key addresses with no actor behind them get a fresh account.
    fn resolve_or_create(&mut self, address: &Address) -> ActorResult<ActorId> {
        if let Some(id) = self.tree.lookup_id(address)? {
            if self.tree.get_actor(id)?.is_some() {
                return Ok(id);
            }
        }
        match address {
            Address::Key { .. } => {
                self.gas.charge(gas::CREATE_ACTOR, "account creation")?;
                let id = self.tree.allocate_id();
                let head = StateTree::account_head(&mut *self.store, address)?;
                self.tree.register_address(address, id)?;
                self.tree.set_actor(
                    id,
                    ActorState { code: BuiltinActor::Account.code(), head, nonce: 0, balance: TokenAmount::zero() },
                )?;
                debug!(id, address = %address, "Account created on first receipt");
                Ok(id)
            }
            _ => Err(ActorError::exit(
                ExitCode::SYS_ERR_INVALID_RECEIVER,
                format!("no actor at {}", address),
            )),
        }
    }

    fn transfer(&mut self, from: ActorId, to: ActorId, value: &TokenAmount) -> ActorResult<()> {
        let sender = self
            .tree
            .get_actor(from)?
            .cloned()
            .ok_or_else(|| ActorError::exit(ExitCode::SYS_ERR_SENDER_INVALID, format!("actor {} missing", from)))?;
        let remaining = sender.balance.checked_sub(value).ok_or_else(|| {
            ActorError::exit(
                ExitCode::SYS_ERR_INSUFFICIENT_FUNDS,
                format!("balance {} below transfer of {}", sender.balance, value),
            )
        })?;
        if from == to {
            return Ok(());
        }
        self.tree.set_actor(from, ActorState { balance: remaining, ..sender })?;
        credit(self.tree, to, value)?;
        Ok(())
    }
}
