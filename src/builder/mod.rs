// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Phased vector construction.
//!
//! ```text
//! Declaring -> PreconditionsCommitted -> Applying -> ApplicationsCommitted -> Asserted
//! ```
//!
//! Every public operation checks the current phase first. A failed
//! `commit_applies` halts the session: all later operations are rejected.

pub mod actors;
pub mod messages;
pub mod phase;

pub use actors::ActorSet;
pub use messages::MessageSet;
pub use phase::Phase;

use crate::assert::{AssertionEngine, ExitCodeIs, Predicate, ReceiptCheck, Returns};
use crate::cid::Cid;
use crate::config::SessionConfig;
use crate::driver::{ApplyRequest, ExecutionDriver, Vm};
use crate::error::{BuilderError, PhaseError, Result};
use crate::schema::{Metadata, Vector};
use crate::state::tree::StateTree;
use crate::store::archive::Archive;
use crate::store::block::Block;
use crate::store::blockstore::{Blockstore, SessionStore, SharedBlockstore};
use crate::types::actor::Actor;
use crate::types::address::{Address, KeyScheme};
use crate::types::message::{Message, MessageDefaults, MessageSpec};
use crate::types::randomness::{Randomness, RandomnessRule};
use crate::types::receipt::{ExitCode, Receipt};
use crate::types::token::TokenAmount;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const BEFORE_APPLY: &[Phase] = &[Phase::Declaring, Phase::PreconditionsCommitted, Phase::Applying];
const BEFORE_ASSERT: &[Phase] = &[
    Phase::Declaring,
    Phase::PreconditionsCommitted,
    Phase::Applying,
    Phase::ApplicationsCommitted,
];

/// Result of a successful `commit_applies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub receipts: Vec<Receipt>,
    pub post_root: Cid,
}

struct Committed {
    root: Cid,
    tree: StateTree,
}

/// One vector authoring session.
pub struct Builder {
    metadata: Metadata,
    selector: Option<BTreeMap<String, String>>,
    config: SessionConfig,
    driver: ExecutionDriver,
    store: SessionStore,
    phase: Phase,
    halted: Option<&'static str>,
    actors: ActorSet,
    messages: MessageSet,
    randomness: Randomness,
    predicates: Vec<Predicate>,
    committed: Option<Committed>,
    applied: Option<Applied>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("id", &self.metadata.id)
            .field("phase", &self.phase)
            .field("halted", &self.halted)
            .field("actors", &self.actors.len())
            .field("messages", &self.messages.len())
            .finish()
    }
}

impl Builder {
    pub fn new(metadata: Metadata, config: SessionConfig, vm: Arc<dyn Vm>) -> Self {
        Self::with_store(metadata, config, vm, SessionStore::new())
    }

    /// A session reading shared fixture blocks. Its own writes stay private.
    pub fn with_fixtures(metadata: Metadata, config: SessionConfig, vm: Arc<dyn Vm>, fixtures: &SharedBlockstore) -> Self {
        Self::with_store(metadata, config, vm, fixtures.session())
    }

    fn with_store(metadata: Metadata, config: SessionConfig, vm: Arc<dyn Vm>, store: SessionStore) -> Self {
        debug!(id = %metadata.id, "Builder session opened");
        Self {
            driver: ExecutionDriver::new(vm, config.deadline),
            messages: MessageSet::new(config.defaults.clone()),
            metadata,
            selector: None,
            config,
            store,
            phase: Phase::Declaring,
            halted: None,
            actors: ActorSet::new(),
            randomness: Randomness::new(),
            predicates: Vec::new(),
            committed: None,
            applied: None,
        }
    }

    fn guard(&self, operation: &'static str, allowed: &[Phase]) -> std::result::Result<(), PhaseError> {
        if let Some(failed) = self.halted {
            return Err(PhaseError::Halted { operation, failed });
        }
        self.phase.require(operation, allowed)
    }

    fn advance(&mut self, to: Phase) {
        if self.phase != to {
            info!(id = %self.metadata.id, from = %self.phase, to = %to, "Phase transition");
            self.phase = to;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn set_selector(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.selector.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
    }

    // Declaring

    /// Declares an account with a key derived from its id.
    pub fn account(&mut self, scheme: KeyScheme, balance: impl Into<TokenAmount>) -> Result<Actor> {
        self.guard("account", &[Phase::Declaring])?;
        Ok(self.actors.account(&mut self.store, scheme, balance.into())?)
    }

    pub fn account_with_key(
        &mut self,
        scheme: KeyScheme,
        public_key: &[u8],
        balance: impl Into<TokenAmount>,
    ) -> Result<Actor> {
        self.guard("account_with_key", &[Phase::Declaring])?;
        Ok(self.actors.account_with_key(&mut self.store, scheme, public_key, balance.into())?)
    }

    /// Declares an actor with arbitrary code. Store its head with [`Self::put_block`] first.
    pub fn actor(
        &mut self,
        code: Cid,
        address: Option<Address>,
        balance: impl Into<TokenAmount>,
        head: Cid,
    ) -> Result<Actor> {
        self.guard("actor", &[Phase::Declaring])?;
        Ok(self.actors.actor(&self.store, code, address, balance.into(), head)?)
    }

    pub fn put_block(&mut self, block: &Block) -> Result<Cid> {
        self.guard("put_block", &[Phase::Declaring])?;
        Ok(self.store.put(block))
    }

    pub fn set_message_defaults(&mut self, defaults: MessageDefaults) -> Result<()> {
        self.guard("set_message_defaults", &[Phase::Declaring])?;
        self.messages.set_defaults(defaults);
        Ok(())
    }

    pub fn pin_randomness(&mut self, rule: RandomnessRule, ret: impl Into<Vec<u8>>) -> Result<()> {
        self.guard("pin_randomness", BEFORE_APPLY)?;
        self.randomness.push(rule, ret);
        Ok(())
    }

    /// Writes the declared actors over the singleton actors and freezes them.
    /// Returns the precondition root.
    pub fn commit_preconditions(&mut self) -> Result<Cid> {
        self.guard("commit_preconditions", &[Phase::Declaring])?;

        let mut tree = StateTree::genesis(&mut self.store)?;
        self.actors.commit(&mut tree)?;
        let root = tree.flush(&mut self.store)?;

        info!(id = %self.metadata.id, root = %root, actors = self.actors.len(), "Preconditions committed");
        self.committed = Some(Committed { root, tree });
        self.advance(Phase::PreconditionsCommitted);
        Ok(root)
    }

    pub fn pre_root(&self) -> Option<Cid> {
        self.committed.as_ref().map(|c| c.root)
    }

    // Applying

    /// Appends a message. Append order is application order.
    pub fn push_message(&mut self, spec: MessageSpec) -> Result<Message> {
        self.guard("push_message", &[Phase::PreconditionsCommitted, Phase::Applying])?;
        let committed = self.committed.as_ref().ok_or(PhaseError::OutOfOrder {
            operation: "push_message",
            phase: self.phase,
        })?;
        let message = self.messages.push(spec, &committed.tree)?.clone();
        self.advance(Phase::Applying);
        Ok(message)
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.messages()
    }

    /// Applies every appended message through the VM in one call.
    pub fn commit_applies(&mut self) -> Result<&Applied> {
        self.guard("commit_applies", &[Phase::PreconditionsCommitted, Phase::Applying])?;
        match self.run_applies() {
            Ok(applied) => {
                info!(
                    id = %self.metadata.id,
                    messages = applied.receipts.len(),
                    post_root = %applied.post_root,
                    "Applications committed"
                );
                self.advance(Phase::ApplicationsCommitted);
                Ok(self.applied.insert(applied))
            }
            Err(e) => {
                warn!(id = %self.metadata.id, error = %e, "Session halted");
                self.halted = Some("commit_applies");
                Err(e)
            }
        }
    }

    fn run_applies(&mut self) -> Result<Applied> {
        let pre_root = self.pre_root().ok_or(PhaseError::OutOfOrder {
            operation: "commit_applies",
            phase: self.phase,
        })?;
        let request = ApplyRequest {
            epoch: self.config.epoch,
            pre_root,
            pre_archive: Archive::snapshot(&self.store, &[pre_root])?,
            messages: self.messages.messages().to_vec(),
            randomness: self.randomness.clone(),
        };

        let outcome = self.driver.apply(request)?;
        outcome.post_archive.load_into(&mut self.store)?;
        Ok(Applied { receipts: outcome.receipts, post_root: outcome.post_root })
    }

    pub fn applied(&self) -> Option<&Applied> {
        self.applied.as_ref()
    }

    // Asserting

    pub fn expect(&mut self, predicate: Predicate) -> Result<()> {
        self.guard("expect", BEFORE_ASSERT)?;
        self.predicates.push(predicate);
        Ok(())
    }

    pub fn expect_exit_code(&mut self, index: usize, code: ExitCode) -> Result<()> {
        self.expect(Predicate::receipt(index, ExitCodeIs(code)))
    }

    /// The return bytes of message `index` decode to `value`.
    pub fn expect_return<T>(&mut self, index: usize, value: T) -> Result<()>
    where
        T: DeserializeOwned + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        self.expect(Predicate::receipt(index, Returns(value)))
    }

    pub fn expect_every_receipt(&mut self, check: impl ReceiptCheck + 'static) -> Result<()> {
        self.expect(Predicate::every_receipt(check))
    }

    pub fn expect_final_root(&mut self, root: Cid) -> Result<()> {
        self.expect(Predicate::FinalRootIs(root))
    }

    /// Evaluates every declared predicate and seals the vector.
    ///
    /// The session moves to `Asserted` whether or not the predicates hold.
    pub fn finish(&mut self) -> Result<Vector> {
        self.guard("finish", &[Phase::ApplicationsCommitted])?;
        let (pre_root, applied) = match (self.pre_root(), self.applied.as_ref()) {
            (Some(pre_root), Some(applied)) => (pre_root, applied),
            _ => {
                return Err(PhaseError::OutOfOrder { operation: "finish", phase: self.phase }.into());
            }
        };

        let engine = AssertionEngine::new(self.config.fail_fast);
        let verdict = engine.evaluate(&self.predicates, &applied.receipts, &applied.post_root);
        let vector = Vector {
            metadata: self.metadata.clone(),
            selector: self.selector.clone(),
            epoch: self.config.epoch,
            pre_root,
            post_root: applied.post_root,
            archive: Archive::snapshot(&self.store, &[pre_root, applied.post_root])?,
            messages: self.messages.messages().to_vec(),
            randomness: self.randomness.clone(),
            receipts: applied.receipts.clone(),
        };
        self.advance(Phase::Asserted);

        verdict.map_err(BuilderError::from)?;
        Ok(vector)
    }
}
