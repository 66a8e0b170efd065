// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Persisted test vectors.
//!
//! A [`Vector`] is stored as one JSON document. Its embedded archive is rooted
//! at both the pre- and post-state so either tree can be rebuilt on replay.
//! Decoding recomputes both roots from the archive and rejects the document
//! if either disagrees with the declared one.

pub mod blob;
pub mod document;

use crate::cid::Cid;
use crate::config::{VECTOR_CLASS, VECTOR_FORMAT_VERSION};
use crate::error::{CorruptArchive, SchemaError};
use crate::state::tree::StateTree;
use crate::store::archive::Archive;
use crate::types::address::Address;
use crate::types::message::Message;
use crate::types::randomness::{Randomness, RandomnessRule};
use crate::types::receipt::{ExitCode, Receipt};
use crate::types::token::TokenAmount;
use document::{
    GenDocument, MessageDocument, MetaDocument, PostconditionsDocument, PreconditionsDocument,
    RandomnessDocument, RandomnessKeyDocument, ReceiptDocument, StateTreeDocument, VectorDocument,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Identity of the tool that produced a vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationData {
    pub source: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub id: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub gen: Vec<GenerationData>,
}

impl Metadata {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn generator(mut self, source: impl Into<String>, version: impl Into<String>) -> Self {
        self.gen.push(GenerationData { source: source.into(), version: version.into() });
        self
    }
}

/// A complete, immutable test vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vector {
    pub metadata: Metadata,
    pub selector: Option<BTreeMap<String, String>>,
    pub epoch: i64,
    pub pre_root: Cid,
    pub post_root: Cid,
    /// Rooted at `[pre_root, post_root]`.
    pub archive: Archive,
    pub messages: Vec<Message>,
    pub randomness: Randomness,
    pub receipts: Vec<Receipt>,
}

impl Vector {
    pub fn pre_state(&self) -> Result<StateTree, SchemaError> {
        Ok(StateTree::load(&self.archive.clone().into_store()?, &self.pre_root)?)
    }

    pub fn post_state(&self) -> Result<StateTree, SchemaError> {
        Ok(StateTree::load(&self.archive.clone().into_store()?, &self.post_root)?)
    }
}

pub fn encode(vector: &Vector) -> Result<Vec<u8>, SchemaError> {
    let document = VectorDocument {
        format_version: VECTOR_FORMAT_VERSION,
        class: VECTOR_CLASS.to_string(),
        selector: vector.selector.clone(),
        meta: MetaDocument {
            id: vector.metadata.id.clone(),
            version: vector.metadata.version.clone(),
            description: vector.metadata.description.clone(),
            comment: vector.metadata.comment.clone(),
            gen: vector
                .metadata
                .gen
                .iter()
                .map(|g| GenDocument { source: g.source.clone(), version: g.version.clone() })
                .collect(),
        },
        car: blob::encode_base64(&blob::compress(&vector.archive.to_bytes())?),
        randomness: vector
            .randomness
            .iter()
            .map(|m| RandomnessDocument {
                on: RandomnessKeyDocument(
                    m.on.kind,
                    m.on.dst,
                    m.on.epoch,
                    m.on.entropy.as_deref().map(blob::encode_base64),
                ),
                ret: blob::encode_base64(&m.ret),
            })
            .collect(),
        preconditions: PreconditionsDocument {
            epoch: vector.epoch,
            state_tree: StateTreeDocument { root_cid: vector.pre_root.to_string() },
        },
        apply_messages: vector.messages.iter().map(message_document).collect(),
        postconditions: PostconditionsDocument {
            state_tree: StateTreeDocument { root_cid: vector.post_root.to_string() },
            receipts: vector
                .receipts
                .iter()
                .map(|r| ReceiptDocument {
                    exit_code: r.exit_code.0,
                    return_data: blob::encode_base64(&r.return_data),
                    gas_used: r.gas_used,
                })
                .collect(),
        },
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

pub fn decode(bytes: &[u8]) -> Result<Vector, SchemaError> {
    let document: VectorDocument = serde_json::from_slice(bytes)?;
    if document.format_version != VECTOR_FORMAT_VERSION {
        return Err(SchemaError::UnsupportedFormat(document.format_version));
    }
    if document.class != VECTOR_CLASS {
        return Err(SchemaError::UnsupportedClass(document.class));
    }

    let car = blob::decompress("car", &blob::decode_base64("car", &document.car)?)?;
    let archive = Archive::from_bytes(&car)?;

    let pre_root = parse_cid("preconditions.state_tree.root_cid", &document.preconditions.state_tree.root_cid)?;
    let post_root = parse_cid("postconditions.state_tree.root_cid", &document.postconditions.state_tree.root_cid)?;
    verify_roots(&archive, pre_root, post_root)?;

    let mut randomness = Randomness::new();
    for r in &document.randomness {
        let RandomnessKeyDocument(kind, dst, epoch, entropy) = &r.on;
        let entropy = entropy
            .as_deref()
            .map(|e| blob::decode_base64("randomness.on.entropy", e))
            .transpose()?;
        randomness.push(
            RandomnessRule::new(*kind, *dst, *epoch, entropy),
            blob::decode_base64("randomness.ret", &r.ret)?,
        );
    }

    let messages = document
        .apply_messages
        .iter()
        .map(message_from_document)
        .collect::<Result<Vec<_>, _>>()?;

    let receipts = document
        .postconditions
        .receipts
        .iter()
        .map(|r| {
            Ok(Receipt {
                exit_code: ExitCode(r.exit_code),
                return_data: blob::decode_base64("receipts.return", &r.return_data)?,
                gas_used: r.gas_used,
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;
    if receipts.len() != messages.len() {
        return Err(SchemaError::ReceiptCountMismatch { messages: messages.len(), receipts: receipts.len() });
    }

    let meta = document.meta;
    debug!(id = %meta.id, messages = messages.len(), blocks = archive.len(), "Vector decoded");

    Ok(Vector {
        metadata: Metadata {
            id: meta.id,
            version: meta.version,
            description: meta.description,
            comment: meta.comment,
            gen: meta
                .gen
                .into_iter()
                .map(|g| GenerationData { source: g.source, version: g.version })
                .collect(),
        },
        selector: document.selector,
        epoch: document.preconditions.epoch,
        pre_root,
        post_root,
        archive,
        messages,
        randomness,
        receipts,
    })
}

pub fn write_to(path: impl AsRef<Path>, vector: &Vector) -> Result<(), SchemaError> {
    fs::write(path, encode(vector)?)?;
    Ok(())
}

pub fn read_from(path: impl AsRef<Path>) -> Result<Vector, SchemaError> {
    decode(&fs::read(path)?)
}

/// The archive must be rooted at exactly `[pre, post]`, and each root must be
/// what the state tree stored under it hashes back to.
fn verify_roots(archive: &Archive, pre_root: Cid, post_root: Cid) -> Result<(), SchemaError> {
    let roots = archive.roots();
    if roots.len() != 2 {
        return Err(CorruptArchive::MalformedBlock {
            cid: roots.first().copied().unwrap_or(pre_root),
            reason: format!("vector archive has {} roots, expected 2", roots.len()),
        }
        .into());
    }

    let store = archive.clone().into_store()?;
    for (declared, stored) in [(pre_root, roots[0]), (post_root, roots[1])] {
        let recomputed = StateTree::load(&store, &stored)?.root()?;
        if recomputed != declared {
            return Err(SchemaError::RootMismatch { declared, recomputed });
        }
    }
    Ok(())
}

fn parse_cid(field: &'static str, text: &str) -> Result<Cid, SchemaError> {
    text.parse().map_err(|_| SchemaError::InvalidCid { field, value: text.to_string() })
}

fn parse_address(field: &'static str, text: &str) -> Result<Address, SchemaError> {
    text.parse().map_err(|_| SchemaError::InvalidAddress { field, value: text.to_string() })
}

fn parse_amount(field: &'static str, text: &str) -> Result<TokenAmount, SchemaError> {
    text.parse().map_err(|_| SchemaError::InvalidInteger { field, value: text.to_string() })
}

fn message_document(m: &Message) -> MessageDocument {
    MessageDocument {
        from: m.from.to_string(),
        to: m.to.to_string(),
        method: m.method,
        params: blob::encode_base64(&m.params),
        nonce: m.nonce,
        value: m.value.to_string(),
        gas_limit: m.gas_limit,
        gas_premium: m.gas_premium.to_string(),
        gas_fee_cap: m.gas_fee_cap.to_string(),
    }
}

fn message_from_document(m: &MessageDocument) -> Result<Message, SchemaError> {
    Ok(Message {
        from: parse_address("apply_messages.from", &m.from)?,
        to: parse_address("apply_messages.to", &m.to)?,
        method: m.method,
        params: blob::decode_base64("apply_messages.params", &m.params)?,
        nonce: m.nonce,
        value: parse_amount("apply_messages.value", &m.value)?,
        gas_limit: m.gas_limit,
        gas_premium: parse_amount("apply_messages.gas_premium", &m.gas_premium)?,
        gas_fee_cap: parse_amount("apply_messages.gas_fee_cap", &m.gas_fee_cap)?,
    })
}
