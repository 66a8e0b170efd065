// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Wire layout of the persisted vector document.
//!
//! Every struct rejects unknown fields and every non-optional field is
//! required. Token amounts are decimal strings, byte blobs are base64,
//! cids are hex.

use crate::types::randomness::RandomnessKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorDocument {
    pub format_version: u32,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<BTreeMap<String, String>>,
    #[serde(rename = "_meta")]
    pub meta: MetaDocument,
    /// Gzip-compressed archive, base64.
    pub car: String,
    #[serde(default)]
    pub randomness: Vec<RandomnessDocument>,
    pub preconditions: PreconditionsDocument,
    pub apply_messages: Vec<MessageDocument>,
    pub postconditions: PostconditionsDocument,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub gen: Vec<GenDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenDocument {
    pub source: String,
    pub version: String,
}

/// `on` is the positional tuple `[kind, dst, epoch, entropy]`; entropy may be
/// `null` or left out.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomnessDocument {
    pub on: RandomnessKeyDocument,
    pub ret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomnessKeyDocument(
    pub RandomnessKind,
    pub i64,
    pub i64,
    #[serde(default)] pub Option<String>,
);

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreconditionsDocument {
    pub epoch: i64,
    pub state_tree: StateTreeDocument,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateTreeDocument {
    pub root_cid: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDocument {
    pub from: String,
    pub to: String,
    pub method: u64,
    pub params: String,
    pub nonce: u64,
    pub value: String,
    pub gas_limit: i64,
    pub gas_premium: String,
    pub gas_fee_cap: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostconditionsDocument {
    pub state_tree: StateTreeDocument,
    pub receipts: Vec<ReceiptDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiptDocument {
    pub exit_code: u32,
    #[serde(rename = "return")]
    pub return_data: String,
    pub gas_used: i64,
}
