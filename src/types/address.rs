// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Actor addresses.
//!
//! Byte form: `[protocol][payload]`.
//! Text form: `t<protocol><payload>`; ids in decimal, hashes in hex,
//! delegated as `t4<namespace>f<hex subaddress>`.

use super::{is_canonical_decimal, is_canonical_hex};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;
use thiserror::Error;

pub type ActorId = u64;

pub const PAYLOAD_HASH_LEN: usize = 20;
pub const MAX_SUBADDRESS_LEN: usize = 54;

const PROTOCOL_ID: u8 = 0;
const PROTOCOL_SECP256K1: u8 = 1;
const PROTOCOL_ACTOR: u8 = 2;
const PROTOCOL_BLS: u8 = 3;
const PROTOCOL_DELEGATED: u8 = 4;

const NETWORK_PREFIX: char = 't';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,
    #[error("Unknown address protocol: {0}")]
    UnknownProtocol(String),
    #[error("Invalid address payload: {0}")]
    InvalidPayload(String),
    #[error("Delegated subaddress too long: {0} bytes")]
    SubaddressTooLong(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyScheme {
    Secp256k1,
    Bls,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    /// Numeric actor id assigned by the state tree.
    Id(ActorId),
    /// Hash of a public key.
    Key { scheme: KeyScheme, hash: [u8; PAYLOAD_HASH_LEN] },
    /// Hash of the data an actor was created from.
    Actor([u8; PAYLOAD_HASH_LEN]),
    /// Address owned by the actor at `namespace`.
    Delegated { namespace: ActorId, subaddress: Vec<u8> },
}

fn payload_hash(data: &[u8]) -> [u8; PAYLOAD_HASH_LEN] {
    let digest = blake3::hash(data);
    let mut out = [0u8; PAYLOAD_HASH_LEN];
    out.copy_from_slice(&digest.as_bytes()[..PAYLOAD_HASH_LEN]);
    out
}

impl Address {
    pub const fn new_id(id: ActorId) -> Self {
        Address::Id(id)
    }

    pub fn new_key(scheme: KeyScheme, public_key: &[u8]) -> Self {
        Address::Key { scheme, hash: payload_hash(public_key) }
    }

    pub fn new_actor(seed: &[u8]) -> Self {
        Address::Actor(payload_hash(seed))
    }

    pub fn new_delegated(namespace: ActorId, subaddress: &[u8]) -> Result<Self, AddressError> {
        if subaddress.len() > MAX_SUBADDRESS_LEN {
            return Err(AddressError::SubaddressTooLong(subaddress.len()));
        }
        Ok(Address::Delegated { namespace, subaddress: subaddress.to_vec() })
    }

    pub fn protocol(&self) -> u8 {
        match self {
            Address::Id(_) => PROTOCOL_ID,
            Address::Key { scheme: KeyScheme::Secp256k1, .. } => PROTOCOL_SECP256K1,
            Address::Actor(_) => PROTOCOL_ACTOR,
            Address::Key { scheme: KeyScheme::Bls, .. } => PROTOCOL_BLS,
            Address::Delegated { .. } => PROTOCOL_DELEGATED,
        }
    }

    pub fn id(&self) -> Option<ActorId> {
        match self {
            Address::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Address::Id(_))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.protocol()];
        match self {
            Address::Id(id) => out.extend_from_slice(&id.to_le_bytes()),
            Address::Key { hash, .. } | Address::Actor(hash) => out.extend_from_slice(hash),
            Address::Delegated { namespace, subaddress } => {
                out.extend_from_slice(&namespace.to_le_bytes());
                out.extend_from_slice(subaddress);
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let mut cursor = Cursor::new(bytes);
        let protocol = cursor.read_u8().map_err(|_| AddressError::Empty)?;
        let short = |_| AddressError::InvalidPayload(format!("{} bytes", bytes.len()));

        let address = match protocol {
            PROTOCOL_ID => Address::Id(cursor.read_u64::<LittleEndian>().map_err(short)?),
            PROTOCOL_SECP256K1 | PROTOCOL_BLS | PROTOCOL_ACTOR => {
                let mut hash = [0u8; PAYLOAD_HASH_LEN];
                cursor.read_exact(&mut hash).map_err(short)?;
                match protocol {
                    PROTOCOL_SECP256K1 => Address::Key { scheme: KeyScheme::Secp256k1, hash },
                    PROTOCOL_BLS => Address::Key { scheme: KeyScheme::Bls, hash },
                    _ => Address::Actor(hash),
                }
            }
            PROTOCOL_DELEGATED => {
                let namespace = cursor.read_u64::<LittleEndian>().map_err(short)?;
                let mut subaddress = Vec::new();
                cursor.read_to_end(&mut subaddress).map_err(short)?;
                return Address::new_delegated(namespace, &subaddress);
            }
            other => return Err(AddressError::UnknownProtocol(other.to_string())),
        };

        if cursor.position() as usize != bytes.len() {
            return Err(AddressError::InvalidPayload(format!("{} bytes", bytes.len())));
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NETWORK_PREFIX, self.protocol())?;
        match self {
            Address::Id(id) => write!(f, "{}", id),
            Address::Key { hash, .. } | Address::Actor(hash) => f.write_str(&hex::encode(hash)),
            Address::Delegated { namespace, subaddress } => {
                write!(f, "{}f{}", namespace, hex::encode(subaddress))
            }
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(NETWORK_PREFIX) => {}
            Some(_) => return Err(AddressError::UnknownProtocol(s.to_string())),
            None => return Err(AddressError::Empty),
        }
        let protocol = chars.next().ok_or(AddressError::Empty)?;
        let payload = chars.as_str();
        let invalid = || AddressError::InvalidPayload(payload.to_string());
        let decimal = |text: &str| -> Result<ActorId, AddressError> {
            if !is_canonical_decimal(text) {
                return Err(invalid());
            }
            text.parse::<ActorId>().map_err(|_| invalid())
        };
        if !is_canonical_hex(payload) {
            return Err(invalid());
        }

        let hash = |scheme: Option<KeyScheme>| -> Result<Address, AddressError> {
            let mut out = [0u8; PAYLOAD_HASH_LEN];
            hex::decode_to_slice(payload, &mut out).map_err(|_| invalid())?;
            Ok(match scheme {
                Some(scheme) => Address::Key { scheme, hash: out },
                None => Address::Actor(out),
            })
        };

        match protocol {
            '0' => decimal(payload).map(Address::Id),
            '1' => hash(Some(KeyScheme::Secp256k1)),
            '2' => hash(None),
            '3' => hash(Some(KeyScheme::Bls)),
            '4' => {
                let (namespace, sub) = payload.split_once('f').ok_or_else(invalid)?;
                let namespace = decimal(namespace)?;
                let subaddress = hex::decode(sub).map_err(|_| invalid())?;
                Address::new_delegated(namespace, &subaddress)
            }
            other => Err(AddressError::UnknownProtocol(other.to_string())),
        }
    }
}
