// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pinned randomness.
//!
//! A vector fixes every randomness request the VM will make, so replays never
//! consult a live entropy source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomnessKind {
    Beacon,
    Chain,
}

impl fmt::Display for RandomnessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RandomnessKind::Beacon => "beacon",
            RandomnessKind::Chain => "chain",
        })
    }
}

impl FromStr for RandomnessKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beacon" => Ok(RandomnessKind::Beacon),
            "chain" => Ok(RandomnessKind::Chain),
            other => Err(format!("unknown randomness kind {:?}", other)),
        }
    }
}

/// The request a pinned value answers.
#[derive(Debug, Clone)]
pub struct RandomnessRule {
    pub kind: RandomnessKind,
    /// Domain separation tag.
    pub dst: i64,
    pub epoch: i64,
    /// Absent and empty entropy are the same request.
    pub entropy: Option<Vec<u8>>,
}

impl RandomnessRule {
    pub fn new(kind: RandomnessKind, dst: i64, epoch: i64, entropy: Option<Vec<u8>>) -> Self {
        Self { kind, dst, epoch, entropy }
    }

    pub fn entropy_bytes(&self) -> &[u8] {
        self.entropy.as_deref().unwrap_or(&[])
    }

    pub fn matches(&self, kind: RandomnessKind, dst: i64, epoch: i64, entropy: &[u8]) -> bool {
        self.kind == kind && self.dst == dst && self.epoch == epoch && self.entropy_bytes() == entropy
    }
}

impl PartialEq for RandomnessRule {
    fn eq(&self, other: &Self) -> bool {
        other.matches(self.kind, self.dst, self.epoch, self.entropy_bytes())
    }
}

impl Eq for RandomnessRule {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomnessMatch {
    pub on: RandomnessRule,
    pub ret: Vec<u8>,
}

/// Override table handed to the VM. Lookups take the first matching rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Randomness(pub Vec<RandomnessMatch>);

impl Randomness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, on: RandomnessRule, ret: impl Into<Vec<u8>>) {
        self.0.push(RandomnessMatch { on, ret: ret.into() });
    }

    pub fn lookup(&self, kind: RandomnessKind, dst: i64, epoch: i64, entropy: &[u8]) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|m| m.on.matches(kind, dst, epoch, entropy))
            .map(|m| m.ret.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RandomnessMatch> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_entropy_equals_empty() {
        let absent = RandomnessRule::new(RandomnessKind::Chain, 99, 68592, None);
        let empty = RandomnessRule::new(RandomnessKind::Chain, 99, 68592, Some(Vec::new()));
        assert_eq!(absent, empty);
    }

    #[test]
    fn test_lookup_first_match() {
        let mut table = Randomness::new();
        table.push(RandomnessRule::new(RandomnessKind::Beacon, 5, 10, Some(b"hello world!".to_vec())), b"super random".to_vec());
        table.push(RandomnessRule::new(RandomnessKind::Chain, 99, 68592, None), b"another random value".to_vec());

        assert_eq!(table.lookup(RandomnessKind::Beacon, 5, 10, b"hello world!"), Some(&b"super random"[..]));
        assert_eq!(table.lookup(RandomnessKind::Chain, 99, 68592, b""), Some(&b"another random value"[..]));
        assert_eq!(table.lookup(RandomnessKind::Chain, 5, 10, b"hello world!"), None);
        assert_eq!(table.lookup(RandomnessKind::Beacon, 5, 11, b"hello world!"), None);
    }
}
