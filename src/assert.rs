// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Postcondition predicates and their evaluation.
//!
//! Predicates run in declaration order against the committed receipts and
//! post root. Every failure is collected unless fail-fast is requested.

use crate::cid::Cid;
use crate::codec;
use crate::error::{AssertionError, AssertionFailures};
use crate::types::receipt::{ExitCode, Receipt};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, warn};

/// Expected and observed renderings of a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: String,
    pub observed: String,
}

impl Mismatch {
    pub fn new(expected: impl fmt::Display, observed: impl fmt::Display) -> Self {
        Self { expected: expected.to_string(), observed: observed.to_string() }
    }
}

/// A condition on a single receipt.
pub trait ReceiptCheck: Send + Sync {
    fn describe(&self) -> String;
    fn check(&self, receipt: &Receipt) -> Result<(), Mismatch>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodeIs(pub ExitCode);

impl ReceiptCheck for ExitCodeIs {
    fn describe(&self) -> String {
        "exit code".to_string()
    }

    fn check(&self, receipt: &Receipt) -> Result<(), Mismatch> {
        if receipt.exit_code == self.0 {
            Ok(())
        } else {
            Err(Mismatch::new(self.0, receipt.exit_code))
        }
    }
}

/// Return bytes decode to a value equal to the expected one.
///
/// Compared after decoding, so two encodings of the same value both pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Returns<T>(pub T);

impl<T> ReceiptCheck for Returns<T>
where
    T: DeserializeOwned + PartialEq + fmt::Debug + Send + Sync,
{
    fn describe(&self) -> String {
        format!("return value ({})", std::any::type_name::<T>())
    }

    fn check(&self, receipt: &Receipt) -> Result<(), Mismatch> {
        match codec::deserialize_params::<T>(&receipt.return_data) {
            Ok(decoded) if decoded == self.0 => Ok(()),
            Ok(decoded) => Err(Mismatch::new(format!("{:?}", self.0), format!("{:?}", decoded))),
            Err(e) => Err(Mismatch::new(
                format!("{:?}", self.0),
                format!("undecodable return 0x{} ({})", hex::encode(&receipt.return_data), e),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasUsedAtMost(pub i64);

impl ReceiptCheck for GasUsedAtMost {
    fn describe(&self) -> String {
        "gas used".to_string()
    }

    fn check(&self, receipt: &Receipt) -> Result<(), Mismatch> {
        if receipt.gas_used <= self.0 {
            Ok(())
        } else {
            Err(Mismatch::new(format!("<= {}", self.0), receipt.gas_used))
        }
    }
}

pub enum Predicate {
    /// Holds for the receipt of the message at `index`.
    Receipt { index: usize, check: Box<dyn ReceiptCheck> },
    /// Holds for every receipt.
    EveryReceipt(Box<dyn ReceiptCheck>),
    FinalRootIs(Cid),
}

impl Predicate {
    pub fn receipt(index: usize, check: impl ReceiptCheck + 'static) -> Self {
        Predicate::Receipt { index, check: Box::new(check) }
    }

    pub fn every_receipt(check: impl ReceiptCheck + 'static) -> Self {
        Predicate::EveryReceipt(Box::new(check))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Receipt { index, check } => write!(f, "Receipt({}, {})", index, check.describe()),
            Predicate::EveryReceipt(check) => write!(f, "EveryReceipt({})", check.describe()),
            Predicate::FinalRootIs(cid) => write!(f, "FinalRootIs({})", cid),
        }
    }
}

pub struct AssertionEngine {
    fail_fast: bool,
}

impl AssertionEngine {
    pub fn new(fail_fast: bool) -> Self {
        Self { fail_fast }
    }

    pub fn evaluate(&self, predicates: &[Predicate], receipts: &[Receipt], post_root: &Cid) -> Result<(), AssertionFailures> {
        let mut failures = Vec::new();

        'predicates: for predicate in predicates {
            let found = match predicate {
                Predicate::Receipt { index, check } => match receipts.get(*index) {
                    Some(receipt) => check
                        .check(receipt)
                        .err()
                        .map(|m| failure(Some(*index), check.describe(), m))
                        .into_iter()
                        .collect(),
                    None => vec![failure(
                        Some(*index),
                        check.describe(),
                        Mismatch::new("a receipt", format!("only {} receipts", receipts.len())),
                    )],
                },
                Predicate::EveryReceipt(check) => {
                    let mut found = Vec::new();
                    for (index, receipt) in receipts.iter().enumerate() {
                        if let Err(m) = check.check(receipt) {
                            found.push(failure(Some(index), format!("every receipt: {}", check.describe()), m));
                            if self.fail_fast {
                                break;
                            }
                        }
                    }
                    found
                }
                Predicate::FinalRootIs(expected) => {
                    if expected == post_root {
                        Vec::new()
                    } else {
                        vec![failure(None, "final state root".to_string(), Mismatch::new(expected, post_root))]
                    }
                }
            };

            for f in found {
                warn!(error = %f, "Assertion failed");
                failures.push(f);
                if self.fail_fast {
                    break 'predicates;
                }
            }
        }

        debug!(predicates = predicates.len(), failures = failures.len(), "Assertions evaluated");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AssertionFailures(failures))
        }
    }
}

fn failure(message: Option<usize>, predicate: String, mismatch: Mismatch) -> AssertionError {
    AssertionError { message, predicate, expected: mismatch.expected, observed: mismatch.observed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_check() {
        let ok = Receipt::new(ExitCode::OK, Vec::new(), 10);
        assert!(ExitCodeIs(ExitCode::OK).check(&ok).is_ok());
        let m = ExitCodeIs(ExitCode::SYS_ERR_OUT_OF_GAS).check(&ok).unwrap_err();
        assert_eq!(m.expected, "SysErrOutOfGas(7)");
        assert_eq!(m.observed, "Ok(0)");
    }

    #[test]
    fn test_gas_bound() {
        let r = Receipt::new(ExitCode::OK, Vec::new(), 10);
        assert!(GasUsedAtMost(10).check(&r).is_ok());
        assert!(GasUsedAtMost(9).check(&r).is_err());
    }
}
