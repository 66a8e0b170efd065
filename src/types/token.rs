// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Arbitrary-precision non-negative token amounts.

use super::is_canonical_decimal;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid token amount: {0:?}")]
pub struct AmountError(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount(pub BigUint);

impl TokenAmount {
    pub fn zero() -> Self {
        TokenAmount(BigUint::zero())
    }

    pub fn from_atto(atto: impl Into<BigUint>) -> Self {
        TokenAmount(atto.into())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_sub(&self, other: &TokenAmount) -> Option<TokenAmount> {
        if self.0 < other.0 {
            None
        } else {
            Some(TokenAmount(&self.0 - &other.0))
        }
    }

    /// Amount times a gas quantity. Non-positive quantities yield zero.
    pub fn times_gas(&self, gas: i64) -> TokenAmount {
        if gas <= 0 {
            return TokenAmount::zero();
        }
        TokenAmount(&self.0 * BigUint::from(gas as u64))
    }
}

impl Add for TokenAmount {
    type Output = TokenAmount;

    fn add(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a TokenAmount> for &'a TokenAmount {
    type Output = TokenAmount;

    fn add(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&TokenAmount> for TokenAmount {
    fn add_assign(&mut self, rhs: &TokenAmount) {
        self.0 += &rhs.0;
    }
}

impl From<u64> for TokenAmount {
    fn from(v: u64) -> Self {
        TokenAmount(BigUint::from(v))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    /// Decimal digits only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_canonical_decimal(s) {
            return Err(AmountError(s.to_string()));
        }
        BigUint::from_str(s).map(TokenAmount).map_err(|_| AmountError(s.to_string()))
    }
}
