//! Integer minor-unit money types.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are whole minor units (the smallest currency unit, e.g. 1 VND). `Money` can never be
//! negative; signed deltas written to the ledger use `SignedMoney`. Every arithmetic operation is
//! checked and reports overflow instead of wrapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by money arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The result does not fit the representation.
    #[error("Money arithmetic overflow")]
    Overflow,

    /// A non-negative amount was asked to go below zero.
    #[error("Amount would become negative: {0}")]
    Negative(i64),
}

/// A non-negative amount in minor currency units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

/// A signed amount in minor currency units (credit positive, debit negative).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SignedMoney(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn new(minor_units: u64) -> Self {
        Self(minor_units)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> u64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Subtracts `other`, failing rather than going below zero.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        match self.0.checked_sub(other.0) {
            Some(value) => Ok(Self(value)),
            None => Err(MoneyError::Negative(
                self.as_signed()?.minor_units() - other.as_signed()?.minor_units(),
            )),
        }
    }

    /// Converts to a signed amount with the same sign (a credit).
    pub fn as_signed(self) -> Result<SignedMoney, MoneyError> {
        i64::try_from(self.0)
            .map(SignedMoney)
            .map_err(|_| MoneyError::Overflow)
    }

    /// Converts to a negated signed amount (a debit).
    pub fn as_debit(self) -> Result<SignedMoney, MoneyError> {
        self.as_signed().map(|signed| SignedMoney(-signed.0))
    }

    /// Sums a sequence of amounts.
    pub fn try_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl SignedMoney {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates a signed amount from minor units.
    #[must_use]
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Returns true if the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the magnitude as `Money`.
    #[must_use]
    pub const fn magnitude(self) -> Money {
        Money(self.0.unsigned_abs())
    }

    /// Adds two signed amounts.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Subtracts two signed amounts.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Applies this delta to a non-negative base, failing if the result is negative.
    pub fn apply_to(self, base: Money) -> Result<Money, MoneyError> {
        let result = base.as_signed()?.checked_add(self)?;
        Money::try_from(result)
    }

    /// `minuend - subtrahend` as a signed amount.
    pub fn difference(minuend: Money, subtrahend: Money) -> Result<Self, MoneyError> {
        minuend.as_signed()?.checked_sub(subtrahend.as_signed()?)
    }
}

impl TryFrom<SignedMoney> for Money {
    type Error = MoneyError;

    fn try_from(value: SignedMoney) -> Result<Self, Self::Error> {
        u64::try_from(value.0)
            .map(Self)
            .map_err(|_| MoneyError::Negative(value.0))
    }
}

impl TryFrom<i64> for Money {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_from(SignedMoney(value))
    }
}

impl TryFrom<Money> for i64 {
    type Error = MoneyError;

    fn try_from(value: Money) -> Result<Self, Self::Error> {
        value.as_signed().map(SignedMoney::minor_units)
    }
}

impl From<u32> for Money {
    fn from(value: u32) -> Self {
        Self(u64::from(value))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for SignedMoney {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
