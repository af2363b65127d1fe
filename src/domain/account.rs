//! Account records and the balance arithmetic transfers are built from
//!
//! Balances are validated newtypes so that a negative balance cannot be
//! constructed; debiting goes through [`Balance::debit`], which refuses to
//! overdraw instead of wrapping below zero.

use derive_more::Display;
use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Store-assigned identity of an account
///
/// Identities are ordered, which is what lock acquisition relies on to avoid
/// lock-ordering deadlocks.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct AccountId(i64);

/// Unique human-readable account name
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct AccountName(String);

/// Non-negative account balance
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        Display
    )
)]
pub struct Balance(i64);

impl Balance {
    pub fn zero() -> Self {
        Self::try_new(0).expect("zero is a valid balance")
    }

    /// Remove `amount` from this balance, or `None` when it would go negative
    pub fn debit(self, amount: TransferAmount) -> Option<Self> {
        self.into_inner()
            .checked_sub(amount.into_inner())
            .and_then(|value| Self::try_new(value).ok())
    }

    /// Add `amount` to this balance, or `None` on overflow
    pub fn credit(self, amount: TransferAmount) -> Option<Self> {
        self.into_inner()
            .checked_add(amount.into_inner())
            .and_then(|value| Self::try_new(value).ok())
    }

    pub fn covers(self, amount: TransferAmount) -> bool {
        self.into_inner() >= amount.into_inner()
    }
}

/// Strictly positive amount of money moved by one transfer
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        Display
    )
)]
pub struct TransferAmount(i64);

/// One persisted account row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display("{name}#{id} ({balance})")]
pub struct Account {
    pub id: AccountId,
    pub name: AccountName,
    pub balance: Balance,
}

/// The two accounts a simulation moves money between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPair {
    pub first: AccountId,
    pub second: AccountId,
}

impl AccountPair {
    pub fn new(first: AccountId, second: AccountId) -> Self {
        Self { first, second }
    }

    pub fn ids(&self) -> [AccountId; 2] {
        [self.first, self.second]
    }
}
