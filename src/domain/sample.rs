//! Invariant samples: recorded observations of the two-account total

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};

use super::account::Balance;

/// One observation of the summed balances, taken inside a transfer's transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantSample {
    pub value: i64,
    pub recorded_at: DateTime<Utc>,
}

impl InvariantSample {
    pub fn new(value: i64, recorded_at: DateTime<Utc>) -> Self {
        Self { value, recorded_at }
    }
}

/// The conserved quantity: the sum of both initial balances
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
pub struct ExpectedTotal(i64);

impl ExpectedTotal {
    /// Total of the given starting balances, `None` on overflow
    pub fn of(balances: &[Balance]) -> Option<Self> {
        balances
            .iter()
            .try_fold(0i64, |sum, balance| sum.checked_add(balance.into_inner()))
            .and_then(|sum| Self::try_new(sum).ok())
    }

    pub fn is_violated_by(self, value: i64) -> bool {
        value != self.into_inner()
    }

    /// Values that disagree with the expected total, in their original order
    pub fn violations<'a>(self, values: impl IntoIterator<Item = &'a i64>) -> Vec<i64> {
        values
            .into_iter()
            .copied()
            .filter(|value| self.is_violated_by(*value))
            .collect()
    }
}
