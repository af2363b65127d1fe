//! Transfer requests and their outcomes

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::account::{AccountId, TransferAmount};
use super::sample::InvariantSample;

/// Move `amount` from one account to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display("{from} -> {to}: {amount}")]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: TransferAmount,
}

impl TransferRequest {
    pub fn new(from: AccountId, to: AccountId, amount: TransferAmount) -> Self {
        Self { from, to, amount }
    }

    pub fn is_self_transfer(&self) -> bool {
        self.from == self.to
    }
}

/// What became of one transfer attempt
///
/// None of these is an error: a store failure is reported through `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// Both balances changed and the post-transfer total was sampled
    Applied(InvariantSample),
    /// The source balance could not cover the amount; nothing changed
    InsufficientFunds,
    /// The store gave up on a lock conflict or deadlock and rolled back
    Aborted,
}

impl TransferOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Running count of transfer outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTally {
    pub applied: u64,
    pub insufficient_funds: u64,
    pub aborted: u64,
}

impl TransferTally {
    pub fn record(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Applied(_) => self.applied += 1,
            TransferOutcome::InsufficientFunds => self.insufficient_funds += 1,
            TransferOutcome::Aborted => self.aborted += 1,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.applied += other.applied;
        self.insufficient_funds += other.insufficient_funds;
        self.aborted += other.aborted;
    }

    pub fn attempts(&self) -> u64 {
        self.applied + self.insufficient_funds + self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn tally_counts_each_outcome_kind() {
        let mut tally = TransferTally::default();
        tally.record(&TransferOutcome::Applied(InvariantSample::new(150, Utc::now())));
        tally.record(&TransferOutcome::InsufficientFunds);
        tally.record(&TransferOutcome::InsufficientFunds);
        tally.record(&TransferOutcome::Aborted);

        assert_eq!(tally.applied, 1);
        assert_eq!(tally.insufficient_funds, 2);
        assert_eq!(tally.aborted, 1);
        assert_eq!(tally.attempts(), 4);
    }

    #[test]
    fn tallies_merge_field_by_field() {
        let mut left = TransferTally {
            applied: 3,
            insufficient_funds: 1,
            aborted: 0,
        };
        left.merge(&TransferTally {
            applied: 2,
            insufficient_funds: 0,
            aborted: 4,
        });
        assert_eq!(
            left,
            TransferTally {
                applied: 5,
                insufficient_funds: 1,
                aborted: 4,
            }
        );
    }

    #[test]
    fn self_transfers_are_detected() {
        let id = AccountId::new(1);
        let amount = TransferAmount::try_new(10).unwrap();
        assert!(TransferRequest::new(id, id, amount).is_self_transfer());
        assert!(!TransferRequest::new(id, AccountId::new(2), amount).is_self_transfer());
    }
}
