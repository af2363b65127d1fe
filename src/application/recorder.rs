//! Invariant recorder
//!
//! Takes one reading of the summed balances inside the caller's transaction
//! and appends it as a sample. Values are persisted unconditionally: judging
//! them happens after the run, so a wrong total gets committed and observed
//! instead of being rolled back out of sight.

use chrono::Utc;
use tracing::{instrument, warn};

use crate::application::store::{LedgerTransaction, StoreResult};
use crate::domain::{AccountPair, ExpectedTotal, InvariantSample};
use crate::infrastructure::log_messages::transfer;

#[derive(Debug, Clone, Copy)]
pub struct InvariantRecorder {
    accounts: AccountPair,
    expected: ExpectedTotal,
}

impl InvariantRecorder {
    pub fn new(accounts: AccountPair, expected: ExpectedTotal) -> Self {
        Self { accounts, expected }
    }

    pub fn expected(&self) -> ExpectedTotal {
        self.expected
    }

    /// Read the total and append it as a sample, inside `tx`
    ///
    /// Must run after the transfer's writes are staged and before commit.
    #[instrument(level = "trace", skip(self, tx))]
    pub async fn record_sample(
        &self,
        tx: &mut (dyn LedgerTransaction + '_),
    ) -> StoreResult<InvariantSample> {
        let value = tx.total_balance(&self.accounts.ids()).await?;
        let sample = tx.append_sample(value, Utc::now()).await?;

        if self.expected.is_violated_by(sample.value) {
            warn!(
                sum = sample.value,
                expected = %self.expected,
                "{}",
                transfer::RACE_CONDITION
            );
        }

        Ok(sample)
    }
}
