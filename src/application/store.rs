//! Storage abstractions the harness runs against
//!
//! A [`LedgerStore`] persists accounts and hands out independent
//! [`LedgerSession`]s, one per concurrent worker. Sessions open
//! [`LedgerTransaction`]s, which carry the row-level primitives the transfer
//! engine composes: locked or unlocked reads, staged writes, a scoped total
//! read and the sample append. A [`SampleStore`] exposes the recorded samples
//! once the workers are done.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Account, AccountId, AccountName, Balance, InvariantSample, LockingMode};

/// Failures reported by a ledger store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Deadlock, lock wait timeout or serialization failure. The transaction
    /// is unusable and must be rolled back; nothing it staged takes effect.
    #[error("Lock conflict: {reason}")]
    LockConflict { reason: String },

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account name already taken: {0}")]
    DuplicateAccountName(String),

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn lock_conflict(reason: impl Into<String>) -> Self {
        Self::LockConflict {
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Self::LockConflict { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Account persistence plus a source of independent sessions
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a session with its own connection to the store
    async fn connect(&self) -> StoreResult<Box<dyn LedgerSession>>;

    async fn create_account(&self, name: &AccountName, balance: Balance) -> StoreResult<Account>;

    async fn delete_all_accounts(&self) -> StoreResult<()>;

    /// Every account, ordered by id
    async fn accounts(&self) -> StoreResult<Vec<Account>>;
}

/// Read access to and reset of the recorded invariant samples
#[async_trait]
pub trait SampleStore: Send + Sync {
    async fn delete_all_samples(&self) -> StoreResult<()>;

    /// Recorded values, oldest first
    async fn sample_values(&self) -> StoreResult<Vec<i64>>;

    async fn samples(&self) -> StoreResult<Vec<InvariantSample>>;
}

/// A store that keeps both accounts and samples
pub trait Ledger: LedgerStore + SampleStore {}

impl<T> Ledger for T where T: LedgerStore + SampleStore + ?Sized {}

/// One worker's connection to the store
#[async_trait]
pub trait LedgerSession: Send {
    async fn begin<'s>(&'s mut self) -> StoreResult<Box<dyn LedgerTransaction + 's>>;
}

/// A unit of work against the store
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Read an account, first taking its exclusive row lock when `mode` asks
    /// for it. Blocks while another transaction holds the lock.
    async fn get(&mut self, id: AccountId, mode: LockingMode) -> StoreResult<Account>;

    /// Overwrite a balance. Takes the row lock if this transaction does not
    /// hold it yet, the way an SQL `UPDATE` does.
    async fn update(&mut self, id: AccountId, balance: Balance) -> StoreResult<()>;

    /// Sum of the given accounts' balances as one read, scoped to this
    /// transaction (its own staged writes included)
    async fn total_balance(&mut self, ids: &[AccountId]) -> StoreResult<i64>;

    async fn append_sample(
        &mut self,
        value: i64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<InvariantSample>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
