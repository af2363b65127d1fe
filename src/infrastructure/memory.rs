//! In-memory ledger store with real row locks
//!
//! Committed rows live behind a `parking_lot` mutex. Each row also owns a
//! `tokio` mutex that plays the exclusive row lock: a transaction takes it on
//! a locked read or on its first write to the row and keeps it until commit or
//! rollback. Writes are staged in the transaction and published atomically on
//! commit, so concurrent readers see read-committed state.
//!
//! There is no wait-for graph. A lock wait that outlasts
//! [`InMemoryConfig::lock_wait`] fails with [`StoreError::LockConflict`],
//! which is how lock-ordering deadlocks get broken.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

use crate::application::store::{
    LedgerSession, LedgerStore, LedgerTransaction, SampleStore, StoreError, StoreResult,
};
use crate::domain::{Account, AccountId, AccountName, Balance, InvariantSample, LockingMode};

/// Tuning knobs for the in-memory store
#[derive(Debug, Clone, Copy)]
pub struct InMemoryConfig {
    /// Longest a transaction waits on a row lock before giving up
    pub lock_wait: Duration,
    /// Yield to the scheduler before every statement, standing in for a
    /// database round trip so that concurrent transactions interleave
    pub interleave: bool,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(50),
            interleave: true,
        }
    }
}

/// Injected store failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    failing_session: Option<usize>,
    after_transactions: u64,
}

impl FaultPlan {
    pub fn none() -> Self {
        Self::default()
    }

    /// The `session`-th opened session (zero based) fails every `begin` once
    /// it has started `transactions` transactions
    pub fn fail_session_after(session: usize, transactions: u64) -> Self {
        Self {
            failing_session: Some(session),
            after_transactions: transactions,
        }
    }

    fn fails(&self, session: usize, begun: u64) -> bool {
        self.failing_session == Some(session) && begun >= self.after_transactions
    }
}

#[derive(Debug)]
struct Row {
    account: Account,
    lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug, Default)]
struct Tables {
    last_account_id: i64,
    accounts: BTreeMap<AccountId, Row>,
    samples: Vec<InvariantSample>,
}

#[derive(Debug)]
struct Shared {
    config: InMemoryConfig,
    faults: FaultPlan,
    sessions_opened: AtomicUsize,
    tables: Mutex<Tables>,
}

impl Shared {
    async fn pause(&self) {
        if self.config.interleave {
            tokio::task::yield_now().await;
        }
    }

    fn row_lock(&self, id: AccountId) -> StoreResult<Arc<tokio::sync::Mutex<()>>> {
        let tables = self.tables.lock();
        tables
            .accounts
            .get(&id)
            .map(|row| Arc::clone(&row.lock))
            .ok_or(StoreError::AccountNotFound(id))
    }
}

/// Shared in-process ledger; clones refer to the same data
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    shared: Arc<Shared>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_config_and_faults(InMemoryConfig::default(), FaultPlan::none())
    }

    pub fn with_config(config: InMemoryConfig) -> Self {
        Self::with_config_and_faults(config, FaultPlan::none())
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self::with_config_and_faults(InMemoryConfig::default(), faults)
    }

    pub fn with_config_and_faults(config: InMemoryConfig, faults: FaultPlan) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                faults,
                sessions_opened: AtomicUsize::new(0),
                tables: Mutex::new(Tables::default()),
            }),
        }
    }

    pub fn config(&self) -> InMemoryConfig {
        self.shared.config
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn connect(&self) -> StoreResult<Box<dyn LedgerSession>> {
        let index = self.shared.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
            index,
            begun: 0,
        }))
    }

    async fn create_account(&self, name: &AccountName, balance: Balance) -> StoreResult<Account> {
        self.shared.pause().await;
        let mut tables = self.shared.tables.lock();
        if tables
            .accounts
            .values()
            .any(|row| row.account.name == *name)
        {
            return Err(StoreError::DuplicateAccountName(name.to_string()));
        }

        tables.last_account_id += 1;
        let account = Account {
            id: AccountId::new(tables.last_account_id),
            name: name.clone(),
            balance,
        };
        tables.accounts.insert(
            account.id,
            Row {
                account: account.clone(),
                lock: Arc::new(tokio::sync::Mutex::new(())),
            },
        );
        Ok(account)
    }

    async fn delete_all_accounts(&self) -> StoreResult<()> {
        self.shared.pause().await;
        self.shared.tables.lock().accounts.clear();
        Ok(())
    }

    async fn accounts(&self) -> StoreResult<Vec<Account>> {
        self.shared.pause().await;
        let tables = self.shared.tables.lock();
        Ok(tables
            .accounts
            .values()
            .map(|row| row.account.clone())
            .collect())
    }
}

#[async_trait]
impl SampleStore for InMemoryLedger {
    async fn delete_all_samples(&self) -> StoreResult<()> {
        self.shared.pause().await;
        self.shared.tables.lock().samples.clear();
        Ok(())
    }

    async fn sample_values(&self) -> StoreResult<Vec<i64>> {
        self.shared.pause().await;
        let tables = self.shared.tables.lock();
        Ok(tables.samples.iter().map(|sample| sample.value).collect())
    }

    async fn samples(&self) -> StoreResult<Vec<InvariantSample>> {
        self.shared.pause().await;
        Ok(self.shared.tables.lock().samples.clone())
    }
}

struct MemorySession {
    shared: Arc<Shared>,
    index: usize,
    begun: u64,
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn begin<'s>(&'s mut self) -> StoreResult<Box<dyn LedgerTransaction + 's>> {
        self.shared.pause().await;
        if self.shared.faults.fails(self.index, self.begun) {
            return Err(StoreError::backend(format!(
                "injected fault in session {}",
                self.index
            )));
        }
        self.begun += 1;
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            locks: HashMap::new(),
            writes: BTreeMap::new(),
            samples: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    shared: Arc<Shared>,
    locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    writes: BTreeMap<AccountId, Balance>,
    samples: Vec<InvariantSample>,
}

impl MemoryTransaction {
    async fn lock(&mut self, id: AccountId) -> StoreResult<()> {
        if self.locks.contains_key(&id) {
            return Ok(());
        }

        let row_lock = self.shared.row_lock(id)?;
        let lock_wait = self.shared.config.lock_wait;
        match tokio::time::timeout(lock_wait, row_lock.lock_owned()).await {
            Ok(guard) => {
                self.locks.insert(id, guard);
                Ok(())
            }
            Err(_) => Err(StoreError::lock_conflict(format!(
                "waited more than {lock_wait:?} for the row lock on account {id}"
            ))),
        }
    }

    fn balance_of(&self, tables: &Tables, id: AccountId) -> StoreResult<Balance> {
        if let Some(staged) = self.writes.get(&id) {
            return Ok(*staged);
        }
        tables
            .accounts
            .get(&id)
            .map(|row| row.account.balance)
            .ok_or(StoreError::AccountNotFound(id))
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn get(&mut self, id: AccountId, mode: LockingMode) -> StoreResult<Account> {
        self.shared.pause().await;
        if mode.locks_rows() {
            self.lock(id).await?;
        }

        let tables = self.shared.tables.lock();
        let mut account = tables
            .accounts
            .get(&id)
            .map(|row| row.account.clone())
            .ok_or(StoreError::AccountNotFound(id))?;
        if let Some(staged) = self.writes.get(&id) {
            account.balance = *staged;
        }
        Ok(account)
    }

    async fn update(&mut self, id: AccountId, balance: Balance) -> StoreResult<()> {
        self.shared.pause().await;
        self.lock(id).await?;
        self.writes.insert(id, balance);
        Ok(())
    }

    async fn total_balance(&mut self, ids: &[AccountId]) -> StoreResult<i64> {
        self.shared.pause().await;
        let tables = self.shared.tables.lock();
        let mut total = 0i64;
        for id in ids {
            let balance = self.balance_of(&tables, *id)?;
            total = total
                .checked_add(balance.into_inner())
                .ok_or_else(|| StoreError::backend("total balance overflows i64"))?;
        }
        Ok(total)
    }

    async fn append_sample(
        &mut self,
        value: i64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<InvariantSample> {
        self.shared.pause().await;
        let sample = InvariantSample::new(value, recorded_at);
        self.samples.push(sample.clone());
        Ok(sample)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.shared.pause().await;
        let mut this = *self;
        {
            let mut tables = this.shared.tables.lock();
            if let Some(missing) = this
                .writes
                .keys()
                .find(|id| !tables.accounts.contains_key(id))
            {
                return Err(StoreError::AccountNotFound(*missing));
            }
            for (id, balance) in &this.writes {
                if let Some(row) = tables.accounts.get_mut(id) {
                    row.account.balance = *balance;
                }
            }
            tables.samples.append(&mut this.samples);
        }
        // Row locks are released as `this` drops
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.shared.pause().await;
        Ok(())
    }
}
