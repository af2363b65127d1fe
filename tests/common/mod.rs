//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use balance_race::application::store::{Ledger, LedgerStore};
use balance_race::domain::config_types::{IterationCount, WorkerCount};
use balance_race::domain::{AccountName, AccountPair, Balance, LockingMode};
use balance_race::infrastructure::memory::{InMemoryConfig, InMemoryLedger};
use balance_race::SimulationConfig;

pub fn name(value: &str) -> AccountName {
    AccountName::try_new(value.to_string()).expect("test account name is valid")
}

pub fn balance(value: i64) -> Balance {
    Balance::try_new(value).expect("test balance is valid")
}

pub fn config(workers: usize, iterations: usize, mode: LockingMode) -> SimulationConfig {
    SimulationConfig::new(
        WorkerCount::try_new(workers).expect("test worker count is valid"),
        IterationCount::try_new(iterations).expect("test iteration count is valid"),
        mode,
    )
}

/// In-memory store with a short lock wait so deadlocks resolve quickly
pub fn quick_store() -> InMemoryLedger {
    InMemoryLedger::with_config(InMemoryConfig {
        lock_wait: Duration::from_millis(10),
        interleave: true,
    })
}

pub fn shared(store: &InMemoryLedger) -> Arc<dyn Ledger> {
    Arc::new(store.clone())
}

/// User1 with 100 and User2 with 50
pub async fn seeded(store: &InMemoryLedger) -> AccountPair {
    let first = store
        .create_account(&name("User1"), balance(100))
        .await
        .expect("create User1");
    let second = store
        .create_account(&name("User2"), balance(50))
        .await
        .expect("create User2");
    AccountPair::new(first.id, second.id)
}

pub async fn balances(store: &InMemoryLedger) -> Vec<i64> {
    store
        .accounts()
        .await
        .expect("list accounts")
        .into_iter()
        .map(|account| account.balance.into_inner())
        .collect()
}
