//! Simulation orchestrator
//!
//! Resets the ledger to two accounts, fans out concurrent workers that shuttle
//! random amounts back and forth through the [`TransferEngine`], joins them
//! all, then scans the recorded invariant samples for totals that differ from
//! the sum of the initial balances.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Barrier;
use tracing::{debug, error, info, instrument, warn};

use crate::application::recorder::InvariantRecorder;
use crate::application::store::{Ledger, LedgerSession, LedgerStore, SampleStore};
use crate::application::transfer::TransferEngine;
use crate::domain::config_types::{IterationCount, WorkerCount};
use crate::domain::{
    Account, AccountName, AccountPair, Balance, ExpectedTotal, LockingMode, TransferAmount,
    TransferRequest, TransferTally,
};
use crate::infrastructure::log_messages::simulation;
use crate::{Error, Result};

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub workers: WorkerCount,
    pub iterations: IterationCount,
    pub locking_mode: LockingMode,
    pub first_name: AccountName,
    pub first_balance: Balance,
    pub second_name: AccountName,
    pub second_balance: Balance,
    /// Seed for the transfer amounts; a random one is drawn when absent.
    /// Worker `n` uses `seed + n`.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn new(workers: WorkerCount, iterations: IterationCount, locking_mode: LockingMode) -> Self {
        Self {
            workers,
            iterations,
            locking_mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_balances(mut self, first: Balance, second: Balance) -> Self {
        self.first_balance = first;
        self.second_balance = second;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The conserved total; transfer amounts are drawn from `1..=total`, so it
    /// must be positive
    pub fn expected_total(&self) -> Result<ExpectedTotal> {
        let total = ExpectedTotal::of(&[self.first_balance, self.second_balance])
            .ok_or_else(|| Error::invalid_input("simulation balances", "sum overflows"))?;
        if total.into_inner() == 0 {
            return Err(Error::invalid_input(
                "simulation balances",
                "at least one initial balance must be positive",
            ));
        }
        if self.first_name == self.second_name {
            return Err(Error::invalid_input(
                "simulation account names",
                "the two accounts need distinct names",
            ));
        }
        Ok(total)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers: WorkerCount::default(),
            iterations: IterationCount::default(),
            locking_mode: LockingMode::default(),
            first_name: AccountName::try_new("User1".to_string())
                .expect("Default account name is valid"),
            first_balance: Balance::try_new(100).expect("Default balance is valid"),
            second_name: AccountName::try_new("User2".to_string())
                .expect("Default account name is valid"),
            second_balance: Balance::try_new(50).expect("Default balance is valid"),
            seed: None,
        }
    }
}

/// What one worker got through before it stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker: usize,
    pub completed_iterations: usize,
    pub tally: TransferTally,
    /// Set when a store failure (or a crash) ended the worker early
    pub failure: Option<String>,
}

impl WorkerReport {
    fn new(worker: usize) -> Self {
        Self {
            worker,
            completed_iterations: 0,
            tally: TransferTally::default(),
            failure: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Outcome of a full simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub locking_mode: LockingMode,
    pub seed: u64,
    pub expected_total: ExpectedTotal,
    pub sample_count: usize,
    /// Recorded totals that differ from `expected_total`, in recording order
    pub violating_samples: Vec<i64>,
    pub tally: TransferTally,
    pub workers: Vec<WorkerReport>,
    pub final_accounts: Vec<Account>,
}

impl SimulationReport {
    /// No recorded sample broke the invariant
    pub fn passed(&self) -> bool {
        self.violating_samples.is_empty()
    }

    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers.iter().filter(|worker| worker.failed())
    }

    pub fn final_total(&self) -> i64 {
        self.final_accounts
            .iter()
            .map(|account| account.balance.into_inner())
            .sum()
    }
}

/// Drives simulations against one ledger
#[derive(Clone)]
pub struct Simulation {
    store: Arc<dyn Ledger>,
}

impl Simulation {
    pub fn new(store: Arc<dyn Ledger>) -> Self {
        Self { store }
    }

    /// Delete every account and sample, then create the two starting accounts
    #[instrument(skip(self, config))]
    pub async fn reset(&self, config: &SimulationConfig) -> Result<AccountPair> {
        info!("{}", simulation::RESETTING);
        self.store.delete_all_samples().await?;
        self.store.delete_all_accounts().await?;

        let first = self
            .store
            .create_account(&config.first_name, config.first_balance)
            .await?;
        let second = self
            .store
            .create_account(&config.second_name, config.second_balance)
            .await?;

        Ok(AccountPair::new(first.id, second.id))
    }

    /// Reset, fan out, join, verify
    ///
    /// Store failures end only the worker that hit them; the run still waits
    /// for every other worker and reports on what was recorded.
    #[instrument(
        skip(self, config),
        fields(
            workers = %config.workers,
            iterations = %config.iterations,
            mode = %config.locking_mode
        )
    )]
    pub async fn run(&self, config: &SimulationConfig) -> Result<SimulationReport> {
        let expected = config.expected_total()?;
        let accounts = self.reset(config).await?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        info!(seed, expected_total = %expected, "{}", simulation::STARTING);

        let engine = TransferEngine::new(
            config.locking_mode,
            InvariantRecorder::new(accounts, expected),
        );
        let workers = config.workers.into_inner();
        let start_line = Arc::new(Barrier::new(workers));

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let plan = WorkerPlan {
                    worker,
                    iterations: config.iterations.into_inner(),
                    accounts,
                    total: expected,
                    seed: seed.wrapping_add(worker as u64),
                };
                tokio::spawn(run_worker(
                    Arc::clone(&self.store),
                    engine,
                    Arc::clone(&start_line),
                    plan,
                ))
            })
            .collect();

        let mut reports = Vec::with_capacity(workers);
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(join_error) => {
                    error!(worker, error = %join_error, "{}", simulation::WORKER_PANICKED);
                    let mut report = WorkerReport::new(worker);
                    report.failure = Some(
                        Error::Worker {
                            worker,
                            message: join_error.to_string(),
                        }
                        .to_string(),
                    );
                    reports.push(report);
                }
            }
        }

        info!("{}", simulation::VERIFYING);
        let values = self.store.sample_values().await?;
        let violating_samples = expected.violations(&values);
        let final_accounts = self.store.accounts().await?;

        let mut tally = TransferTally::default();
        for report in &reports {
            tally.merge(&report.tally);
        }

        Ok(SimulationReport {
            locking_mode: config.locking_mode,
            seed,
            expected_total: expected,
            sample_count: values.len(),
            violating_samples,
            tally,
            workers: reports,
            final_accounts,
        })
    }
}

/// Run a simulation with the default balances and names and return the
/// violating sample values, empty when the invariant held
pub async fn run_simulation(
    store: Arc<dyn Ledger>,
    workers: WorkerCount,
    iterations: IterationCount,
    locking_mode: LockingMode,
) -> Result<Vec<i64>> {
    let config = SimulationConfig::new(workers, iterations, locking_mode);
    let report = Simulation::new(store).run(&config).await?;
    Ok(report.violating_samples)
}

#[derive(Debug, Clone, Copy)]
struct WorkerPlan {
    worker: usize,
    iterations: usize,
    accounts: AccountPair,
    total: ExpectedTotal,
    seed: u64,
}

impl WorkerPlan {
    /// Uniform in `1..=total`
    fn random_amount(&self, rng: &mut StdRng) -> Result<TransferAmount> {
        let value = rng.random_range(1..=self.total.into_inner());
        TransferAmount::try_new(value)
            .map_err(|e| Error::invalid_input("transfer amount", e.to_string()))
    }
}

async fn run_worker(
    store: Arc<dyn Ledger>,
    engine: TransferEngine,
    start_line: Arc<Barrier>,
    plan: WorkerPlan,
) -> WorkerReport {
    let mut report = WorkerReport::new(plan.worker);

    // Connect before the barrier so every worker starts transferring together
    let session = store.connect().await;
    start_line.wait().await;
    let mut session = match session {
        Ok(session) => session,
        Err(store_error) => {
            let failure = Error::from(store_error);
            warn!(worker = plan.worker, error = %failure, "{}", simulation::WORKER_FAILED);
            report.failure = Some(failure.to_string());
            return report;
        }
    };

    info!(worker = plan.worker, "{}", simulation::WORKER_STARTED);
    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(plan.seed);

    for iteration in 0..plan.iterations {
        debug!(
            worker = plan.worker,
            iteration,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "{}",
            simulation::ITERATION_STARTED
        );

        let round = run_iteration(&engine, session.as_mut(), &plan, &mut rng, &mut report).await;
        if let Err(failure) = round {
            warn!(
                worker = plan.worker,
                iteration,
                error = %failure,
                "{}",
                simulation::WORKER_FAILED
            );
            report.failure = Some(failure.to_string());
            return report;
        }
        report.completed_iterations += 1;
    }

    info!(
        worker = plan.worker,
        elapsed_secs = started.elapsed().as_secs_f64(),
        applied = report.tally.applied,
        aborted = report.tally.aborted,
        "{}",
        simulation::WORKER_FINISHED
    );
    report
}

/// One round trip: first -> second, then second -> first
async fn run_iteration(
    engine: &TransferEngine,
    session: &mut (dyn LedgerSession + '_),
    plan: &WorkerPlan,
    rng: &mut StdRng,
    report: &mut WorkerReport,
) -> Result<()> {
    let AccountPair { first, second } = plan.accounts;
    for (from, to) in [(first, second), (second, first)] {
        let amount = plan.random_amount(rng)?;
        let outcome = engine
            .transfer(&mut *session, TransferRequest::new(from, to, amount))
            .await?;
        report.tally.record(&outcome);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryLedger;

    fn config(workers: usize, iterations: usize, mode: LockingMode) -> SimulationConfig {
        SimulationConfig::new(
            WorkerCount::try_new(workers).unwrap(),
            IterationCount::try_new(iterations).unwrap(),
            mode,
        )
        .with_seed(7)
    }

    #[test]
    fn default_config_mirrors_the_classic_setup() {
        let config = SimulationConfig::default();
        assert_eq!(*config.workers.as_ref(), 10);
        assert_eq!(*config.iterations.as_ref(), 10);
        assert_eq!(config.expected_total().unwrap().into_inner(), 150);
        assert_eq!(config.locking_mode, LockingMode::Exclusive);
    }

    #[test]
    fn zero_total_is_rejected() {
        let config = SimulationConfig::default().with_balances(Balance::zero(), Balance::zero());
        assert!(matches!(
            config.expected_total(),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut config = SimulationConfig::default();
        config.second_name = config.first_name.clone();
        assert!(config.expected_total().is_err());
    }

    #[test]
    fn random_amounts_stay_within_one_and_total() {
        let plan = WorkerPlan {
            worker: 0,
            iterations: 1,
            accounts: AccountPair::new(
                crate::domain::AccountId::new(1),
                crate::domain::AccountId::new(2),
            ),
            total: ExpectedTotal::try_new(3).unwrap(),
            seed: 1,
        };
        let mut rng = StdRng::seed_from_u64(plan.seed);
        for _ in 0..200 {
            let amount = plan.random_amount(&mut rng).unwrap().into_inner();
            assert!((1..=3).contains(&amount));
        }
    }

    #[tokio::test]
    async fn reset_twice_leaves_two_fresh_accounts_and_no_samples() {
        let store = InMemoryLedger::new();
        let simulation = Simulation::new(Arc::new(store.clone()));
        let config = SimulationConfig::default();

        simulation.reset(&config).await.unwrap();
        simulation.reset(&config).await.unwrap();

        let accounts = store.accounts().await.unwrap();
        let balances: Vec<i64> = accounts.iter().map(|a| a.balance.into_inner()).collect();
        assert_eq!(balances, vec![100, 50]);
        assert!(store.sample_values().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn exclusive_run_conserves_total_and_counts_samples() {
        let store = InMemoryLedger::new();
        let simulation = Simulation::new(Arc::new(store.clone()));

        let report = simulation
            .run(&config(4, 5, LockingMode::Exclusive))
            .await
            .unwrap();

        assert!(report.passed(), "violations: {:?}", report.violating_samples);
        assert_eq!(report.sample_count as u64, report.tally.applied);
        assert_eq!(report.tally.attempts(), 4 * 5 * 2);
        assert_eq!(report.final_total(), 150);
        assert_eq!(report.failed_workers().count(), 0);
        assert_eq!(report.seed, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_simulation_returns_only_violations() {
        let store: Arc<dyn Ledger> = Arc::new(InMemoryLedger::new());
        let violations = run_simulation(
            store,
            WorkerCount::try_new(3).unwrap(),
            IterationCount::try_new(3).unwrap(),
            LockingMode::Exclusive,
        )
        .await
        .unwrap();
        assert!(violations.is_empty());
    }
}
