use anyhow::{Context, Result};
use balance_race::config::Settings;
use balance_race::domain::config_types::{
    IterationCount, LogFormat, LogLevel, StoreBackend, WorkerCount,
};
use balance_race::domain::{Balance, LockingMode};
use balance_race::infrastructure::log_messages::verdict;
use balance_race::{Application, SimulationReport};
use clap::Parser;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

/// Hammer two accounts with concurrent transfers and check that their
/// combined balance never changes
#[derive(Parser, Debug)]
#[command(name = "balance-race", version)]
struct Cli {
    /// Row locking used by every transfer: exclusive or none
    #[arg(short, long)]
    mode: Option<LockingMode>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Round trips per worker
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Ledger backend: memory or postgres
    #[arg(long)]
    backend: Option<StoreBackend>,

    /// Seed for the transfer amounts
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    first_balance: Option<i64>,

    #[arg(long)]
    second_balance: Option<i64>,

    /// Print the full report as JSON instead of the verdict lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        let simulation = &mut settings.simulation;
        if let Some(mode) = self.mode {
            simulation.locking_mode = mode;
        }
        if let Some(workers) = self.workers {
            simulation.workers = WorkerCount::try_new(workers).context("invalid --workers")?;
        }
        if let Some(iterations) = self.iterations {
            simulation.iterations =
                IterationCount::try_new(iterations).context("invalid --iterations")?;
        }
        if let Some(balance) = self.first_balance {
            simulation.first_balance = Balance::try_new(balance).context("invalid --first-balance")?;
        }
        if let Some(balance) = self.second_balance {
            simulation.second_balance =
                Balance::try_new(balance).context("invalid --second-balance")?;
        }
        if self.seed.is_some() {
            simulation.seed = self.seed;
        }
        if let Some(backend) = self.backend {
            settings.store.backend = backend;
        }
        Ok(())
    }
}

fn init_tracing(level: LogLevel, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn print_verdict(report: &SimulationReport) {
    if report.passed() {
        println!("{}", verdict::NO_RACE_CONDITIONS);
    } else {
        println!("{}", verdict::RACE_CONDITIONS);
        println!("{}", verdict::WRONG_SUMS);
        for value in &report.violating_samples {
            println!("{value}");
        }
    }
    for worker in report.failed_workers() {
        if let Some(failure) = &worker.failure {
            eprintln!("worker {} stopped early: {failure}", worker.worker);
        }
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::new().context("failed to load configuration")?;
    cli.apply(&mut settings)?;

    init_tracing(settings.logging.level, settings.logging.format);
    info!(mode = %settings.simulation.locking_mode, "Starting balance race");

    let app = Application::new(settings).await?;
    let report = app.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_verdict(&report);
    }

    Ok(())
}
