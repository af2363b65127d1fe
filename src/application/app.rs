use std::sync::Arc;

use crate::application::simulation::{Simulation, SimulationConfig, SimulationReport};
use crate::application::store::Ledger;
use crate::config::Settings;
use crate::domain::config_types::StoreBackend;
use crate::infrastructure::database::PostgresLedger;
use crate::infrastructure::log_messages::application;
use crate::infrastructure::memory::InMemoryLedger;
use crate::Result;
use tracing::{info, instrument};

/// Main application struct that wires the configured store to a simulation
pub struct Application {
    settings: Settings,
    store: Arc<dyn Ledger>,
}

impl Application {
    #[instrument(skip(settings), fields(backend = %settings.store.backend))]
    pub async fn new(settings: Settings) -> Result<Self> {
        let store: Arc<dyn Ledger> = match settings.store.backend {
            StoreBackend::Memory => {
                info!("{}", application::USING_IN_MEMORY_STORE);
                Arc::new(InMemoryLedger::with_config(settings.in_memory_config()))
            }
            StoreBackend::Postgres => {
                info!(
                    host = %settings.database.host,
                    port = settings.database.port,
                    "{}",
                    application::CONNECTING_TO_DATABASE
                );
                let ledger = PostgresLedger::open(
                    &settings.database_url(),
                    settings.database.max_connections,
                    settings.simulation.workers.into_inner(),
                )
                .await?;
                ledger.health_check().await?;
                Arc::new(ledger)
            }
        };

        Ok(Self { settings, store })
    }

    /// Build an application around an already constructed store
    pub fn with_store(settings: Settings, store: Arc<dyn Ledger>) -> Self {
        Self { settings, store }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SimulationReport> {
        let config = self.simulation_config();
        info!(
            workers = %config.workers,
            iterations = %config.iterations,
            mode = %config.locking_mode,
            "{}",
            application::STARTING
        );

        let report = Simulation::new(Arc::clone(&self.store)).run(&config).await?;

        info!(
            passed = report.passed(),
            samples = report.sample_count,
            "{}",
            application::FINISHED
        );
        Ok(report)
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        self.settings.simulation_config()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn Ledger> {
        &self.store
    }
}
