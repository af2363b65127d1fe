use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::application::simulation::SimulationConfig;
use crate::domain::config_types::{
    DatabasePassword, IterationCount, LockWaitMs, LogFormat, LogLevel, MaxConnections,
    StoreBackend, WorkerCount,
};
use crate::domain::{AccountName, Balance, LockingMode};
use crate::infrastructure::memory::InMemoryConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub store: StoreSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSettings {
    pub workers: WorkerCount,
    pub iterations: IterationCount,
    pub locking_mode: LockingMode,
    pub first_name: AccountName,
    pub first_balance: Balance,
    pub second_name: AccountName,
    pub second_balance: Balance,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub lock_wait_ms: LockWaitMs,
    pub interleave: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: DatabasePassword,
    pub database_name: String,
    pub max_connections: MaxConnections,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::builder()?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("BALANCE_RACE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with a single configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("simulation.workers", 10)?
            .set_default("simulation.iterations", 10)?
            .set_default("simulation.locking_mode", "exclusive")?
            .set_default("simulation.first_name", "User1")?
            .set_default("simulation.first_balance", 100)?
            .set_default("simulation.second_name", "User2")?
            .set_default("simulation.second_balance", 50)?
            .set_default("store.backend", "memory")?
            .set_default("store.lock_wait_ms", 50)?
            .set_default("store.interleave", true)?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.username", "postgres")?
            .set_default("database.password", "password")?
            .set_default("database.database_name", "balance_race")?
            .set_default("database.max_connections", 16)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password.as_ref(),
            self.database.host,
            self.database.port,
            self.database.database_name
        )
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        let simulation = &self.simulation;
        SimulationConfig {
            workers: simulation.workers,
            iterations: simulation.iterations,
            locking_mode: simulation.locking_mode,
            first_name: simulation.first_name.clone(),
            first_balance: simulation.first_balance,
            second_name: simulation.second_name.clone(),
            second_balance: simulation.second_balance,
            seed: simulation.seed,
        }
    }

    pub fn in_memory_config(&self) -> InMemoryConfig {
        InMemoryConfig {
            lock_wait: self.store.lock_wait_ms.as_duration(),
            interleave: self.store.interleave,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_settings_can_be_loaded() {
        let settings = Settings::new();
        assert!(settings.is_ok());
    }

    #[test]
    fn test_defaults_describe_the_classic_run() {
        let settings = Settings::new().unwrap();
        let config = settings.simulation_config();
        assert_eq!(config.expected_total().unwrap().into_inner(), 150);
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert!(settings.store.interleave);
    }

    #[test]
    fn test_database_url_format() {
        let settings = Settings::new().unwrap();
        let url = settings.database_url();
        assert!(url.starts_with("postgres://"));
        assert!(url.contains(&settings.database.username));
        assert!(url.contains(&settings.database.database_name));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[simulation]
workers = 3
locking_mode = "none"
seed = 42

[store]
lock_wait_ms = 5
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(*settings.simulation.workers.as_ref(), 3);
        assert_eq!(settings.simulation.locking_mode, LockingMode::None);
        assert_eq!(settings.simulation.seed, Some(42));
        assert_eq!(*settings.simulation.iterations.as_ref(), 10);
        assert_eq!(
            settings.in_memory_config().lock_wait,
            std::time::Duration::from_millis(5)
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[simulation]\nworkers = 0\n").unwrap();

        assert!(Settings::from_file(file.path()).is_err());
    }
}
