//! Type-safe configuration types
//!
//! This module provides domain-specific types for configuration values,
//! ensuring validation at boundaries and preventing primitive obsession.

use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Number of concurrent workers a simulation fans out to
#[nutype(
    validate(predicate = |count| *count > 0 && *count <= 1000),
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
        AsRef,
        Display
    )
)]
pub struct WorkerCount(usize);

impl Default for WorkerCount {
    fn default() -> Self {
        Self::try_new(10).expect("Default worker count is valid")
    }
}

/// Number of transfer rounds each worker performs
///
/// Every round is two transfers, one in each direction.
#[nutype(
    validate(predicate = |count| *count > 0 && *count <= 1_000_000),
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
        AsRef,
        Display
    )
)]
pub struct IterationCount(usize);

impl Default for IterationCount {
    fn default() -> Self {
        Self::try_new(10).expect("Default iteration count is valid")
    }
}

/// Maximum number of database connections
#[nutype(
    validate(predicate = |count| *count > 0 && *count <= 1000),
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
        AsRef,
        Display
    )
)]
pub struct MaxConnections(u32);

impl Default for MaxConnections {
    fn default() -> Self {
        Self::try_new(16).expect("Default max connections is valid")
    }
}

/// How long the in-memory store lets a transaction wait on a row lock
/// before declaring a lock conflict
#[nutype(
    validate(predicate = |ms| *ms > 0 && *ms <= 60000), // max 1 minute
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
        AsRef,
        Display
    )
)]
pub struct LockWaitMs(u64);

impl LockWaitMs {
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.into_inner())
    }
}

impl Default for LockWaitMs {
    fn default() -> Self {
        Self::try_new(50).expect("Default lock wait is valid")
    }
}

/// Database password (secured)
#[nutype(validate(not_empty), derive(Clone, Serialize, Deserialize, AsRef))]
pub struct DatabasePassword(String);

impl fmt::Debug for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabasePassword(***)")
    }
}

impl fmt::Display for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Which ledger store backs a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Postgres => "postgres",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            _ => Err(format!("Invalid store backend: {s}")),
        }
    }
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Invalid log format: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_validation() {
        assert!(WorkerCount::try_new(1).is_ok());
        assert!(WorkerCount::try_new(1000).is_ok());
        assert!(WorkerCount::try_new(0).is_err());
        assert!(WorkerCount::try_new(1001).is_err());
    }

    #[test]
    fn test_iteration_count_validation() {
        assert!(IterationCount::try_new(1).is_ok());
        assert!(IterationCount::try_new(0).is_err());
    }

    #[test]
    fn test_max_connections_validation() {
        assert!(MaxConnections::try_new(10).is_ok());
        assert!(MaxConnections::try_new(1000).is_ok());
        assert!(MaxConnections::try_new(0).is_err());
        assert!(MaxConnections::try_new(1001).is_err());
    }

    #[test]
    fn test_lock_wait_validation() {
        assert!(LockWaitMs::try_new(1).is_ok());
        assert!(LockWaitMs::try_new(60000).is_ok());
        assert!(LockWaitMs::try_new(0).is_err());
        assert!(LockWaitMs::try_new(60001).is_err());
        assert_eq!(
            LockWaitMs::try_new(25).unwrap().as_duration(),
            Duration::from_millis(25)
        );
    }

    #[test]
    fn test_database_password_security() {
        let password = DatabasePassword::try_new("secret123".to_string()).unwrap();
        assert_eq!(format!("{password:?}"), "DatabasePassword(***)");
        assert_eq!(format!("{password}"), "***");
        assert_eq!(password.as_ref(), "secret123");
    }

    #[test]
    fn test_store_backend_parsing() {
        use std::str::FromStr;

        assert_eq!(StoreBackend::from_str("memory").unwrap(), StoreBackend::Memory);
        assert_eq!(
            StoreBackend::from_str("PostgreSQL").unwrap(),
            StoreBackend::Postgres
        );
        assert!(StoreBackend::from_str("sqlite").is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        use std::str::FromStr;

        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("INFO").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        use std::str::FromStr;

        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert!(LogFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(*WorkerCount::default().as_ref(), 10);
        assert_eq!(*IterationCount::default().as_ref(), 10);
        assert_eq!(*MaxConnections::default().as_ref(), 16);
        assert_eq!(*LockWaitMs::default().as_ref(), 50);
        assert_eq!(StoreBackend::default(), StoreBackend::Memory);
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
