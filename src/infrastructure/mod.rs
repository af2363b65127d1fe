//! Infrastructure layer
//!
//! Ledger store backends (PostgreSQL and in-memory) and the shared log
//! message catalogue.

pub mod database;
pub mod log_messages;
pub mod memory;

pub use database::PostgresLedger;
pub use memory::{FaultPlan, InMemoryConfig, InMemoryLedger};
