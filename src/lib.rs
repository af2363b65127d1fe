//! Balance Race - a concurrency harness for a two-account ledger
//!
//! Concurrent workers move random amounts between two accounts while every
//! transfer samples the combined balance inside its own transaction. With
//! exclusive row locks the samples never deviate from the initial total;
//! without them, lost updates show up as wrong sums.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{run_simulation, Application, Simulation, SimulationConfig, SimulationReport};
pub use error::{Error, Result};
