//! Application services and simulation orchestration
//!
//! The store traits live here; the transfer engine, the invariant recorder
//! and the simulation drive them without knowing which backend is behind.

pub mod app;
pub mod recorder;
pub mod simulation;
pub mod store;
pub mod transfer;

pub use app::Application;
pub use recorder::InvariantRecorder;
pub use simulation::{
    run_simulation, Simulation, SimulationConfig, SimulationReport, WorkerReport,
};
pub use store::{
    Ledger, LedgerSession, LedgerStore, LedgerTransaction, SampleStore, StoreError, StoreResult,
};
pub use transfer::TransferEngine;
