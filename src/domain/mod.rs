//! Domain types for the balance race harness
//!
//! This module contains the value types the harness reasons about: accounts
//! and balances, transfer requests and outcomes, invariant samples, and the
//! validated configuration values a simulation is parameterised by.

pub mod account;
pub mod config_types;
pub mod locking;
pub mod sample;
pub mod transfer;

pub use account::*;
pub use locking::*;
pub use sample::*;
pub use transfer::*;
