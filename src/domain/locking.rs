//! Concurrency-control discipline applied by the transfer engine

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a transfer reads the rows it is about to modify
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum LockingMode {
    /// Lock each row exclusively before reading it, in account-id order
    #[default]
    #[display("exclusive")]
    Exclusive,
    /// Read without locks; concurrent transfers may act on stale balances
    #[display("none")]
    None,
}

impl LockingMode {
    pub fn locks_rows(self) -> bool {
        matches!(self, Self::Exclusive)
    }
}

impl FromStr for LockingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusive" | "locked" => Ok(Self::Exclusive),
            "none" | "unlocked" => Ok(Self::None),
            other => Err(format!(
                "unknown locking mode '{other}' (expected 'exclusive' or 'none')"
            )),
        }
    }
}
