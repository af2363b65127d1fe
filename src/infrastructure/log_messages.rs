//! Log message constants
//!
//! This module centralizes the log messages used throughout the harness to
//! keep wording consistent between the library, the binary and the tests.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting balance race harness";
    pub const CONNECTING_TO_DATABASE: &str = "Connecting to database";
    pub const USING_IN_MEMORY_STORE: &str = "Using in-memory ledger store";
    pub const FINISHED: &str = "Simulation finished";
}

/// Database-related log messages
pub mod database {
    pub const HEALTH_CHECK_FAILED: &str = "Database health check failed";
    pub const SCHEMA_ENSURED: &str = "Ledger schema is in place";
}

/// Simulation progress messages
pub mod simulation {
    pub const RESETTING: &str = "Resetting ledger to initial balances";
    pub const STARTING: &str = "Starting simulation";
    pub const WORKER_STARTED: &str = "Worker started";
    pub const ITERATION_STARTED: &str = "Worker started new iteration";
    pub const WORKER_FINISHED: &str = "Worker finished";
    pub const WORKER_FAILED: &str = "Worker stopped on store failure";
    pub const WORKER_PANICKED: &str = "Worker task did not complete";
    pub const VERIFYING: &str = "All workers joined, verifying recorded samples";
}

/// Transfer and invariant messages
pub mod transfer {
    pub const LOCK_CONFLICT: &str = "Transfer aborted on lock conflict";
    pub const INSUFFICIENT_FUNDS: &str = "Not enough money";
    pub const ROLLBACK_FAILED: &str = "Rollback failed";
    pub const RACE_CONDITION: &str = "!!! race condition";
}

/// Final verdict lines
pub mod verdict {
    pub const NO_RACE_CONDITIONS: &str = "✓ No race conditions happened";
    pub const RACE_CONDITIONS: &str = "!!! Race conditions happened";
    pub const WRONG_SUMS: &str = "Wrong sums:";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_messages_are_not_empty() {
        assert!(application::STARTING.len() > 10);
        assert!(database::HEALTH_CHECK_FAILED.len() > 10);
        assert!(simulation::WORKER_STARTED.len() > 10);
        assert!(transfer::LOCK_CONFLICT.len() > 10);
        assert!(verdict::NO_RACE_CONDITIONS.len() > 10);
    }

    #[test]
    fn test_messages_have_no_format_placeholders() {
        // Values travel as structured fields, never interpolated into the text
        for message in [
            simulation::WORKER_STARTED,
            simulation::ITERATION_STARTED,
            transfer::RACE_CONDITION,
            verdict::WRONG_SUMS,
        ] {
            assert!(!message.contains("{}"));
        }
    }
}
