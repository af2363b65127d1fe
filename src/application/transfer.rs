//! Transfer engine
//!
//! Runs one transfer as a single transaction: read both accounts (locked or
//! not, depending on the [`LockingMode`]), debit and credit when the source
//! can cover the amount, sample the total, commit. Lock conflicts and
//! deadlocks reported by the store end the attempt as
//! [`TransferOutcome::Aborted`]; they are not retried and not surfaced as
//! errors. Any other store failure is returned to the caller.

use tracing::{debug, instrument, trace, warn};

use crate::application::recorder::InvariantRecorder;
use crate::application::store::{LedgerSession, LedgerTransaction};
use crate::domain::{Account, InvariantSample, LockingMode, TransferOutcome, TransferRequest};
use crate::infrastructure::log_messages::transfer;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct TransferEngine {
    mode: LockingMode,
    recorder: InvariantRecorder,
}

impl TransferEngine {
    pub fn new(mode: LockingMode, recorder: InvariantRecorder) -> Self {
        Self { mode, recorder }
    }

    pub fn mode(&self) -> LockingMode {
        self.mode
    }

    #[instrument(level = "debug", skip(self, session, request), fields(mode = %self.mode, transfer = %request))]
    pub async fn transfer(
        &self,
        session: &mut (dyn LedgerSession + '_),
        request: TransferRequest,
    ) -> Result<TransferOutcome> {
        if request.is_self_transfer() {
            return Err(Error::invalid_input(
                "transfer",
                "source and destination accounts must differ",
            ));
        }

        let mut tx = match session.begin().await {
            Ok(tx) => tx,
            Err(error) if error.is_lock_conflict() => {
                debug!(%error, "{}", transfer::LOCK_CONFLICT);
                return Ok(TransferOutcome::Aborted);
            }
            Err(error) => return Err(error.into()),
        };

        let staged = self.apply(tx.as_mut(), request).await;
        match staged {
            Ok(Some(sample)) => match tx.commit().await {
                Ok(()) => Ok(TransferOutcome::Applied(sample)),
                Err(error) if error.is_lock_conflict() => {
                    debug!(%error, "{}", transfer::LOCK_CONFLICT);
                    Ok(TransferOutcome::Aborted)
                }
                Err(error) => Err(error.into()),
            },
            Ok(None) => {
                trace!("{}", transfer::INSUFFICIENT_FUNDS);
                tx.rollback().await?;
                Ok(TransferOutcome::InsufficientFunds)
            }
            Err(error) if error.is_lock_conflict() => {
                debug!(%error, "{}", transfer::LOCK_CONFLICT);
                rollback_quietly(tx).await;
                Ok(TransferOutcome::Aborted)
            }
            Err(error) => {
                rollback_quietly(tx).await;
                Err(error)
            }
        }
    }

    /// Stage the transfer inside `tx`; `None` when funds are insufficient
    async fn apply(
        &self,
        tx: &mut (dyn LedgerTransaction + '_),
        request: TransferRequest,
    ) -> Result<Option<InvariantSample>> {
        let (from, to) = self.read_accounts(tx, request).await?;

        let Some(debited) = from.balance.debit(request.amount) else {
            return Ok(None);
        };
        let credited = to
            .balance
            .credit(request.amount)
            .ok_or(Error::BalanceOverflow { account: to.id })?;

        tx.update(from.id, debited).await?;
        tx.update(to.id, credited).await?;

        let sample = self.recorder.record_sample(tx).await?;
        Ok(Some(sample))
    }

    /// Returns `(from, to)`. Exclusive mode locks the lower id first whatever
    /// the direction, so two opposite transfers cannot deadlock each other.
    async fn read_accounts(
        &self,
        tx: &mut (dyn LedgerTransaction + '_),
        request: TransferRequest,
    ) -> Result<(Account, Account)> {
        match self.mode {
            LockingMode::Exclusive => {
                let forward = request.from < request.to;
                let (low, high) = if forward {
                    (request.from, request.to)
                } else {
                    (request.to, request.from)
                };
                let low = tx.get(low, LockingMode::Exclusive).await?;
                let high = tx.get(high, LockingMode::Exclusive).await?;
                Ok(if forward { (low, high) } else { (high, low) })
            }
            LockingMode::None => {
                let from = tx.get(request.from, LockingMode::None).await?;
                let to = tx.get(request.to, LockingMode::None).await?;
                Ok((from, to))
            }
        }
    }
}

async fn rollback_quietly(tx: Box<dyn LedgerTransaction + '_>) {
    if let Err(error) = tx.rollback().await {
        warn!(%error, "{}", transfer::ROLLBACK_FAILED);
    }
}
