//! Confirmation and retry.
//!
//! Drives one [`PendingTransaction`] from `Unsent` or `Sent` to a terminal
//! state:
//!
//! - `Confirmed` once the signature reaches the requested commitment.
//! - `Rejected` when the ledger reports a transaction error. The reason is
//!   kept verbatim and the transaction is never resubmitted.
//! - `Expired` when the freshness token lapses and the retry budget is
//!   spent, or when the sequence deadline passes.
//!
//! An expired token is replaced by resubmitting through the submitter,
//! which always fetches a new one. Before resubmitting, the status is read
//! once more at `processed`: a transaction that landed between the status
//! poll and the height poll is never sent twice.
//!
//! Failed sends have their own budget of `max_retries`, with exponential
//! backoff between attempts; they do not consume expiry resubmissions.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::signature::Signature;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::builder::{PendingTransaction, TxStatus};
use crate::config::SequencerConfig;
use crate::error::SequencerError;
use crate::metrics::SequencerMetrics;
use crate::rpc::{Commitment, SignatureState};
use crate::submitter::TransactionSubmitter;

/// Confirmation policy.
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Resubmissions allowed after an expiry, and separately, retries
    /// allowed after failed sends.
    pub max_retries: u32,

    /// Delay between signature status polls.
    pub poll_interval: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl From<&SequencerConfig> for ConfirmationConfig {
    fn from(config: &SequencerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Drives pending transactions to a terminal status.
pub struct ConfirmationController {
    submitter: Arc<TransactionSubmitter>,
    config: ConfirmationConfig,
    metrics: Option<Arc<SequencerMetrics>>,
}

impl ConfirmationController {
    /// Creates a new controller.
    #[must_use]
    pub fn new(submitter: Arc<TransactionSubmitter>, config: ConfirmationConfig) -> Self {
        Self {
            submitter,
            config,
            metrics: None,
        }
    }

    /// Attaches metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<SequencerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Submits `tx` if needed and waits until it is terminal or `deadline`
    /// passes.
    ///
    /// Returns the slot of inclusion.
    ///
    /// # Errors
    ///
    /// - `Rejected` or `PreflightRejected` with the program's reason.
    /// - `Expired` once `max_retries` resubmissions have also expired.
    /// - `Timeout` when the deadline passes; `tx` is then marked `Expired`
    ///   but may still land.
    /// - `SubmissionFailed` or an RPC error once `max_retries` send retries
    ///   have also failed.
    pub async fn drive(
        &self,
        tx: &mut PendingTransaction,
        deadline: Instant,
    ) -> Result<u64, SequencerError> {
        match &tx.status {
            TxStatus::Confirmed { slot } => return Ok(*slot),
            TxStatus::Rejected { reason } => {
                return Err(SequencerError::Rejected {
                    reason: reason.clone(),
                })
            }
            TxStatus::Expired { attempts } => {
                return Err(SequencerError::Expired {
                    attempts: *attempts,
                })
            }
            TxStatus::Unsent | TxStatus::Sent => {}
        }

        let started = Instant::now();
        let commitment = self.submitter.config().commitment;
        let rpc = self.submitter.rpc().clone();
        let mut needs_send = tx.status == TxStatus::Unsent;
        let mut resubmissions: u32 = 0;
        let mut send_retries: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(self.expire_on_deadline(tx, started));
            }

            if needs_send {
                match self.submitter.submit(tx).await {
                    Ok(_) => needs_send = false,
                    Err(e) if e.is_retryable() && send_retries < self.config.max_retries => {
                        let backoff = self.submitter.calculate_backoff(send_retries);
                        send_retries += 1;
                        warn!(
                            tx = tx.id,
                            error = %e,
                            retry = send_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            "Submission failed, retrying"
                        );
                        sleep_until_or(deadline, backoff).await;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            let (signature, token) = match (tx.signature, tx.token) {
                (Some(signature), Some(token)) => (signature, token),
                _ => {
                    return Err(SequencerError::InvalidState(format!(
                        "transaction {} is sent without a signature",
                        tx.id
                    )))
                }
            };

            match rpc.signature_status(&signature, commitment).await {
                Ok(Some(state)) => return self.settle(tx, &signature, state),
                Ok(None) => {}
                Err(e) if e.class().is_retryable() => {
                    debug!(tx = tx.id, error = %e, "Status poll failed");
                }
                Err(e) => return Err(e.into()),
            }

            let height = match rpc.block_height(commitment).await {
                Ok(height) => Some(height),
                Err(e) if e.class().is_retryable() => {
                    debug!(tx = tx.id, error = %e, "Block height poll failed");
                    None
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(height) = height {
                if token.is_expired_at(height) {
                    // It may have landed after the status poll above.
                    match rpc.signature_status(&signature, Commitment::Processed).await {
                        Ok(Some(SignatureState::Landed { slot })) if commitment > Commitment::Processed => {
                            debug!(tx = tx.id, slot, "Landed past expiry, awaiting commitment");
                            sleep_until_or(deadline, self.config.poll_interval).await;
                            continue;
                        }
                        Ok(Some(state)) => return self.settle(tx, &signature, state),
                        Ok(None) => {}
                        Err(e) if e.class().is_retryable() => {
                            debug!(tx = tx.id, error = %e, "Status re-poll failed");
                            sleep_until_or(deadline, self.config.poll_interval).await;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }

                    if resubmissions >= self.config.max_retries {
                        tx.status = TxStatus::Expired {
                            attempts: tx.attempts,
                        };
                        if let Some(metrics) = &self.metrics {
                            metrics.record_expired();
                        }
                        warn!(tx = tx.id, label = %tx.label, attempts = tx.attempts, "Transaction expired");
                        return Err(SequencerError::Expired {
                            attempts: tx.attempts,
                        });
                    }

                    resubmissions += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.record_resubmission();
                    }
                    info!(
                        tx = tx.id,
                        label = %tx.label,
                        block_height = height,
                        last_valid_block_height = token.last_valid_block_height,
                        retry = resubmissions,
                        "Freshness token expired, resubmitting"
                    );
                    needs_send = true;
                    continue;
                }
            }

            sleep_until_or(deadline, self.config.poll_interval).await;
        }
    }

    /// Records a signature state reported by the ledger.
    fn settle(
        &self,
        tx: &mut PendingTransaction,
        signature: &Signature,
        state: SignatureState,
    ) -> Result<u64, SequencerError> {
        match state {
            SignatureState::Landed { slot } => {
                tx.status = TxStatus::Confirmed { slot };
                if let Some(metrics) = &self.metrics {
                    metrics.record_confirmed();
                }
                info!(tx = tx.id, label = %tx.label, %signature, slot, "Transaction confirmed");
                Ok(slot)
            }
            SignatureState::Failed { slot, reason } => {
                tx.status = TxStatus::Rejected {
                    reason: reason.clone(),
                };
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected();
                }
                warn!(tx = tx.id, label = %tx.label, %signature, slot, %reason, "Transaction rejected");
                Err(SequencerError::Rejected { reason })
            }
        }
    }

    fn expire_on_deadline(&self, tx: &mut PendingTransaction, started: Instant) -> SequencerError {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tx.status = TxStatus::Expired {
            attempts: tx.attempts,
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_expired();
        }
        warn!(
            tx = tx.id,
            label = %tx.label,
            attempts = tx.attempts,
            elapsed_ms,
            "Sequence deadline passed; transaction may still land"
        );
        SequencerError::Timeout { elapsed_ms }
    }
}

/// Sleeps for `delay`, or until `deadline` if that comes first.
async fn sleep_until_or(deadline: Instant, delay: Duration) {
    let wake = (Instant::now() + delay).min(deadline);
    tokio::time::sleep_until(wake).await;
}
