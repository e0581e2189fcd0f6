//! Transaction submission.
//!
//! Stamps each transaction with a freshness token fetched immediately
//! before signing, optionally simulates it, and sends it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use solana_sdk::{signature::Signature, transaction::Transaction};
use tracing::{debug, warn};

use crate::builder::{PendingTransaction, TxStatus};
use crate::config::SequencerConfig;
use crate::error::SequencerError;
use crate::metrics::SequencerMetrics;
use crate::rpc::{Commitment, LedgerRpc, RpcError, SendOptions};
use crate::signer::TransactionSigner;

/// Configuration for the transaction submitter.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Commitment for blockhash fetches and simulation.
    pub commitment: Commitment,

    /// Skip simulation before sending.
    pub skip_preflight: bool,

    /// Initial backoff in milliseconds.
    pub initial_backoff_ms: u64,

    /// Backoff multiplier.
    pub backoff_multiplier: f64,

    /// Maximum backoff in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            skip_preflight: false,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10_000,
        }
    }
}

impl From<&SequencerConfig> for SubmitterConfig {
    fn from(config: &SequencerConfig) -> Self {
        Self {
            commitment: config.commitment,
            skip_preflight: config.skip_preflight,
            initial_backoff_ms: config.initial_backoff_ms,
            backoff_multiplier: config.backoff_multiplier,
            max_backoff_ms: config.max_backoff_ms,
        }
    }
}

/// Signs and sends pending transactions.
pub struct TransactionSubmitter {
    /// Ledger RPC.
    rpc: Arc<dyn LedgerRpc>,

    /// Authority signer; also the fee payer.
    signer: Arc<dyn TransactionSigner>,

    /// Configuration.
    config: SubmitterConfig,

    /// Metrics.
    metrics: Option<Arc<SequencerMetrics>>,
}

impl TransactionSubmitter {
    /// Creates a new transaction submitter.
    #[must_use]
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        signer: Arc<dyn TransactionSigner>,
        config: SubmitterConfig,
    ) -> Self {
        Self {
            rpc,
            signer,
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
    pub const fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Returns the ledger RPC.
    #[must_use]
    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    /// Signs and sends `tx` with a freshly fetched freshness token.
    ///
    /// On success the transaction is `Sent` with its token, signature,
    /// submission time and attempt count updated. A failed simulation marks
    /// it `Rejected` without sending, as does a send the node refuses after
    /// its own preflight. Any other failed send leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns `PreflightRejected` when either preflight reports an error,
    /// `SubmissionFailed` when the send does not reach the ledger, and
    /// `InvalidState` for a transaction that is already terminal.
    pub async fn submit(&self, tx: &mut PendingTransaction) -> Result<Signature, SequencerError> {
        if tx.status.is_terminal() {
            return Err(SequencerError::InvalidState(format!(
                "transaction {} is already {:?}",
                tx.id, tx.status
            )));
        }

        let token = self
            .rpc
            .latest_freshness_token(self.config.commitment)
            .await?;

        let payer = self.signer.pubkey();
        let mut transaction = Transaction::new_with_payer(&tx.instructions, Some(&payer));
        self.signer
            .sign_transaction(&mut transaction, token.blockhash)
            .await?;

        if !self.config.skip_preflight {
            let simulation = self
                .rpc
                .simulate_transaction(&transaction, self.config.commitment)
                .await?;

            for line in &simulation.logs {
                debug!(tx = tx.id, "{}", line);
            }

            if let Some(reason) = simulation.err {
                return Err(self.reject_preflight(tx, reason));
            }
        }

        let options = SendOptions {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: self.config.commitment,
        };

        let signature = match self.rpc.send_transaction(&transaction, options).await {
            Ok(signature) => signature,
            Err(RpcError::PreflightFailure { reason, logs }) => {
                for line in &logs {
                    debug!(tx = tx.id, "{}", line);
                }
                return Err(self.reject_preflight(tx, reason));
            }
            Err(e) => {
                warn!(tx = tx.id, label = %tx.label, error = %e, "Send failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_send_failure();
                }
                return Err(SequencerError::SubmissionFailed {
                    reason: e.to_string(),
                });
            }
        };

        tx.attempts += 1;
        tx.token = Some(token);
        tx.signature = Some(signature);
        tx.submitted_at = Some(Utc::now());
        tx.status = TxStatus::Sent;

        if let Some(metrics) = &self.metrics {
            metrics.record_submission();
        }

        debug!(
            tx = tx.id,
            label = %tx.label,
            %signature,
            attempt = tx.attempts,
            last_valid_block_height = token.last_valid_block_height,
            "Transaction sent"
        );

        Ok(signature)
    }

    /// Marks `tx` rejected by a preflight run, local or node-side.
    fn reject_preflight(&self, tx: &mut PendingTransaction, reason: String) -> SequencerError {
        warn!(tx = tx.id, label = %tx.label, %reason, "Preflight rejected");
        if let Some(metrics) = &self.metrics {
            metrics.record_preflight_failure();
            metrics.record_rejected();
        }
        tx.status = TxStatus::Rejected {
            reason: reason.clone(),
        };
        SequencerError::PreflightRejected { reason }
    }

    /// Calculates the backoff duration for a given retry count.
    #[must_use]
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let backoff = self.config.initial_backoff_ms as f64
            * self.config.backoff_multiplier.powi(retry as i32);
        let backoff = (backoff as u64).min(self.config.max_backoff_ms);
        Duration::from_millis(backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::{MockLedger, Script};
    use crate::signer::KeypairSigner;
    use driftwire_sdk::instructions::wrap;
    use solana_sdk::{pubkey::Pubkey, signature::Keypair};

    fn create_submitter(ledger: Arc<MockLedger>, config: SubmitterConfig) -> TransactionSubmitter {
        let signer = Arc::new(KeypairSigner::new(Keypair::new()));
        TransactionSubmitter::new(ledger, signer, config)
    }

    fn transfer_tx(submitter: &TransactionSubmitter) -> PendingTransaction {
        let payer = submitter.signer.pubkey();
        PendingTransaction::new(
            "transfer",
            vec![wrap::transfer(&payer, &Pubkey::new_unique(), 1_000)],
        )
    }

    #[test]
    fn test_submitter_config_default() {
        let config = SubmitterConfig::default();
        assert_eq!(config.commitment, Commitment::Confirmed);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(!config.skip_preflight);
    }

    #[test]
    fn test_submitter_config_from_sequencer_config() {
        let config = SequencerConfig::default()
            .with_commitment(Commitment::Finalized)
            .with_skip_preflight(true);
        let submitter_config = SubmitterConfig::from(&config);

        assert_eq!(submitter_config.commitment, Commitment::Finalized);
        assert!(submitter_config.skip_preflight);
    }

    #[test]
    fn test_submitter_calculate_backoff() {
        let ledger = Arc::new(MockLedger::new(Script::Land));
        let submitter = create_submitter(ledger, SubmitterConfig::default());

        assert_eq!(submitter.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(submitter.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(submitter.calculate_backoff(2), Duration::from_millis(400));
        assert_eq!(submitter.calculate_backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn test_submitter_calculate_backoff_max() {
        let ledger = Arc::new(MockLedger::new(Script::Land));
        let config = SubmitterConfig {
            initial_backoff_ms: 1000,
            backoff_multiplier: 10.0,
            max_backoff_ms: 5000,
            ..Default::default()
        };
        let submitter = create_submitter(ledger, config);

        assert_eq!(submitter.calculate_backoff(2), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_submit_marks_sent() {
        let ledger = Arc::new(MockLedger::new(Script::Land));
        let metrics = Arc::new(SequencerMetrics::new());
        let submitter = create_submitter(ledger.clone(), SubmitterConfig::default())
            .with_metrics(metrics.clone());
        let mut tx = transfer_tx(&submitter);

        let signature = submitter.submit(&mut tx).await.expect("submit");

        assert_eq!(tx.status, TxStatus::Sent);
        assert_eq!(tx.attempts, 1);
        assert_eq!(tx.signature, Some(signature));
        assert!(tx.submitted_at.is_some());
        assert!(tx.token.is_some());
        assert_eq!(ledger.simulated_count(), 1);
        assert_eq!(ledger.sent_count(), 1);
        assert_eq!(metrics.transactions_submitted(), 1);
    }

    #[tokio::test]
    async fn test_submit_stamps_fresh_token_each_time() {
        let ledger = Arc::new(MockLedger::new(Script::Drop));
        let submitter = create_submitter(ledger.clone(), SubmitterConfig::default());
        let mut tx = transfer_tx(&submitter);

        submitter.submit(&mut tx).await.expect("first");
        let first = tx.token.map(|t| t.blockhash);
        submitter.submit(&mut tx).await.expect("second");
        let second = tx.token.map(|t| t.blockhash);

        assert_ne!(first, second);
        assert_eq!(tx.attempts, 2);
        assert_eq!(ledger.distinct_blockhashes(), 2);
    }

    #[tokio::test]
    async fn test_submit_preflight_rejected() {
        let reason = r#"{"InstructionError":[0,{"Custom":6010}]}"#;
        let ledger = Arc::new(MockLedger::new(Script::Land).with_simulation_error(reason));
        let submitter = create_submitter(ledger.clone(), SubmitterConfig::default());
        let mut tx = transfer_tx(&submitter);

        let result = submitter.submit(&mut tx).await;

        match result {
            Err(SequencerError::PreflightRejected { reason: got }) => assert_eq!(got, reason),
            other => panic!("expected preflight rejection, got {:?}", other),
        }
        assert_eq!(
            tx.status,
            TxStatus::Rejected {
                reason: reason.to_string()
            }
        );
        assert_eq!(ledger.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_skip_preflight() {
        let ledger = Arc::new(MockLedger::new(Script::Land).with_simulation_error("ignored"));
        let config = SubmitterConfig {
            skip_preflight: true,
            ..Default::default()
        };
        let submitter = create_submitter(ledger.clone(), config);
        let mut tx = transfer_tx(&submitter);

        submitter.submit(&mut tx).await.expect("submit");

        assert_eq!(ledger.simulated_count(), 0);
        assert_eq!(ledger.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_send_failure() {
        let ledger = Arc::new(MockLedger::new(Script::Land).with_send_failures(1));
        let submitter = create_submitter(ledger.clone(), SubmitterConfig::default());
        let mut tx = transfer_tx(&submitter);

        let result = submitter.submit(&mut tx).await;

        assert!(matches!(result, Err(SequencerError::SubmissionFailed { .. })));
        assert_eq!(tx.status, TxStatus::Unsent);
        assert_eq!(tx.attempts, 0);
    }

    #[tokio::test]
    async fn test_submit_node_preflight_failure_rejects() {
        let reason = "Error processing Instruction 0: custom program error: 0x1773";
        let ledger = Arc::new(MockLedger::new(Script::Land).with_send_rejection(reason));
        let metrics = Arc::new(SequencerMetrics::new());
        let config = SubmitterConfig {
            skip_preflight: true,
            ..Default::default()
        };
        let submitter =
            create_submitter(ledger.clone(), config).with_metrics(metrics.clone());
        let mut tx = transfer_tx(&submitter);

        let result = submitter.submit(&mut tx).await;

        assert!(matches!(
            result,
            Err(SequencerError::PreflightRejected { reason: ref got }) if got == reason
        ));
        assert!(!result.expect_err("rejected").is_retryable());
        assert_eq!(
            tx.status,
            TxStatus::Rejected {
                reason: reason.to_string()
            }
        );
        assert_eq!(metrics.preflight_failures(), 1);
        assert_eq!(metrics.send_failures(), 0);
    }

    #[tokio::test]
    async fn test_submit_terminal_is_invalid() {
        let ledger = Arc::new(MockLedger::new(Script::Land));
        let submitter = create_submitter(ledger, SubmitterConfig::default());
        let mut tx = transfer_tx(&submitter);
        tx.status = TxStatus::Confirmed { slot: 1 };

        let result = submitter.submit(&mut tx).await;
        assert!(matches!(result, Err(SequencerError::InvalidState(_))));
    }
}
