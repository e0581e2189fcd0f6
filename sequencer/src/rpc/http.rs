//! [`LedgerRpc`] over the cluster's JSON-RPC API.
//!
//! Wire encoding, request ids and 429 back-off are handled by the
//! nonblocking `RpcClient`; this layer only maps its types onto the
//! sequencer's.

use std::fmt;

use async_trait::async_trait;
use solana_commitment_config::CommitmentConfig;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    client_error::TransactionError,
    config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig},
};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use tracing::debug;

use super::config::RpcConfig;
use super::error::RpcError;
use super::{
    Commitment, FreshnessToken, LedgerRpc, SendOptions, SignatureState, SimulationResult,
};

/// Ledger client backed by a nonblocking `RpcClient`.
pub struct HttpLedgerRpc {
    config: RpcConfig,
    client: RpcClient,
}

impl fmt::Debug for HttpLedgerRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLedgerRpc")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpLedgerRpc {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RpcConfig) -> Result<Self, RpcError> {
        config.validate()?;

        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            config.timeout,
            CommitmentConfig::confirmed(),
        );

        Ok(Self { config, client })
    }

    /// Creates a new client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid.
    pub fn with_url(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::new(RpcConfig::new(url))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: RpcClient) -> Self {
        Self {
            config: RpcConfig::new(client.url()),
            client,
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn latest_freshness_token(
        &self,
        commitment: Commitment,
    ) -> Result<FreshnessToken, RpcError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(commitment.into())
            .await?;

        Ok(FreshnessToken {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn block_height(&self, commitment: Commitment) -> Result<u64, RpcError> {
        Ok(self
            .client
            .get_block_height_with_commitment(commitment.into())
            .await?)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;

        Ok(response.value.map(|account| account.data))
    }

    async fn simulate_transaction(
        &self,
        tx: &Transaction,
        commitment: Commitment,
    ) -> Result<SimulationResult, RpcError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            commitment: Some(commitment.into()),
            ..Default::default()
        };
        let response = self.client.simulate_transaction_with_config(tx, config).await?;

        Ok(SimulationResult {
            err: response.value.err.map(|e| e.to_string()),
            logs: response.value.logs.unwrap_or_default(),
        })
    }

    async fn send_transaction(
        &self,
        tx: &Transaction,
        options: SendOptions,
    ) -> Result<Signature, RpcError> {
        let preflight: CommitmentConfig = options.preflight_commitment.into();
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(preflight.commitment),
            // Resubmission is driven by the confirmation loop, not the node.
            max_retries: Some(0),
            ..Default::default()
        };

        let signature = self.client.send_transaction_with_config(tx, config).await?;
        debug!(%signature, "transaction sent");
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<Option<SignatureState>, RpcError> {
        let response = self
            .client
            .get_signature_statuses(std::slice::from_ref(signature))
            .await?;

        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(None);
        };

        let reached = status.satisfies_commitment(commitment.into());
        Ok(signature_state(status.slot, status.err, reached))
    }
}

/// Maps a status entry to a state, or `None` if the commitment is not met.
fn signature_state(
    slot: u64,
    err: Option<TransactionError>,
    reached: bool,
) -> Option<SignatureState> {
    if let Some(err) = err {
        // A failed transaction never recovers; report it at any commitment.
        return Some(SignatureState::Failed {
            slot,
            reason: err.to_string(),
        });
    }

    reached.then_some(SignatureState::Landed { slot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{Keypair, Signer};

    fn mock(url: &str) -> HttpLedgerRpc {
        HttpLedgerRpc::from_client(RpcClient::new_mock(url.to_string()))
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(matches!(
            HttpLedgerRpc::with_url("not-a-url"),
            Err(RpcError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_signature_state_below_commitment() {
        assert_eq!(signature_state(42, None, false), None);
        assert_eq!(
            signature_state(42, None, true),
            Some(SignatureState::Landed { slot: 42 })
        );
    }

    #[test]
    fn test_signature_state_failed_at_any_commitment() {
        let state = signature_state(7, Some(TransactionError::AccountInUse), false);
        assert!(matches!(state, Some(SignatureState::Failed { slot: 7, .. })));
    }

    #[tokio::test]
    async fn test_freshness_token_and_height() {
        let rpc = mock("succeeds");

        let token = rpc
            .latest_freshness_token(Commitment::Confirmed)
            .await
            .expect("token");
        assert_eq!(token.last_valid_block_height, 1234);
        assert_eq!(
            rpc.block_height(Commitment::Confirmed).await.expect("height"),
            1234
        );
    }

    #[tokio::test]
    async fn test_missing_account() {
        let rpc = mock("succeeds");
        assert_eq!(
            rpc.get_account_data(&Pubkey::new_unique())
                .await
                .expect("account"),
            None
        );
    }

    #[tokio::test]
    async fn test_signature_status_mapping() {
        let signature = Keypair::new().sign_message(b"status");

        let landed = mock("succeeds")
            .signature_status(&signature, Commitment::Finalized)
            .await
            .expect("status");
        assert_eq!(landed, Some(SignatureState::Landed { slot: 1 }));

        let failed = mock("instruction_error")
            .signature_status(&signature, Commitment::Confirmed)
            .await
            .expect("status");
        assert!(matches!(
            failed,
            Some(SignatureState::Failed { ref reason, .. })
                if reason.starts_with("Error processing Instruction 0")
        ));

        let unknown = mock("sig_not_found")
            .signature_status(&signature, Commitment::Confirmed)
            .await
            .expect("status");
        assert_eq!(unknown, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        // The "fails" mock answers every request with null.
        let err = mock("fails")
            .block_height(Commitment::Confirmed)
            .await
            .expect_err("null height");
        assert!(err.class().is_retryable());
    }
}
