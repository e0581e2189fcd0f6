//! Ledger RPC seam.
//!
//! [`LedgerRpc`] is the only way the sequencer reads or writes the remote
//! ledger. [`HttpLedgerRpc`] implements it over the cluster's JSON-RPC API;
//! tests use a scripted in-memory implementation.

pub mod config;
pub mod error;
pub mod http;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

pub use config::RpcConfig;
pub use error::RpcError;
pub use http::HttpLedgerRpc;

/// Commitment level, ordered from weakest to strongest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node.
    Processed,
    /// Voted on by a supermajority.
    #[default]
    Confirmed,
    /// Rooted.
    Finalized,
}

impl Commitment {
    /// Returns the JSON-RPC name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => Self::processed(),
            Commitment::Confirmed => Self::confirmed(),
            Commitment::Finalized => Self::finalized(),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("invalid commitment: {}", other)),
        }
    }
}

/// Recent blockhash together with the last block height it is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessToken {
    /// Recent blockhash.
    pub blockhash: Hash,
    /// Last block height at which a transaction using it can land.
    pub last_valid_block_height: u64,
}

impl FreshnessToken {
    /// Returns true once `block_height` is past the validity window.
    #[must_use]
    pub const fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.last_valid_block_height
    }
}

/// Outcome of a transaction simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    /// Transaction error, rendered verbatim.
    pub err: Option<String>,
    /// Program logs.
    pub logs: Vec<String>,
}

/// Send options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Skip the node's own preflight simulation.
    pub skip_preflight: bool,
    /// Commitment used for the node's preflight.
    pub preflight_commitment: Commitment,
}

/// Ledger-reported state of a signature at the requested commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Included without error.
    Landed {
        /// Slot of inclusion.
        slot: u64,
    },
    /// Included, but execution failed.
    Failed {
        /// Slot of inclusion.
        slot: u64,
        /// Transaction error, rendered verbatim.
        reason: String,
    },
}

/// Remote ledger operations used by the sequencer.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Fetches a fresh blockhash and its validity bound.
    async fn latest_freshness_token(
        &self,
        commitment: Commitment,
    ) -> Result<FreshnessToken, RpcError>;

    /// Returns the current block height.
    async fn block_height(&self, commitment: Commitment) -> Result<u64, RpcError>;

    /// Returns raw account data, or `None` if the account does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError>;

    /// Returns true if the account exists.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool, RpcError> {
        Ok(self.get_account_data(address).await?.is_some())
    }

    /// Simulates a signed transaction without submitting it.
    async fn simulate_transaction(
        &self,
        tx: &Transaction,
        commitment: Commitment,
    ) -> Result<SimulationResult, RpcError>;

    /// Submits a signed transaction.
    async fn send_transaction(
        &self,
        tx: &Transaction,
        options: SendOptions,
    ) -> Result<Signature, RpcError>;

    /// Returns the signature's state once it reaches `commitment`, or `None`
    /// if it is unknown or has not reached it yet.
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<Option<SignatureState>, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_ordering() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
        assert_eq!(Commitment::default(), Commitment::Confirmed);
    }

    #[test]
    fn test_commitment_parse() {
        assert_eq!(
            "finalized".parse::<Commitment>().expect("commitment"),
            Commitment::Finalized
        );
        assert!("max".parse::<Commitment>().is_err());
    }

    #[test]
    fn test_commitment_config() {
        assert!(CommitmentConfig::from(Commitment::Finalized).is_finalized());
        assert!(CommitmentConfig::from(Commitment::Confirmed).is_confirmed());
    }

    #[test]
    fn test_freshness_token_expiry() {
        let token = FreshnessToken {
            blockhash: Hash::default(),
            last_valid_block_height: 100,
        };
        assert!(!token.is_expired_at(100));
        assert!(token.is_expired_at(101));
    }
}
