//! Transaction signing seam.

use std::path::Path;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
    transaction::Transaction,
};

use crate::config::ConfigError;
use crate::error::SequencerError;

/// Signs transactions on behalf of the session authority.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Returns the public key of the authority.
    fn pubkey(&self) -> Pubkey;

    /// Signs `tx` against `blockhash`, replacing any earlier signatures.
    async fn sign_transaction(
        &self,
        tx: &mut Transaction,
        blockhash: Hash,
    ) -> Result<(), SequencerError>;
}

/// In-memory keypair signer.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    /// Wraps a keypair.
    #[must_use]
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Creates a signer from the 64-byte secret/public key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid keypair.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SequencerError> {
        if bytes.len() != 64 {
            return Err(SequencerError::Signing(format!(
                "invalid keypair length: expected 64 bytes, got {}",
                bytes.len()
            )));
        }

        Keypair::try_from(bytes)
            .map(Self::new)
            .map_err(|e| SequencerError::Signing(format!("invalid keypair bytes: {}", e)))
    }

    /// Loads a keypair file in the CLI's JSON format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Keypair` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SequencerError> {
        let path = path.as_ref();
        let keypair = read_keypair_file(path).map_err(|e| ConfigError::Keypair {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(keypair))
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("pubkey", &self.keypair.pubkey())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(
        &self,
        tx: &mut Transaction,
        blockhash: Hash,
    ) -> Result<(), SequencerError> {
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| SequencerError::Signing(e.to_string()))
    }
}
