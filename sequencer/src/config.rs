//! Sequencer configuration.
//!
//! Values come from `DRIFTWIRE_*` environment variables, falling back to
//! defaults; the binary lets command-line flags override them.

use std::str::FromStr;
use std::time::Duration;

use driftwire_sdk::ids::DRIFT_DEMO_PROGRAM_ID;
use driftwire_sdk::registry::MAINNET_BETA;
use driftwire_sdk::schema::DRIFT_DEMO_V1;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::rpc::config::DEFAULT_RPC_URL;
use crate::rpc::{Commitment, RpcConfig};

/// Environment variable names.
pub mod env {
    /// JSON-RPC endpoint.
    pub const RPC_URL: &str = "DRIFTWIRE_RPC_URL";
    /// Market registry network.
    pub const NETWORK: &str = "DRIFTWIRE_NETWORK";
    /// Target program id.
    pub const PROGRAM_ID: &str = "DRIFTWIRE_PROGRAM_ID";
    /// Keypair file path.
    pub const KEYPAIR: &str = "DRIFTWIRE_KEYPAIR";
    /// Commitment level.
    pub const COMMITMENT: &str = "DRIFTWIRE_COMMITMENT";
    /// Skip simulation before sending.
    pub const SKIP_PREFLIGHT: &str = "DRIFTWIRE_SKIP_PREFLIGHT";
    /// Resubmissions after expiry.
    pub const MAX_RETRIES: &str = "DRIFTWIRE_MAX_RETRIES";
    /// Sequence deadline.
    pub const SEQUENCE_TIMEOUT_MS: &str = "DRIFTWIRE_SEQUENCE_TIMEOUT_MS";
    /// Instructions per transaction.
    pub const MAX_INSTRUCTIONS_PER_TX: &str = "DRIFTWIRE_MAX_INSTRUCTIONS_PER_TX";
}

/// Configuration for the sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// Network whose market registry is loaded.
    pub network: String,

    /// Program the instructions target (base58).
    pub program_id: String,

    /// Account schema version.
    pub schema_version: String,

    /// Path to the authority keypair file.
    pub keypair_path: Option<String>,

    /// Commitment required for confirmation.
    pub commitment: Commitment,

    /// Skip simulation before sending.
    pub skip_preflight: bool,

    /// Resubmissions allowed after a freshness-token expiry.
    pub max_retries: u32,

    /// Initial backoff in milliseconds.
    pub initial_backoff_ms: u64,

    /// Backoff multiplier for retries.
    pub backoff_multiplier: f64,

    /// Maximum backoff in milliseconds.
    pub max_backoff_ms: u64,

    /// Signature status poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Wall-clock deadline for one logical sequence.
    pub sequence_timeout_ms: u64,

    /// Maximum instructions packed into one transaction.
    pub max_instructions_per_tx: usize,

    /// RPC request timeout in milliseconds.
    pub rpc_timeout_ms: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            network: MAINNET_BETA.to_string(),
            program_id: DRIFT_DEMO_PROGRAM_ID.to_string(),
            schema_version: DRIFT_DEMO_V1.version().to_string(),
            keypair_path: None,
            commitment: Commitment::Confirmed,
            skip_preflight: false,
            max_retries: 3,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10_000,
            poll_interval_ms: 500,
            sequence_timeout_ms: 90_000,
            max_instructions_per_tx: 4,
            rpc_timeout_ms: 30_000,
        }
    }
}

impl SequencerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(env::RPC_URL) {
            config.rpc_url = url;
        }
        if let Some(network) = lookup(env::NETWORK) {
            config.network = network;
        }
        if let Some(program_id) = lookup(env::PROGRAM_ID) {
            config.program_id = program_id;
        }
        if let Some(path) = lookup(env::KEYPAIR) {
            config.keypair_path = Some(path);
        }
        if let Some(value) = lookup(env::COMMITMENT) {
            config.commitment = parse_var(env::COMMITMENT, &value)?;
        }
        if let Some(value) = lookup(env::SKIP_PREFLIGHT) {
            config.skip_preflight = parse_var(env::SKIP_PREFLIGHT, &value)?;
        }
        if let Some(value) = lookup(env::MAX_RETRIES) {
            config.max_retries = parse_var(env::MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(env::SEQUENCE_TIMEOUT_MS) {
            config.sequence_timeout_ms = parse_var(env::SEQUENCE_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(env::MAX_INSTRUCTIONS_PER_TX) {
            config.max_instructions_per_tx = parse_var(env::MAX_INSTRUCTIONS_PER_TX, &value)?;
        }

        Ok(config)
    }

    /// Sets the RPC endpoint.
    #[must_use]
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Sets the commitment level.
    #[must_use]
    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    /// Sets the maximum resubmissions.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the sequence deadline.
    #[must_use]
    pub fn with_sequence_timeout(mut self, ms: u64) -> Self {
        self.sequence_timeout_ms = ms;
        self
    }

    /// Sets whether preflight simulation is skipped.
    #[must_use]
    pub fn with_skip_preflight(mut self, skip: bool) -> Self {
        self.skip_preflight = skip;
        self
    }

    /// Sets how many instructions a batched operation packs per transaction.
    #[must_use]
    pub fn with_max_instructions_per_tx(mut self, max: usize) -> Self {
        self.max_instructions_per_tx = max;
        self
    }

    /// Sets the backoff schedule.
    #[must_use]
    pub fn with_backoff(mut self, initial_ms: u64, multiplier: f64, max_ms: u64) -> Self {
        self.initial_backoff_ms = initial_ms;
        self.backoff_multiplier = multiplier;
        self.max_backoff_ms = max_ms;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        if self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier);
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidBackoffRange);
        }

        if self.sequence_timeout_ms == 0 {
            return Err(ConfigError::InvalidSequenceTimeout);
        }

        if self.max_instructions_per_tx == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        self.parse_program_id()?;
        Ok(())
    }

    /// Parses the program id.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not valid base58 of 32 bytes.
    pub fn parse_program_id(&self) -> Result<Pubkey, ConfigError> {
        Pubkey::from_str(&self.program_id)
            .map_err(|_| ConfigError::InvalidProgramId(self.program_id.clone()))
    }

    /// Returns the RPC client configuration.
    #[must_use]
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig::new(self.rpc_url.clone())
            .with_timeout(Duration::from_millis(self.rpc_timeout_ms))
    }

    /// Returns the sequence deadline.
    #[must_use]
    pub const fn sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.sequence_timeout_ms)
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVariable {
        name,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid poll interval.
    #[error("poll_interval_ms must be > 0")]
    InvalidPollInterval,

    /// Invalid backoff multiplier.
    #[error("backoff_multiplier must be >= 1.0")]
    InvalidBackoffMultiplier,

    /// Invalid backoff range.
    #[error("initial_backoff_ms must be <= max_backoff_ms")]
    InvalidBackoffRange,

    /// Invalid sequence timeout.
    #[error("sequence_timeout_ms must be > 0")]
    InvalidSequenceTimeout,

    /// Invalid batch size.
    #[error("max_instructions_per_tx must be > 0")]
    InvalidBatchSize,

    /// Invalid program id.
    #[error("invalid program id: {0}")]
    InvalidProgramId(String),

    /// Environment variable holds an unparseable value.
    #[error("invalid value for {name}: {value}")]
    InvalidVariable {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// Keypair file could not be loaded.
    #[error("cannot load keypair from {path}: {reason}")]
    Keypair {
        /// File path.
        path: String,
        /// Failure reason.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = SequencerConfig::default();
        assert_eq!(config.network, "mainnet-beta");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.commitment, Commitment::Confirmed);
        assert!(!config.skip_preflight);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.parse_program_id().expect("program id"),
            DRIFT_DEMO_PROGRAM_ID
        );
    }

    #[test]
    fn test_config_builder() {
        let config = SequencerConfig::default()
            .with_rpc_url("http://127.0.0.1:8899")
            .with_commitment(Commitment::Finalized)
            .with_max_retries(5)
            .with_poll_interval(200)
            .with_skip_preflight(true);

        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.commitment, Commitment::Finalized);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.poll_interval_ms, 200);
        assert!(config.skip_preflight);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = SequencerConfig::from_lookup(lookup(&[
            (env::RPC_URL, "http://localhost:8899"),
            (env::COMMITMENT, "finalized"),
            (env::SKIP_PREFLIGHT, "true"),
            (env::MAX_RETRIES, "5"),
        ]))
        .expect("config");

        assert_eq!(config.rpc_url, "http://localhost:8899");
        assert_eq!(config.commitment, Commitment::Finalized);
        assert!(config.skip_preflight);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.network, "mainnet-beta");
    }

    #[test]
    fn test_config_from_lookup_invalid() {
        let result = SequencerConfig::from_lookup(lookup(&[(env::MAX_RETRIES, "many")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidVariable {
                name: env::MAX_RETRIES,
                ..
            })
        ));
    }

    #[test]
    fn test_config_validate_invalid_poll_interval() {
        let config = SequencerConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_backoff() {
        let config = SequencerConfig::default().with_backoff(100, 0.5, 1000);
        assert!(config.validate().is_err());

        let config = SequencerConfig::default().with_backoff(5000, 2.0, 1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_batch_size() {
        let config = SequencerConfig {
            max_instructions_per_tx: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchSize)
        ));
    }

    #[test]
    fn test_config_validate_invalid_program_id() {
        let config = SequencerConfig {
            program_id: "invalid!".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProgramId(_))
        ));
    }
}
