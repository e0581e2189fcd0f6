//! Session context.
//!
//! Everything a sequence needs that lives for the whole process: the
//! configuration, ledger and signer handles, the market registry and the
//! account resolver built over it.

use std::path::Path;
use std::sync::Arc;

use driftwire_sdk::{AccountSetResolver, AddressDeriver, MarketRegistry, SchemaRegistry, SdkError};
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::builder::TransactionBuilder;
use crate::config::{ConfigError, SequencerConfig};
use crate::confirmation::{ConfirmationConfig, ConfirmationController};
use crate::error::SequencerError;
use crate::metrics::SequencerMetrics;
use crate::rpc::{HttpLedgerRpc, LedgerRpc};
use crate::signer::{KeypairSigner, TransactionSigner};
use crate::submitter::{SubmitterConfig, TransactionSubmitter};

/// Shared state for one authority talking to one ledger.
pub struct Session {
    config: SequencerConfig,
    program_id: Pubkey,
    rpc: Arc<dyn LedgerRpc>,
    signer: Arc<dyn TransactionSigner>,
    resolver: Arc<AccountSetResolver>,
    metrics: Arc<SequencerMetrics>,
}

impl Session {
    /// Creates a session over the given ledger and signer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the schema version
    /// is unknown, or the market registry cannot be loaded.
    pub fn new(
        config: SequencerConfig,
        rpc: Arc<dyn LedgerRpc>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, SequencerError> {
        config.validate()?;
        let program_id = config.parse_program_id()?;
        let schemas = SchemaRegistry::by_version(&config.schema_version)?;
        let registry = load_registry(&config.network)?;

        info!(
            network = registry.network(),
            markets = registry.len(),
            schema = schemas.version(),
            %program_id,
            authority = %signer.pubkey(),
            "Session ready"
        );

        let resolver = AccountSetResolver::new(
            schemas,
            Arc::new(registry),
            Arc::new(AddressDeriver::default()),
        );

        Ok(Self {
            config,
            program_id,
            rpc,
            signer,
            resolver: Arc::new(resolver),
            metrics: Arc::new(SequencerMetrics::new()),
        })
    }

    /// Creates a session with the JSON-RPC client and the configured
    /// keypair file.
    ///
    /// # Errors
    ///
    /// Returns an error if no keypair is configured or it cannot be loaded,
    /// or for any error of [`Session::new`].
    pub fn connect(config: SequencerConfig) -> Result<Self, SequencerError> {
        let keypair_path = config.keypair_path.clone().ok_or(ConfigError::Keypair {
            path: String::new(),
            reason: "no keypair configured".to_string(),
        })?;

        let signer = KeypairSigner::from_file(&keypair_path)?;
        let rpc = HttpLedgerRpc::new(config.rpc_config())?;

        Self::new(config, Arc::new(rpc), Arc::new(signer))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Returns the target program id.
    #[must_use]
    pub const fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Returns the authority, which signs and pays for every transaction.
    #[must_use]
    pub fn authority(&self) -> Pubkey {
        self.signer.pubkey()
    }

    /// Returns the ledger RPC.
    #[must_use]
    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    /// Returns the signer.
    #[must_use]
    pub fn signer(&self) -> &Arc<dyn TransactionSigner> {
        &self.signer
    }

    /// Returns the account resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<AccountSetResolver> {
        &self.resolver
    }

    /// Returns the market registry.
    #[must_use]
    pub fn registry(&self) -> &MarketRegistry {
        self.resolver.registry()
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<SequencerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Creates a transaction builder for this session.
    #[must_use]
    pub fn transaction_builder(&self) -> TransactionBuilder {
        TransactionBuilder::new(
            self.program_id,
            Arc::clone(&self.resolver),
            self.config.max_instructions_per_tx,
        )
    }

    /// Creates a confirmation controller (and its submitter) for this
    /// session.
    #[must_use]
    pub fn confirmation_controller(&self) -> ConfirmationController {
        let submitter = TransactionSubmitter::new(
            Arc::clone(&self.rpc),
            Arc::clone(&self.signer),
            SubmitterConfig::from(&self.config),
        )
        .with_metrics(self.metrics());

        ConfirmationController::new(Arc::new(submitter), ConfirmationConfig::from(&self.config))
            .with_metrics(self.metrics())
    }
}

/// Loads the registry for a network name, or from a JSON file when given a
/// path ending in `.json`.
fn load_registry(network: &str) -> Result<MarketRegistry, SequencerError> {
    if network.ends_with(".json") {
        let json = std::fs::read_to_string(Path::new(network))
            .map_err(|e| SdkError::InvalidRegistry(format!("{}: {}", network, e)))?;
        return Ok(MarketRegistry::from_json(&json)?);
    }

    Ok(MarketRegistry::load(network)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::{MockLedger, Script};
    use driftwire_sdk::ids::DRIFT_DEMO_PROGRAM_ID;
    use solana_sdk::signature::Keypair;

    fn create_session(config: SequencerConfig) -> Result<Session, SequencerError> {
        Session::new(
            config,
            Arc::new(MockLedger::new(Script::Land)),
            Arc::new(KeypairSigner::new(Keypair::new())),
        )
    }

    #[test]
    fn test_session_new() {
        let session = create_session(SequencerConfig::default()).expect("session");

        assert_eq!(session.program_id(), &DRIFT_DEMO_PROGRAM_ID);
        assert_eq!(session.registry().len(), 3);
        assert_eq!(session.authority(), session.signer().pubkey());
    }

    #[test]
    fn test_session_unknown_network() {
        let config = SequencerConfig {
            network: "localnet".to_string(),
            ..Default::default()
        };
        let result = create_session(config);
        assert!(matches!(
            result,
            Err(SequencerError::Sdk(SdkError::UnknownNetwork(_)))
        ));
    }

    #[test]
    fn test_session_unknown_schema_version() {
        let config = SequencerConfig {
            schema_version: "drift-demo/v0".to_string(),
            ..Default::default()
        };
        let result = create_session(config);
        assert!(matches!(
            result,
            Err(SequencerError::Sdk(SdkError::SchemaMismatch { .. }))
        ));
    }

    #[test]
    fn test_session_invalid_config() {
        let config = SequencerConfig::default().with_poll_interval(0);
        let result = create_session(config);
        assert!(matches!(result, Err(SequencerError::Config(_))));
    }

    #[test]
    fn test_session_connect_requires_keypair() {
        let result = Session::connect(SequencerConfig::default());
        assert!(matches!(
            result,
            Err(SequencerError::Config(ConfigError::Keypair { .. }))
        ));
    }

    #[test]
    fn test_load_registry_missing_file() {
        let result = load_registry("/nonexistent/markets.json");
        assert!(matches!(
            result,
            Err(SequencerError::Sdk(SdkError::InvalidRegistry(_)))
        ));
    }

    #[test]
    fn test_transaction_builder_uses_session_program() {
        let session = create_session(SequencerConfig::default()).expect("session");
        let builder = session.transaction_builder();
        assert_eq!(builder.program_id(), session.program_id());
    }
}
