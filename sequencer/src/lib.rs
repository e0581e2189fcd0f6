//! Driftwire Sequencer - submits composed instructions and sees them through.
//!
//! Takes the instructions built by `driftwire-sdk`, packs them into
//! transactions, stamps each with a fresh blockhash, and drives it to
//! confirmation, resubmitting when the blockhash expires.
//!
//! # Components
//!
//! - [`config`]: Sequencer configuration
//! - [`rpc`]: Ledger RPC seam and JSON-RPC client
//! - [`signer`]: Signing seam
//! - [`builder`]: Transaction planning
//! - [`submitter`]: Transaction submission
//! - [`confirmation`]: Confirmation and retry
//! - [`session`]: Per-process context
//! - [`service`]: High-level operations
//! - [`metrics`]: Sequencer metrics

pub mod builder;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod metrics;
pub mod rpc;
pub mod service;
pub mod session;
pub mod signer;
pub mod submitter;

pub use builder::{PendingTransaction, TransactionBuilder, TxStatus};
pub use config::{ConfigError, SequencerConfig};
pub use confirmation::{ConfirmationConfig, ConfirmationController};
pub use error::SequencerError;
pub use metrics::SequencerMetrics;
pub use rpc::{Commitment, HttpLedgerRpc, LedgerRpc};
pub use service::{AccountLocks, SequenceReport, SequencerService, TransactionOutcome};
pub use session::Session;
pub use signer::{KeypairSigner, TransactionSigner};
pub use submitter::{SubmitterConfig, TransactionSubmitter};
