//! Sequencer error types.

use driftwire_sdk::{ErrorClass, SdkError};

use crate::config::ConfigError;
use crate::rpc::RpcError;

/// Errors raised while planning, submitting or confirming transactions.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// Instruction composition failed.
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// Ledger RPC failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Simulation reported an error; nothing was submitted.
    #[error("preflight rejected: {reason}")]
    PreflightRejected {
        /// Transaction error, verbatim.
        reason: String,
    },

    /// The transaction could not be delivered to the ledger.
    #[error("submission failed: {reason}")]
    SubmissionFailed {
        /// Transport or node error.
        reason: String,
    },

    /// The ledger executed the transaction and the program refused it.
    #[error("transaction rejected: {reason}")]
    Rejected {
        /// Transaction error, verbatim.
        reason: String,
    },

    /// Freshness token expired and the retry budget is spent.
    #[error("transaction expired after {attempts} attempts")]
    Expired {
        /// Submissions made.
        attempts: u32,
    },

    /// Sequence deadline elapsed.
    #[error("sequence timed out after {elapsed_ms} ms")]
    Timeout {
        /// Elapsed time.
        elapsed_ms: u64,
    },

    /// A transaction was in the wrong lifecycle state for the operation.
    #[error("invalid transaction state: {0}")]
    InvalidState(String),
}

impl SequencerError {
    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Sdk(e) => e.class(),
            Self::Rpc(e) => e.class(),
            Self::Config(_) | Self::Signing(_) => ErrorClass::Configuration,
            Self::InvalidState(_) => ErrorClass::Validation,
            Self::PreflightRejected { .. } | Self::Rejected { .. } => ErrorClass::ProgramRejection,
            Self::SubmissionFailed { .. } | Self::Expired { .. } | Self::Timeout { .. } => {
                ErrorClass::Transient
            }
        }
    }

    /// Returns true if retrying may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}
