//! Ledger RPC error types.

use driftwire_sdk::ErrorClass;
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    request::{RpcError as ClientRpcError, RpcResponseErrorData},
    response::RpcSimulateTransactionResult,
};

/// Ledger RPC errors.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport or node failure; the request may succeed if repeated.
    #[error("RPC request failed: {0}")]
    Client(Box<ClientError>),

    /// The node ran the transaction in preflight and it failed.
    #[error("preflight failed: {reason}")]
    PreflightFailure {
        /// Transaction error, rendered verbatim.
        reason: String,
        /// Program logs from the preflight run.
        logs: Vec<String>,
    },

    /// Response was well-formed but did not contain what was asked for.
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RpcError {
    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Client(_) => ErrorClass::Transient,
            Self::PreflightFailure { .. } => ErrorClass::ProgramRejection,
            Self::InvalidResponse(_) | Self::InvalidConfig(_) => ErrorClass::Configuration,
        }
    }
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        let Some(tx_err) = err.get_transaction_error() else {
            return Self::Client(Box::new(err));
        };

        let logs = match err.kind() {
            ClientErrorKind::RpcError(
                ClientRpcError::RpcResponseError {
                    data:
                        RpcResponseErrorData::SendTransactionPreflightFailure(
                            RpcSimulateTransactionResult {
                                logs: Some(logs), ..
                            },
                        ),
                    ..
                },
            ) => logs.clone(),
            _ => Vec::new(),
        };

        Self::PreflightFailure {
            reason: tx_err.to_string(),
            logs,
        }
    }
}
