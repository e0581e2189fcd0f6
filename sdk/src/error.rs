//! SDK error types.
//!
//! Provides error types for address derivation, account resolution and
//! instruction building. Nothing in this crate performs I/O, so every error
//! here is either a configuration or a validation problem.

use serde::Serialize;

use crate::types::{MarketId, MarketType};

/// Coarse classification used by callers to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Unknown market, schema mismatch, exhausted derivation space.
    Configuration,
    /// Out-of-range argument or malformed account list.
    Validation,
    /// Expired freshness token, RPC timeout.
    Transient,
    /// The on-chain program refused the transaction.
    ProgramRejection,
}

impl ErrorClass {
    /// Returns true if errors of this class may be retried automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Market not present in the registry.
    #[error("unknown market {market} on {network}")]
    UnknownMarket {
        /// Network the registry was loaded for.
        network: String,
        /// Requested market.
        market: MarketId,
    },

    /// Network has no registry available.
    #[error("no market registry for network: {0}")]
    UnknownNetwork(String),

    /// Registry data could not be parsed or is inconsistent.
    #[error("invalid market registry: {0}")]
    InvalidRegistry(String),

    /// No bump in 0..=255 produced an off-curve address.
    #[error("exhausted bump space deriving address for program {program_id}")]
    ExhaustedBumpSpace {
        /// Program the derivation was attempted for (base58).
        program_id: String,
    },

    /// Seed material exceeds the runtime's limits.
    #[error("invalid seeds: {0}")]
    InvalidSeeds(String),

    /// No schema registered for the instruction kind.
    #[error("no account schema for {kind} in {version}")]
    SchemaMismatch {
        /// Schema version.
        version: String,
        /// Instruction kind.
        kind: String,
    },

    /// Instruction kind needs a target market but none was given.
    #[error("{0} requires a target market")]
    MissingMarket(String),

    /// Market exists but has the wrong type for the instruction.
    #[error("{market} is not a {expected} market")]
    WrongMarketType {
        /// Offending market.
        market: MarketId,
        /// Expected market type.
        expected: MarketType,
    },

    /// Required builder field not set.
    #[error("{0} not set")]
    MissingField(&'static str),

    /// Invalid amount value.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid price value.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Invalid order identifier.
    #[error("invalid order id: {0}")]
    InvalidOrderId(String),

    /// Invalid address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl SdkError {
    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownMarket { .. }
            | Self::UnknownNetwork(_)
            | Self::InvalidRegistry(_)
            | Self::ExhaustedBumpSpace { .. }
            | Self::InvalidSeeds(_)
            | Self::SchemaMismatch { .. } => ErrorClass::Configuration,
            Self::MissingMarket(_)
            | Self::WrongMarketType { .. }
            | Self::MissingField(_)
            | Self::InvalidAmount(_)
            | Self::InvalidPrice(_)
            | Self::InvalidOrderId(_)
            | Self::InvalidAddress(_)
            | Self::Serialization(_)
            | Self::Deserialization(_) => ErrorClass::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdkError::InvalidPrice("must be positive".to_string());
        assert_eq!(err.to_string(), "invalid price: must be positive");
    }

    #[test]
    fn test_unknown_market_display() {
        let err = SdkError::UnknownMarket {
            network: "mainnet-beta".to_string(),
            market: MarketId::new(MarketType::Perp, 7),
        };
        assert_eq!(err.to_string(), "unknown market perp-7 on mainnet-beta");
    }

    #[test]
    fn test_error_class() {
        let err = SdkError::ExhaustedBumpSpace {
            program_id: "x".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(!err.class().is_retryable());

        let err = SdkError::InvalidAmount("zero".to_string());
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_missing_field_display() {
        let err = SdkError::MissingField("authority");
        assert_eq!(err.to_string(), "authority not set");
    }
}
