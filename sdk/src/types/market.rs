//! Market descriptor type.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::primitives::{MarketId, MarketIndex, MarketType};
use crate::error::SdkError;

/// Static description of one market, as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDescriptor {
    /// Market id.
    pub id: MarketId,
    /// Human-readable symbol (e.g., "SOL-PERP").
    pub symbol: String,
    /// Price oracle account.
    pub oracle: Pubkey,
    /// On-chain market-state account.
    pub market: Pubkey,
    /// Token mint, spot markets only.
    pub mint: Option<Pubkey>,
    /// Deposit vault, spot markets only.
    pub vault: Option<Pubkey>,
}

impl MarketDescriptor {
    /// Returns the market type.
    #[must_use]
    pub const fn market_type(&self) -> MarketType {
        self.id.market_type
    }

    /// Returns the market index.
    #[must_use]
    pub const fn index(&self) -> MarketIndex {
        self.id.index
    }

    /// Returns true for spot markets.
    #[must_use]
    pub fn is_spot(&self) -> bool {
        self.id.market_type == MarketType::Spot
    }
}

/// Registry file representation of a market (addresses base58 encoded).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    /// Market type.
    pub market_type: MarketType,
    /// Market index.
    pub market_index: MarketIndex,
    /// Symbol.
    pub symbol: String,
    /// Oracle address.
    pub oracle: String,
    /// Market-state address.
    pub market: String,
    /// Mint address (spot only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    /// Vault address (spot only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
}

fn parse_pubkey(value: &str) -> Result<Pubkey, SdkError> {
    Pubkey::from_str(value).map_err(|_| SdkError::InvalidAddress(value.to_string()))
}

impl TryFrom<MarketRecord> for MarketDescriptor {
    type Error = SdkError;

    fn try_from(record: MarketRecord) -> Result<Self, Self::Error> {
        let id = MarketId::new(record.market_type, record.market_index);

        if record.market_type == MarketType::Perp && (record.mint.is_some() || record.vault.is_some())
        {
            return Err(SdkError::InvalidRegistry(format!(
                "{} is a perp market but lists a mint or vault",
                id
            )));
        }

        Ok(Self {
            id,
            symbol: record.symbol,
            oracle: parse_pubkey(&record.oracle)?,
            market: parse_pubkey(&record.market)?,
            mint: record.mint.as_deref().map(parse_pubkey).transpose()?,
            vault: record.vault.as_deref().map(parse_pubkey).transpose()?,
        })
    }
}
