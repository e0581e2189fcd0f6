//! Static market registry.
//!
//! Maps `(network, market id)` to a [`MarketDescriptor`]. A registry is
//! loaded once per session and never mutated afterwards; share it behind an
//! `Arc` for concurrent readers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::types::{MarketDescriptor, MarketId, MarketRecord};

/// Network with an embedded registry.
pub const MAINNET_BETA: &str = "mainnet-beta";

const MAINNET_BETA_REGISTRY: &str = include_str!("../registry/mainnet-beta.json");

/// Registry file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    /// Network identifier.
    pub network: String,
    /// Registry version, bumped whenever an address changes.
    pub version: u32,
    /// Market records.
    pub markets: Vec<MarketRecord>,
}

/// Read-only market registry for one network.
#[derive(Debug, Clone)]
pub struct MarketRegistry {
    network: String,
    version: u32,
    markets: BTreeMap<MarketId, MarketDescriptor>,
}

impl MarketRegistry {
    /// Loads the embedded registry for `network`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::UnknownNetwork` if no registry is embedded for the
    /// network, or a parse error if the embedded data is invalid.
    pub fn load(network: &str) -> Result<Self, SdkError> {
        match network {
            MAINNET_BETA => Self::from_json(MAINNET_BETA_REGISTRY),
            other => Err(SdkError::UnknownNetwork(other.to_string())),
        }
    }

    /// Parses a registry from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, an address is invalid, or
    /// a market id appears twice.
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let file: RegistryFile = serde_json::from_str(json)
            .map_err(|e| SdkError::InvalidRegistry(e.to_string()))?;

        let descriptors = file
            .markets
            .into_iter()
            .map(MarketDescriptor::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_descriptors(file.network, file.version, descriptors)
    }

    /// Builds a registry from descriptors.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidRegistry` if a market id appears twice.
    pub fn from_descriptors(
        network: impl Into<String>,
        version: u32,
        descriptors: impl IntoIterator<Item = MarketDescriptor>,
    ) -> Result<Self, SdkError> {
        let mut markets = BTreeMap::new();
        for descriptor in descriptors {
            let id = descriptor.id;
            if markets.insert(id, descriptor).is_some() {
                return Err(SdkError::InvalidRegistry(format!("duplicate market {}", id)));
            }
        }

        Ok(Self {
            network: network.into(),
            version,
            markets,
        })
    }

    /// Returns the network identifier.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Returns the registry version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Looks up a market.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::UnknownMarket` if the market is not registered.
    pub fn get(&self, id: &MarketId) -> Result<&MarketDescriptor, SdkError> {
        self.markets.get(id).ok_or_else(|| SdkError::UnknownMarket {
            network: self.network.clone(),
            market: *id,
        })
    }

    /// Returns true if the market is registered.
    #[must_use]
    pub fn contains(&self, id: &MarketId) -> bool {
        self.markets.contains_key(id)
    }

    /// Returns the number of markets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    /// Returns true if the registry has no markets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Iterates markets in `MarketId` order.
    pub fn iter(&self) -> impl Iterator<Item = &MarketDescriptor> {
        self.markets.values()
    }

    /// Finds a market by symbol.
    #[must_use]
    pub fn find_by_symbol(&self, symbol: &str) -> Option<&MarketDescriptor> {
        self.markets
            .values()
            .find(|m| m.symbol.eq_ignore_ascii_case(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::WSOL_MINT;
    use crate::types::MarketType;

    #[test]
    fn test_load_mainnet() {
        let registry = MarketRegistry::load(MAINNET_BETA).expect("registry");
        assert_eq!(registry.network(), MAINNET_BETA);
        assert_eq!(registry.len(), 3);

        let sol = registry.get(&MarketId::spot(1)).expect("sol spot");
        assert_eq!(sol.symbol, "SOL");
        assert_eq!(sol.mint, Some(WSOL_MINT));
        assert!(sol.vault.is_some());

        let perp = registry.get(&MarketId::perp(0)).expect("sol perp");
        assert_eq!(perp.market_type(), MarketType::Perp);
        assert_eq!(perp.oracle, sol.oracle);
    }

    #[test]
    fn test_load_unknown_network() {
        assert!(matches!(
            MarketRegistry::load("localnet"),
            Err(SdkError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_get_unknown_market() {
        let registry = MarketRegistry::load(MAINNET_BETA).expect("registry");
        let err = registry.get(&MarketId::perp(99)).expect_err("unknown");
        assert!(matches!(err, SdkError::UnknownMarket { .. }));
    }

    #[test]
    fn test_iter_is_ordered() {
        let registry = MarketRegistry::load(MAINNET_BETA).expect("registry");
        let ids: Vec<_> = registry.iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![MarketId::spot(0), MarketId::spot(1), MarketId::perp(0)]
        );
    }

    #[test]
    fn test_find_by_symbol() {
        let registry = MarketRegistry::load(MAINNET_BETA).expect("registry");
        let market = registry.find_by_symbol("sol-perp").expect("symbol");
        assert_eq!(market.id, MarketId::perp(0));
        assert!(registry.find_by_symbol("DOGE").is_none());
    }

    #[test]
    fn test_from_json_duplicate() {
        let json = r#"{
            "network": "test",
            "version": 1,
            "markets": [
                {"marketType": "perp", "marketIndex": 0, "symbol": "A",
                 "oracle": "11111111111111111111111111111111",
                 "market": "11111111111111111111111111111111"},
                {"marketType": "perp", "marketIndex": 0, "symbol": "B",
                 "oracle": "11111111111111111111111111111111",
                 "market": "11111111111111111111111111111111"}
            ]
        }"#;
        assert!(matches!(
            MarketRegistry::from_json(json),
            Err(SdkError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(MarketRegistry::from_json("{").is_err());
    }
}
