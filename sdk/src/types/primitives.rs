//! Primitive types for the driftwire SDK.
//!
//! Provides type-safe wrappers for prices and base amounts, plus market
//! identifiers and position directions.

use std::fmt;
use std::str::FromStr;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Fixed-point precision of Drift prices (1e6).
pub const PRICE_PRECISION: u64 = 1_000_000;

/// Fixed-point precision of Drift base asset amounts (1e9).
pub const BASE_PRECISION: u64 = 1_000_000_000;

/// Index of a market within its type namespace.
pub type MarketIndex = u16;

/// A price in `PRICE_PRECISION` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Creates a new price from raw precision units.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Creates a price from whole quote units.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidPrice` if the result overflows.
    pub fn from_units(units: u64) -> Result<Self, SdkError> {
        units
            .checked_mul(PRICE_PRECISION)
            .map(Self)
            .ok_or_else(|| SdkError::InvalidPrice(format!("{} overflows", units)))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns zero price.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns true if the price is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Price {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Price> for u64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// A base asset amount in `BASE_PRECISION` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseAmount(u64);

impl BaseAmount {
    /// Creates a new amount from raw precision units.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for BaseAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BaseAmount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Market type. Spot and perp markets are indexed independently.
///
/// Borsh encoding matches the program's `MarketType` enum.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
)]
#[serde(rename_all = "lowercase")]
#[borsh(use_discriminant = true)]
pub enum MarketType {
    /// Spot market.
    #[default]
    Spot = 0,
    /// Perpetual futures market.
    Perp = 1,
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::Perp => write!(f, "perp"),
        }
    }
}

impl FromStr for MarketType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(Self::Spot),
            "perp" => Ok(Self::Perp),
            _ => Err(SdkError::Deserialization(format!(
                "invalid market type: {}",
                s
            ))),
        }
    }
}

/// Identifies one market: its type plus its index within that type.
///
/// Ordering is spot before perp, then ascending index. This is the order
/// in which remaining accounts are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketId {
    /// Market type.
    pub market_type: MarketType,
    /// Market index.
    pub index: MarketIndex,
}

impl MarketId {
    /// Creates a new market id.
    #[must_use]
    pub const fn new(market_type: MarketType, index: MarketIndex) -> Self {
        Self { market_type, index }
    }

    /// Shorthand for a spot market id.
    #[must_use]
    pub const fn spot(index: MarketIndex) -> Self {
        Self::new(MarketType::Spot, index)
    }

    /// Shorthand for a perp market id.
    #[must_use]
    pub const fn perp(index: MarketIndex) -> Self {
        Self::new(MarketType::Perp, index)
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.market_type, self.index)
    }
}

impl FromStr for MarketId {
    type Err = SdkError;

    /// Parses `spot-1` or `perp-0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, index) = s
            .split_once('-')
            .ok_or_else(|| SdkError::Deserialization(format!("invalid market id: {}", s)))?;
        let index = index
            .parse()
            .map_err(|_| SdkError::Deserialization(format!("invalid market index: {}", index)))?;
        Ok(Self::new(kind.parse()?, index))
    }
}

/// Position direction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize,
)]
#[serde(rename_all = "lowercase")]
#[borsh(use_discriminant = true)]
pub enum PositionDirection {
    /// Buy / go long.
    #[default]
    Long = 0,
    /// Sell / go short.
    Short = 1,
}

impl PositionDirection {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl fmt::Display for PositionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

impl FromStr for PositionDirection {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            _ => Err(SdkError::Deserialization(format!(
                "invalid direction: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_units() {
        let price = Price::from_units(156).expect("price");
        assert_eq!(price.value(), 156_000_000);
    }

    #[test]
    fn test_price_from_units_overflow() {
        assert!(Price::from_units(u64::MAX).is_err());
    }

    #[test]
    fn test_price_zero() {
        assert!(Price::zero().is_zero());
        assert!(!Price::new(1).is_zero());
    }

    #[test]
    fn test_base_amount() {
        let amount = BaseAmount::new(BASE_PRECISION / 10);
        assert_eq!(amount.value(), 100_000_000);
        assert!(!amount.is_zero());
        assert_eq!(amount.to_string(), "100000000");
    }

    #[test]
    fn test_market_id_ordering() {
        let mut ids = vec![
            MarketId::perp(0),
            MarketId::spot(2),
            MarketId::perp(1),
            MarketId::spot(0),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                MarketId::spot(0),
                MarketId::spot(2),
                MarketId::perp(0),
                MarketId::perp(1),
            ]
        );
    }

    #[test]
    fn test_market_id_parse() {
        let id: MarketId = "perp-3".parse().expect("market id");
        assert_eq!(id, MarketId::perp(3));
        assert_eq!(id.to_string(), "perp-3");

        assert!("perp".parse::<MarketId>().is_err());
        assert!("swap-1".parse::<MarketId>().is_err());
        assert!("spot-x".parse::<MarketId>().is_err());
    }

    #[test]
    fn test_market_type_borsh() {
        assert_eq!(borsh::to_vec(&MarketType::Spot).expect("borsh"), vec![0]);
        assert_eq!(borsh::to_vec(&MarketType::Perp).expect("borsh"), vec![1]);
    }

    #[test]
    fn test_direction() {
        assert_eq!(PositionDirection::Long.opposite(), PositionDirection::Short);
        assert_eq!(
            "sell".parse::<PositionDirection>().expect("direction"),
            PositionDirection::Short
        );
        assert_eq!(
            borsh::to_vec(&PositionDirection::Short).expect("borsh"),
            vec![1]
        );
    }
}
