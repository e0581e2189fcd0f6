//! Order types for the driftwire SDK.
//!
//! Provides order-related types and the `OrderParams` payload in the exact
//! Borsh layout the program expects.

use std::fmt;
use std::str::FromStr;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};

use super::primitives::{BaseAmount, MarketId, MarketIndex, MarketType, PositionDirection, Price};
use crate::error::SdkError;

/// Order type.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize,
)]
#[serde(rename_all = "snake_case")]
#[borsh(use_discriminant = true)]
pub enum OrderType {
    /// Market order, filled through the auction.
    Market = 0,
    /// Limit order.
    #[default]
    Limit = 1,
    /// Market order that activates on a trigger price.
    TriggerMarket = 2,
    /// Limit order that activates on a trigger price.
    TriggerLimit = 3,
    /// Order priced relative to the oracle.
    Oracle = 4,
}

impl OrderType {
    /// Returns true if this order type carries an explicit limit price.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::TriggerLimit)
    }

    /// Returns true if this order type needs a trigger price.
    #[must_use]
    pub const fn requires_trigger(&self) -> bool {
        matches!(self, Self::TriggerMarket | Self::TriggerLimit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
            Self::TriggerMarket => write!(f, "trigger_market"),
            Self::TriggerLimit => write!(f, "trigger_limit"),
            Self::Oracle => write!(f, "oracle"),
        }
    }
}

impl FromStr for OrderType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(Self::Market),
            "limit" => Ok(Self::Limit),
            "trigger_market" => Ok(Self::TriggerMarket),
            "trigger_limit" => Ok(Self::TriggerLimit),
            "oracle" => Ok(Self::Oracle),
            _ => Err(SdkError::Deserialization(format!(
                "invalid order type: {}",
                s
            ))),
        }
    }
}

/// Post-only behaviour.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize,
)]
#[serde(rename_all = "snake_case")]
#[borsh(use_discriminant = true)]
pub enum PostOnlyParam {
    /// Order may take liquidity.
    #[default]
    None = 0,
    /// Fail the transaction if the order would cross.
    MustPostOnly = 1,
    /// Skip the order if it would cross.
    TryPostOnly = 2,
    /// Reprice the order so it does not cross.
    Slide = 3,
}

/// Trigger condition for trigger orders.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize,
)]
#[serde(rename_all = "snake_case")]
#[borsh(use_discriminant = true)]
pub enum TriggerCondition {
    /// Trigger when the oracle goes above the trigger price.
    #[default]
    Above = 0,
    /// Trigger when the oracle goes below the trigger price.
    Below = 1,
    /// Already triggered (above). Set by the program only.
    TriggeredAbove = 2,
    /// Already triggered (below). Set by the program only.
    TriggeredBelow = 3,
}

/// Order flag: immediate-or-cancel.
pub const ORDER_FLAG_IMMEDIATE_OR_CANCEL: u8 = 0b0000_0001;

/// Order placement parameters (on-chain layout).
///
/// Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    /// Order type.
    pub order_type: OrderType,
    /// Market type.
    pub market_type: MarketType,
    /// Direction.
    pub direction: PositionDirection,
    /// Caller-chosen order id, 0 for none.
    pub user_order_id: u8,
    /// Base amount in `BASE_PRECISION`.
    pub base_asset_amount: u64,
    /// Limit price in `PRICE_PRECISION`, 0 for none.
    pub price: u64,
    /// Market index.
    pub market_index: MarketIndex,
    /// Only reduce an existing position.
    pub reduce_only: bool,
    /// Post-only behaviour.
    pub post_only: PostOnlyParam,
    /// Order flags (`ORDER_FLAG_*`).
    pub bit_flags: u8,
    /// Unix timestamp after which the order expires.
    pub max_ts: Option<i64>,
    /// Trigger price for trigger orders.
    pub trigger_price: Option<u64>,
    /// Trigger condition.
    pub trigger_condition: TriggerCondition,
    /// Offset from the oracle price for oracle orders.
    pub oracle_price_offset: Option<i32>,
    /// Auction duration in slots.
    pub auction_duration: Option<u8>,
    /// Auction start price.
    pub auction_start_price: Option<i64>,
    /// Auction end price.
    pub auction_end_price: Option<i64>,
}

impl OrderParams {
    /// Creates limit order parameters with every optional field unset.
    #[must_use]
    pub fn limit(
        market: MarketId,
        direction: PositionDirection,
        base_asset_amount: BaseAmount,
        price: Price,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            market_type: market.market_type,
            direction,
            user_order_id: 0,
            base_asset_amount: base_asset_amount.value(),
            price: price.value(),
            market_index: market.index,
            reduce_only: false,
            post_only: PostOnlyParam::None,
            bit_flags: 0,
            max_ts: None,
            trigger_price: None,
            trigger_condition: TriggerCondition::Above,
            oracle_price_offset: None,
            auction_duration: None,
            auction_start_price: None,
            auction_end_price: None,
        }
    }

    /// Returns the market these parameters target.
    #[must_use]
    pub const fn market(&self) -> MarketId {
        MarketId::new(self.market_type, self.market_index)
    }

    /// Validates argument domains that can be checked client-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero, a priced order has no price,
    /// or a trigger order has no trigger price.
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.base_asset_amount == 0 {
            return Err(SdkError::InvalidAmount(
                "base asset amount must be positive".to_string(),
            ));
        }

        if self.order_type.requires_price() && self.price == 0 {
            return Err(SdkError::InvalidPrice(format!(
                "{} order requires a positive price",
                self.order_type
            )));
        }

        if self.order_type.requires_trigger() && self.trigger_price.unwrap_or(0) == 0 {
            return Err(SdkError::InvalidPrice(format!(
                "{} order requires a positive trigger price",
                self.order_type
            )));
        }

        Ok(())
    }
}
