//! Core types for the driftwire SDK.

pub mod market;
pub mod order;
pub mod primitives;

pub use market::{MarketDescriptor, MarketRecord};
pub use order::{
    OrderParams, OrderType, PostOnlyParam, TriggerCondition, ORDER_FLAG_IMMEDIATE_OR_CANCEL,
};
pub use primitives::{
    BaseAmount, MarketId, MarketIndex, MarketType, PositionDirection, Price, BASE_PRECISION,
    PRICE_PRECISION,
};
