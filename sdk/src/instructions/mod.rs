//! Instruction builders for the drift demo program.
//!
//! Each builder validates its arguments, resolves the full account list
//! through an [`AccountSetResolver`], and produces an immutable
//! [`InstructionSpec`]. The payload is the 8-byte Anchor discriminator
//! followed by the Borsh-encoded arguments.
//!
//! # Example
//!
//! ```rust,ignore
//! use driftwire_sdk::instructions::PlaceOrderBuilder;
//! use driftwire_sdk::ids::DRIFT_DEMO_PROGRAM_ID;
//! use driftwire_sdk::types::{BaseAmount, MarketId, OrderParams, PositionDirection, Price};
//!
//! let params = OrderParams::limit(
//!     MarketId::perp(0),
//!     PositionDirection::Long,
//!     BaseAmount::new(100_000_000),
//!     Price::new(150_000_000),
//! );
//!
//! let spec = PlaceOrderBuilder::new(DRIFT_DEMO_PROGRAM_ID)
//!     .authority(authority)
//!     .params(params)
//!     .build(&resolver)
//!     .expect("should build instruction");
//! ```

pub mod cancel_order;
pub mod deposit;
pub mod initialize;
pub mod place_order;
pub mod wrap;

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::error::SdkError;
use crate::schema::{AccountRole, InstructionKind};
use crate::types::OrderParams;

pub use cancel_order::CancelOrderBuilder;
pub use deposit::DepositBuilder;
pub use initialize::InitializeBuilder;
pub use place_order::PlaceOrderBuilder;

/// Length of an Anchor instruction discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Computes the Anchor discriminator: `sha256("global:<method>")[..8]`.
#[must_use]
pub fn discriminator(method: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = Sha256::digest(format!("global:{}", method).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

#[derive(BorshSerialize)]
struct DepositArgs {
    market_index: u16,
    amount: u64,
}

#[derive(BorshSerialize)]
struct CancelOrderArgs {
    order_id: Option<u32>,
}

/// Typed instruction arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionArgs {
    /// `drift_initialize()`.
    Initialize,
    /// `drift_deposit(market_index, amount)`.
    Deposit {
        /// Spot market index.
        market_index: u16,
        /// Amount in the mint's native units.
        amount: u64,
    },
    /// `drift_place_orders(order_params)`.
    PlaceOrder(OrderParams),
    /// `drift_cancel_order(order_id)`.
    CancelOrder {
        /// Order to cancel; `None` cancels the most recent order.
        order_id: Option<u32>,
    },
}

impl InstructionArgs {
    /// Returns the instruction kind these arguments belong to.
    #[must_use]
    pub const fn kind(&self) -> InstructionKind {
        match self {
            Self::Initialize => InstructionKind::Initialize,
            Self::Deposit { .. } => InstructionKind::Deposit,
            Self::PlaceOrder(_) => InstructionKind::PlaceOrder,
            Self::CancelOrder { .. } => InstructionKind::CancelOrder,
        }
    }

    /// Encodes discriminator and arguments.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Serialization` if Borsh encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, SdkError> {
        let mut data = discriminator(self.kind().method_name()).to_vec();

        let args = match self {
            Self::Initialize => Ok(Vec::new()),
            Self::Deposit {
                market_index,
                amount,
            } => borsh::to_vec(&DepositArgs {
                market_index: *market_index,
                amount: *amount,
            }),
            Self::PlaceOrder(params) => borsh::to_vec(params),
            Self::CancelOrder { order_id } => borsh::to_vec(&CancelOrderArgs {
                order_id: *order_id,
            }),
        }
        .map_err(|e| SdkError::Serialization(e.to_string()))?;

        data.extend(args);
        Ok(data)
    }
}

/// A fully resolved, validated instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSpec {
    /// Target program.
    pub program_id: Pubkey,
    /// Instruction arguments.
    pub args: InstructionArgs,
    /// Ordered account list (fixed prefix, then dynamic suffix).
    pub accounts: Vec<AccountRole>,
}

impl InstructionSpec {
    /// Returns the instruction kind.
    #[must_use]
    pub const fn kind(&self) -> InstructionKind {
        self.args.kind()
    }

    /// Converts to a ledger instruction.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Serialization` if the arguments cannot be encoded.
    pub fn to_instruction(&self) -> Result<Instruction, SdkError> {
        Ok(Instruction {
            program_id: self.program_id,
            accounts: self
                .accounts
                .iter()
                .copied()
                .map(AccountMeta::from)
                .collect(),
            data: self.args.encode()?,
        })
    }
}
