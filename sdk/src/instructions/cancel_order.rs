//! CancelOrder instruction builder.
//!
//! Order ids are only checked for being non-zero. Whether an id is actually
//! outstanding is for the program to decide.

use std::collections::BTreeSet;

use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::resolver::{AccountSetResolver, ResolveContext};
use crate::schema::InstructionKind;
use crate::types::MarketId;

use super::{InstructionArgs, InstructionSpec};

/// Builder for the CancelOrder instruction.
#[derive(Debug, Clone)]
pub struct CancelOrderBuilder {
    program_id: Pubkey,
    authority: Option<Pubkey>,
    sub_account_id: u16,
    order_id: Option<u32>,
    market: Option<MarketId>,
    open_positions: BTreeSet<MarketId>,
}

impl CancelOrderBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            authority: None,
            sub_account_id: 0,
            order_id: None,
            market: None,
            open_positions: BTreeSet::new(),
        }
    }

    /// Sets the authority.
    #[must_use]
    pub fn authority(mut self, authority: Pubkey) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Sets the sub-account id.
    #[must_use]
    pub fn sub_account_id(mut self, sub_account_id: u16) -> Self {
        self.sub_account_id = sub_account_id;
        self
    }

    /// Sets the order id. Without one the program cancels the most recent
    /// order.
    #[must_use]
    pub fn order_id(mut self, order_id: u32) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Sets the market the order rests in, making its state account writable.
    #[must_use]
    pub fn market(mut self, market: MarketId) -> Self {
        self.market = Some(market);
        self
    }

    /// Sets the markets the authority holds positions in.
    #[must_use]
    pub fn open_positions(mut self, positions: impl IntoIterator<Item = MarketId>) -> Self {
        self.open_positions = positions.into_iter().collect();
        self
    }

    /// Builds the instruction.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is missing, the order id is zero,
    /// or a referenced market is unknown.
    pub fn build(self, resolver: &AccountSetResolver) -> Result<InstructionSpec, SdkError> {
        let authority = self.authority.ok_or(SdkError::MissingField("authority"))?;

        if self.order_id == Some(0) {
            return Err(SdkError::InvalidOrderId(
                "order id must be positive".to_string(),
            ));
        }

        let ctx = ResolveContext {
            authority,
            sub_account_id: self.sub_account_id,
            market: self.market,
            direction: None,
            open_positions: self.open_positions,
        };
        let accounts = resolver
            .resolve(InstructionKind::CancelOrder, &ctx)?
            .into_accounts();

        Ok(InstructionSpec {
            program_id: self.program_id,
            args: InstructionArgs::CancelOrder {
                order_id: self.order_id,
            },
            accounts,
        })
    }
}
