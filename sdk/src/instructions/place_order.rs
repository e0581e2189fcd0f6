//! PlaceOrder instruction builder.
//!
//! Builds the instruction to place a single order.

use std::collections::BTreeSet;

use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::resolver::{AccountSetResolver, ResolveContext};
use crate::schema::InstructionKind;
use crate::types::{MarketId, OrderParams};

use super::{InstructionArgs, InstructionSpec};

/// Builder for the PlaceOrder instruction.
#[derive(Debug, Clone)]
pub struct PlaceOrderBuilder {
    program_id: Pubkey,
    authority: Option<Pubkey>,
    sub_account_id: u16,
    params: Option<OrderParams>,
    open_positions: BTreeSet<MarketId>,
}

impl PlaceOrderBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            authority: None,
            sub_account_id: 0,
            params: None,
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

    /// Sets the order parameters.
    #[must_use]
    pub fn params(mut self, params: OrderParams) -> Self {
        self.params = Some(params);
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
    /// Returns an error if a required field is missing, the parameters fail
    /// validation, or a referenced market is unknown.
    pub fn build(self, resolver: &AccountSetResolver) -> Result<InstructionSpec, SdkError> {
        let authority = self.authority.ok_or(SdkError::MissingField("authority"))?;
        let params = self.params.ok_or(SdkError::MissingField("order params"))?;
        params.validate()?;

        let ctx = ResolveContext {
            authority,
            sub_account_id: self.sub_account_id,
            market: Some(params.market()),
            direction: Some(params.direction),
            open_positions: self.open_positions,
        };
        let accounts = resolver
            .resolve(InstructionKind::PlaceOrder, &ctx)?
            .into_accounts();

        Ok(InstructionSpec {
            program_id: self.program_id,
            args: InstructionArgs::PlaceOrder(params),
            accounts,
        })
    }
}
