//! Deposit instruction builder.
//!
//! Builds the instruction to move collateral from the authority's token
//! account into a spot market vault.

use std::collections::BTreeSet;

use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::resolver::{AccountSetResolver, ResolveContext};
use crate::schema::InstructionKind;
use crate::types::MarketId;

use super::{InstructionArgs, InstructionSpec};

/// Builder for the Deposit instruction.
#[derive(Debug, Clone)]
pub struct DepositBuilder {
    program_id: Pubkey,
    authority: Option<Pubkey>,
    sub_account_id: u16,
    market: Option<MarketId>,
    amount: u64,
    open_positions: BTreeSet<MarketId>,
}

impl DepositBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            authority: None,
            sub_account_id: 0,
            market: None,
            amount: 0,
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

    /// Sets the spot market to deposit into.
    #[must_use]
    pub fn spot_market(mut self, index: u16) -> Self {
        self.market = Some(MarketId::spot(index));
        self
    }

    /// Sets the market to deposit into.
    #[must_use]
    pub fn market(mut self, market: MarketId) -> Self {
        self.market = Some(market);
        self
    }

    /// Sets the amount in the mint's native units.
    #[must_use]
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
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
    /// Returns an error if a required field is missing, the amount is zero,
    /// or the market is unknown or not a spot market.
    pub fn build(self, resolver: &AccountSetResolver) -> Result<InstructionSpec, SdkError> {
        let authority = self.authority.ok_or(SdkError::MissingField("authority"))?;
        let market = self.market.ok_or(SdkError::MissingField("market"))?;

        if self.amount == 0 {
            return Err(SdkError::InvalidAmount(
                "deposit amount must be positive".to_string(),
            ));
        }

        let ctx = ResolveContext {
            authority,
            sub_account_id: self.sub_account_id,
            market: Some(market),
            direction: None,
            open_positions: self.open_positions,
        };
        let accounts = resolver
            .resolve(InstructionKind::Deposit, &ctx)?
            .into_accounts();

        Ok(InstructionSpec {
            program_id: self.program_id,
            args: InstructionArgs::Deposit {
                market_index: market.index,
                amount: self.amount,
            },
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{DRIFT_DEMO_PROGRAM_ID, WSOL_MINT};
    use crate::instructions::test_support::mainnet_resolver;

    #[test]
    fn test_deposit_builder_chain() {
        let authority = Pubkey::new_unique();
        let builder = DepositBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(authority)
            .spot_market(1)
            .amount(500);

        assert_eq!(builder.authority, Some(authority));
        assert_eq!(builder.market, Some(MarketId::spot(1)));
        assert_eq!(builder.amount, 500);
    }

    #[test]
    fn test_deposit_builder_build() {
        let resolver = mainnet_resolver();
        let authority = Pubkey::new_unique();

        let spec = DepositBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(authority)
            .spot_market(1)
            .amount(2_000_000_000)
            .build(&resolver)
            .expect("should build instruction");

        // 10 fixed accounts, one oracle, one market.
        assert_eq!(spec.accounts.len(), 12);
        assert_eq!(
            spec.accounts[1].address,
            resolver
                .deriver()
                .associated_token_address(&authority, &WSOL_MINT)
                .expect("ata")
        );
        assert!(spec.accounts[11].is_writable);
        assert_eq!(
            spec.args,
            InstructionArgs::Deposit {
                market_index: 1,
                amount: 2_000_000_000
            }
        );
    }

    #[test]
    fn test_deposit_builder_zero_amount() {
        let result = DepositBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(Pubkey::new_unique())
            .spot_market(1)
            .build(&mainnet_resolver());

        assert!(matches!(result, Err(SdkError::InvalidAmount(_))));
    }

    #[test]
    fn test_deposit_builder_unknown_market() {
        let result = DepositBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(Pubkey::new_unique())
            .spot_market(40)
            .amount(1)
            .build(&mainnet_resolver());

        assert!(matches!(result, Err(SdkError::UnknownMarket { .. })));
    }

    #[test]
    fn test_deposit_builder_missing_market() {
        let result = DepositBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(Pubkey::new_unique())
            .amount(1)
            .build(&mainnet_resolver());

        assert!(matches!(result, Err(SdkError::MissingField("market"))));
    }
}
