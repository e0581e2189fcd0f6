//! Account-set resolution.
//!
//! Expands an instruction kind plus a handful of caller identifiers into the
//! complete ordered account list: the fixed prefix from the schema table,
//! followed by the dynamic suffix the program needs for margin checks.
//!
//! Suffix ordering: every oracle first, then every market-state account.
//! Both groups follow `MarketId` order (spot before perp, ascending index).
//! The acted-upon market's state account is the only writable one.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::ids::{RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID, WSOL_MINT};
use crate::pda::AddressDeriver;
use crate::registry::MarketRegistry;
use crate::schema::{AccountRole, InstructionKind, RoleSource, SchemaRegistry};
use crate::types::{MarketDescriptor, MarketId, MarketType, PositionDirection};

/// Caller-supplied identifiers for one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    /// Authority (and fee payer).
    pub authority: Pubkey,
    /// Sub-account id of the user PDA.
    pub sub_account_id: u16,
    /// Market the instruction acts on.
    pub market: Option<MarketId>,
    /// Order direction, if any.
    pub direction: Option<PositionDirection>,
    /// Markets in which the authority holds an open position.
    pub open_positions: BTreeSet<MarketId>,
}

impl ResolveContext {
    /// Creates a context for the authority's main sub-account.
    #[must_use]
    pub fn new(authority: Pubkey) -> Self {
        Self {
            authority,
            sub_account_id: 0,
            market: None,
            direction: None,
            open_positions: BTreeSet::new(),
        }
    }

    /// Sets the sub-account id.
    #[must_use]
    pub fn sub_account(mut self, sub_account_id: u16) -> Self {
        self.sub_account_id = sub_account_id;
        self
    }

    /// Sets the acted-upon market.
    #[must_use]
    pub fn market(mut self, market: MarketId) -> Self {
        self.market = Some(market);
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn direction(mut self, direction: PositionDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Sets the open-position set.
    #[must_use]
    pub fn open_positions(mut self, positions: impl IntoIterator<Item = MarketId>) -> Self {
        self.open_positions = positions.into_iter().collect();
        self
    }
}

/// Resolved account list, split at the prefix/suffix boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccounts {
    /// Fixed, schema-declared accounts.
    pub prefix: Vec<AccountRole>,
    /// Oracle and market-state accounts.
    pub suffix: Vec<AccountRole>,
}

impl ResolvedAccounts {
    /// Returns the total account count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// Returns true if there are no accounts at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    /// Concatenates prefix and suffix.
    #[must_use]
    pub fn into_accounts(self) -> Vec<AccountRole> {
        let mut accounts = self.prefix;
        accounts.extend(self.suffix);
        accounts
    }
}

/// Resolves account lists against a schema version and market registry.
#[derive(Debug, Clone)]
pub struct AccountSetResolver {
    schemas: SchemaRegistry,
    registry: Arc<MarketRegistry>,
    deriver: Arc<AddressDeriver>,
}

impl AccountSetResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        schemas: SchemaRegistry,
        registry: Arc<MarketRegistry>,
        deriver: Arc<AddressDeriver>,
    ) -> Self {
        Self {
            schemas,
            registry,
            deriver,
        }
    }

    /// Returns the schema registry.
    #[must_use]
    pub const fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Returns the market registry.
    #[must_use]
    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    /// Returns the address deriver.
    #[must_use]
    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    /// Resolves the full account list for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` for markets missing from the registry,
    /// `MissingMarket` when the kind needs a target market and none is set,
    /// `WrongMarketType` when a deposit targets a perp market, and
    /// derivation errors from the PDA helpers.
    pub fn resolve(
        &self,
        kind: InstructionKind,
        ctx: &ResolveContext,
    ) -> Result<ResolvedAccounts, SdkError> {
        if kind.requires_market() && ctx.market.is_none() {
            return Err(SdkError::MissingMarket(kind.to_string()));
        }

        let target = ctx
            .market
            .map(|id| self.registry.get(&id))
            .transpose()?;

        let schema = self.schemas.get(kind)?;
        let prefix = schema
            .roles
            .iter()
            .map(|spec| {
                Ok(AccountRole {
                    address: self.role_address(kind, spec.source, ctx, target)?,
                    is_writable: spec.writable,
                    is_signer: spec.signer,
                })
            })
            .collect::<Result<Vec<_>, SdkError>>()?;

        let suffix = if kind.has_dynamic_suffix() {
            self.remaining_accounts(ctx.market, &ctx.open_positions)?
        } else {
            Vec::new()
        };

        Ok(ResolvedAccounts { prefix, suffix })
    }

    /// Builds the dynamic suffix for an acted-upon market and position set.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` if any market is not registered.
    pub fn remaining_accounts(
        &self,
        target: Option<MarketId>,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<Vec<AccountRole>, SdkError> {
        let mut relevant = open_positions.clone();
        relevant.extend(target);

        let markets = relevant
            .iter()
            .map(|id| self.registry.get(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::with_capacity(markets.len());
        let mut accounts = Vec::with_capacity(markets.len() * 2);

        for market in &markets {
            if seen.insert(market.oracle) {
                accounts.push(AccountRole::readonly(market.oracle));
            }
        }

        for market in &markets {
            if Some(market.id) == target {
                accounts.push(AccountRole::writable(market.market));
            } else {
                accounts.push(AccountRole::readonly(market.market));
            }
        }

        Ok(accounts)
    }

    fn role_address(
        &self,
        kind: InstructionKind,
        source: RoleSource,
        ctx: &ResolveContext,
        target: Option<&MarketDescriptor>,
    ) -> Result<Pubkey, SdkError> {
        match source {
            RoleSource::Authority => Ok(ctx.authority),
            RoleSource::AuthorityTokenAccount => {
                let mint = match target {
                    Some(market) if kind == InstructionKind::Deposit => {
                        collateral_market(market)?.mint.unwrap_or(WSOL_MINT)
                    }
                    _ => WSOL_MINT,
                };
                self.deriver.associated_token_address(&ctx.authority, &mint)
            }
            RoleSource::User => self.deriver.user(&ctx.authority, ctx.sub_account_id),
            RoleSource::UserStats => self.deriver.user_stats(&ctx.authority),
            RoleSource::State => self.deriver.state(),
            RoleSource::SpotMarketVault => {
                let market = target.ok_or_else(|| SdkError::MissingMarket(kind.to_string()))?;
                let market = collateral_market(market)?;
                match market.vault {
                    Some(vault) => Ok(vault),
                    None => self.deriver.spot_market_vault(market.index()),
                }
            }
            RoleSource::DriftProgram => Ok(*self.deriver.drift_program_id()),
            RoleSource::TokenProgram => Ok(TOKEN_PROGRAM_ID),
            RoleSource::SystemProgram => Ok(SYSTEM_PROGRAM_ID),
            RoleSource::Rent => Ok(RENT_SYSVAR_ID),
        }
    }
}

fn collateral_market(market: &MarketDescriptor) -> Result<&MarketDescriptor, SdkError> {
    if market.is_spot() {
        Ok(market)
    } else {
        Err(SdkError::WrongMarketType {
            market: market.id,
            expected: MarketType::Spot,
        })
    }
}
