//! Instruction schema registry.
//!
//! The target program binds accounts by position, not by name. Each
//! instruction kind's fixed account prefix is declared here once, as a
//! table, and versioned together with the deployed program release. A
//! wrong row here produces a wrong-account failure on-chain, so the tests
//! at the bottom pin every row.

use std::fmt;

use serde::{Deserialize, Serialize};
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;

/// A single account reference in an instruction's account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountRole {
    /// Account address.
    pub address: Pubkey,
    /// Whether the instruction may write the account.
    pub is_writable: bool,
    /// Whether the account must sign.
    pub is_signer: bool,
}

impl AccountRole {
    /// Writable, non-signer account.
    #[must_use]
    pub const fn writable(address: Pubkey) -> Self {
        Self {
            address,
            is_writable: true,
            is_signer: false,
        }
    }

    /// Read-only, non-signer account.
    #[must_use]
    pub const fn readonly(address: Pubkey) -> Self {
        Self {
            address,
            is_writable: false,
            is_signer: false,
        }
    }
}

impl From<AccountRole> for AccountMeta {
    fn from(role: AccountRole) -> Self {
        if role.is_writable {
            AccountMeta::new(role.address, role.is_signer)
        } else {
            AccountMeta::new_readonly(role.address, role.is_signer)
        }
    }
}

/// Instruction kinds understood by the target program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    /// Create the user stats and user accounts.
    Initialize,
    /// Deposit collateral into a spot market.
    Deposit,
    /// Place an order.
    PlaceOrder,
    /// Cancel an order.
    CancelOrder,
}

impl InstructionKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Initialize,
        Self::Deposit,
        Self::PlaceOrder,
        Self::CancelOrder,
    ];

    /// Returns the program's method name, used for the Anchor discriminator.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::Initialize => "drift_initialize",
            Self::Deposit => "drift_deposit",
            Self::PlaceOrder => "drift_place_orders",
            Self::CancelOrder => "drift_cancel_order",
        }
    }

    /// Returns true if the instruction affects margin and therefore needs
    /// oracle and market accounts appended.
    #[must_use]
    pub const fn has_dynamic_suffix(&self) -> bool {
        matches!(self, Self::Deposit | Self::PlaceOrder | Self::CancelOrder)
    }

    /// Returns true if the instruction must name the market it acts on.
    #[must_use]
    pub const fn requires_market(&self) -> bool {
        matches!(self, Self::Deposit | Self::PlaceOrder)
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => write!(f, "initialize"),
            Self::Deposit => write!(f, "deposit"),
            Self::PlaceOrder => write!(f, "place_order"),
            Self::CancelOrder => write!(f, "cancel_order"),
        }
    }
}

/// Where the resolver gets the address for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSource {
    /// The session authority.
    Authority,
    /// Authority's token account for the collateral mint.
    AuthorityTokenAccount,
    /// User PDA.
    User,
    /// User stats PDA.
    UserStats,
    /// Protocol state PDA.
    State,
    /// Deposit vault of the target spot market.
    SpotMarketVault,
    /// Protocol program.
    DriftProgram,
    /// SPL Token program.
    TokenProgram,
    /// System program.
    SystemProgram,
    /// Rent sysvar.
    Rent,
}

/// One row of an instruction's fixed prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    /// Account name in the program's declaration.
    pub name: &'static str,
    /// Address source.
    pub source: RoleSource,
    /// Writable flag.
    pub writable: bool,
    /// Signer flag.
    pub signer: bool,
}

const fn role(name: &'static str, source: RoleSource, writable: bool, signer: bool) -> RoleSpec {
    RoleSpec {
        name,
        source,
        writable,
        signer,
    }
}

/// Fixed-prefix layout of one instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSchema {
    /// Instruction kind.
    pub kind: InstructionKind,
    /// Ordered roles.
    pub roles: &'static [RoleSpec],
}

impl InstructionSchema {
    /// Returns the number of fixed accounts.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true if the schema has no accounts.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the position of a named role.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.roles.iter().position(|r| r.name == name)
    }

    /// Checks that `accounts` starts with this schema's writable/signer pattern.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::SchemaMismatch` describing the first divergence.
    pub fn check_prefix(&self, version: &str, accounts: &[AccountRole]) -> Result<(), SdkError> {
        if accounts.len() < self.roles.len() {
            return Err(SdkError::SchemaMismatch {
                version: version.to_string(),
                kind: format!(
                    "{} (expected at least {} accounts, got {})",
                    self.kind,
                    self.roles.len(),
                    accounts.len()
                ),
            });
        }

        for (position, (spec, account)) in self.roles.iter().zip(accounts).enumerate() {
            if spec.writable != account.is_writable || spec.signer != account.is_signer {
                return Err(SdkError::SchemaMismatch {
                    version: version.to_string(),
                    kind: format!("{} (account {} `{}`)", self.kind, position, spec.name),
                });
            }
        }

        Ok(())
    }
}

use RoleSource::{
    Authority, AuthorityTokenAccount, DriftProgram, Rent, SpotMarketVault, State, SystemProgram,
    TokenProgram, User, UserStats,
};

const INITIALIZE_V1: &[RoleSpec] = &[
    role("signer", Authority, true, true),
    role("signer_wsol_ata", AuthorityTokenAccount, true, false),
    role("user", User, true, false),
    role("user_stats", UserStats, true, false),
    role("state", State, true, false),
    role("drift_program", DriftProgram, false, false),
    role("system_program", SystemProgram, false, false),
    role("rent", Rent, false, false),
];

const DEPOSIT_V1: &[RoleSpec] = &[
    role("signer", Authority, true, true),
    role("signer_wsol_ata", AuthorityTokenAccount, true, false),
    role("user", User, true, false),
    role("user_stats", UserStats, true, false),
    role("state", State, true, false),
    role("spot_market_vault", SpotMarketVault, true, false),
    role("token_program", TokenProgram, false, false),
    role("drift_program", DriftProgram, false, false),
    role("system_program", SystemProgram, false, false),
    role("rent", Rent, false, false),
];

const ORDER_V1: &[RoleSpec] = &[
    role("signer", Authority, true, true),
    role("user", User, true, false),
    role("state", State, true, false),
    role("token_program", TokenProgram, false, false),
    role("drift_program", DriftProgram, false, false),
    role("system_program", SystemProgram, false, false),
    role("rent", Rent, false, false),
];

const DRIFT_DEMO_V1_SCHEMAS: &[InstructionSchema] = &[
    InstructionSchema {
        kind: InstructionKind::Initialize,
        roles: INITIALIZE_V1,
    },
    InstructionSchema {
        kind: InstructionKind::Deposit,
        roles: DEPOSIT_V1,
    },
    InstructionSchema {
        kind: InstructionKind::PlaceOrder,
        roles: ORDER_V1,
    },
    InstructionSchema {
        kind: InstructionKind::CancelOrder,
        roles: ORDER_V1,
    },
];

/// Versioned set of instruction schemas for one program release.
#[derive(Debug, Clone, Copy)]
pub struct SchemaRegistry {
    version: &'static str,
    schemas: &'static [InstructionSchema],
}

/// Schemas of the first release of the demo program.
pub const DRIFT_DEMO_V1: SchemaRegistry = SchemaRegistry {
    version: "drift-demo/v1",
    schemas: DRIFT_DEMO_V1_SCHEMAS,
};

impl Default for SchemaRegistry {
    fn default() -> Self {
        DRIFT_DEMO_V1
    }
}

impl SchemaRegistry {
    /// Looks up a registry by version string.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::SchemaMismatch` for unknown versions.
    pub fn by_version(version: &str) -> Result<Self, SdkError> {
        match version {
            v if v == DRIFT_DEMO_V1.version => Ok(DRIFT_DEMO_V1),
            other => Err(SdkError::SchemaMismatch {
                version: other.to_string(),
                kind: "any".to_string(),
            }),
        }
    }

    /// Returns the version string.
    #[must_use]
    pub const fn version(&self) -> &'static str {
        self.version
    }

    /// Returns the schema for an instruction kind.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::SchemaMismatch` if this version does not declare
    /// the kind.
    pub fn get(&self, kind: InstructionKind) -> Result<&'static InstructionSchema, SdkError> {
        self.schemas
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| SdkError::SchemaMismatch {
                version: self.version.to_string(),
                kind: kind.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (name, writable, signer) per position, transcribed from the program's
    /// account structs.
    fn reference(kind: InstructionKind) -> Vec<(&'static str, bool, bool)> {
        match kind {
            InstructionKind::Initialize => vec![
                ("signer", true, true),
                ("signer_wsol_ata", true, false),
                ("user", true, false),
                ("user_stats", true, false),
                ("state", true, false),
                ("drift_program", false, false),
                ("system_program", false, false),
                ("rent", false, false),
            ],
            InstructionKind::Deposit => vec![
                ("signer", true, true),
                ("signer_wsol_ata", true, false),
                ("user", true, false),
                ("user_stats", true, false),
                ("state", true, false),
                ("spot_market_vault", true, false),
                ("token_program", false, false),
                ("drift_program", false, false),
                ("system_program", false, false),
                ("rent", false, false),
            ],
            InstructionKind::PlaceOrder | InstructionKind::CancelOrder => vec![
                ("signer", true, true),
                ("user", true, false),
                ("state", true, false),
                ("token_program", false, false),
                ("drift_program", false, false),
                ("system_program", false, false),
                ("rent", false, false),
            ],
        }
    }

    #[test]
    fn test_every_kind_matches_reference() {
        for kind in InstructionKind::ALL {
            let schema = DRIFT_DEMO_V1.get(kind).expect("schema");
            let actual: Vec<_> = schema
                .roles
                .iter()
                .map(|r| (r.name, r.writable, r.signer))
                .collect();
            assert_eq!(actual, reference(kind), "schema drift for {}", kind);
        }
    }

    #[test]
    fn test_only_authority_signs() {
        for kind in InstructionKind::ALL {
            let schema = DRIFT_DEMO_V1.get(kind).expect("schema");
            for spec in schema.roles {
                assert_eq!(spec.signer, spec.source == RoleSource::Authority);
            }
            assert_eq!(schema.position("signer"), Some(0));
        }
    }

    #[test]
    fn test_by_version() {
        let registry = SchemaRegistry::by_version("drift-demo/v1").expect("registry");
        assert_eq!(registry.version(), "drift-demo/v1");
        assert!(SchemaRegistry::by_version("drift-demo/v9").is_err());
    }

    #[test]
    fn test_check_prefix() {
        let schema = DRIFT_DEMO_V1
            .get(InstructionKind::CancelOrder)
            .expect("schema");
        let mut accounts: Vec<AccountRole> = schema
            .roles
            .iter()
            .map(|r| AccountRole {
                address: Pubkey::new_unique(),
                is_writable: r.writable,
                is_signer: r.signer,
            })
            .collect();
        assert!(schema.check_prefix("v1", &accounts).is_ok());

        accounts[2].is_writable = false;
        assert!(schema.check_prefix("v1", &accounts).is_err());

        accounts.truncate(3);
        assert!(schema.check_prefix("v1", &accounts).is_err());
    }

    #[test]
    fn test_kind_flags() {
        assert!(!InstructionKind::Initialize.has_dynamic_suffix());
        assert!(InstructionKind::Deposit.has_dynamic_suffix());
        assert!(InstructionKind::Deposit.requires_market());
        assert!(!InstructionKind::CancelOrder.requires_market());
        assert_eq!(InstructionKind::PlaceOrder.method_name(), "drift_place_orders");
    }

    #[test]
    fn test_account_role_to_meta() {
        let address = Pubkey::new_unique();
        let meta: AccountMeta = AccountRole::writable(address).into();
        assert!(meta.is_writable);
        assert!(!meta.is_signer);

        let meta: AccountMeta = AccountRole::readonly(address).into();
        assert!(!meta.is_writable);
    }
}
