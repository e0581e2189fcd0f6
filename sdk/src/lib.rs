//! Driftwire SDK - instruction composition for the drift demo program.
//!
//! This crate is free of I/O. It derives program addresses, resolves the
//! ordered account lists the program expects, and encodes instructions.
//!
//! # Building blocks
//!
//! - [`AddressDeriver`]: memoizing PDA derivation
//! - [`MarketRegistry`]: static per-network market table
//! - [`SchemaRegistry`]: fixed account prefix per instruction kind
//! - [`AccountSetResolver`]: prefix plus oracle/market suffix
//! - [`instructions`]: one builder per instruction kind
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use driftwire_sdk::{
//!     AccountSetResolver, AddressDeriver, MarketRegistry, SchemaRegistry,
//! };
//! use driftwire_sdk::ids::DRIFT_DEMO_PROGRAM_ID;
//! use driftwire_sdk::instructions::DepositBuilder;
//! use solana_sdk::pubkey::Pubkey;
//!
//! let resolver = AccountSetResolver::new(
//!     SchemaRegistry::default(),
//!     Arc::new(MarketRegistry::load("mainnet-beta").unwrap()),
//!     Arc::new(AddressDeriver::default()),
//! );
//!
//! let spec = DepositBuilder::new(DRIFT_DEMO_PROGRAM_ID)
//!     .authority(Pubkey::new_unique())
//!     .spot_market(1)
//!     .amount(1_000_000_000)
//!     .build(&resolver)
//!     .unwrap();
//! assert_eq!(spec.accounts.len(), 12);
//! ```

pub mod error;
pub mod ids;
pub mod instructions;
pub mod pda;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod types;

pub use error::{ErrorClass, SdkError};
pub use instructions::{InstructionArgs, InstructionSpec};
pub use pda::{AddressDeriver, DerivedAddress};
pub use registry::MarketRegistry;
pub use resolver::{AccountSetResolver, ResolveContext, ResolvedAccounts};
pub use schema::{AccountRole, InstructionKind, SchemaRegistry};
pub use types::{
    BaseAmount, MarketDescriptor, MarketId, MarketType, OrderParams, OrderType,
    PositionDirection, Price,
};
