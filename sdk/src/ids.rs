//! Well-known program and account addresses.

use solana_sdk::pubkey::Pubkey;

/// Drift v2 protocol program.
pub const DRIFT_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH");

/// Drift CPI demo program that forwards to Drift.
pub const DRIFT_DEMO_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("3eqvCf482d2Z1C7DevfrQZpzmKUh687kt7yhgLYUaYzu");

/// System program.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::from_str_const("11111111111111111111111111111111");

/// SPL Token program.
pub const TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// SPL Associated Token Account program.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Rent sysvar.
pub const RENT_SYSVAR_ID: Pubkey =
    Pubkey::from_str_const("SysvarRent111111111111111111111111111111111");

/// Wrapped SOL mint.
pub const WSOL_MINT: Pubkey = Pubkey::from_str_const("So11111111111111111111111111111111111111112");
