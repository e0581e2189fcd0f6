//! Native SOL wrapping instructions.
//!
//! Wrapping is three steps: create the owner's WSOL associated token
//! account, transfer lamports into it, then `SyncNative` so the token
//! balance reflects the lamports. The create step uses the idempotent form,
//! so a wrap racing another wrap for the same owner still lands.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use spl_associated_token_account_interface::instruction::create_associated_token_account_idempotent;

use crate::error::SdkError;
use crate::ids::{TOKEN_PROGRAM_ID, WSOL_MINT};
use crate::pda::AddressDeriver;

/// Creates the associated token account of `owner` for `mint`, paid by `payer`.
///
/// Succeeds without effect when the account already exists.
#[must_use]
pub fn create_associated_token_account(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    create_associated_token_account_idempotent(payer, owner, mint, &TOKEN_PROGRAM_ID)
}

/// Transfers `lamports` from `from` to `to`.
#[must_use]
pub fn transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    solana_system_interface::instruction::transfer(from, to, lamports)
}

/// Syncs a native token account's amount with its lamport balance.
///
/// # Errors
///
/// Returns `SdkError::InvalidAddress` if the token program id is rejected.
pub fn sync_native(account: &Pubkey) -> Result<Instruction, SdkError> {
    spl_token_interface::instruction::sync_native(&TOKEN_PROGRAM_ID, account)
        .map_err(|e| SdkError::InvalidAddress(e.to_string()))
}

/// Builds the wrap sequence for `owner`.
///
/// The account-creation instruction is included only when
/// `create_account` is set; the caller decides from ledger state.
///
/// # Errors
///
/// Returns `SdkError::InvalidAmount` for a zero amount, or a derivation error.
pub fn wrap_sol(
    deriver: &AddressDeriver,
    owner: &Pubkey,
    lamports: u64,
    create_account: bool,
) -> Result<Vec<Instruction>, SdkError> {
    if lamports == 0 {
        return Err(SdkError::InvalidAmount(
            "wrap amount must be positive".to_string(),
        ));
    }

    let ata = deriver.associated_token_address(owner, &WSOL_MINT)?;
    let mut instructions = Vec::with_capacity(3);

    if create_account {
        instructions.push(create_associated_token_account(owner, owner, &WSOL_MINT));
    }
    instructions.push(transfer(owner, &ata, lamports));
    instructions.push(sync_native(&ata)?);

    Ok(instructions)
}
