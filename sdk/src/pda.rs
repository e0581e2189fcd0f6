//! PDA derivation utilities.
//!
//! Provides a memoizing [`AddressDeriver`] plus the seed layouts of every
//! program-derived account the client references.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::ids::{ASSOCIATED_TOKEN_PROGRAM_ID, DRIFT_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::types::MarketIndex;

/// Seed for the protocol state PDA.
pub const STATE_SEED: &[u8] = b"drift_state";

/// Seed for user PDAs.
pub const USER_SEED: &[u8] = b"user";

/// Seed for user stats PDAs.
pub const USER_STATS_SEED: &[u8] = b"user_stats";

/// Seed for spot market PDAs.
pub const SPOT_MARKET_SEED: &[u8] = b"spot_market";

/// Seed for perp market PDAs.
pub const PERP_MARKET_SEED: &[u8] = b"perp_market";

/// Seed for spot market vault PDAs.
pub const SPOT_MARKET_VAULT_SEED: &[u8] = b"spot_market_vault";

/// Maximum number of caller seeds (the bump takes the last slot).
pub const MAX_SEEDS: usize = 15;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// A program-derived address together with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAddress {
    /// Seeds, without the bump.
    pub seeds: Vec<Vec<u8>>,
    /// Owning program.
    pub program_id: Pubkey,
    /// Resulting address.
    pub address: Pubkey,
    /// Bump appended to the seeds.
    pub bump: u8,
}

/// Searches bumps from 255 down to 0 for the first off-curve address.
///
/// # Errors
///
/// Returns `SdkError::InvalidSeeds` if the seeds exceed runtime limits and
/// `SdkError::ExhaustedBumpSpace` if every bump lands on the curve.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SdkError> {
    if seeds.len() > MAX_SEEDS {
        return Err(SdkError::InvalidSeeds(format!(
            "{} seeds, at most {} allowed",
            seeds.len(),
            MAX_SEEDS
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(SdkError::InvalidSeeds(format!(
            "seed of {} bytes, at most {} allowed",
            seed.len(),
            MAX_SEED_LEN
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut candidate: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        candidate.extend_from_slice(seeds);
        candidate.push(&bump_seed);

        if let Ok(address) = Pubkey::create_program_address(&candidate, program_id) {
            return Ok((address, bump));
        }
    }

    Err(SdkError::ExhaustedBumpSpace {
        program_id: program_id.to_string(),
    })
}

type CacheKey = (Vec<Vec<u8>>, Pubkey);

/// Memoizing address deriver.
///
/// Safe to share between tasks; each `(seeds, program)` key is computed at
/// most once.
#[derive(Debug)]
pub struct AddressDeriver {
    drift_program_id: Pubkey,
    cache: DashMap<CacheKey, DerivedAddress>,
}

impl Default for AddressDeriver {
    fn default() -> Self {
        Self::new(DRIFT_PROGRAM_ID)
    }
}

impl AddressDeriver {
    /// Creates a deriver for the given protocol program.
    #[must_use]
    pub fn new(drift_program_id: Pubkey) -> Self {
        Self {
            drift_program_id,
            cache: DashMap::new(),
        }
    }

    /// Returns the protocol program id.
    #[must_use]
    pub const fn drift_program_id(&self) -> &Pubkey {
        &self.drift_program_id
    }

    /// Returns the number of memoized derivations.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Derives (or returns the memoized) address for `seeds` under `program_id`.
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn derive(&self, seeds: &[&[u8]], program_id: &Pubkey) -> Result<DerivedAddress, SdkError> {
        let key: CacheKey = (seeds.iter().map(|s| s.to_vec()).collect(), *program_id);

        match self.cache.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (address, bump) = find_program_address(seeds, program_id)?;
                let derived = DerivedAddress {
                    seeds: entry.key().0.clone(),
                    program_id: *program_id,
                    address,
                    bump,
                };
                entry.insert(derived.clone());
                Ok(derived)
            }
        }
    }

    fn drift_address(&self, seeds: &[&[u8]]) -> Result<Pubkey, SdkError> {
        let program_id = self.drift_program_id;
        self.derive(seeds, &program_id).map(|d| d.address)
    }

    /// Derives the protocol state account.
    ///
    /// Seeds: `[b"drift_state"]`
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn state(&self) -> Result<Pubkey, SdkError> {
        self.drift_address(&[STATE_SEED])
    }

    /// Derives a user account.
    ///
    /// Seeds: `[b"user", authority, sub_account_id (u16 LE)]`
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn user(&self, authority: &Pubkey, sub_account_id: u16) -> Result<Pubkey, SdkError> {
        self.drift_address(&[USER_SEED, authority.as_ref(), &sub_account_id.to_le_bytes()])
    }

    /// Derives the user stats account.
    ///
    /// Seeds: `[b"user_stats", authority]`
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn user_stats(&self, authority: &Pubkey) -> Result<Pubkey, SdkError> {
        self.drift_address(&[USER_STATS_SEED, authority.as_ref()])
    }

    /// Derives a spot market account.
    ///
    /// Seeds: `[b"spot_market", index (u16 LE)]`
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn spot_market(&self, index: MarketIndex) -> Result<Pubkey, SdkError> {
        self.drift_address(&[SPOT_MARKET_SEED, &index.to_le_bytes()])
    }

    /// Derives a perp market account.
    ///
    /// Seeds: `[b"perp_market", index (u16 LE)]`
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn perp_market(&self, index: MarketIndex) -> Result<Pubkey, SdkError> {
        self.drift_address(&[PERP_MARKET_SEED, &index.to_le_bytes()])
    }

    /// Derives a spot market deposit vault.
    ///
    /// Seeds: `[b"spot_market_vault", index (u16 LE)]`
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn spot_market_vault(&self, index: MarketIndex) -> Result<Pubkey, SdkError> {
        self.drift_address(&[SPOT_MARKET_VAULT_SEED, &index.to_le_bytes()])
    }

    /// Derives the associated token account of `owner` for `mint`.
    ///
    /// Seeds: `[owner, token_program, mint]` under the ATA program.
    ///
    /// # Errors
    ///
    /// See [`find_program_address`].
    pub fn associated_token_address(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, SdkError> {
        self.derive(
            &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        )
        .map(|d| d.address)
    }
}
