//! Initialize instruction builder.
//!
//! Creates the user stats and user accounts for an authority.

use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::resolver::{AccountSetResolver, ResolveContext};
use crate::schema::InstructionKind;

use super::{InstructionArgs, InstructionSpec};

/// Builder for the Initialize instruction.
#[derive(Debug, Clone)]
pub struct InitializeBuilder {
    program_id: Pubkey,
    authority: Option<Pubkey>,
    sub_account_id: u16,
}

impl InitializeBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            authority: None,
            sub_account_id: 0,
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

    /// Builds the instruction.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is not set or resolution fails.
    pub fn build(self, resolver: &AccountSetResolver) -> Result<InstructionSpec, SdkError> {
        let authority = self.authority.ok_or(SdkError::MissingField("authority"))?;

        let ctx = ResolveContext::new(authority).sub_account(self.sub_account_id);
        let accounts = resolver
            .resolve(InstructionKind::Initialize, &ctx)?
            .into_accounts();

        Ok(InstructionSpec {
            program_id: self.program_id,
            args: InstructionArgs::Initialize,
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DRIFT_DEMO_PROGRAM_ID;
    use crate::instructions::test_support::mainnet_resolver;

    #[test]
    fn test_initialize_builder_build() {
        let resolver = mainnet_resolver();
        let authority = Pubkey::new_unique();

        let spec = InitializeBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(authority)
            .build(&resolver)
            .expect("should build instruction");

        assert_eq!(spec.program_id, DRIFT_DEMO_PROGRAM_ID);
        assert_eq!(spec.kind(), InstructionKind::Initialize);
        assert_eq!(spec.accounts.len(), 8);
        assert_eq!(spec.accounts[0].address, authority);
        assert!(spec.accounts[0].is_signer);
        assert_eq!(
            spec.accounts[2].address,
            resolver.deriver().user(&authority, 0).expect("user")
        );
    }

    #[test]
    fn test_initialize_builder_sub_account() {
        let resolver = mainnet_resolver();
        let authority = Pubkey::new_unique();

        let spec = InitializeBuilder::new(DRIFT_DEMO_PROGRAM_ID)
            .authority(authority)
            .sub_account_id(3)
            .build(&resolver)
            .expect("should build instruction");

        assert_eq!(
            spec.accounts[2].address,
            resolver.deriver().user(&authority, 3).expect("user")
        );
    }

    #[test]
    fn test_initialize_builder_missing_authority() {
        let result = InitializeBuilder::new(DRIFT_DEMO_PROGRAM_ID).build(&mainnet_resolver());
        assert!(matches!(result, Err(SdkError::MissingField("authority"))));
    }
}
