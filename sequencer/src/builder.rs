//! Transaction planning.
//!
//! Turns a logical operation into one or more [`PendingTransaction`]s. A
//! wrap step always gets its own transaction because the deposit that
//! follows references the account it creates.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use driftwire_sdk::instructions::{
    wrap, CancelOrderBuilder, DepositBuilder, InitializeBuilder, PlaceOrderBuilder,
};
use driftwire_sdk::{AccountSetResolver, InstructionSpec, MarketId, OrderParams, SdkError};
use serde::Serialize;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};

use crate::error::SequencerError;
use crate::rpc::FreshnessToken;

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TxStatus {
    /// Built, not yet submitted.
    Unsent,
    /// Submitted, awaiting confirmation.
    Sent,
    /// Included at the requested commitment.
    Confirmed {
        /// Slot of inclusion.
        slot: u64,
    },
    /// Freshness token expired with the retry budget spent, or the
    /// sequence deadline passed.
    Expired {
        /// Submissions made.
        attempts: u32,
    },
    /// Refused by the program, in preflight or on-chain.
    Rejected {
        /// Error, verbatim.
        reason: String,
    },
}

impl TxStatus {
    /// Returns true for `Confirmed`, `Expired` and `Rejected`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed { .. } | Self::Expired { .. } | Self::Rejected { .. }
        )
    }

    /// Returns true for `Confirmed`.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// A transaction moving through submission and confirmation.
///
/// The submitter writes the freshness token, signature, timestamps and
/// attempt count; the confirmation controller writes `status`.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    /// Process-unique id.
    pub id: u64,
    /// Human-readable label.
    pub label: String,
    /// Instructions, in execution order.
    pub instructions: Vec<Instruction>,
    /// Token the current signature was produced against.
    pub token: Option<FreshnessToken>,
    /// Time of the most recent submission.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Signature of the most recent submission.
    pub signature: Option<Signature>,
    /// Number of submissions made.
    pub attempts: u32,
    /// Lifecycle state.
    pub status: TxStatus,
}

impl PendingTransaction {
    /// Creates an unsent transaction.
    #[must_use]
    pub fn new(label: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            id: NEXT_TX_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            instructions,
            token: None,
            submitted_at: None,
            signature: None,
            attempts: 0,
            status: TxStatus::Unsent,
        }
    }

    /// Returns the signature as base58, if submitted.
    #[must_use]
    pub fn signature_string(&self) -> Option<String> {
        self.signature.map(|s| s.to_string())
    }
}

/// Plans transactions for high-level operations.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    /// Program the instructions target.
    program_id: Pubkey,

    /// Account resolver.
    resolver: Arc<AccountSetResolver>,

    /// Maximum instructions per transaction.
    max_instructions_per_tx: usize,
}

impl TransactionBuilder {
    /// Creates a new transaction builder.
    #[must_use]
    pub fn new(
        program_id: Pubkey,
        resolver: Arc<AccountSetResolver>,
        max_instructions_per_tx: usize,
    ) -> Self {
        Self {
            program_id,
            resolver,
            max_instructions_per_tx: max_instructions_per_tx.max(1),
        }
    }

    /// Returns the program ID.
    #[must_use]
    pub const fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Returns the resolver.
    #[must_use]
    pub fn resolver(&self) -> &AccountSetResolver {
        &self.resolver
    }

    /// Plans native SOL wrapping into the authority's WSOL account.
    ///
    /// # Arguments
    ///
    /// * `authority` - Owner and fee payer
    /// * `lamports` - Amount to wrap
    /// * `account_exists` - Whether the WSOL account is already on the ledger
    ///
    /// # Errors
    ///
    /// Returns an error for a zero amount.
    pub fn plan_wrap(
        &self,
        authority: &Pubkey,
        lamports: u64,
        account_exists: bool,
    ) -> Result<PendingTransaction, SequencerError> {
        let instructions =
            wrap::wrap_sol(self.resolver.deriver(), authority, lamports, !account_exists)?;
        Ok(PendingTransaction::new("wrap", instructions))
    }

    /// Plans user account initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if account resolution fails.
    pub fn plan_initialize(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
    ) -> Result<PendingTransaction, SequencerError> {
        let spec = InitializeBuilder::new(self.program_id)
            .authority(*authority)
            .sub_account_id(sub_account_id)
            .build(&self.resolver)?;
        self.single("initialize", &spec)
    }

    /// Plans a collateral deposit.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero or the market is invalid.
    pub fn plan_deposit(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        market: MarketId,
        amount: u64,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<PendingTransaction, SequencerError> {
        let spec = DepositBuilder::new(self.program_id)
            .authority(*authority)
            .sub_account_id(sub_account_id)
            .market(market)
            .amount(amount)
            .open_positions(open_positions.iter().copied())
            .build(&self.resolver)?;
        self.single("deposit", &spec)
    }

    /// Plans wrapping followed by a deposit of the wrapped amount.
    ///
    /// Produces two transactions: the deposit references the WSOL account,
    /// which must exist before it can be resolved on-chain.
    ///
    /// # Errors
    ///
    /// Returns an error if either step fails to build.
    pub fn plan_wrap_and_deposit(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        market: MarketId,
        lamports: u64,
        account_exists: bool,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<Vec<PendingTransaction>, SequencerError> {
        Ok(vec![
            self.plan_wrap(authority, lamports, account_exists)?,
            self.plan_deposit(authority, sub_account_id, market, lamports, open_positions)?,
        ])
    }

    /// Plans an order placement.
    ///
    /// # Errors
    ///
    /// Returns an error if the order parameters are invalid.
    pub fn plan_place_order(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        params: OrderParams,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<PendingTransaction, SequencerError> {
        let spec = PlaceOrderBuilder::new(self.program_id)
            .authority(*authority)
            .sub_account_id(sub_account_id)
            .params(params)
            .open_positions(open_positions.iter().copied())
            .build(&self.resolver)?;
        self.single("place_order", &spec)
    }

    /// Plans several order placements, packed up to the batch limit per
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if `orders` is empty or any order is invalid; nothing
    /// is planned in that case.
    pub fn plan_place_orders(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        orders: Vec<OrderParams>,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<Vec<PendingTransaction>, SequencerError> {
        if orders.is_empty() {
            return Err(SdkError::MissingField("orders").into());
        }

        let instructions = orders
            .into_iter()
            .map(|params| {
                PlaceOrderBuilder::new(self.program_id)
                    .authority(*authority)
                    .sub_account_id(sub_account_id)
                    .params(params)
                    .open_positions(open_positions.iter().copied())
                    .build(&self.resolver)?
                    .to_instruction()
            })
            .collect::<Result<Vec<_>, SdkError>>()?;

        Ok(self.plan_batch("place_orders", instructions))
    }

    /// Plans an order cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the order id is zero or a market is unknown.
    pub fn plan_cancel_order(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        order_id: Option<u32>,
        market: Option<MarketId>,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<PendingTransaction, SequencerError> {
        let mut builder = CancelOrderBuilder::new(self.program_id)
            .authority(*authority)
            .sub_account_id(sub_account_id)
            .open_positions(open_positions.iter().copied());
        if let Some(order_id) = order_id {
            builder = builder.order_id(order_id);
        }
        if let Some(market) = market {
            builder = builder.market(market);
        }

        let spec = builder.build(&self.resolver)?;
        self.single("cancel_order", &spec)
    }

    /// Packs instructions into as few transactions as the batch limit allows,
    /// preserving order.
    #[must_use]
    pub fn plan_batch(&self, label: &str, instructions: Vec<Instruction>) -> Vec<PendingTransaction> {
        let chunks: Vec<Vec<Instruction>> = instructions
            .chunks(self.max_instructions_per_tx)
            .map(<[Instruction]>::to_vec)
            .collect();
        let total = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let label = if total > 1 {
                    format!("{}[{}/{}]", label, i + 1, total)
                } else {
                    label.to_string()
                };
                PendingTransaction::new(label, chunk)
            })
            .collect()
    }

    /// Wraps one instruction spec into a transaction.
    fn single(
        &self,
        label: &str,
        spec: &InstructionSpec,
    ) -> Result<PendingTransaction, SequencerError> {
        Ok(PendingTransaction::new(label, vec![spec.to_instruction()?]))
    }
}
