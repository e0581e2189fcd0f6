//! High-level operations.
//!
//! Each operation takes the authority's lock, plans its transactions, then
//! drives them one at a time until each is terminal. Ledger reads that
//! shape the plan happen under the lock. The first failure stops the
//! sequence; earlier confirmed transactions stay confirmed and the report
//! says so.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use driftwire_sdk::ids::WSOL_MINT;
use driftwire_sdk::{ErrorClass, MarketId, MarketType, OrderParams, SdkError};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::builder::{PendingTransaction, TransactionBuilder, TxStatus};
use crate::confirmation::ConfirmationController;
use crate::error::SequencerError;
use crate::session::Session;

/// Per-account locks serializing sequences that touch the same account set.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<Pubkey, Arc<Mutex<()>>>,
}

impl AccountLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and takes the lock for `key`.
    pub async fn lock(&self, key: Pubkey) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Returns the number of keys ever locked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no key was ever locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Final state of one transaction in a sequence.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOutcome {
    /// Transaction id.
    pub id: u64,
    /// Label.
    pub label: String,
    /// Lifecycle state.
    pub status: TxStatus,
    /// Base58 signature of the last submission.
    pub signature: Option<String>,
    /// Submissions made.
    pub attempts: u32,
    /// Error, if the transaction failed or was skipped.
    pub error: Option<String>,
    /// Error class, if any.
    pub error_class: Option<ErrorClass>,
}

impl TransactionOutcome {
    fn new(tx: &PendingTransaction, error: Option<&SequencerError>) -> Self {
        Self {
            id: tx.id,
            label: tx.label.clone(),
            status: tx.status.clone(),
            signature: tx.signature_string(),
            attempts: tx.attempts,
            error: error.map(ToString::to_string),
            error_class: error.map(SequencerError::class),
        }
    }

    fn skipped(tx: &PendingTransaction) -> Self {
        Self {
            error: Some("skipped after earlier failure".to_string()),
            ..Self::new(tx, None)
        }
    }

    /// Returns true if the transaction confirmed.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.status.is_confirmed()
    }
}

/// Per-transaction report for one logical operation.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    /// Operation name.
    pub operation: String,
    /// Authority the sequence ran for.
    pub authority: String,
    /// One outcome per planned transaction, in order.
    pub transactions: Vec<TransactionOutcome>,
}

impl SequenceReport {
    /// Returns true if every transaction confirmed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.transactions.iter().all(TransactionOutcome::is_confirmed)
    }

    /// Returns the number of confirmed transactions.
    #[must_use]
    pub fn confirmed_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_confirmed()).count()
    }

    /// Returns the first transaction that did not confirm.
    #[must_use]
    pub fn first_failure(&self) -> Option<&TransactionOutcome> {
        self.transactions.iter().find(|t| !t.is_confirmed())
    }
}

/// Runs logical operations for the session authority.
pub struct SequencerService {
    session: Arc<Session>,
    builder: TransactionBuilder,
    controller: ConfirmationController,
    locks: Arc<AccountLocks>,
    sub_account_id: u16,
}

impl SequencerService {
    /// Creates a new service.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            builder: session.transaction_builder(),
            controller: session.confirmation_controller(),
            session,
            locks: Arc::new(AccountLocks::new()),
            sub_account_id: 0,
        }
    }

    /// Shares a lock table with other services for the same ledger.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<AccountLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Sets the sub-account id.
    #[must_use]
    pub const fn with_sub_account(mut self, sub_account_id: u16) -> Self {
        self.sub_account_id = sub_account_id;
        self
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Wraps native SOL into the authority's WSOL account, creating the
    /// account first if the ledger does not have it.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero or the account lookup fails.
    pub async fn wrap_sol(&self, lamports: u64) -> Result<SequenceReport, SequencerError> {
        let authority = self.session.authority();
        let _guard = self.locks.lock(authority).await;
        let exists = self.wsol_account_exists(&authority).await?;
        let tx = self.builder.plan_wrap(&authority, lamports, exists)?;
        Ok(self.drive_sequence("wrap", vec![tx]).await)
    }

    /// Initializes the user and user-stats accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if account resolution fails.
    pub async fn initialize(&self) -> Result<SequenceReport, SequencerError> {
        let tx = self
            .builder
            .plan_initialize(&self.session.authority(), self.sub_account_id)?;
        Ok(self.run_sequence("initialize", vec![tx]).await)
    }

    /// Deposits collateral into a spot market.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero or the market is not a known
    /// spot market.
    pub async fn deposit(
        &self,
        market: MarketId,
        amount: u64,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<SequenceReport, SequencerError> {
        let tx = self.builder.plan_deposit(
            &self.session.authority(),
            self.sub_account_id,
            market,
            amount,
            open_positions,
        )?;
        Ok(self.run_sequence("deposit", vec![tx]).await)
    }

    /// Wraps native SOL and deposits it into the SOL spot market.
    ///
    /// The wrap and the deposit are separate transactions; if the deposit
    /// fails the wrapped SOL stays in the WSOL account.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has no SOL spot market, the amount
    /// is zero, or the account lookup fails.
    pub async fn wrap_and_deposit(
        &self,
        lamports: u64,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<SequenceReport, SequencerError> {
        let market = self.wsol_market()?;
        let authority = self.session.authority();
        let _guard = self.locks.lock(authority).await;
        let exists = self.wsol_account_exists(&authority).await?;

        let txs = self.builder.plan_wrap_and_deposit(
            &authority,
            self.sub_account_id,
            market,
            lamports,
            exists,
            open_positions,
        )?;
        Ok(self.drive_sequence("wrap_and_deposit", txs).await)
    }

    /// Places an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order parameters are invalid.
    pub async fn place_order(
        &self,
        params: OrderParams,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<SequenceReport, SequencerError> {
        let tx = self.builder.plan_place_order(
            &self.session.authority(),
            self.sub_account_id,
            params,
            open_positions,
        )?;
        Ok(self.run_sequence("place_order", vec![tx]).await)
    }

    /// Places several orders, packed up to `max_instructions_per_tx` per
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if `orders` is empty or any order is invalid.
    pub async fn place_orders(
        &self,
        orders: Vec<OrderParams>,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<SequenceReport, SequencerError> {
        let txs = self.builder.plan_place_orders(
            &self.session.authority(),
            self.sub_account_id,
            orders,
            open_positions,
        )?;
        Ok(self.run_sequence("place_orders", txs).await)
    }

    /// Cancels an order by id, or the most recent order when `order_id` is
    /// `None`.
    ///
    /// An id that was never outstanding is sent anyway; the program decides.
    ///
    /// # Errors
    ///
    /// Returns an error if the order id is zero or a market is unknown.
    pub async fn cancel_order(
        &self,
        order_id: Option<u32>,
        market: Option<MarketId>,
        open_positions: &BTreeSet<MarketId>,
    ) -> Result<SequenceReport, SequencerError> {
        let tx = self.builder.plan_cancel_order(
            &self.session.authority(),
            self.sub_account_id,
            order_id,
            market,
            open_positions,
        )?;
        Ok(self.run_sequence("cancel_order", vec![tx]).await)
    }

    /// Fetches the raw market-state account of a registered market.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown or the RPC call fails.
    pub async fn fetch_market_account(
        &self,
        market: MarketId,
    ) -> Result<Option<Vec<u8>>, SequencerError> {
        let address = self.session.registry().get(&market)?.market;
        let data = self.session.rpc().get_account_data(&address).await?;
        debug!(%market, %address, bytes = data.as_ref().map(Vec::len), "Fetched market account");
        Ok(data)
    }

    /// Drives `txs` in order under the authority's lock.
    ///
    /// Stops at the first transaction that does not confirm; the rest are
    /// reported as skipped and never submitted. The whole sequence shares one
    /// deadline.
    pub async fn run_sequence(
        &self,
        operation: &str,
        txs: Vec<PendingTransaction>,
    ) -> SequenceReport {
        let _guard = self.locks.lock(self.session.authority()).await;
        self.drive_sequence(operation, txs).await
    }

    /// Body of [`Self::run_sequence`]; the caller holds the authority's lock.
    async fn drive_sequence(
        &self,
        operation: &str,
        mut txs: Vec<PendingTransaction>,
    ) -> SequenceReport {
        let authority = self.session.authority();
        let deadline = Instant::now() + self.session.config().sequence_timeout();
        self.session.metrics().record_sequence();

        info!(operation, %authority, transactions = txs.len(), "Starting sequence");

        let mut outcomes = Vec::with_capacity(txs.len());
        let mut failed = false;

        for tx in &mut txs {
            if failed {
                outcomes.push(TransactionOutcome::skipped(tx));
                continue;
            }

            match self.controller.drive(tx, deadline).await {
                Ok(_) => outcomes.push(TransactionOutcome::new(tx, None)),
                Err(e) => {
                    warn!(operation, tx = tx.id, label = %tx.label, error = %e, "Sequence stopped");
                    outcomes.push(TransactionOutcome::new(tx, Some(&e)));
                    failed = true;
                }
            }
        }

        let report = SequenceReport {
            operation: operation.to_string(),
            authority: authority.to_string(),
            transactions: outcomes,
        };

        info!(
            operation,
            confirmed = report.confirmed_count(),
            total = report.transactions.len(),
            "Sequence finished"
        );

        report
    }

    async fn wsol_account_exists(&self, authority: &Pubkey) -> Result<bool, SequencerError> {
        let ata = self
            .session
            .resolver()
            .deriver()
            .associated_token_address(authority, &WSOL_MINT)?;
        Ok(self.session.rpc().account_exists(&ata).await?)
    }

    fn wsol_market(&self) -> Result<MarketId, SequencerError> {
        self.session
            .registry()
            .iter()
            .find(|m| m.market_type() == MarketType::Spot && m.mint == Some(WSOL_MINT))
            .map(|m| m.id)
            .ok_or_else(|| {
                SequencerError::Sdk(SdkError::InvalidRegistry(
                    "no spot market for wrapped SOL".to_string(),
                ))
            })
    }
}
