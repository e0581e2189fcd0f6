//! Scripted in-memory ledger for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use driftwire_sdk::ids::ASSOCIATED_TOKEN_PROGRAM_ID;
use solana_rpc_client_api::client_error::{Error as ClientError, ErrorKind as ClientErrorKind};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

use super::{
    Commitment, FreshnessToken, LedgerRpc, RpcError, SendOptions, SignatureState,
    SimulationResult,
};

/// Blocks a freshness token stays valid for.
pub const VALIDITY_WINDOW: u64 = 150;

/// What the ledger does with sent transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Every transaction lands.
    Land,
    /// Nothing ever lands.
    Drop,
    /// Every transaction fails on-chain with the given error.
    Reject(String),
    /// Transactions land once this many have been sent.
    LandOnAttempt(usize),
    /// Status polls report nothing until this many have been made.
    LandAfterPolls(usize),
}

/// In-memory ledger.
#[derive(Debug)]
pub struct MockLedger {
    height: AtomicU64,
    height_step: AtomicU64,
    tokens_issued: AtomicU64,
    script: Mutex<Script>,
    simulation_error: Mutex<Option<String>>,
    send_failures: AtomicU64,
    send_rejection: Mutex<Option<String>>,
    status_polls: AtomicU64,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    sent: Mutex<Vec<Transaction>>,
    simulated: AtomicU64,
}

impl MockLedger {
    pub fn new(script: Script) -> Self {
        Self {
            height: AtomicU64::new(1_000),
            height_step: AtomicU64::new(0),
            tokens_issued: AtomicU64::new(0),
            script: Mutex::new(script),
            simulation_error: Mutex::new(None),
            send_failures: AtomicU64::new(0),
            send_rejection: Mutex::new(None),
            status_polls: AtomicU64::new(0),
            accounts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            simulated: AtomicU64::new(0),
        }
    }

    /// Advances block height by `step` on every height read.
    pub fn with_height_step(self, step: u64) -> Self {
        self.height_step.store(step, Ordering::SeqCst);
        self
    }

    pub fn with_simulation_error(self, err: &str) -> Self {
        *self.simulation_error.lock().expect("lock") = Some(err.to_string());
        self
    }

    /// Fails the next `count` sends with a node error.
    pub fn with_send_failures(self, count: u64) -> Self {
        self.send_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Fails every send as the node's own preflight would.
    pub fn with_send_rejection(self, reason: &str) -> Self {
        *self.send_rejection.lock().expect("lock") = Some(reason.to_string());
        self
    }

    pub fn with_account(self, address: Pubkey, data: Vec<u8>) -> Self {
        self.accounts.lock().expect("lock").insert(address, data);
        self
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("lock").len()
    }

    pub fn simulated_count(&self) -> u64 {
        self.simulated.load(Ordering::SeqCst)
    }

    pub fn status_polls(&self) -> u64 {
        self.status_polls.load(Ordering::SeqCst)
    }

    pub fn tokens_issued(&self) -> u64 {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    pub fn distinct_blockhashes(&self) -> usize {
        self.sent()
            .iter()
            .map(|tx| tx.message.recent_blockhash)
            .collect::<HashSet<_>>()
            .len()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn latest_freshness_token(
        &self,
        _commitment: Commitment,
    ) -> Result<FreshnessToken, RpcError> {
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_le_bytes());

        Ok(FreshnessToken {
            blockhash: Hash::new_from_array(bytes),
            last_valid_block_height: self.height.load(Ordering::SeqCst) + VALIDITY_WINDOW,
        })
    }

    async fn block_height(&self, _commitment: Commitment) -> Result<u64, RpcError> {
        let step = self.height_step.load(Ordering::SeqCst);
        Ok(self.height.fetch_add(step, Ordering::SeqCst) + step)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        Ok(self.accounts.lock().expect("lock").get(address).cloned())
    }

    async fn simulate_transaction(
        &self,
        _tx: &Transaction,
        _commitment: Commitment,
    ) -> Result<SimulationResult, RpcError> {
        self.simulated.fetch_add(1, Ordering::SeqCst);
        Ok(SimulationResult {
            err: self.simulation_error.lock().expect("lock").clone(),
            logs: vec!["Program log: simulated".to_string()],
        })
    }

    async fn send_transaction(
        &self,
        tx: &Transaction,
        _options: SendOptions,
    ) -> Result<Signature, RpcError> {
        let remaining = self.send_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.send_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RpcError::Client(Box::new(ClientError::from(
                ClientErrorKind::Custom("Node is behind".to_string()),
            ))));
        }

        if let Some(reason) = self.send_rejection.lock().expect("lock").clone() {
            return Err(RpcError::PreflightFailure {
                reason,
                logs: vec!["Program log: preflight".to_string()],
            });
        }

        // Token accounts created by the transaction appear on the ledger.
        let keys = &tx.message.account_keys;
        for ix in &tx.message.instructions {
            if keys[ix.program_id_index as usize] == ASSOCIATED_TOKEN_PROGRAM_ID {
                let created = keys[ix.accounts[1] as usize];
                self.accounts
                    .lock()
                    .expect("lock")
                    .entry(created)
                    .or_insert_with(|| vec![0; 165]);
            }
        }

        self.sent.lock().expect("lock").push(tx.clone());
        tx.signatures
            .first()
            .copied()
            .ok_or_else(|| RpcError::InvalidResponse("unsigned transaction".to_string()))
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> Result<Option<SignatureState>, RpcError> {
        let slot = self.height.load(Ordering::SeqCst);
        let sent = self.sent_count();
        let polls = self.status_polls.fetch_add(1, Ordering::SeqCst) + 1;

        let state = match &*self.script.lock().expect("lock") {
            Script::Land => Some(SignatureState::Landed { slot }),
            Script::Drop => None,
            Script::Reject(reason) => Some(SignatureState::Failed {
                slot,
                reason: reason.clone(),
            }),
            Script::LandOnAttempt(n) if sent >= *n => Some(SignatureState::Landed { slot }),
            Script::LandOnAttempt(_) => None,
            Script::LandAfterPolls(n) if polls > *n as u64 => Some(SignatureState::Landed { slot }),
            Script::LandAfterPolls(_) => None,
        };

        Ok(state)
    }
}
