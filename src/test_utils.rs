//! Test Utilities Module
//!
//! Deterministic stand-ins for the ledger RPC, the smart-wallet SDK, blockhash
//! sources, instruction builders and progress sinks. No network access.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::observability::{CorrelationId, ProgressSink, TransferProgress};
use crate::rpc_manager::{BlockhashSource, LatestBlockhash, LedgerRpc, RpcManagerError};
use crate::tx_builder::{InstructionPlan, TransactionBuilderError, TransferInstructionBuilder};
use crate::types::{Network, ValidatedTransfer};
use crate::wallet::{
    RelayFailure, SignAndSendRequest, SmartWallet, WalletConnector, WalletError, WalletIdentity,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentLevel,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use spl_token::solana_program::program_pack::Pack;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Address that can hold SOL directly
pub fn on_curve_address() -> Pubkey {
    Keypair::new().pubkey()
}

/// Program-derived (off-curve) address, like a smart wallet
pub fn off_curve_address() -> Pubkey {
    let nonce = Uuid::new_v4();
    Pubkey::find_program_address(&[b"smart_wallet".as_ref(), nonce.as_bytes().as_ref()], &Pubkey::new_unique()).0
}

/// Random signature
pub fn random_signature() -> Signature {
    Keypair::new().sign_message(Uuid::new_v4().as_bytes())
}

// ---------------------------------------------------------------------------
// Ledger RPC
// ---------------------------------------------------------------------------

/// In-memory ledger
///
/// Accounts can be present from the start or appear after a number of
/// lookups, which models a lagging read replica.
#[derive(Default)]
pub struct MockLedgerRpc {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    /// Lookups still answered with `None` before the account shows up
    delayed: Mutex<HashMap<Pubkey, usize>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    account_error: Mutex<Option<String>>,
    blockhash_error: Mutex<Option<String>>,
    account_queries: AtomicUsize,
    blockhash_queries: AtomicUsize,
    queried: Mutex<Vec<(Pubkey, CommitmentLevel)>>,
}

impl MockLedgerRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, address: Pubkey) {
        self.accounts.lock().insert(address, Account::default());
    }

    /// Account answered as missing for the first `lookups` queries
    pub fn add_account_after(&self, address: Pubkey, lookups: usize) {
        self.add_account(address);
        self.delayed.lock().insert(address, lookups);
    }

    /// Initialized token account holding `amount` of `mint` for `owner`
    pub fn add_token_account(&self, address: Pubkey, mint: Pubkey, owner: Pubkey, amount: u64) {
        let state = spl_token::state::Account {
            mint,
            owner,
            amount,
            state: spl_token::state::AccountState::Initialized,
            ..Default::default()
        };
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        spl_token::state::Account::pack(state, &mut data).expect("pack token account");
        self.accounts.lock().insert(
            address,
            Account {
                lamports: 2_039_280,
                data,
                owner: spl_token::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.balances.lock().insert(address, lamports);
    }

    /// Every `get_account_info` fails with `message`
    pub fn fail_account_queries_with(&self, message: &str) {
        *self.account_error.lock() = Some(message.to_string());
    }

    pub fn fail_blockhash_with(&self, message: &str) {
        *self.blockhash_error.lock() = Some(message.to_string());
    }

    pub fn account_query_count(&self) -> usize {
        self.account_queries.load(Ordering::SeqCst)
    }

    pub fn blockhash_query_count(&self) -> usize {
        self.blockhash_queries.load(Ordering::SeqCst)
    }

    /// Addresses queried, in order
    pub fn queried(&self) -> Vec<(Pubkey, CommitmentLevel)> {
        self.queried.lock().clone()
    }
}

#[async_trait]
impl LedgerRpc for MockLedgerRpc {
    fn endpoint(&self) -> &str {
        "mock://ledger"
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcManagerError> {
        Ok(self.balances.lock().get(address).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError> {
        self.blockhash_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.blockhash_error.lock().clone() {
            return Err(RpcManagerError::from_message(&message, self.endpoint()));
        }
        Ok(LatestBlockhash {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
        })
    }

    async fn get_account_info(
        &self,
        address: &Pubkey,
        commitment: CommitmentLevel,
    ) -> Result<Option<Account>, RpcManagerError> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().push((*address, commitment));

        if let Some(message) = self.account_error.lock().clone() {
            return Err(RpcManagerError::from_message(&message, self.endpoint()));
        }

        if let Some(remaining) = self.delayed.lock().get_mut(address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }

        Ok(self.accounts.lock().get(address).cloned())
    }
}

// ---------------------------------------------------------------------------
// Wallet SDK
// ---------------------------------------------------------------------------

/// Scripted smart wallet
///
/// Submissions pop scripted outcomes in order; once the script is empty every
/// submission succeeds with a fresh signature.
pub struct MockWallet {
    network: Network,
    smart_wallet: Pubkey,
    /// `smart_wallet_address` calls answered with `None` first
    identity_delay: AtomicUsize,
    script: Mutex<VecDeque<Result<Signature, RelayFailure>>>,
    requests: Mutex<Vec<SignAndSendRequest>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MockWallet {
    pub fn new(network: Network) -> Self {
        Self::with_identity_after(network, 0)
    }

    /// Identity unpublished for the first `checks` address lookups
    pub fn with_identity_after(network: Network, checks: usize) -> Self {
        Self {
            network,
            smart_wallet: off_curve_address(),
            identity_delay: AtomicUsize::new(checks),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    /// Identity never published
    pub fn without_identity(network: Network) -> Self {
        Self::with_identity_after(network, usize::MAX)
    }

    pub fn smart_wallet(&self) -> Pubkey {
        self.smart_wallet
    }

    pub fn push_failure(&self, message: &str) {
        self.script.lock().push_back(Err(RelayFailure::new(message)));
    }

    pub fn push_failure_with_stack(&self, message: &str, stack: &str) {
        self.script
            .lock()
            .push_back(Err(RelayFailure::new(message).with_stack(stack)));
    }

    pub fn push_success(&self, signature: Signature) {
        self.script.lock().push_back(Ok(signature));
    }

    /// Every submission received so far
    pub fn requests(&self) -> Vec<SignAndSendRequest> {
        self.requests.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmartWallet for MockWallet {
    fn network(&self) -> Network {
        self.network
    }

    async fn connect(&self) -> Result<WalletIdentity, WalletError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(WalletIdentity {
            smart_wallet: self.smart_wallet,
            credential_id: Some("mock-credential".to_string()),
        })
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn smart_wallet_address(&self) -> Option<Pubkey> {
        let pending = self.identity_delay.load(Ordering::SeqCst);
        if pending == 0 {
            return Some(self.smart_wallet);
        }
        if pending != usize::MAX {
            self.identity_delay.fetch_sub(1, Ordering::SeqCst);
        }
        None
    }

    async fn sign_and_send_transaction(
        &self,
        request: SignAndSendRequest,
    ) -> Result<Signature, RelayFailure> {
        self.requests.lock().push(request);
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(random_signature()))
    }
}

/// Connector handing out fresh `MockWallet`s
#[derive(Default)]
pub struct MockConnector {
    opened: Mutex<Vec<(Network, Arc<MockWallet>)>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<Network> {
        self.opened.lock().iter().map(|(n, _)| *n).collect()
    }

    pub fn wallets(&self) -> Vec<Arc<MockWallet>> {
        self.opened.lock().iter().map(|(_, w)| Arc::clone(w)).collect()
    }
}

#[async_trait]
impl WalletConnector for MockConnector {
    async fn open(&self, network: Network) -> Result<Arc<dyn SmartWallet>, WalletError> {
        let wallet = Arc::new(MockWallet::new(network));
        self.opened.lock().push((network, Arc::clone(&wallet)));
        Ok(wallet)
    }
}

// ---------------------------------------------------------------------------
// Blockhash, builder and progress
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockBlockhashSource {
    fail: bool,
    calls: AtomicUsize,
}

impl MockBlockhashSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockhashSource for MockBlockhashSource {
    async fn latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RpcManagerError::Transport {
                endpoint: "mock://blockhash".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(LatestBlockhash {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
        })
    }
}

/// Builder wrapper recording every plan it hands out
pub struct CountingBuilder {
    inner: Arc<dyn TransferInstructionBuilder>,
    plans: Mutex<Vec<InstructionPlan>>,
}

impl CountingBuilder {
    pub fn wrap(inner: Arc<dyn TransferInstructionBuilder>) -> Self {
        Self {
            inner,
            plans: Mutex::new(Vec::new()),
        }
    }

    pub fn build_count(&self) -> usize {
        self.plans.lock().len()
    }

    pub fn plan_ids(&self) -> Vec<Uuid> {
        self.plans.lock().iter().map(|p| p.id).collect()
    }

    pub fn plans(&self) -> Vec<InstructionPlan> {
        self.plans.lock().clone()
    }
}

#[async_trait]
impl TransferInstructionBuilder for CountingBuilder {
    async fn build(&self, transfer: &ValidatedTransfer) -> Result<InstructionPlan, TransactionBuilderError> {
        let plan = self.inner.build(transfer).await?;
        self.plans.lock().push(plan.clone());
        Ok(plan)
    }
}

/// Progress sink keeping every notification
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(CorrelationId, TransferProgress)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransferProgress> {
        self.events.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn correlation_ids(&self) -> HashSet<CorrelationId> {
        self.events.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn notify(&self, correlation_id: &CorrelationId, progress: TransferProgress) {
        self.events.lock().push((correlation_id.clone(), progress));
    }
}
