#![allow(dead_code)]

use async_trait::async_trait;
use hydentity_sdk::core::connection::SolConnection;
use hydentity_sdk::core::signer::HydentitySigner;
use hydentity_sdk::error::{HydentitySdkError, Result};
use hydentity_sdk::mixer::{FeeSchedule, IdentityBridge, MixerBridge, PoolIdentity};
use hydentity_sdk::resolver::NameResolver;
use hydentity_sdk::types::{Amount, DepositReceipt, PrivacyPolicy, WithdrawReceipt};
use hydentity_sdk::utils::{
    derive_policy_pda, derive_vault_authority_pda, derive_vault_pda, encode_account,
    NameVaultAccount, PolicyAccount,
};
use hydentity_sdk::ClaimOrchestrator;
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const RENT_EXEMPT_MINIMUM: u64 = 1_000_000;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

//=============================================================================
// Connection
//=============================================================================

/// In-memory `SolConnection`: an account map plus a call counter.
pub struct MockConnection {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    pub blockhash: Hash,
    pub sent: Mutex<Vec<Transaction>>,
    calls: AtomicUsize,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            blockhash: Hash::new_unique(),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_account(&self, address: Pubkey, lamports: u64, data: Vec<u8>, owner: Pubkey) {
        self.accounts.lock().unwrap().insert(
            address,
            Account {
                lamports,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn set_lamports(&self, address: Pubkey, lamports: u64) {
        self.set_account(address, lamports, Vec::new(), Pubkey::default());
    }

    pub fn network_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SolConnection for MockConnection {
    async fn send_transaction(&self, tx: &Transaction) -> std::result::Result<Signature, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !tx.is_signed() {
            return Err("transaction is not fully signed".into());
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn get_account(&self, pubkey: &Pubkey) -> std::result::Result<Option<Account>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(pubkey).cloned())
    }

    async fn get_latest_blockhash(&self) -> std::result::Result<Hash, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.blockhash)
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        _data_len: usize,
    ) -> std::result::Result<u64, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RENT_EXEMPT_MINIMUM)
    }
}

//=============================================================================
// Signer
//=============================================================================

/// Keypair signer that counts how often it was asked to sign.
pub struct RecordingSigner {
    pub keypair: Keypair,
    signs: AtomicUsize,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            signs: AtomicUsize::new(0),
        }
    }

    pub fn sign_count(&self) -> usize {
        self.signs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HydentitySigner for RecordingSigner {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(&self.keypair)
    }

    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Signature, String> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        Ok(Signer::sign_message(&self.keypair, message))
    }
}

//=============================================================================
// Mixer
//=============================================================================

/// In-memory pool for one identity.
pub struct MockMixer {
    identity: PoolIdentity,
    fees: FeeSchedule,
    pool_balance: Mutex<Amount>,
    deposits: Mutex<Vec<(Amount, tokio::time::Instant)>>,
    withdrawals: Mutex<Vec<(Amount, Option<Pubkey>)>>,
    fail_deposit_at: Mutex<Option<usize>>,
    fail_withdrawals: AtomicBool,
    fail_balance_queries: AtomicBool,
    balance_queries: AtomicUsize,
    deposit_latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockMixer {
    pub fn new(identity: PoolIdentity) -> Self {
        Self {
            identity,
            fees: FeeSchedule::new(3_500, 6_000),
            pool_balance: Mutex::new(0),
            deposits: Mutex::new(Vec::new()),
            withdrawals: Mutex::new(Vec::new()),
            fail_deposit_at: Mutex::new(None),
            fail_withdrawals: AtomicBool::new(false),
            fail_balance_queries: AtomicBool::new(false),
            balance_queries: AtomicUsize::new(0),
            deposit_latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_deposit_latency(mut self, latency: Duration) -> Self {
        self.deposit_latency = latency;
        self
    }

    /// Make the `index`-th deposit (0-based, counted from now) fail with a network error
    pub fn fail_deposit_at(&self, index: Option<usize>) {
        let already = self.deposits.lock().unwrap().len();
        *self.fail_deposit_at.lock().unwrap() = index.map(|i| already + i);
    }

    pub fn fail_withdrawals(&self, fail: bool) {
        self.fail_withdrawals.store(fail, Ordering::SeqCst);
    }

    pub fn fail_balance_queries(&self, fail: bool) {
        self.fail_balance_queries.store(fail, Ordering::SeqCst);
    }

    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    pub fn deposits(&self) -> Vec<Amount> {
        self.deposits.lock().unwrap().iter().map(|(a, _)| *a).collect()
    }

    pub fn deposit_times(&self) -> Vec<tokio::time::Instant> {
        self.deposits.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn withdrawals(&self) -> Vec<(Amount, Option<Pubkey>)> {
        self.withdrawals.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MixerBridge for MockMixer {
    fn identity(&self) -> PoolIdentity {
        self.identity
    }

    async fn deposit_into_mixer(&self, amount: Amount) -> Result<DepositReceipt> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if !self.deposit_latency.is_zero() {
            tokio::time::sleep(self.deposit_latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut deposits = self.deposits.lock().unwrap();
        if *self.fail_deposit_at.lock().unwrap() == Some(deposits.len()) {
            return Err(HydentitySdkError::NetworkFailure("relayer timed out".to_string()));
        }
        deposits.push((amount, tokio::time::Instant::now()));
        *self.pool_balance.lock().unwrap() += amount;
        Ok(DepositReceipt {
            signature: Signature::new_unique(),
            amount,
        })
    }

    async fn withdraw(&self, amount: Amount, recipient: Option<Pubkey>) -> Result<WithdrawReceipt> {
        if self.fail_withdrawals.load(Ordering::SeqCst) {
            return Err(HydentitySdkError::NetworkFailure("relayer timed out".to_string()));
        }
        let mut balance = self.pool_balance.lock().unwrap();
        if *balance < amount {
            return Err(HydentitySdkError::InsufficientPoolBalance {
                requested: amount,
                available: *balance,
            });
        }
        let breakdown = self.fees.breakdown(amount)?;
        *balance -= amount;
        self.withdrawals.lock().unwrap().push((amount, recipient));
        Ok(WithdrawReceipt {
            signature: Signature::new_unique(),
            amount_received: breakdown.amount_received,
            fee: breakdown.fee,
            recipient,
        })
    }

    async fn get_balance(&self) -> Result<Amount> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance_queries.load(Ordering::SeqCst) {
            return Err(HydentitySdkError::NetworkFailure("relayer unavailable".to_string()));
        }
        Ok(*self.pool_balance.lock().unwrap())
    }
}

//=============================================================================
// Resolver
//=============================================================================

/// Fixed domain table: domain → (name account, registry owner)
#[derive(Default)]
pub struct StaticResolver {
    names: Mutex<HashMap<String, (Pubkey, Pubkey)>>,
}

impl StaticResolver {
    pub fn register(&self, domain: &str, name_account: Pubkey, owner: Pubkey) {
        self.names
            .lock()
            .unwrap()
            .insert(domain.to_string(), (name_account, owner));
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn resolve(&self, domain: &str) -> Result<Option<Pubkey>> {
        Ok(self.names.lock().unwrap().get(domain).map(|(name, _)| *name))
    }

    async fn verify_ownership(&self, domain: &str, owner: &Pubkey) -> Result<bool> {
        match self.names.lock().unwrap().get(domain) {
            Some((_, registered)) => Ok(registered == owner),
            None => Err(HydentitySdkError::NameNotFound(domain.to_string())),
        }
    }
}

//=============================================================================
// Fixtures
//=============================================================================

/// Write the policy, vault and vault-authority accounts of a name.
pub fn seed_vault(
    connection: &MockConnection,
    program_id: &Pubkey,
    name_account: &Pubkey,
    owner: &Pubkey,
    policy: &PrivacyPolicy,
    claimable: u64,
) {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (authority, _) = derive_vault_authority_pda(program_id, name_account);
    let (policy_pda, _) = derive_policy_pda(program_id, name_account);

    let policy_body = PolicyAccount::from_policy(&vault, name_account, policy);
    connection.set_account(
        policy_pda,
        RENT_EXEMPT_MINIMUM,
        encode_account(PolicyAccount::NAME, &policy_body).unwrap(),
        *program_id,
    );

    let vault_body = NameVaultAccount::new(owner, name_account);
    connection.set_account(
        vault,
        RENT_EXEMPT_MINIMUM,
        encode_account(NameVaultAccount::NAME, &vault_body).unwrap(),
        *program_id,
    );

    connection.set_account(
        authority,
        claimable + RENT_EXEMPT_MINIMUM,
        vec![0u8; 8],
        *program_id,
    );
}

pub struct ClaimFixture {
    pub program_id: Pubkey,
    pub domain: String,
    pub name_account: Pubkey,
    pub connection: Arc<MockConnection>,
    pub resolver: Arc<StaticResolver>,
    pub signer: Arc<RecordingSigner>,
    pub mixer: Arc<MockMixer>,
    pub orchestrator: ClaimOrchestrator,
}

impl ClaimFixture {
    pub fn new(policy: PrivacyPolicy, claimable: u64) -> Self {
        Self::with_mixer(policy, claimable, |identity| MockMixer::new(identity))
    }

    pub fn with_mixer(
        policy: PrivacyPolicy,
        claimable: u64,
        build_mixer: impl FnOnce(PoolIdentity) -> MockMixer,
    ) -> Self {
        let program_id = Pubkey::new_unique();
        let domain = "alice.sol".to_string();
        let name_account = Pubkey::new_unique();
        let connection = Arc::new(MockConnection::new());
        let resolver = Arc::new(StaticResolver::default());
        let signer = Arc::new(RecordingSigner::new());
        let mixer = Arc::new(build_mixer(PoolIdentity::from_bytes([7; 32])));

        resolver.register(&domain, name_account, signer.pubkey());
        seed_vault(
            &connection,
            &program_id,
            &name_account,
            &signer.pubkey(),
            &policy,
            claimable,
        );

        let orchestrator = ClaimOrchestrator::new(
            connection.clone(),
            resolver.clone(),
            signer.clone(),
            Arc::new(IdentityBridge::new(mixer.clone())),
            program_id,
        );

        Self {
            program_id,
            domain,
            name_account,
            connection,
            resolver,
            signer,
            mixer,
            orchestrator,
        }
    }
}

/// Policy with fixed split count and no delays
pub fn fixed_policy(splits: u8) -> PrivacyPolicy {
    PrivacyPolicy {
        min_splits: splits,
        max_splits: splits,
        min_delay_seconds: 0,
        max_delay_seconds: 0,
        ..PrivacyPolicy::default()
    }
}
