use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

use crate::core::connection::SolConnection;
use crate::core::constants::{
    DELEGATE_SEED, POLICY_SEED, VAULT_AUTHORITY_LEN, VAULT_AUTH_SEED, VAULT_SEED,
};
use crate::error::{HydentitySdkError, Result};
use crate::types::{DestinationMode, Distribution, PrivacyMode, PrivacyPolicy};

//=============================================================================
// PDA Derivation Helpers
//=============================================================================

/// Derive the NameVault PDA for an SNS name account
pub fn derive_vault_pda(program_id: &Pubkey, name_account: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, name_account.as_ref()], program_id)
}

/// Derive the VaultAuthority PDA (holds the SOL) for an SNS name account
pub fn derive_vault_authority_pda(program_id: &Pubkey, name_account: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_AUTH_SEED, name_account.as_ref()], program_id)
}

pub fn derive_policy_pda(program_id: &Pubkey, name_account: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POLICY_SEED, name_account.as_ref()], program_id)
}

/// Derive the DelegateSession PDA for a (name, delegate) pair
pub fn derive_delegate_pda(
    program_id: &Pubkey,
    name_account: &Pubkey,
    delegate: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[DELEGATE_SEED, name_account.as_ref(), delegate.as_ref()],
        program_id,
    )
}

//=============================================================================
// Anchor Encoding
//=============================================================================

/// First 8 bytes of `sha256("global:<name>")`
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    hash_prefix(&format!("global:{}", name))
}

/// First 8 bytes of `sha256("account:<Type>")`
pub fn account_discriminator(type_name: &str) -> [u8; 8] {
    hash_prefix(&format!("account:{}", type_name))
}

fn hash_prefix(preimage: &str) -> [u8; 8] {
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

//=============================================================================
// On-chain Account Layouts
//=============================================================================

/// `PrivacyPolicy` account body (after the discriminator)
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PolicyAccount {
    pub vault: [u8; 32],
    pub sns_name: [u8; 32],
    pub enabled: bool,
    pub min_splits: u8,
    pub max_splits: u8,
    pub min_delay_seconds: u32,
    pub max_delay_seconds: u32,
    pub distribution: u8,
    pub privacy_mode: u8,
    pub destination_mode: u8,
    pub destinations: Vec<[u8; 32]>,
    pub policy_nonce: u64,
    pub updated_at: i64,
    pub bump: u8,
    pub reserved: [u8; 64],
}

impl PolicyAccount {
    pub const NAME: &'static str = "PrivacyPolicy";

    /// Build the on-chain representation of `policy` (used by tooling and tests)
    pub fn from_policy(vault: &Pubkey, sns_name: &Pubkey, policy: &PrivacyPolicy) -> Self {
        Self {
            vault: vault.to_bytes(),
            sns_name: sns_name.to_bytes(),
            enabled: policy.enabled,
            min_splits: policy.min_splits,
            max_splits: policy.max_splits,
            min_delay_seconds: policy.min_delay_seconds,
            max_delay_seconds: policy.max_delay_seconds,
            distribution: policy.distribution.to_u8(),
            privacy_mode: policy.privacy_mode.to_u8(),
            destination_mode: policy.destination_mode.to_u8(),
            destinations: policy.destinations.iter().map(|d| d.to_bytes()).collect(),
            policy_nonce: policy.policy_nonce,
            updated_at: 0,
            bump: 0,
            reserved: [0u8; 64],
        }
    }

    pub fn into_policy(self) -> Result<PrivacyPolicy> {
        let distribution = Distribution::from_u8(self.distribution).ok_or_else(|| {
            HydentitySdkError::InvalidAccountData(format!(
                "unknown distribution {}",
                self.distribution
            ))
        })?;
        let privacy_mode = PrivacyMode::from_u8(self.privacy_mode).ok_or_else(|| {
            HydentitySdkError::InvalidAccountData(format!(
                "unknown privacy mode {}",
                self.privacy_mode
            ))
        })?;
        let destination_mode = DestinationMode::from_u8(self.destination_mode).ok_or_else(|| {
            HydentitySdkError::InvalidAccountData(format!(
                "unknown destination mode {}",
                self.destination_mode
            ))
        })?;

        Ok(PrivacyPolicy {
            enabled: self.enabled,
            min_splits: self.min_splits,
            max_splits: self.max_splits,
            min_delay_seconds: self.min_delay_seconds,
            max_delay_seconds: self.max_delay_seconds,
            distribution,
            privacy_mode,
            destination_mode,
            destinations: self
                .destinations
                .into_iter()
                .map(Pubkey::new_from_array)
                .collect(),
            policy_nonce: self.policy_nonce,
        })
    }
}

/// `NameVault` account body (after the discriminator)
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct NameVaultAccount {
    pub owner: [u8; 32],
    pub sns_name: [u8; 32],
    pub total_sol_received: u64,
    pub deposit_count: u64,
    pub created_at: i64,
    pub last_deposit_at: i64,
    pub bump: u8,
    pub domain_transferred: bool,
    pub reserved1: [u8; 31],
    pub reserved2: [u8; 32],
}

impl NameVaultAccount {
    pub const NAME: &'static str = "NameVault";

    pub fn new(owner: &Pubkey, sns_name: &Pubkey) -> Self {
        Self {
            owner: owner.to_bytes(),
            sns_name: sns_name.to_bytes(),
            total_sol_received: 0,
            deposit_count: 0,
            created_at: 0,
            last_deposit_at: 0,
            bump: 0,
            domain_transferred: false,
            reserved1: [0u8; 31],
            reserved2: [0u8; 32],
        }
    }

    pub fn owner(&self) -> Pubkey {
        Pubkey::new_from_array(self.owner)
    }
}

/// Prefix `body` with the Anchor account discriminator for `type_name`
pub fn encode_account<T: BorshSerialize>(type_name: &str, body: &T) -> Result<Vec<u8>> {
    let mut data = account_discriminator(type_name).to_vec();
    body.serialize(&mut data)?;
    Ok(data)
}

/// Check the discriminator and decode the account body.
/// Trailing bytes (reserved or unused capacity) are ignored.
pub fn decode_account<T: BorshDeserialize>(type_name: &str, data: &[u8]) -> Result<T> {
    if data.len() < 8 {
        return Err(HydentitySdkError::InvalidAccountData(format!(
            "{} account shorter than its discriminator",
            type_name
        )));
    }
    if data[..8] != account_discriminator(type_name) {
        return Err(HydentitySdkError::InvalidAccountData(format!(
            "discriminator mismatch for {}",
            type_name
        )));
    }
    let mut body = &data[8..];
    T::deserialize(&mut body).map_err(|e| {
        HydentitySdkError::InvalidAccountData(format!("Failed to parse {}: {}", type_name, e))
    })
}

//=============================================================================
// Account Fetching & Parsing
//=============================================================================

/// Fetch raw account data, failing with `AccountNotFound` when absent
pub async fn fetch_account_data(
    connection: &(impl SolConnection + ?Sized),
    address: &Pubkey,
) -> Result<Vec<u8>> {
    let account = connection
        .get_account(address)
        .await
        .map_err(HydentitySdkError::network)?
        .ok_or(HydentitySdkError::AccountNotFound(*address))?;

    Ok(account.data)
}

/// Fetch and decode the privacy policy of a name
pub async fn fetch_policy(
    connection: &(impl SolConnection + ?Sized),
    program_id: &Pubkey,
    name_account: &Pubkey,
) -> Result<PrivacyPolicy> {
    let (policy_pda, _) = derive_policy_pda(program_id, name_account);
    let data = fetch_account_data(connection, &policy_pda).await?;
    decode_account::<PolicyAccount>(PolicyAccount::NAME, &data)?.into_policy()
}

/// Fetch and decode the NameVault account of a name
pub async fn fetch_name_vault(
    connection: &(impl SolConnection + ?Sized),
    program_id: &Pubkey,
    name_account: &Pubkey,
) -> Result<NameVaultAccount> {
    let (vault_pda, _) = derive_vault_pda(program_id, name_account);
    let data = fetch_account_data(connection, &vault_pda).await?;
    decode_account(NameVaultAccount::NAME, &data)
}

/// Claimable SOL: vault-authority lamports above the rent-exempt minimum
pub async fn fetch_vault_balance(
    connection: &(impl SolConnection + ?Sized),
    program_id: &Pubkey,
    name_account: &Pubkey,
) -> Result<u64> {
    let (authority_pda, _) = derive_vault_authority_pda(program_id, name_account);
    let account = connection
        .get_account(&authority_pda)
        .await
        .map_err(HydentitySdkError::network)?
        .ok_or(HydentitySdkError::AccountNotFound(authority_pda))?;
    let rent = connection
        .get_minimum_balance_for_rent_exemption(VAULT_AUTHORITY_LEN)
        .await
        .map_err(HydentitySdkError::network)?;

    Ok(account.lamports.saturating_sub(rent))
}

/// Owner field of an SNS name registry account (bytes 32..64)
pub fn parse_name_owner(data: &[u8]) -> Result<Pubkey> {
    let bytes: [u8; 32] = data
        .get(32..64)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            HydentitySdkError::InvalidAccountData(
                "name registry account too small for owner field".to_string(),
            )
        })?;
    Ok(Pubkey::new_from_array(bytes))
}
