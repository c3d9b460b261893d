use async_trait::async_trait;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

use crate::core::connection::SolConnection;
use crate::core::constants::{SNS_HASH_PREFIX, SNS_NAME_PROGRAM_ID, SOL_TLD_AUTHORITY};
use crate::error::{HydentitySdkError, Result};
use crate::utils::parse_name_owner;

/// Domain → name account lookup.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Name account for `domain`, or `None` if it is not registered.
    async fn resolve(&self, domain: &str) -> Result<Option<Pubkey>>;

    /// Whether `owner` currently owns `domain`.
    async fn verify_ownership(&self, domain: &str, owner: &Pubkey) -> Result<bool>;
}

/// Strip a trailing `.sol` and surrounding whitespace
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim().to_lowercase();
    trimmed
        .strip_suffix(".sol")
        .map(str::to_string)
        .unwrap_or(trimmed)
}

pub fn hash_name(label: &str) -> [u8; 32] {
    Sha256::digest(format!("{}{}", SNS_HASH_PREFIX, label).as_bytes()).into()
}

/// Name account of a `.sol` second-level domain
pub fn derive_name_account(domain: &str) -> Pubkey {
    let hashed = hash_name(&normalize_domain(domain));
    let (address, _) = Pubkey::find_program_address(
        &[&hashed, Pubkey::default().as_ref(), SOL_TLD_AUTHORITY.as_ref()],
        &SNS_NAME_PROGRAM_ID,
    );
    address
}

/// Resolver over the SNS name registry.
pub struct SnsResolver<C: ?Sized> {
    connection: Arc<C>,
}

impl<C: SolConnection + ?Sized> SnsResolver<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self { connection }
    }

    /// Current owner recorded in the name registry.
    pub async fn owner_of(&self, domain: &str) -> Result<Pubkey> {
        let name_account = derive_name_account(domain);
        let account = self
            .connection
            .get_account(&name_account)
            .await
            .map_err(HydentitySdkError::network)?
            .ok_or_else(|| HydentitySdkError::NameNotFound(domain.to_string()))?;
        parse_name_owner(&account.data)
    }
}

#[async_trait]
impl<C: SolConnection + ?Sized> NameResolver for SnsResolver<C> {
    async fn resolve(&self, domain: &str) -> Result<Option<Pubkey>> {
        let name_account = derive_name_account(domain);
        let account = self
            .connection
            .get_account(&name_account)
            .await
            .map_err(HydentitySdkError::network)?;
        debug!(domain, %name_account, found = account.is_some(), "resolved domain");
        Ok(account.map(|_| name_account))
    }

    async fn verify_ownership(&self, domain: &str, owner: &Pubkey) -> Result<bool> {
        Ok(self.owner_of(domain).await? == *owner)
    }
}
