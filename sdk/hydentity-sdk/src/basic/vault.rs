use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::advanced::instructions;
use crate::basic::actions::{
    AddDelegateBuilder, DepositToPoolBuilder, UpdatePolicyBuilder, WithdrawDirectBuilder,
};
use crate::core::connection::SolConnection;
use crate::core::constants::DEFAULT_PROGRAM_ID;
use crate::error::{HydentitySdkError, Result};
use crate::resolver::NameResolver;
use crate::types::PrivacyPolicy;
use crate::utils::{self, NameVaultAccount};

/// A Hydentity vault attached to one SNS name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVault {
    pub domain: String,

    /// SNS name registry account
    pub name_account: Pubkey,

    /// Program ID of the vault program
    pub program_id: Pubkey,

    /// NameVault PDA - bookkeeping
    pub address: Pubkey,

    /// VaultAuthority PDA - holds the received SOL
    pub authority: Pubkey,

    /// PrivacyPolicy PDA
    pub policy_address: Pubkey,
}

impl NameVault {
    pub const DEFAULT_PROGRAM_ID: Pubkey = DEFAULT_PROGRAM_ID;

    /// Construct from a known name account, without touching the network.
    pub fn new(program_id: Pubkey, domain: impl Into<String>, name_account: Pubkey) -> Self {
        let (address, _) = utils::derive_vault_pda(&program_id, &name_account);
        let (authority, _) = utils::derive_vault_authority_pda(&program_id, &name_account);
        let (policy_address, _) = utils::derive_policy_pda(&program_id, &name_account);
        Self {
            domain: domain.into(),
            name_account,
            program_id,
            address,
            authority,
            policy_address,
        }
    }

    /// Resolve `domain` and check that `claimant` may act on its vault.
    ///
    /// Ownership holds when the name registry lists `claimant`, or when the
    /// domain was handed to the vault authority and the vault records
    /// `claimant` as its owner.
    pub async fn open(
        resolver: &(impl NameResolver + ?Sized),
        connection: &(impl SolConnection + ?Sized),
        program_id: Option<Pubkey>,
        domain: &str,
        claimant: &Pubkey,
    ) -> Result<Self> {
        let program_id = program_id.unwrap_or(Self::DEFAULT_PROGRAM_ID);
        let name_account = resolver
            .resolve(domain)
            .await?
            .ok_or_else(|| HydentitySdkError::NameNotFound(domain.to_string()))?;
        let vault = Self::new(program_id, domain, name_account);

        if resolver.verify_ownership(domain, claimant).await? {
            debug!(domain, %claimant, "ownership verified via name registry");
            return Ok(vault);
        }

        match vault.fetch_account(connection).await {
            Ok(account) if account.domain_transferred && account.owner() == *claimant => {
                debug!(domain, %claimant, "ownership verified via transferred vault");
                Ok(vault)
            },
            Ok(_) | Err(HydentitySdkError::AccountNotFound(_)) => {
                Err(HydentitySdkError::OwnershipMismatch {
                    domain: domain.to_string(),
                    owner: *claimant,
                })
            },
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_account(
        &self,
        connection: &(impl SolConnection + ?Sized),
    ) -> Result<NameVaultAccount> {
        utils::fetch_name_vault(connection, &self.program_id, &self.name_account).await
    }

    pub async fn fetch_policy(
        &self,
        connection: &(impl SolConnection + ?Sized),
    ) -> Result<PrivacyPolicy> {
        utils::fetch_policy(connection, &self.program_id, &self.name_account).await
    }

    /// Claimable SOL held by the vault authority
    pub async fn fetch_balance(&self, connection: &(impl SolConnection + ?Sized)) -> Result<u64> {
        let balance =
            utils::fetch_vault_balance(connection, &self.program_id, &self.name_account).await?;
        info!(domain = %self.domain, balance, "vault balance");
        Ok(balance)
    }

    //=========================================================================
    // Instruction builders
    //=========================================================================

    pub fn initialize(&self, owner: &Pubkey) -> Instruction {
        instructions::initialize_vault(&self.program_id, owner, &self.name_account)
    }

    /// Start building a policy update signed by `authority`
    pub fn update_policy(&self, authority: Pubkey) -> UpdatePolicyBuilder<'_> {
        UpdatePolicyBuilder::new(self, authority)
    }

    pub fn add_delegate(&self, owner: Pubkey, delegate: Pubkey) -> AddDelegateBuilder<'_> {
        AddDelegateBuilder::new(self, owner, delegate)
    }

    pub fn revoke_delegate(&self, owner: &Pubkey, delegate: &Pubkey) -> Instruction {
        instructions::revoke_delegate(&self.program_id, owner, &self.name_account, delegate)
    }

    pub fn withdraw_direct(&self, owner: Pubkey) -> WithdrawDirectBuilder<'_> {
        WithdrawDirectBuilder::new(self, owner)
    }

    /// Start building an on-chain deposit from the vault into a pool account
    pub fn deposit_to_pool(&self, authority: Pubkey) -> DepositToPoolBuilder<'_> {
        DepositToPoolBuilder::new(self, authority)
    }

    pub fn mark_domain_transferred(&self, owner: &Pubkey) -> Instruction {
        instructions::mark_domain_transferred(&self.program_id, owner, &self.name_account)
    }

    pub fn reclaim_domain(&self, owner: &Pubkey, destination: &Pubkey) -> Instruction {
        instructions::reclaim_domain(&self.program_id, owner, &self.name_account, destination)
    }
}
