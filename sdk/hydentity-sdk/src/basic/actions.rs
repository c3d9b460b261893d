use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::advanced::instructions::{self, UpdatePolicyParams};
use crate::basic::pipeline::build_transaction;
use crate::basic::vault::NameVault;
use crate::core::constants::{DUST_THRESHOLD_LAMPORTS, PERMISSION_ALL};
use crate::error::{HydentitySdkError, Result};
use crate::types::{DestinationMode, Distribution, PrivacyMode, PrivacyPolicy};
use crate::utils::derive_delegate_pda;

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn unknown(field: &str, value: u8) -> HydentitySdkError {
    HydentitySdkError::InvalidPolicy(format!("unknown {} {}", field, value))
}

pub struct UpdatePolicyBuilder<'a> {
    vault: &'a NameVault,
    authority: Pubkey,
    as_delegate: bool,
    params: UpdatePolicyParams,
}

impl<'a> UpdatePolicyBuilder<'a> {
    pub fn new(vault: &'a NameVault, authority: Pubkey) -> Self {
        Self {
            vault,
            authority,
            as_delegate: false,
            params: UpdatePolicyParams::default(),
        }
    }

    /// Sign as a delegate rather than the owner; passes the session PDA.
    pub fn as_delegate(mut self) -> Self {
        self.as_delegate = true;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.params.enabled = Some(enabled);
        self
    }

    pub fn with_splits(mut self, min: u8, max: u8) -> Self {
        self.params.min_splits = Some(min);
        self.params.max_splits = Some(max);
        self
    }

    pub fn with_delays(mut self, min_seconds: u32, max_seconds: u32) -> Self {
        self.params.min_delay_seconds = Some(min_seconds);
        self.params.max_delay_seconds = Some(max_seconds);
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.params.distribution = Some(distribution.to_u8());
        self
    }

    pub fn with_privacy_mode(mut self, mode: PrivacyMode) -> Self {
        self.params.privacy_mode = Some(mode.to_u8());
        self
    }

    pub fn with_destination_mode(mut self, mode: DestinationMode) -> Self {
        self.params.destination_mode = Some(mode.to_u8());
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<Pubkey>) -> Self {
        self.params.destinations = Some(destinations.iter().map(|d| d.to_bytes()).collect());
        self
    }

    /// Replace every field at once with raw instruction params.
    pub fn with_params(mut self, params: UpdatePolicyParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &UpdatePolicyParams {
        &self.params
    }

    /// `current` with this update applied, validated as the program would.
    /// The nonce is bumped the way the program bumps it.
    pub fn apply(&self, current: &PrivacyPolicy) -> Result<PrivacyPolicy> {
        let p = &self.params;
        let mut next = current.clone();
        if let Some(enabled) = p.enabled {
            next.enabled = enabled;
        }
        if let Some(min) = p.min_splits {
            next.min_splits = min;
        }
        if let Some(max) = p.max_splits {
            next.max_splits = max;
        }
        if let Some(min) = p.min_delay_seconds {
            next.min_delay_seconds = min;
        }
        if let Some(max) = p.max_delay_seconds {
            next.max_delay_seconds = max;
        }
        if let Some(d) = p.distribution {
            next.distribution =
                Distribution::from_u8(d).ok_or_else(|| unknown("distribution", d))?;
        }
        if let Some(m) = p.privacy_mode {
            next.privacy_mode =
                PrivacyMode::from_u8(m).ok_or_else(|| unknown("privacy mode", m))?;
        }
        if let Some(m) = p.destination_mode {
            next.destination_mode =
                DestinationMode::from_u8(m).ok_or_else(|| unknown("destination mode", m))?;
        }
        if let Some(destinations) = &p.destinations {
            next.destinations = destinations.iter().copied().map(Pubkey::new_from_array).collect();
        }
        next.policy_nonce = current.policy_nonce.wrapping_add(1);
        next.validate()?;
        Ok(next)
    }

    pub fn build_instruction(&self) -> Result<Instruction> {
        let session = self.as_delegate.then(|| {
            derive_delegate_pda(&self.vault.program_id, &self.vault.name_account, &self.authority).0
        });
        instructions::update_policy(
            &self.vault.program_id,
            &self.authority,
            &self.vault.name_account,
            &self.params,
            session,
        )
    }

    pub fn build_transaction(&self) -> Result<Transaction> {
        Ok(build_transaction(&[self.build_instruction()?], &self.authority))
    }
}

pub struct AddDelegateBuilder<'a> {
    vault: &'a NameVault,
    owner: Pubkey,
    delegate: Pubkey,
    expires_at: Option<i64>,
    permissions: u8,
}

impl<'a> AddDelegateBuilder<'a> {
    pub fn new(vault: &'a NameVault, owner: Pubkey, delegate: Pubkey) -> Self {
        Self {
            vault,
            owner,
            delegate,
            expires_at: None,
            permissions: PERMISSION_ALL,
        }
    }

    /// Unix timestamp after which the session is void
    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_permissions(mut self, permissions: u8) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn build_instruction(&self) -> Result<Instruction> {
        self.build_instruction_at(unix_now())
    }

    /// Same as [`build_instruction`](Self::build_instruction) against a given clock.
    pub fn build_instruction_at(&self, now: i64) -> Result<Instruction> {
        let expires_at = self
            .expires_at
            .ok_or_else(|| HydentitySdkError::InvalidDelegate("expiry required".to_string()))?;
        if expires_at <= now {
            return Err(HydentitySdkError::InvalidDelegate(format!(
                "expiry {} is not in the future",
                expires_at
            )));
        }
        if self.permissions == 0 {
            return Err(HydentitySdkError::InvalidDelegate(
                "at least one permission required".to_string(),
            ));
        }
        instructions::add_delegate(
            &self.vault.program_id,
            &self.owner,
            &self.vault.name_account,
            &self.delegate,
            expires_at,
            self.permissions,
        )
    }

    pub fn build_transaction(&self) -> Result<Transaction> {
        Ok(build_transaction(&[self.build_instruction()?], &self.owner))
    }
}

pub struct WithdrawDirectBuilder<'a> {
    vault: &'a NameVault,
    owner: Pubkey,
    destination: Option<Pubkey>,
    amount: u64,
}

impl<'a> WithdrawDirectBuilder<'a> {
    pub fn new(vault: &'a NameVault, owner: Pubkey) -> Self {
        Self {
            vault,
            owner,
            destination: None,
            amount: 0,
        }
    }

    /// Defaults to the owner
    pub fn with_destination(mut self, destination: Pubkey) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub fn build_instruction(&self) -> Result<Instruction> {
        if self.amount == 0 {
            return Err(HydentitySdkError::InvalidAmount(
                "withdrawal amount must be greater than zero".to_string(),
            ));
        }
        instructions::withdraw_direct(
            &self.vault.program_id,
            &self.owner,
            &self.vault.name_account,
            &self.destination.unwrap_or(self.owner),
            self.amount,
        )
    }

    pub fn build_transaction(&self) -> Result<Transaction> {
        Ok(build_transaction(&[self.build_instruction()?], &self.owner))
    }
}

pub struct DepositToPoolBuilder<'a> {
    vault: &'a NameVault,
    authority: Pubkey,
    as_delegate: bool,
    pool: Option<(Pubkey, Pubkey)>,
    amount: u64,
}

impl<'a> DepositToPoolBuilder<'a> {
    pub fn new(vault: &'a NameVault, authority: Pubkey) -> Self {
        Self {
            vault,
            authority,
            as_delegate: false,
            pool: None,
            amount: 0,
        }
    }

    /// Sign as a delegate rather than the owner; passes the session PDA.
    pub fn as_delegate(mut self) -> Self {
        self.as_delegate = true;
        self
    }

    /// Pool program and the pool account it credits
    pub fn with_pool(mut self, program: Pubkey, pool: Pubkey) -> Self {
        self.pool = Some((program, pool));
        self
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub fn build_instruction(&self) -> Result<Instruction> {
        let (pool_program, pool) = self
            .pool
            .ok_or(HydentitySdkError::NotConfigured("pool accounts required"))?;
        if self.amount < DUST_THRESHOLD_LAMPORTS {
            return Err(HydentitySdkError::InvalidAmount(format!(
                "deposit of {} is below the dust threshold of {}",
                self.amount, DUST_THRESHOLD_LAMPORTS
            )));
        }
        let session = self.as_delegate.then(|| {
            derive_delegate_pda(&self.vault.program_id, &self.vault.name_account, &self.authority).0
        });
        instructions::deposit_to_umbra(
            &self.vault.program_id,
            &self.authority,
            &self.vault.name_account,
            &pool_program,
            &pool,
            self.amount,
            session,
        )
    }

    pub fn build_transaction(&self) -> Result<Transaction> {
        Ok(build_transaction(&[self.build_instruction()?], &self.authority))
    }
}
