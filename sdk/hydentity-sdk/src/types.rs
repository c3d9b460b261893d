use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_MAX_DELAY_SECONDS, DEFAULT_MAX_SPLITS, DEFAULT_MIN_DELAY_SECONDS, DEFAULT_MIN_SPLITS,
    MAX_DESTINATIONS, MAX_SPLITS,
};
use crate::error::{HydentitySdkError, Result};

/// Smallest on-chain unit (lamports).
pub type Amount = u64;

/// How a claim amount is carved into splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distribution {
    /// Fair share per split, perturbed by up to 20%
    #[default]
    Uniform,
    /// Uniform random cut of whatever remains
    Weighted,
    /// Each cut takes 40-60% of the remainder, so earlier splits are larger
    ExponentialDecay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrivacyMode {
    #[default]
    FullPrivacy,
    PartialPrivacy,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DestinationMode {
    #[default]
    SingleOwner,
    MultiDestination,
}

impl Distribution {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Uniform => 0,
            Self::Weighted => 1,
            Self::ExponentialDecay => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uniform),
            1 => Some(Self::Weighted),
            2 => Some(Self::ExponentialDecay),
            _ => None,
        }
    }
}

impl PrivacyMode {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::FullPrivacy => 0,
            Self::PartialPrivacy => 1,
            Self::Direct => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::FullPrivacy),
            1 => Some(Self::PartialPrivacy),
            2 => Some(Self::Direct),
            _ => None,
        }
    }
}

impl DestinationMode {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::SingleOwner => 0,
            Self::MultiDestination => 1,
        }
    }

    /// The program stores rotating (1) and random (2) selection; both map to
    /// multi-destination routing.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SingleOwner),
            1 | 2 => Some(Self::MultiDestination),
            _ => None,
        }
    }
}

/// Owner-configured parameters controlling how a claim is split and delayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyPolicy {
    pub enabled: bool,
    pub min_splits: u8,
    pub max_splits: u8,
    pub min_delay_seconds: u32,
    pub max_delay_seconds: u32,
    pub distribution: Distribution,
    pub privacy_mode: PrivacyMode,
    pub destination_mode: DestinationMode,
    pub destinations: Vec<Pubkey>,
    /// Incremented by the program on every policy update
    pub policy_nonce: u64,
}

impl Default for PrivacyPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_splits: DEFAULT_MIN_SPLITS,
            max_splits: DEFAULT_MAX_SPLITS,
            min_delay_seconds: DEFAULT_MIN_DELAY_SECONDS,
            max_delay_seconds: DEFAULT_MAX_DELAY_SECONDS,
            distribution: Distribution::default(),
            privacy_mode: PrivacyMode::default(),
            destination_mode: DestinationMode::default(),
            destinations: Vec::new(),
            policy_nonce: 0,
        }
    }
}

impl PrivacyPolicy {
    /// Default policy as created by `initialize_vault`: owner is the only destination.
    pub fn for_owner(owner: Pubkey) -> Self {
        Self {
            destinations: vec![owner],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_splits == 0 {
            return Err(HydentitySdkError::InvalidPolicy(
                "min_splits must be at least 1".to_string(),
            ));
        }
        if self.min_splits > self.max_splits {
            return Err(HydentitySdkError::InvalidPolicy(format!(
                "min_splits ({}) exceeds max_splits ({})",
                self.min_splits, self.max_splits
            )));
        }
        if self.max_splits > MAX_SPLITS {
            return Err(HydentitySdkError::InvalidPolicy(format!(
                "max_splits ({}) exceeds the cap of {}",
                self.max_splits, MAX_SPLITS
            )));
        }
        if self.min_delay_seconds > self.max_delay_seconds {
            return Err(HydentitySdkError::InvalidPolicy(format!(
                "min_delay_seconds ({}) exceeds max_delay_seconds ({})",
                self.min_delay_seconds, self.max_delay_seconds
            )));
        }
        if self.destinations.len() > MAX_DESTINATIONS {
            return Err(HydentitySdkError::InvalidPolicy(format!(
                "{} destinations configured, at most {} allowed",
                self.destinations.len(),
                MAX_DESTINATIONS
            )));
        }
        if self.destination_mode == DestinationMode::MultiDestination
            && self.destinations.is_empty()
        {
            return Err(HydentitySdkError::InvalidPolicy(
                "multi-destination mode requires at least one destination".to_string(),
            ));
        }
        Ok(())
    }
}

/// Concrete split amounts and inter-split delays for one claim.
///
/// `delays[i]` is the wait between split `i` and split `i + 1`; the first split
/// fires immediately. `recipients[i]` is where split `i` is routed when the claim
/// withdraws from the pool (empty when the policy has no destinations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub splits: Vec<Amount>,
    pub delays: Vec<Duration>,
    pub recipients: Vec<Pubkey>,
}

impl ExecutionPlan {
    pub fn split_count(&self) -> usize {
        self.splits.len()
    }

    pub fn total(&self) -> Amount {
        self.splits.iter().sum()
    }

    /// Minimum wait before split `index` is issued.
    pub fn delay_before(&self, index: usize) -> Duration {
        match index {
            0 => Duration::ZERO,
            i => self.delays.get(i - 1).copied().unwrap_or(Duration::ZERO),
        }
    }

    /// Amount still to move when resuming at `index`.
    pub fn remaining_from(&self, index: usize) -> Amount {
        self.splits.iter().skip(index).sum()
    }

    /// SHA-256 over a canonical encoding of the plan.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"hydentity:plan:v1");
        hasher.update((self.splits.len() as u32).to_le_bytes());
        for split in &self.splits {
            hasher.update(split.to_le_bytes());
        }
        for delay in &self.delays {
            hasher.update(delay.as_secs().to_le_bytes());
        }
        for recipient in &self.recipients {
            hasher.update(recipient.as_ref());
        }
        hasher.finalize().into()
    }
}

/// Result of pushing value into the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub signature: Signature,
    pub amount: Amount,
}

/// Result of pulling value out of the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub signature: Signature,
    pub amount_received: Amount,
    pub fee: Amount,
    pub recipient: Option<Pubkey>,
}

/// One completed split of a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub index: usize,
    /// Pool deposit signature
    pub signature: Signature,
    pub amount: Amount,
    /// Vault release submitted ahead of the deposit, if any
    pub release: Option<Signature>,
    pub withdrawal: Option<WithdrawReceipt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResult {
    pub split_count: u32,
    pub total_amount: Amount,
    pub transactions: Vec<TransactionReceipt>,
    pub execution_plan: ExecutionPlan,
}

impl ClaimResult {
    pub fn completed_amount(&self) -> Amount {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }
}

/// Steps of an interrupted split that already landed. Both are
/// irreversible, so a resumed claim continues after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitProgress {
    /// Vault release submitted, nothing deposited yet
    Released { release: Signature },
    /// Deposit landed, withdrawal still outstanding
    Deposited {
        release: Option<Signature>,
        deposit: DepositReceipt,
    },
}

impl SplitProgress {
    pub fn release(&self) -> Option<Signature> {
        match *self {
            Self::Released { release } => Some(release),
            Self::Deposited { release, .. } => release,
        }
    }

    pub fn deposit(&self) -> Option<&DepositReceipt> {
        match self {
            Self::Released { .. } => None,
            Self::Deposited { deposit, .. } => Some(deposit),
        }
    }
}

/// Where to pick up an interrupted claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    /// First split that has not completed
    pub next_index: usize,
    /// Digest of the plan the completed splits belong to
    pub plan_digest: [u8; 32],
    /// What split `next_index` already did before the claim stopped
    #[serde(default)]
    pub in_progress: Option<SplitProgress>,
}

impl ResumePoint {
    pub fn new(next_index: usize, plan_digest: [u8; 32]) -> Self {
        Self {
            next_index,
            plan_digest,
            in_progress: None,
        }
    }
}

/// Splits completed before a claim stopped, and why it stopped.
///
/// Completed deposits are irreversible; nothing here is rolled back. A split
/// that stopped halfway keeps its landed steps in `in_progress`.
#[derive(Debug)]
pub struct PartialClaim {
    pub result: ClaimResult,
    pub failed_index: usize,
    pub in_progress: Option<SplitProgress>,
    pub cause: HydentitySdkError,
}

impl PartialClaim {
    pub fn resume_point(&self) -> ResumePoint {
        ResumePoint {
            next_index: self.failed_index,
            plan_digest: self.result.execution_plan.digest(),
            in_progress: self.in_progress,
        }
    }
}

impl fmt::Display for PartialClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "claim stopped at split {} of {} ({} completed): {}",
            self.failed_index,
            self.result.split_count,
            self.result.transactions.len(),
            self.cause
        )?;
        if let Some(deposit) = self.in_progress.as_ref().and_then(SplitProgress::deposit) {
            write!(f, " (split {} already deposited as {})", self.failed_index, deposit.signature)?;
        }
        Ok(())
    }
}
