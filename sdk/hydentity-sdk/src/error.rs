use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::types::PartialClaim;

/// SDK-specific error types for Hydentity operations
#[derive(Debug, Error)]
pub enum HydentitySdkError {
    /// Policy ranges or destinations are malformed. Raised before planning.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Claim amount exceeds what the vault can release
    #[error("Insufficient vault balance: requested {requested}, available {available}")]
    InsufficientVaultBalance { requested: u64, available: u64 },

    /// Pool balance under the caller's identity is below the withdrawal amount
    #[error("Insufficient pool balance: requested {requested}, available {available}")]
    InsufficientPoolBalance { requested: u64, available: u64 },

    /// Deposit source holds less than the deposit amount
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    /// Missing signer or forwarder for the requested transaction mode
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    /// Domain does not resolve to a name account
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// Domain is not owned by the claimant
    #[error("Ownership mismatch: {domain} is not owned by {owner}")]
    OwnershipMismatch { domain: String, owner: Pubkey },

    /// Transient RPC or relayer failure. Safe to retry the same step.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Execution stopped part-way; carries the completed splits for resumption
    #[error("{0}")]
    PartialClaimFailure(Box<PartialClaim>),

    /// Amount is zero or otherwise unusable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Caller cancelled the claim
    #[error("Claim cancelled")]
    Cancelled,

    /// Recomputed plan does not match the plan being resumed
    #[error("Execution plan mismatch: the policy or seed changed since the interrupted claim")]
    PlanMismatch,

    /// Account not found on-chain
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Invalid account data or deserialization error
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    /// Delegate parameters rejected before building the instruction
    #[error("Invalid delegate: {0}")]
    InvalidDelegate(String),

    /// Signer refused or failed to sign
    #[error("Signing error: {0}")]
    Signing(String),

    /// Relayer rejected the request
    #[error("Mixer error: {0}")]
    Mixer(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Borsh serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] std::io::Error),
}

impl HydentitySdkError {
    /// Whether the failed step may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }

    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        Self::NetworkFailure(err.to_string())
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, HydentitySdkError>;
