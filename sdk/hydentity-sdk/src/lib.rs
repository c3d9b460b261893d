pub mod advanced;
pub mod basic;
pub mod claim;
pub mod config;
pub mod core;
pub mod error;
pub mod mixer;
pub mod policy;
pub mod resolver;
pub mod types;
pub mod utils;

pub use crate::basic::pipeline::{
    TransactionMode, TransactionOptions, TransactionOutcome, TransactionPipeline,
};
pub use crate::basic::vault::NameVault;
pub use crate::claim::{ClaimOptions, ClaimOrchestrator};
pub use crate::config::{HydentityConfig, MixerConfig};
pub use crate::core::connection::SolConnection;
pub use crate::core::forwarder::{ConnectionForwarder, TransactionForwarder};
pub use crate::core::signer::HydentitySigner;
pub use crate::error::{HydentitySdkError, Result};
pub use crate::mixer::{FeeSchedule, MixerBridge, MixerBridgeCache, PoolIdentity};
pub use crate::policy::{generate_execution_plan, SeedMaterial};
pub use crate::resolver::{NameResolver, SnsResolver};
pub use crate::types::{
    Amount, ClaimResult, DestinationMode, Distribution, ExecutionPlan, PartialClaim,
    PrivacyMode, PrivacyPolicy, ResumePoint, SplitProgress, TransactionReceipt,
};
pub use crate::utils::{
    derive_delegate_pda, derive_policy_pda, derive_vault_authority_pda, derive_vault_pda,
    fetch_name_vault, fetch_policy, fetch_vault_balance,
};
