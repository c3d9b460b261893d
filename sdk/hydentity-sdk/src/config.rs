use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::core::constants::DEFAULT_PROGRAM_ID;
use crate::error::{HydentitySdkError, Result};
use crate::mixer::fees::FeeSchedule;

pub const ENV_PREFIX: &str = "HYDENTITY";

/// SDK configuration.
///
/// Environment keys use the `HYDENTITY_` prefix and `__` for nesting,
/// e.g. `HYDENTITY_RPC_URL`, `HYDENTITY_MIXER__BASE_URL`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydentityConfig {
    pub rpc_url: String,
    /// Base58 program id of the vault program
    pub program_id: String,
    /// `processed`, `confirmed` or `finalized`
    pub commitment: String,
    pub mixer: MixerConfig,
}

impl Default for HydentityConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            commitment: "confirmed".to_string(),
            mixer: MixerConfig::default(),
        }
    }
}

/// Relayer endpoint and fee settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Attempts for idempotent requests
    pub max_retries: u32,
    /// Fetched from the relayer when unset
    pub fees: Option<FeeSchedule>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            fees: None,
        }
    }
}

impl MixerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HydentityConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML (or any `config`-supported) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.program_id()?;
        self.commitment_config()?;
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id).map_err(|e| {
            HydentitySdkError::Config(config::ConfigError::Message(format!(
                "invalid program_id {}: {}",
                self.program_id, e
            )))
        })
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        let commitment = CommitmentLevel::from_str(&self.commitment).map_err(|e| {
            HydentitySdkError::Config(config::ConfigError::Message(format!(
                "invalid commitment {}: {}",
                self.commitment, e
            )))
        })?;
        Ok(CommitmentConfig { commitment })
    }

    /// Nonblocking RPC client for `rpc_url` at the configured commitment.
    pub fn rpc_client(&self) -> Result<RpcClient> {
        Ok(RpcClient::new_with_commitment(
            self.rpc_url.clone(),
            self.commitment_config()?,
        ))
    }
}
