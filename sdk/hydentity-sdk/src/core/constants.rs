use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

// Hydentity vault program (devnet/mainnet)
pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("46mwRQo4f6sLy9cigZdVJgdEpeEVc6jLRG1H241Uk9GY");

pub const SNS_NAME_PROGRAM_ID: Pubkey = pubkey!("namesLPneVptA9Z5rqUDD9tMTWEJwofgaYwp8cawRkX");
pub const SOL_TLD_AUTHORITY: Pubkey = pubkey!("58PwtjSDuFHuUkYjH9BYnnQKHfwo9reZhC2zMJv9JPkx");
pub const SPL_TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

pub const SNS_HASH_PREFIX: &str = "SPL Name Service";

pub const VAULT_SEED: &[u8] = b"vault";
pub const VAULT_AUTH_SEED: &[u8] = b"vault_auth";
pub const POLICY_SEED: &[u8] = b"policy";
pub const DELEGATE_SEED: &[u8] = b"delegate";

/// Account sizes (discriminator included)
pub const VAULT_AUTHORITY_LEN: usize = 8 + 32 + 32 + 1 + 32;

pub const MAX_DESTINATIONS: usize = 10;

/// Upper bound on splits per claim
pub const MAX_SPLITS: u8 = 10;

// "Medium" preset applied when a vault is initialized
pub const DEFAULT_MIN_SPLITS: u8 = 2;
pub const DEFAULT_MAX_SPLITS: u8 = 5;
pub const DEFAULT_MIN_DELAY_SECONDS: u32 = 300;
pub const DEFAULT_MAX_DELAY_SECONDS: u32 = 1800;

pub const PERMISSION_UPDATE_POLICY: u8 = 1 << 0;
pub const PERMISSION_DEPOSIT_UMBRA: u8 = 1 << 1;
pub const PERMISSION_ALL: u8 = PERMISSION_UPDATE_POLICY | PERMISSION_DEPOSIT_UMBRA;

pub const DUST_THRESHOLD_LAMPORTS: u64 = 10_000;

/// Domain separators for key-derived material
pub const CLAIM_SEED_MESSAGE_PREFIX: &str = "hydentity:claim-seed:v1";
pub const POOL_IDENTITY_MESSAGE: &[u8] = b"hydentity:pool-identity:v1";
pub const PLAN_STREAM_LABEL: &[u8] = b"hydentity:plan-stream:v1";
