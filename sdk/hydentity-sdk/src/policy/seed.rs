use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::core::constants::CLAIM_SEED_MESSAGE_PREFIX;
use crate::core::signer::HydentitySigner;
use crate::error::{HydentitySdkError, Result};

/// Secret keying material for the plan stream of one vault at one policy nonce.
///
/// Derived from a signature by the claimant's key, so the same key, vault and
/// nonce always yield the same material (Ed25519 signatures are deterministic).
#[derive(Clone, PartialEq, Eq)]
pub struct SeedMaterial([u8; 32]);

impl SeedMaterial {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Message the claimant signs to produce seed material.
    pub fn derivation_message(vault: &Pubkey, policy_nonce: u64) -> Vec<u8> {
        format!("{}:{}:{}", CLAIM_SEED_MESSAGE_PREFIX, vault, policy_nonce).into_bytes()
    }

    pub async fn derive(
        signer: &(impl HydentitySigner + ?Sized),
        vault: &Pubkey,
        policy_nonce: u64,
    ) -> Result<Self> {
        let message = Self::derivation_message(vault, policy_nonce);
        let signature = signer
            .sign_message(&message)
            .await
            .map_err(HydentitySdkError::Signing)?;
        Ok(Self(Sha256::digest(signature.as_ref()).into()))
    }
}

impl fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedMaterial(..)")
    }
}
