use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::core::constants::POOL_IDENTITY_MESSAGE;
use crate::core::signer::HydentitySigner;
use crate::error::{HydentitySdkError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Pool-side identity of a claimant, derived from their signing key.
///
/// Stable for a given key, so it doubles as the bridge cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolIdentity([u8; 32]);

impl PoolIdentity {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub async fn derive(signer: &(impl HydentitySigner + ?Sized)) -> Result<Self> {
        let signature = signer
            .sign_message(POOL_IDENTITY_MESSAGE)
            .await
            .map_err(HydentitySdkError::Signing)?;
        let mut mac = HmacSha256::new_from_slice(signature.as_ref())
            .map_err(|e| HydentitySdkError::Signing(e.to_string()))?;
        mac.update(POOL_IDENTITY_MESSAGE);
        Ok(Self(mac.finalize().into_bytes().into()))
    }

    /// Full hex form, sent to the relayer
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex chars, for logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for PoolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolIdentity({}..)", self.short())
    }
}

impl fmt::Display for PoolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}
