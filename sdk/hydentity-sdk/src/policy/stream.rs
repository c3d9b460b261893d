use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use crate::core::constants::PLAN_STREAM_LABEL;
use crate::error::{HydentitySdkError, Result};
use crate::policy::seed::SeedMaterial;
use crate::types::Amount;

type HmacSha256 = Hmac<Sha256>;

/// Fixed-point scale for fractional cuts: a cut of `k` means `k / 2^32`.
pub const FRACTION_BITS: u32 = 32;

/// Deterministic pseudo-random stream for plan generation.
///
/// The ChaCha20 key is `HMAC-SHA256(seed, label || nonce || amount)`. Only raw
/// `next_u64` output is consumed, so plans stay stable across `rand` releases.
pub struct PlanStream {
    rng: ChaCha20Rng,
}

impl PlanStream {
    pub fn new(seed: &SeedMaterial, policy_nonce: u64, amount: Amount) -> Result<Self> {
        let mut mac = HmacSha256::new_from_slice(seed.as_bytes())
            .map_err(|e| HydentitySdkError::Signing(format!("unusable seed material: {}", e)))?;
        mac.update(PLAN_STREAM_LABEL);
        mac.update(&policy_nonce.to_le_bytes());
        mac.update(&amount.to_le_bytes());
        let key: [u8; 32] = mac.finalize().into_bytes().into();

        Ok(Self {
            rng: ChaCha20Rng::from_seed(key),
        })
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform draw from `[low, high]` by rejection sampling (no modulo bias).
    pub fn uniform_inclusive(&mut self, low: u64, high: u64) -> u64 {
        debug_assert!(low <= high);
        let span = match (high - low).checked_add(1) {
            Some(span) => span,
            None => return self.next_u64(),
        };
        let zone = u64::MAX - (u64::MAX % span);
        loop {
            let value = self.next_u64();
            if value < zone {
                return low + value % span;
            }
        }
    }

    /// Fraction in the open interval (0, 1), as a numerator over `2^FRACTION_BITS`.
    pub fn fraction(&mut self) -> u64 {
        self.uniform_inclusive(1, (1u64 << FRACTION_BITS) - 1)
    }
}

/// `floor(value * numerator / 2^FRACTION_BITS)` without overflow.
pub fn scale_by_fraction(value: Amount, numerator: u64) -> Amount {
    ((value as u128 * numerator as u128) >> FRACTION_BITS) as Amount
}
