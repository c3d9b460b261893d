use std::time::Duration;
use tracing::{debug, warn};

use crate::core::constants::DUST_THRESHOLD_LAMPORTS;
use crate::error::{HydentitySdkError, Result};
use crate::policy::seed::SeedMaterial;
use crate::policy::stream::{scale_by_fraction, PlanStream};
use crate::types::{Amount, DestinationMode, Distribution, ExecutionPlan, PrivacyPolicy};

/// Share of the remainder taken by each exponential-decay cut, in ppm.
const DECAY_MIN_PPM: u64 = 400_000;
const DECAY_MAX_PPM: u64 = 600_000;

/// Turn a claim amount into split amounts, inter-split delays and recipients.
///
/// Deterministic in `(amount, policy, seed)`: the stream is keyed on the seed,
/// the policy nonce and the amount, and draws happen in a fixed order
/// (split count, cuts, delays, recipient shuffle). A disabled policy yields a
/// single split with no delays.
pub fn generate_execution_plan(
    amount: Amount,
    policy: &PrivacyPolicy,
    seed: &SeedMaterial,
) -> Result<ExecutionPlan> {
    if amount == 0 {
        return Err(HydentitySdkError::InvalidAmount(
            "claim amount must be greater than zero".to_string(),
        ));
    }
    policy.validate()?;

    let mut stream = PlanStream::new(seed, policy.policy_nonce, amount)?;

    let (min_splits, max_splits) = if policy.enabled {
        (policy.min_splits as u64, policy.max_splits as u64)
    } else {
        (1, 1)
    };
    let drawn = stream.uniform_inclusive(min_splits, max_splits);
    // Every split carries at least one unit.
    let count = drawn.min(amount).max(1) as usize;

    let splits = cut_splits(amount, count, policy.distribution, &mut stream);

    let delays = (1..count)
        .map(|_| {
            let secs = stream.uniform_inclusive(
                policy.min_delay_seconds as u64,
                policy.max_delay_seconds as u64,
            );
            Duration::from_secs(secs)
        })
        .collect::<Vec<_>>();

    let recipients = assign_recipients(policy, count, &mut stream);

    if splits.iter().any(|s| *s < DUST_THRESHOLD_LAMPORTS) {
        warn!(
            splits = count,
            dust_threshold = DUST_THRESHOLD_LAMPORTS,
            "execution plan contains splits below the dust threshold"
        );
    }
    debug!(
        splits = count,
        policy_nonce = policy.policy_nonce,
        distribution = ?policy.distribution,
        "generated execution plan"
    );

    Ok(ExecutionPlan {
        splits,
        delays,
        recipients,
    })
}

fn cut_splits(
    amount: Amount,
    count: usize,
    distribution: Distribution,
    stream: &mut PlanStream,
) -> Vec<Amount> {
    let mut splits = Vec::with_capacity(count);
    let mut remaining = amount;

    for i in 0..count.saturating_sub(1) {
        let splits_left = (count - i) as u64;
        let raw = match distribution {
            Distribution::Uniform => {
                let base = remaining / splits_left;
                let spread = base / 5;
                base - spread + stream.uniform_inclusive(0, spread * 2)
            },
            Distribution::Weighted => scale_by_fraction(remaining, stream.fraction()),
            Distribution::ExponentialDecay => {
                let ppm = stream.uniform_inclusive(DECAY_MIN_PPM, DECAY_MAX_PPM);
                ((remaining as u128 * ppm as u128) / 1_000_000) as Amount
            },
        };
        // Leave at least one unit for each later split.
        let ceiling = remaining - (splits_left - 1);
        let cut = raw.clamp(1, ceiling);
        splits.push(cut);
        remaining -= cut;
    }
    splits.push(remaining);
    splits
}

fn assign_recipients(
    policy: &PrivacyPolicy,
    count: usize,
    stream: &mut PlanStream,
) -> Vec<solana_sdk::pubkey::Pubkey> {
    if policy.destinations.is_empty() {
        return Vec::new();
    }
    match policy.destination_mode {
        DestinationMode::SingleOwner => vec![policy.destinations[0]; count],
        DestinationMode::MultiDestination => {
            let mut order = policy.destinations.clone();
            for i in (1..order.len()).rev() {
                let j = stream.uniform_inclusive(0, i as u64) as usize;
                order.swap(i, j);
            }
            order.iter().cycle().take(count).copied().collect()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_respect_floor_of_one() {
        let seed = SeedMaterial::from_bytes([4; 32]);
        let mut stream = PlanStream::new(&seed, 0, 5).unwrap();
        let splits = cut_splits(5, 5, Distribution::Weighted, &mut stream);
        assert_eq!(splits, vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn uniform_cuts_stay_near_fair_share() {
        let seed = SeedMaterial::from_bytes([8; 32]);
        let mut stream = PlanStream::new(&seed, 0, 1_000_000).unwrap();
        let splits = cut_splits(1_000_000, 4, Distribution::Uniform, &mut stream);
        // First cut: fair share 250_000 +/- 50_000
        assert!((200_000..=300_000).contains(&splits[0]));
        assert_eq!(splits.iter().sum::<u64>(), 1_000_000);
    }

    #[test]
    fn decay_front_loads() {
        let seed = SeedMaterial::from_bytes([2; 32]);
        let mut stream = PlanStream::new(&seed, 0, 1_000_000).unwrap();
        let splits = cut_splits(1_000_000, 3, Distribution::ExponentialDecay, &mut stream);
        assert!((400_000..=600_000).contains(&splits[0]));
        assert_eq!(splits.iter().sum::<u64>(), 1_000_000);
    }
}
