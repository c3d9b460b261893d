use serde::{Deserialize, Serialize};

use crate::error::{HydentitySdkError, Result};
use crate::types::Amount;

pub const PPM_SCALE: u64 = 1_000_000;

/// Relayer fee schedule: `fee = floor(amount * rate) + flat_fee`.
///
/// The rate is held in parts per million so fee math never touches floats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub fee_rate_ppm: u32,
    pub flat_fee: Amount,
}

/// Fee split of one withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub fee: Amount,
    pub amount_received: Amount,
}

impl FeeSchedule {
    pub fn new(fee_rate_ppm: u32, flat_fee: Amount) -> Self {
        Self {
            fee_rate_ppm,
            flat_fee,
        }
    }

    /// Convert a fractional rate (e.g. `0.0035`) as published by the relayer.
    pub fn from_rate(fee_rate: f64, flat_fee: Amount) -> Result<Self> {
        if !fee_rate.is_finite() || !(0.0..1.0).contains(&fee_rate) {
            return Err(HydentitySdkError::Mixer(format!(
                "fee rate {} outside [0, 1)",
                fee_rate
            )));
        }
        Ok(Self {
            fee_rate_ppm: (fee_rate * PPM_SCALE as f64).round() as u32,
            flat_fee,
        })
    }

    pub fn fee_for(&self, amount: Amount) -> Amount {
        let proportional = (amount as u128 * self.fee_rate_ppm as u128) / PPM_SCALE as u128;
        (proportional as Amount).saturating_add(self.flat_fee)
    }

    pub fn breakdown(&self, amount: Amount) -> Result<FeeBreakdown> {
        let fee = self.fee_for(amount);
        let amount_received = amount.checked_sub(fee).ok_or_else(|| {
            HydentitySdkError::InvalidAmount(format!(
                "withdrawal of {} does not cover the relayer fee of {}",
                amount, fee
            ))
        })?;
        Ok(FeeBreakdown {
            fee,
            amount_received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relayer_fee_example() {
        let schedule = FeeSchedule::from_rate(0.0035, 6_000_000).unwrap();
        assert_eq!(schedule.fee_rate_ppm, 3_500);

        let breakdown = schedule.breakdown(1_000_000_000).unwrap();
        assert_eq!(breakdown.fee, 9_500_000);
        assert_eq!(breakdown.amount_received, 990_500_000);
    }

    #[test]
    fn proportional_part_floors() {
        let schedule = FeeSchedule::new(3_500, 0);
        // 999 * 0.0035 = 3.4965
        assert_eq!(schedule.fee_for(999), 3);
        let expected = u64::MAX / 1_000_000 * 3_500 + 3_500 * (u64::MAX % 1_000_000) / 1_000_000;
        assert_eq!(schedule.fee_for(u64::MAX), expected);
    }

    #[test]
    fn fee_above_amount_is_rejected() {
        let schedule = FeeSchedule::new(0, 6_000_000);
        assert!(matches!(
            schedule.breakdown(5_000_000),
            Err(HydentitySdkError::InvalidAmount(_))
        ));
        assert!(FeeSchedule::from_rate(1.5, 0).is_err());
        assert!(FeeSchedule::from_rate(f64::NAN, 0).is_err());
    }
}
