//! Reputation-weighted validator collateral.

use crate::errors::RegistryError;
use crate::instructions::constants::{
    HIGH_REPUTATION_RATE, HIGH_REPUTATION_STAKE_PCT, LOW_REPUTATION_RATE,
    LOW_REPUTATION_STAKE_PCT, PERCENT_BASE,
};
use crate::state::ValidatorStats;
use anchor_lang::prelude::*;

/// Minimum collateral a validator must lock on its next stake submission.
///
/// | history                    | required        |
/// |----------------------------|-----------------|
/// | no completed validations   | `base`          |
/// | success rate >= 90%        | 50% of `base`   |
/// | success rate < 70%         | 200% of `base`  |
/// | otherwise                  | `base`          |
///
/// Recomputed on every submission from the current stats. Never below one
/// lamport, so every stake response puts collateral at risk.
pub fn required_validator_stake(base: u64, stats: &ValidatorStats) -> Result<u64> {
    let multiplier_pct = match stats.success_rate_pct() {
        None => PERCENT_BASE,
        Some(rate) if rate >= HIGH_REPUTATION_RATE => HIGH_REPUTATION_STAKE_PCT,
        Some(rate) if rate < LOW_REPUTATION_RATE => LOW_REPUTATION_STAKE_PCT,
        Some(_) => PERCENT_BASE,
    };

    let required = (base as u128)
        .checked_mul(multiplier_pct as u128)
        .ok_or(RegistryError::ArithmeticOverflow)?
        / (PERCENT_BASE as u128);
    let required =
        u64::try_from(required).map_err(|_| error!(RegistryError::ArithmeticOverflow))?;
    Ok(required.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u64 = 100_000_000;

    fn stats(successful: u64, failed: u64) -> ValidatorStats {
        ValidatorStats {
            total_validations: successful + failed,
            successful_validations: successful,
            failed_validations: failed,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_validator_pays_base() {
        assert_eq!(required_validator_stake(BASE, &stats(0, 0)).unwrap(), BASE);
    }

    #[test]
    fn test_pending_only_history_pays_base() {
        // Submitted but nothing settled yet
        let s = ValidatorStats {
            total_validations: 12,
            ..Default::default()
        };
        assert_eq!(required_validator_stake(BASE, &s).unwrap(), BASE);
    }

    #[test]
    fn test_high_reputation_discount() {
        assert_eq!(required_validator_stake(BASE, &stats(9, 1)).unwrap(), BASE / 2);
        assert_eq!(required_validator_stake(BASE, &stats(100, 0)).unwrap(), BASE / 2);
    }

    #[test]
    fn test_mid_reputation_pays_base() {
        assert_eq!(required_validator_stake(BASE, &stats(7, 3)).unwrap(), BASE);
        assert_eq!(required_validator_stake(BASE, &stats(89, 11)).unwrap(), BASE);
    }

    #[test]
    fn test_low_reputation_doubles() {
        // 60% history requires 2x base; flat base is not enough
        let required = required_validator_stake(BASE, &stats(6, 4)).unwrap();
        assert_eq!(required, 2 * BASE);
        assert!(BASE < required);

        assert_eq!(required_validator_stake(BASE, &stats(0, 5)).unwrap(), 2 * BASE);
        assert_eq!(required_validator_stake(BASE, &stats(69, 31)).unwrap(), 2 * BASE);
    }

    #[test]
    fn test_discount_never_rounds_to_zero() {
        assert_eq!(required_validator_stake(1, &stats(10, 0)).unwrap(), 1);
        assert_eq!(required_validator_stake(3, &stats(10, 0)).unwrap(), 1);
        assert_eq!(required_validator_stake(1, &stats(0, 0)).unwrap(), 1);
        assert_eq!(required_validator_stake(1, &stats(0, 3)).unwrap(), 2);
    }

    #[test]
    fn test_doubling_overflow() {
        assert!(required_validator_stake(u64::MAX, &stats(0, 1)).is_err());
        assert_eq!(
            required_validator_stake(u64::MAX, &stats(1, 0)).unwrap(),
            u64::MAX / 2
        );
    }
}
