//! Weighted consensus over the responses of a validation request.
//!
//! Evaluated synchronously after every accepted response while the request is
//! pending. A decision is terminal: the caller settles and finalizes in the
//! same instruction.

use crate::errors::RegistryError;
use crate::events::outcome;
use crate::instructions::constants::{CONSENSUS_PRECISION, PERCENT_BASE};
use crate::state::{ValidationResponse, ValidationStatus};
use anchor_lang::prelude::*;

/// Weight on each side of a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub success_weight: u64,
    pub fail_weight: u64,
    pub responses: usize,
}

impl Tally {
    pub fn total_weight(&self) -> Result<u64> {
        self.success_weight
            .checked_add(self.fail_weight)
            .ok_or(error!(RegistryError::ArithmeticOverflow))
    }
}

/// Result of one consensus evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsensusOutcome {
    /// Not enough responses (or no weight) yet
    Deferred,
    Validated,
    Failed,
    Disputed,
}

impl ConsensusOutcome {
    /// Terminal status this outcome moves the request to, if any.
    pub fn status(&self) -> Option<ValidationStatus> {
        match self {
            ConsensusOutcome::Deferred => None,
            ConsensusOutcome::Validated => Some(ValidationStatus::Validated),
            ConsensusOutcome::Failed => Some(ValidationStatus::Failed),
            ConsensusOutcome::Disputed => Some(ValidationStatus::Disputed),
        }
    }
}

/// Outcome code reported in events for a terminal status.
pub fn outcome_code(status: ValidationStatus) -> u8 {
    match status {
        ValidationStatus::Validated => outcome::VALIDATED,
        ValidationStatus::Failed => outcome::FAILED,
        ValidationStatus::Disputed => outcome::DISPUTED,
        ValidationStatus::Expired => outcome::EXPIRED,
        ValidationStatus::Pending => 0,
    }
}

/// Sum response weights by side.
pub fn tally(responses: &[ValidationResponse]) -> Result<Tally> {
    let mut result = Tally {
        responses: responses.len(),
        ..Default::default()
    };
    for response in responses {
        let side = if response.success {
            &mut result.success_weight
        } else {
            &mut result.fail_weight
        };
        *side = side
            .checked_add(response.weight)
            .ok_or(RegistryError::ArithmeticOverflow)?;
    }
    Ok(result)
}

/// Success share of the total weight, in percent scaled by `CONSENSUS_PRECISION`.
///
/// Returns `None` when there is no weight at all.
pub fn success_rate_scaled(success_weight: u64, total_weight: u64) -> Option<u128> {
    if total_weight == 0 {
        return None;
    }
    // u64 * 100 * 1e6 stays far below u128::MAX
    Some(
        (success_weight as u128) * (PERCENT_BASE as u128) * CONSENSUS_PRECISION
            / (total_weight as u128),
    )
}

/// Decide the request outcome from a tally.
///
/// Thresholds are inclusive on both sides: a success rate equal to
/// `consensus_threshold` validates, a rate equal to `100 - consensus_threshold`
/// fails.
pub fn decide(tally: &Tally, min_validators: u8, consensus_threshold: u8) -> Result<ConsensusOutcome> {
    if tally.responses < min_validators as usize {
        return Ok(ConsensusOutcome::Deferred);
    }
    let total = tally.total_weight()?;
    let Some(rate) = success_rate_scaled(tally.success_weight, total) else {
        return Ok(ConsensusOutcome::Deferred);
    };

    let threshold = consensus_threshold as u128;
    let success_bar = threshold * CONSENSUS_PRECISION;
    let fail_bar = (PERCENT_BASE as u128).saturating_sub(threshold) * CONSENSUS_PRECISION;

    Ok(if rate >= success_bar {
        ConsensusOutcome::Validated
    } else if rate <= fail_bar {
        ConsensusOutcome::Failed
    } else {
        ConsensusOutcome::Disputed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(success: bool, weight: u64) -> ValidationResponse {
        ValidationResponse {
            success,
            weight,
            ..Default::default()
        }
    }

    fn responses(success: &[u64], fail: &[u64]) -> Vec<ValidationResponse> {
        success
            .iter()
            .map(|w| response(true, *w))
            .chain(fail.iter().map(|w| response(false, *w)))
            .collect()
    }

    #[test]
    fn test_tally_splits_by_side() {
        let t = tally(&responses(&[10, 20], &[5])).unwrap();
        assert_eq!(t.success_weight, 30);
        assert_eq!(t.fail_weight, 5);
        assert_eq!(t.responses, 3);
        assert_eq!(t.total_weight().unwrap(), 35);
    }

    #[test]
    fn test_tally_overflow() {
        assert!(tally(&responses(&[u64::MAX, 1], &[])).is_err());
        let t = tally(&responses(&[u64::MAX], &[1])).unwrap();
        assert!(t.total_weight().is_err());
    }

    #[test]
    fn test_rate_scaling() {
        assert_eq!(success_rate_scaled(0, 0), None);
        assert_eq!(success_rate_scaled(1, 1), Some(100_000_000));
        assert_eq!(success_rate_scaled(2, 3), Some(66_666_666));
        assert_eq!(success_rate_scaled(u64::MAX, u64::MAX), Some(100_000_000));
    }

    #[test]
    fn test_defers_below_minimum_validators() {
        let t = tally(&responses(&[100, 100], &[])).unwrap();
        assert_eq!(decide(&t, 3, 66).unwrap(), ConsensusOutcome::Deferred);
    }

    #[test]
    fn test_defers_without_weight() {
        let t = tally(&responses(&[0, 0, 0], &[])).unwrap();
        assert_eq!(decide(&t, 3, 66).unwrap(), ConsensusOutcome::Deferred);
    }

    #[test]
    fn test_success_threshold_is_inclusive() {
        let t = tally(&responses(&[66], &[34])).unwrap();
        assert_eq!(decide(&t, 1, 66).unwrap(), ConsensusOutcome::Validated);
        let t = tally(&responses(&[65], &[35])).unwrap();
        assert_eq!(decide(&t, 1, 66).unwrap(), ConsensusOutcome::Disputed);
    }

    #[test]
    fn test_failure_threshold_is_inclusive() {
        let t = tally(&responses(&[34], &[66])).unwrap();
        assert_eq!(decide(&t, 1, 66).unwrap(), ConsensusOutcome::Failed);
        let t = tally(&responses(&[35], &[65])).unwrap();
        assert_eq!(decide(&t, 1, 66).unwrap(), ConsensusOutcome::Disputed);
    }

    #[test]
    fn test_two_thirds_by_count() {
        // 2/3 = 66.6666% >= 66%
        let t = tally(&responses(&[1, 1], &[1])).unwrap();
        assert_eq!(decide(&t, 3, 66).unwrap(), ConsensusOutcome::Validated);
        // 2/3 < 67%
        assert_eq!(decide(&t, 3, 67).unwrap(), ConsensusOutcome::Disputed);
    }

    #[test]
    fn test_even_split_is_disputed() {
        let t = tally(&responses(&[100, 100], &[100, 100])).unwrap();
        assert_eq!(decide(&t, 4, 66).unwrap(), ConsensusOutcome::Disputed);
        assert_eq!(decide(&t, 4, 51).unwrap(), ConsensusOutcome::Disputed);
    }

    #[test]
    fn test_unanimous_threshold() {
        let t = tally(&responses(&[1, 1, 1], &[])).unwrap();
        assert_eq!(decide(&t, 3, 100).unwrap(), ConsensusOutcome::Validated);
        let t = tally(&responses(&[], &[1, 1, 1])).unwrap();
        assert_eq!(decide(&t, 3, 100).unwrap(), ConsensusOutcome::Failed);
        let t = tally(&responses(&[1, 1], &[1])).unwrap();
        assert_eq!(decide(&t, 3, 100).unwrap(), ConsensusOutcome::Disputed);
    }

    #[test]
    fn test_weight_beats_headcount() {
        // One heavy honest validator outweighs three light ones
        let t = tally(&responses(&[900], &[100, 100, 100])).unwrap();
        assert_eq!(decide(&t, 4, 66).unwrap(), ConsensusOutcome::Validated);
    }

    #[test]
    fn test_seven_to_three_validates_at_seventy_percent() {
        let stake = 100_000_000;
        let t = tally(&responses(&[stake; 7], &[stake; 3])).unwrap();
        assert_eq!(success_rate_scaled(t.success_weight, t.total_weight().unwrap()), Some(70_000_000));
        assert_eq!(decide(&t, 5, 66).unwrap(), ConsensusOutcome::Validated);
    }

    #[test]
    fn test_outcome_status_mapping() {
        assert_eq!(ConsensusOutcome::Deferred.status(), None);
        assert_eq!(ConsensusOutcome::Validated.status(), Some(ValidationStatus::Validated));
        assert_eq!(ConsensusOutcome::Failed.status(), Some(ValidationStatus::Failed));
        assert_eq!(ConsensusOutcome::Disputed.status(), Some(ValidationStatus::Disputed));
        assert_eq!(outcome_code(ValidationStatus::Expired), outcome::EXPIRED);
        assert_eq!(outcome_code(ValidationStatus::Validated), outcome::VALIDATED);
    }
}
