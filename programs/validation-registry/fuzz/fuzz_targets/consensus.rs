//! Fuzz target for weighted consensus
//!
//! Tests invariants:
//! - Requests with fewer responses than the minimum are never decided
//! - Decisions follow the inclusive threshold bars
//! - The decision does not depend on submission order
//!
//! Run with: cargo test --release -p validation-registry-fuzz consensus

use crate::*;
use proptest::prelude::*;
use validation_registry::instructions::consensus_helpers::{decide, tally, ConsensusOutcome};

/// Reference decision computed directly from the weights.
fn expected_outcome(input: &ConsensusInput) -> ConsensusOutcome {
    if input.responses.len() < input.min_validators as usize {
        return ConsensusOutcome::Deferred;
    }
    let success: u128 = input
        .responses
        .iter()
        .filter(|r| r.success)
        .map(|r| r.weight as u128)
        .sum();
    let total: u128 = input.responses.iter().map(|r| r.weight as u128).sum();
    if total == 0 {
        return ConsensusOutcome::Deferred;
    }
    let rate = success * 100_000_000 / total;
    let threshold = input.threshold as u128;
    if rate >= threshold * 1_000_000 {
        ConsensusOutcome::Validated
    } else if rate <= (100 - threshold) * 1_000_000 {
        ConsensusOutcome::Failed
    } else {
        ConsensusOutcome::Disputed
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// The decision matches the reference computation for any response set
    #[test]
    fn fuzz_consensus_decision(input in any::<ConsensusInput>()) {
        let responses = build_responses(&input.responses);
        let current = tally(&responses).unwrap();
        let decision = decide(&current, input.min_validators, input.threshold).unwrap();

        prop_assert_eq!(decision, expected_outcome(&input),
            "Decision mismatch for {:?}", input);
        prop_assert_eq!(current.responses, responses.len());
    }

    /// Reversing submission order never changes the decision
    #[test]
    fn fuzz_consensus_order_independent(input in any::<ConsensusInput>()) {
        let forward = build_responses(&input.responses);
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = decide(&tally(&forward).unwrap(), input.min_validators, input.threshold).unwrap();
        let b = decide(&tally(&reversed).unwrap(), input.min_validators, input.threshold).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Unanimous responses with weight always decide for their side
    #[test]
    fn fuzz_consensus_unanimous(
        count in 1usize..=16,
        weight in 1u64..1_000_000_000u64,
        success in any::<bool>(),
        threshold in arb_consensus_threshold(),
    ) {
        let specs: Vec<ResponseSpec> = (0..count)
            .map(|_| ResponseSpec { success, collateral: weight, weight })
            .collect();
        let responses = build_responses(&specs);
        let decision = decide(&tally(&responses).unwrap(), count as u8, threshold).unwrap();

        let expected = if success { ConsensusOutcome::Validated } else { ConsensusOutcome::Failed };
        prop_assert_eq!(decision, expected);
    }

    /// A decided outcome always maps to a terminal status
    #[test]
    fn fuzz_consensus_decision_is_terminal(input in any::<ConsensusInput>()) {
        let responses = build_responses(&input.responses);
        let decision = decide(&tally(&responses).unwrap(), input.min_validators, input.threshold).unwrap();
        match decision.status() {
            None => prop_assert_eq!(decision, ConsensusOutcome::Deferred),
            Some(status) => prop_assert!(status.is_terminal()),
        }
    }
}

#[test]
fn test_threshold_is_inclusive_on_both_sides() {
    let specs = |success_weight: u64, fail_weight: u64| {
        vec![
            ResponseSpec { success: true, collateral: success_weight, weight: success_weight },
            ResponseSpec { success: false, collateral: fail_weight, weight: fail_weight },
        ]
    };

    // exactly 66%
    let responses = build_responses(&specs(66, 34));
    assert_eq!(decide(&tally(&responses).unwrap(), 2, 66).unwrap(), ConsensusOutcome::Validated);

    // exactly 34%
    let responses = build_responses(&specs(34, 66));
    assert_eq!(decide(&tally(&responses).unwrap(), 2, 66).unwrap(), ConsensusOutcome::Failed);

    // 50%
    let responses = build_responses(&specs(50, 50));
    assert_eq!(decide(&tally(&responses).unwrap(), 2, 66).unwrap(), ConsensusOutcome::Disputed);
}

#[test]
fn test_zero_weight_defers() {
    let responses = build_responses(&[
        ResponseSpec { success: true, collateral: 0, weight: 0 },
        ResponseSpec { success: false, collateral: 0, weight: 0 },
    ]);
    assert_eq!(decide(&tally(&responses).unwrap(), 1, 66).unwrap(), ConsensusOutcome::Deferred);
}
