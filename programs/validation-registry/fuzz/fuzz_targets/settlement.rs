//! Fuzz target for settlement planning
//!
//! Tests invariants:
//! - Every locked lamport is credited exactly once
//! - Rewards never exceed the reward pool, slashes never exceed collateral
//! - Disputed and expired requests refund everything
//! - Validator stats stay consistent after payouts
//!
//! Run with: cargo test --release -p validation-registry-fuzz settlement

use crate::*;
use proptest::prelude::*;
use validation_registry::instructions::settlement_helpers::{
    compute_settlement, record_payout, PayoutRole,
};
use validation_registry::state::{ValidationStatus, ValidatorStats};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Plans balance and respect the pool and collateral bounds
    #[test]
    fn fuzz_settlement_conservation(input in any::<SettlementInput>()) {
        let responses = build_responses(&input.responses);
        let outcome = status_from_code(input.outcome);
        let plan = compute_settlement(
            input.stake,
            &responses,
            outcome,
            input.reward_percentage,
            input.slashing_percentage,
        ).unwrap();

        let result = check_settlement_plan(&plan, input.stake, &responses);
        prop_assert_eq!(result, SettlementInvariantResult::Valid,
            "Settlement invariant violated for {:?}", input);

        let locked = responses.iter().map(|r| r.validator_stake).sum::<u64>() + input.stake;
        prop_assert!(plan.verify_balanced(locked).is_ok());

        let max_pool = (input.stake as u128 * input.reward_percentage as u128 / 100) as u64;
        prop_assert!(plan.reward_pool <= max_pool);
        prop_assert!(plan.requester_credit >= input.stake - plan.reward_paid);
    }

    /// Disputed and expired requests return every lamport to its owner
    #[test]
    fn fuzz_refund_outcomes(input in any::<SettlementInput>(), disputed in any::<bool>()) {
        let responses = build_responses(&input.responses);
        let outcome = if disputed { ValidationStatus::Disputed } else { ValidationStatus::Expired };
        let plan = compute_settlement(
            input.stake,
            &responses,
            outcome,
            input.reward_percentage,
            input.slashing_percentage,
        ).unwrap();

        prop_assert_eq!(plan.requester_credit, input.stake);
        prop_assert_eq!(plan.reward_paid, 0);
        prop_assert_eq!(plan.total_slashed, 0);
        for (payout, response) in plan.payouts.iter().zip(&responses) {
            prop_assert_eq!(payout.role, PayoutRole::Neutral);
            prop_assert_eq!(payout.credit().unwrap(), response.validator_stake);
        }
    }

    /// Decided outcomes split responses by side and pay only the winners
    #[test]
    fn fuzz_decided_roles(input in any::<SettlementInput>(), validated in any::<bool>()) {
        let responses = build_responses(&input.responses);
        let outcome = if validated { ValidationStatus::Validated } else { ValidationStatus::Failed };
        let plan = compute_settlement(
            input.stake,
            &responses,
            outcome,
            input.reward_percentage,
            input.slashing_percentage,
        ).unwrap();

        let mut stats = ValidatorStats::default();
        for (payout, response) in plan.payouts.iter().zip(&responses) {
            if response.success == validated {
                prop_assert_eq!(payout.role, PayoutRole::Honest);
                prop_assert!(payout.credit().unwrap() >= response.validator_stake);
            } else {
                prop_assert_eq!(payout.role, PayoutRole::Dishonest);
                prop_assert_eq!(payout.reward, 0);
                prop_assert!(payout.credit().unwrap() <= response.validator_stake);
            }
            stats.total_validations += 1;
            record_payout(&mut stats, payout).unwrap();
        }

        prop_assert_eq!(check_stats_consistency(&stats), StatsInvariantResult::Valid);
        prop_assert_eq!(stats.total_slashed, plan.total_slashed);
        prop_assert_eq!(stats.total_rewards, plan.reward_paid);
    }
}

#[test]
fn test_full_slash_zeroes_dishonest_credit() {
    let specs = vec![
        ResponseSpec { success: true, collateral: 1_000, weight: 1_000 },
        ResponseSpec { success: false, collateral: 1_000, weight: 1_000 },
    ];
    let responses = build_responses(&specs);
    let plan = compute_settlement(10_000, &responses, ValidationStatus::Validated, 10, 100).unwrap();
    assert_eq!(plan.payouts[1].credit().unwrap(), 0);
    assert_eq!(plan.requester_credit, 9_000 + 1_000);
    assert_eq!(
        check_settlement_plan(&plan, 10_000, &responses),
        SettlementInvariantResult::Valid
    );
}
