//! Fuzz test runner for the Validation Registry
//!
//! Run with: cargo run --release
//! Or: cargo test (for property-based tests)

use proptest::prelude::*;
use std::time::Instant;
use validation_registry::instructions::consensus_helpers::{decide, tally};
use validation_registry::instructions::settlement_helpers::compute_settlement;
use validation_registry::state::PendingWithdrawal;
use validation_registry_fuzz::*;

fn main() {
    println!("=== Validation Registry Fuzz Testing ===\n");

    let start = Instant::now();
    let mut total_tests = 0;
    let mut passed = 0;
    let mut failed = 0;

    println!("Running consensus fuzz tests...");
    let (p, f) = run_consensus_fuzz(500);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running settlement fuzz tests...");
    let (p, f) = run_settlement_fuzz(500);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running request lifecycle fuzz tests...");
    let (p, f) = run_lifecycle_fuzz(200);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running withdrawal fuzz tests...");
    let (p, f) = run_withdrawal_fuzz(500);
    passed += p;
    failed += f;
    total_tests += p + f;

    let duration = start.elapsed();

    println!("\n=== Fuzz Testing Complete ===");
    println!("Total tests: {}", total_tests);
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!("Duration: {:?}", duration);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_consensus_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<ConsensusInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate ConsensusInput")
            .current();

        let responses = build_responses(&input.responses);
        let decision = tally(&responses)
            .and_then(|t| decide(&t, input.min_validators, input.threshold));

        match decision {
            Ok(outcome) => {
                let deferred_expected = input.responses.len() < input.min_validators as usize;
                if deferred_expected && outcome.status().is_some() {
                    println!("  [{}] Decided below minimum: {:?}", i, input);
                    failed += 1;
                } else {
                    passed += 1;
                }
            }
            Err(err) => {
                println!("  [{}] Consensus error: {:?}", i, err);
                failed += 1;
            }
        }
    }

    println!("  consensus: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_settlement_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<SettlementInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate SettlementInput")
            .current();

        let responses = build_responses(&input.responses);
        let plan = compute_settlement(
            input.stake,
            &responses,
            status_from_code(input.outcome),
            input.reward_percentage,
            input.slashing_percentage,
        );

        match plan {
            Ok(plan) => match check_settlement_plan(&plan, input.stake, &responses) {
                SettlementInvariantResult::Valid => passed += 1,
                violation => {
                    println!("  [{}] Settlement violation: {:?}", i, violation);
                    failed += 1;
                }
            },
            Err(err) => {
                println!("  [{}] Settlement error: {:?}", i, err);
                failed += 1;
            }
        }
    }

    println!("  settlement: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_lifecycle_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<LifecycleInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate LifecycleInput")
            .current();

        let result = run_lifecycle(&input);
        if result.is_success() {
            passed += 1;
        } else {
            println!("  [{}] Lifecycle failure: {:?}", i, result);
            failed += 1;
        }
    }

    println!("  request lifecycle: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_withdrawal_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<WithdrawalInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate WithdrawalInput")
            .current();

        let mut pending = PendingWithdrawal::default();
        let mut ok = true;
        for step in &input.steps {
            match step {
                Some(amount) => ok &= pending.credit(*amount).is_ok(),
                None => {
                    if pending.take_balance().is_ok() {
                        let second = pending.take_balance().ok();
                        ok &= check_withdrawal(pending.amount, second)
                            == WithdrawalInvariantResult::Valid;
                    }
                }
            }
            ok &= check_credit_conservation(
                pending.amount,
                pending.total_credited,
                pending.total_withdrawn,
            ) == ConservationInvariantResult::Valid;
        }

        if ok {
            passed += 1;
        } else {
            println!("  [{}] Withdrawal ledger broken: {:?}", i, input);
            failed += 1;
        }
    }

    println!("  withdrawal: {} passed, {} failed", passed, failed);
    (passed, failed)
}
