//! Fuzz target for pull-payment withdrawals
//!
//! Tests invariants:
//! - The balance is zeroed before anything is paid
//! - A second withdrawal without a new credit pays nothing
//! - amount == total_credited - total_withdrawn at every step
//! - Once every participant withdraws, everything deposited has been paid out
//!
//! Run with: cargo test --release -p validation-registry-fuzz withdrawal

use crate::*;
use proptest::prelude::*;
use validation_registry::errors::RegistryError;
use validation_registry::instructions::request_helpers::{derive_request_id, RequestParams};
use validation_registry::state::{PendingWithdrawal, RegistryParams};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Interleaved credits and withdrawals keep the ledger consistent
    #[test]
    fn fuzz_pending_ledger(input in any::<WithdrawalInput>()) {
        let mut pending = PendingWithdrawal::default();
        let mut paid: u64 = 0;

        for step in &input.steps {
            match step {
                Some(amount) => {
                    pending.credit(*amount).unwrap();
                }
                None => {
                    let owed = pending.amount;
                    match pending.take_balance() {
                        Ok(amount) => {
                            prop_assert_eq!(amount, owed);
                            paid += amount;
                            let second = pending.take_balance().ok();
                            prop_assert_eq!(
                                check_withdrawal(pending.amount, second),
                                WithdrawalInvariantResult::Valid
                            );
                        }
                        Err(err) => {
                            prop_assert_eq!(owed, 0);
                            let expected: anchor_lang::error::Error =
                                RegistryError::NothingToWithdraw.into();
                            prop_assert_eq!(err, expected);
                        }
                    }
                }
            }
            prop_assert_eq!(
                check_credit_conservation(pending.amount, pending.total_credited, pending.total_withdrawn),
                ConservationInvariantResult::Valid
            );
            prop_assert_eq!(pending.total_withdrawn, paid);
        }
    }

    /// Crediting arbitrary amounts either succeeds exactly or reports overflow
    #[test]
    fn fuzz_pending_credit_overflow(first in arb_stake(), second in arb_stake()) {
        let mut pending = PendingWithdrawal::default();
        pending.credit(first).unwrap();
        match first.checked_add(second) {
            Some(total) => {
                pending.credit(second).unwrap();
                prop_assert_eq!(pending.amount, total);
            }
            None => prop_assert!(pending.credit(second).is_err()),
        }
    }

    /// Draining every pending balance after a settled request pays out all deposits
    #[test]
    fn fuzz_drain_after_settlement(
        params in arb_registry_params(),
        stake in 100_000_000u64..10_000_000_000u64,
        votes in prop::collection::vec(any::<bool>(), 16),
    ) {
        let mut reg = SimulatedRegistry::initialize(params, SIM_START).unwrap();
        reg.register_agent(sim_key(SIM_SERVER));
        for index in 0..16u8 {
            reg.register_agent(sim_validator(index));
        }
        let request_params = RequestParams {
            task_id: [1u8; 32],
            server_agent: sim_key(SIM_SERVER),
            data_hash: [2u8; 32],
            validation_type: 1,
            deadline: SIM_START + 86_400,
            stake,
        };
        let requester = sim_key(SIM_REQUESTER);
        prop_assert!(reg.request_validation(requester, request_params).is_success());
        let request_id = derive_request_id(&request_params, &requester);

        // Twice the base covers any reputation multiplier
        let collateral = reg.config.min_validator_stake * 2;
        for (index, vote) in votes.iter().enumerate() {
            let submission = Submission::Stake {
                computed_hash: if *vote { [2u8; 32] } else { [3u8; 32] },
                collateral,
            };
            let result = reg.submit(request_id, sim_validator(index as u8), submission);
            prop_assert!(!result.is_invariant_violation(), "{:?}", result);
            if reg.request(&request_id).map(|r| r.finalized).unwrap_or(false) {
                break;
            }
        }
        if !reg.request(&request_id).map(|r| r.finalized).unwrap_or(false) {
            reg.advance_time(86_401);
            prop_assert!(reg.finalize_expired(request_id).is_success());
        }

        let owners: Vec<_> = reg.pending.keys().copied().collect();
        for owner in owners {
            let result = reg.withdraw(owner);
            prop_assert!(result.is_success() || result.is_registry_error(RegistryError::NothingToWithdraw));
            prop_assert!(reg.withdraw(owner).is_registry_error(RegistryError::NothingToWithdraw));
        }

        prop_assert_eq!(reg.paid_out, reg.deposited);
        prop_assert_eq!(reg.config.total_locked, 0);
        prop_assert!(reg.check_invariants().is_success());
    }
}

#[test]
fn test_withdraw_unknown_owner_fails() {
    let mut reg = SimulatedRegistry::initialize(RegistryParams::default(), SIM_START).unwrap();
    assert!(reg.withdraw(sim_key(42)).is_error());
    assert_eq!(reg.paid_out, 0);
}
