//! Fuzz target for whole request lifecycles
//!
//! Tests invariants:
//! - Escrowed lamports always equal the locked counter
//! - Deposits are always locked or credited, never lost
//! - Terminal requests never change again
//! - Responses stay within the cap and are unique per validator
//! - Parameter updates only ever leave a valid configuration
//!
//! Run with: cargo test --release -p validation-registry-fuzz request_lifecycle

use crate::*;
use proptest::prelude::*;
use validation_registry::instructions::config_helpers::{params_of, validate_registry_params};
use validation_registry::instructions::request_helpers::{derive_request_id, RequestParams};
use validation_registry::state::{ConfigUpdate, RegistryParams, ValidationStatus};

fn arb_config_update() -> impl Strategy<Value = ConfigUpdate> {
    prop_oneof![
        arb_stake().prop_map(ConfigUpdate::MinRequesterStake),
        arb_stake().prop_map(ConfigUpdate::MinValidatorStake),
        arb_percentage().prop_map(ConfigUpdate::RewardPercentage),
        arb_percentage().prop_map(ConfigUpdate::SlashingPercentage),
        arb_percentage().prop_map(ConfigUpdate::ConsensusThreshold),
        (0u8..=20u8).prop_map(ConfigUpdate::MinValidatorsRequired),
        (0u8..=20u8).prop_map(ConfigUpdate::MaxResponsesPerRequest),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Arbitrary action sequences never break a registry invariant
    #[test]
    fn fuzz_request_lifecycle(input in any::<LifecycleInput>()) {
        let result = run_lifecycle(&input);
        prop_assert!(result.is_success(),
            "Lifecycle failed: {:?}\nInput: {:?}", result, input);
    }

    /// Any sequence of updates keeps the parameter set valid
    #[test]
    fn fuzz_config_updates(updates in prop::collection::vec(arb_config_update(), 1..30)) {
        let mut reg = SimulatedRegistry::initialize(RegistryParams::default(), SIM_START).unwrap();
        for update in updates {
            let before = params_of(&reg.config);
            let result = reg.update_config(update);
            prop_assert!(!result.is_invariant_violation());
            if !result.is_success() {
                prop_assert_eq!(params_of(&reg.config), before);
            }
            prop_assert!(validate_registry_params(&params_of(&reg.config)).is_ok(),
                "Invalid config after {:?}", update);
        }
    }

    /// Honest stake submissions reaching the minimum always validate
    #[test]
    fn fuzz_honest_majority_validates(params in arb_registry_params(), stake in 100_000_000u64..10_000_000_000u64) {
        let mut reg = SimulatedRegistry::initialize(params, SIM_START).unwrap();
        reg.register_agent(sim_key(SIM_SERVER));
        for index in 0..16u8 {
            reg.register_agent(sim_validator(index));
        }
        let request_params = RequestParams {
            task_id: [5u8; 32],
            server_agent: sim_key(SIM_SERVER),
            data_hash: [6u8; 32],
            validation_type: 1,
            deadline: SIM_START + 7_200,
            stake,
        };
        let requester = sim_key(SIM_REQUESTER);
        prop_assert!(reg.request_validation(requester, request_params).is_success());
        let request_id = derive_request_id(&request_params, &requester);

        let collateral = reg.config.min_validator_stake;
        for index in 0..params.min_validators_required {
            let status = reg.request(&request_id).map(|r| r.status);
            prop_assert_eq!(status, Some(ValidationStatus::Pending));
            let result = reg.submit(request_id, sim_validator(index), Submission::Stake {
                computed_hash: [6u8; 32],
                collateral,
            });
            prop_assert!(result.is_success(), "{:?}", result);
        }

        let request = reg.request(&request_id).unwrap();
        prop_assert_eq!(request.status, ValidationStatus::Validated);
        prop_assert_eq!(request.responses.len(), params.min_validators_required as usize);
        prop_assert!(reg.pending_balance(&requester) >= stake - stake / 2);
        prop_assert!(reg.check_invariants().is_success());
    }
}

#[test]
fn test_rejected_request_locks_nothing() {
    let input = LifecycleInput {
        params: RegistryParams::default(),
        task_id: [1u8; 32],
        data_hash: [2u8; 32],
        stake: RegistryParams::default().min_requester_stake,
        validation_type: 0,
        deadline_offset: 7_200,
        actions: vec![RegistryAction::FinalizeExpired],
    };
    assert!(run_lifecycle(&input).is_success());
}

#[test]
fn test_lifecycle_through_expiry_and_withdrawals() {
    let input = LifecycleInput {
        params: RegistryParams::default(),
        task_id: [1u8; 32],
        data_hash: [2u8; 32],
        stake: 1_000_000_000,
        validation_type: 3,
        deadline_offset: 7_200,
        actions: vec![
            RegistryAction::SubmitStake { validator: 0, matches: true, collateral_pct: 100 },
            RegistryAction::SubmitTee { validator: 1, matches: false, trusted: true },
            RegistryAction::SubmitStake { validator: 0, matches: true, collateral_pct: 100 },
            RegistryAction::SubmitStake { validator: 17, matches: true, collateral_pct: 100 },
            RegistryAction::AdvanceTime(7_201),
            RegistryAction::FinalizeExpired,
            RegistryAction::FinalizeExpired,
            RegistryAction::Withdraw(None),
            RegistryAction::Withdraw(Some(0)),
            RegistryAction::Withdraw(Some(0)),
            RegistryAction::Withdraw(Some(1)),
        ],
    };
    assert!(run_lifecycle(&input).is_success());
}
