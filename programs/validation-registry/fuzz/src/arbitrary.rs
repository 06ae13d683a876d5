//! Arbitrary input generators for fuzz testing
//!
//! Generates random inputs for registry operations, mixing valid ranges with
//! edge cases around each bound.

use proptest::prelude::*;
use validation_registry::state::{RegistryParams, MAX_RESPONSES_CAP};

/// Arbitrary 32-byte identifier (task_id, data_hash, key hash)
pub fn arb_id() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Arbitrary lamport amount with edge cases
pub fn arb_stake() -> impl Strategy<Value = u64> {
    prop_oneof![
        // Edge cases
        Just(0u64),
        Just(1u64),
        Just(u64::MAX),
        Just(u64::MAX / 2),
        // Small amounts
        1u64..1_000_000u64,
        // Typical amounts (0.001 - 10 SOL)
        1_000_000u64..10_000_000_000u64,
        // Large amounts
        10_000_000_000u64..u64::MAX / 64,
    ]
}

/// Lamport amount that keeps sums of up to `MAX_RESPONSES_CAP + 1` values in range
pub fn arb_bounded_stake() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(3u64),
        1u64..1_000_000u64,
        1_000_000u64..10_000_000_000u64,
        Just(u64::MAX / 32),
    ]
}

/// Percentage including out-of-range values
pub fn arb_percentage() -> impl Strategy<Value = u8> {
    prop_oneof![
        Just(0u8),
        Just(1u8),
        Just(50u8),
        Just(51u8),
        Just(100u8),
        Just(101u8),
        Just(u8::MAX),
        0u8..=100u8,
    ]
}

/// Reward percentage within the accepted range (1-50)
pub fn arb_reward_percentage() -> impl Strategy<Value = u8> {
    prop_oneof![Just(1u8), Just(50u8), 1u8..=50u8]
}

/// Slashing percentage within the accepted range (0-100)
pub fn arb_slashing_percentage() -> impl Strategy<Value = u8> {
    prop_oneof![Just(0u8), Just(100u8), 0u8..=100u8]
}

/// Consensus threshold within the accepted range (51-100)
pub fn arb_consensus_threshold() -> impl Strategy<Value = u8> {
    prop_oneof![Just(51u8), Just(66u8), Just(100u8), 51u8..=100u8]
}

/// Registry parameters that pass validation
pub fn arb_registry_params() -> impl Strategy<Value = RegistryParams> {
    (
        1u64..100_000_000u64,
        1u64..100_000_000u64,
        arb_reward_percentage(),
        arb_slashing_percentage(),
        arb_consensus_threshold(),
        1u8..=MAX_RESPONSES_CAP as u8,
    )
        .prop_flat_map(|(requester, validator, reward, slash, threshold, max_responses)| {
            (1u8..=max_responses).prop_map(move |min_validators| RegistryParams {
                min_requester_stake: requester,
                min_validator_stake: validator,
                reward_percentage: reward,
                slashing_percentage: slash,
                consensus_threshold: threshold,
                min_validators_required: min_validators,
                max_responses_per_request: max_responses,
            })
        })
}

/// One response as seen by consensus and settlement
#[derive(Debug, Clone, Copy)]
pub struct ResponseSpec {
    pub success: bool,
    pub collateral: u64,
    pub weight: u64,
}

pub fn arb_response() -> impl Strategy<Value = ResponseSpec> {
    (any::<bool>(), arb_bounded_stake(), any::<bool>()).prop_map(|(success, collateral, tee)| {
        // TEE responses lock nothing and weigh the base validator stake
        if tee {
            ResponseSpec {
                success,
                collateral: 0,
                weight: 100_000_000,
            }
        } else {
            ResponseSpec {
                success,
                collateral,
                weight: collateral,
            }
        }
    })
}

/// Input for consensus decision fuzzing
#[derive(Debug, Clone)]
pub struct ConsensusInput {
    pub responses: Vec<ResponseSpec>,
    pub min_validators: u8,
    pub threshold: u8,
}

impl Arbitrary for ConsensusInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(arb_response(), 0..=MAX_RESPONSES_CAP),
            1u8..=MAX_RESPONSES_CAP as u8,
            arb_consensus_threshold(),
        )
            .prop_map(|(responses, min_validators, threshold)| ConsensusInput {
                responses,
                min_validators,
                threshold,
            })
            .boxed()
    }
}

/// Input for settlement fuzzing
#[derive(Debug, Clone)]
pub struct SettlementInput {
    pub stake: u64,
    pub responses: Vec<ResponseSpec>,
    /// Terminal status code (1-4)
    pub outcome: u8,
    pub reward_percentage: u8,
    pub slashing_percentage: u8,
}

impl Arbitrary for SettlementInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_bounded_stake(),
            prop::collection::vec(arb_response(), 0..=MAX_RESPONSES_CAP),
            1u8..=4u8,
            arb_reward_percentage(),
            arb_slashing_percentage(),
        )
            .prop_map(
                |(stake, responses, outcome, reward_percentage, slashing_percentage)| {
                    SettlementInput {
                        stake,
                        responses,
                        outcome,
                        reward_percentage,
                        slashing_percentage,
                    }
                },
            )
            .boxed()
    }
}

/// A single step of a request lifecycle
#[derive(Debug, Clone)]
pub enum RegistryAction {
    /// Stake submission by validator `validator` (index into the validator pool)
    SubmitStake {
        validator: u8,
        matches: bool,
        /// Collateral as a percentage of the base validator stake
        collateral_pct: u16,
    },
    /// TEE attestation by validator `validator`
    SubmitTee {
        validator: u8,
        matches: bool,
        trusted: bool,
    },
    AdvanceTime(i64),
    FinalizeExpired,
    /// Withdraw for the requester (`None`) or a validator
    Withdraw(Option<u8>),
}

pub fn arb_action() -> impl Strategy<Value = RegistryAction> {
    prop_oneof![
        4 => (0u8..20u8, any::<bool>(), prop_oneof![Just(0u16), Just(100u16), Just(200u16), 0u16..400u16])
            .prop_map(|(validator, matches, collateral_pct)| RegistryAction::SubmitStake {
                validator,
                matches,
                collateral_pct,
            }),
        2 => (0u8..20u8, any::<bool>(), any::<bool>())
            .prop_map(|(validator, matches, trusted)| RegistryAction::SubmitTee {
                validator,
                matches,
                trusted,
            }),
        1 => prop_oneof![Just(3_600i64), Just(86_400i64), 0i64..1_000_000i64]
            .prop_map(RegistryAction::AdvanceTime),
        1 => Just(RegistryAction::FinalizeExpired),
        1 => prop::option::of(0u8..20u8).prop_map(RegistryAction::Withdraw),
    ]
}

/// Input for whole-lifecycle fuzzing
#[derive(Debug, Clone)]
pub struct LifecycleInput {
    pub params: RegistryParams,
    pub task_id: [u8; 32],
    pub data_hash: [u8; 32],
    pub stake: u64,
    /// Wire encoding, including invalid values
    pub validation_type: u8,
    pub deadline_offset: i64,
    pub actions: Vec<RegistryAction>,
}

impl Arbitrary for LifecycleInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_registry_params(),
            arb_id(),
            arb_id(),
            prop_oneof![Just(0u64), 1u64..10_000_000_000u64],
            prop_oneof![Just(0u8), 1u8..=3u8, Just(4u8)],
            prop_oneof![Just(3_600i64), Just(3_601i64), 3_601i64..2_592_000i64, Just(2_592_000i64)],
            prop::collection::vec(arb_action(), 1..40),
        )
            .prop_map(
                |(params, task_id, data_hash, stake, validation_type, deadline_offset, actions)| {
                    LifecycleInput {
                        params,
                        task_id,
                        data_hash,
                        stake,
                        validation_type,
                        deadline_offset,
                        actions,
                    }
                },
            )
            .boxed()
    }
}

/// Input for pull-payment fuzzing: a sequence of credits and withdrawals
#[derive(Debug, Clone)]
pub struct WithdrawalInput {
    /// `Some(amount)` credits, `None` withdraws
    pub steps: Vec<Option<u64>>,
}

impl Arbitrary for WithdrawalInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(prop::option::of(arb_bounded_stake()), 1..32)
            .prop_map(|steps| WithdrawalInput { steps })
            .boxed()
    }
}
