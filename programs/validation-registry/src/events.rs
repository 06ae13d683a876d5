//! Events emitted by the Validation Registry
//!
//! Every state change is observable through these events. `ValidationFinalized`
//! is the record consumed by downstream reputation ledgers.

use anchor_lang::prelude::*;

/// Emitted once when the registry configuration is created
#[event]
pub struct RegistryInitialized {
    pub authority: Pubkey,
    pub identity_program: Pubkey,
    pub governance_program: Pubkey,
    pub min_requester_stake: u64,
    pub min_validator_stake: u64,
    pub reward_percentage: u8,
    pub slashing_percentage: u8,
    pub consensus_threshold: u8,
    pub min_validators_required: u8,
    pub max_responses_per_request: u8,
    pub timestamp: i64,
}

/// Emitted when a multisig-approved configuration update is applied
#[event]
pub struct RegistryConfigUpdated {
    /// Discriminant of the `ConfigUpdate` variant (see `config_field`)
    pub field: u8,
    pub old_value: u64,
    pub new_value: u64,
    pub updated_by: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a requester locks stake for a new request
#[event]
pub struct ValidationRequested {
    pub request_id: [u8; 32],
    pub task_id: [u8; 32],
    pub requester: Pubkey,
    pub server_agent: Pubkey,
    pub data_hash: [u8; 32],
    pub validation_type: u8,
    pub stake: u64,
    pub deadline: i64,
    pub timestamp: i64,
}

/// Emitted for every accepted response
#[event]
pub struct ValidationResponseSubmitted {
    pub request_id: [u8; 32],
    pub validator: Pubkey,
    pub kind: u8,
    pub success: bool,
    pub computed_hash: [u8; 32],
    pub validator_stake: u64,
    pub weight: u64,
    pub response_count: u8,
    pub attestation_key: [u8; 32],
    /// Opaque attestation proof bytes (empty for stake responses)
    pub proof: Vec<u8>,
    pub timestamp: i64,
}

/// Emitted for each validator on the winning side of a decision
#[event]
pub struct ValidatorRewarded {
    pub request_id: [u8; 32],
    pub validator: Pubkey,
    pub reward: u64,
    pub collateral_returned: u64,
    pub timestamp: i64,
}

/// Emitted for each validator on the losing side of a decision
#[event]
pub struct ValidatorSlashed {
    pub request_id: [u8; 32],
    pub validator: Pubkey,
    pub slashed: u64,
    pub collateral_returned: u64,
    pub timestamp: i64,
}

/// Summary of the credits produced by one settlement
#[event]
pub struct SettlementCompleted {
    pub request_id: [u8; 32],
    pub outcome: u8,
    pub reward_pool: u64,
    pub reward_paid: u64,
    pub total_slashed: u64,
    pub requester_credit: u64,
    pub validator_credits: u64,
    pub timestamp: i64,
}

/// Terminal record of a request
#[event]
pub struct ValidationFinalized {
    pub request_id: [u8; 32],
    pub task_id: [u8; 32],
    pub server_agent: Pubkey,
    pub outcome: u8,
    pub success_weight: u64,
    pub fail_weight: u64,
    pub timestamp: i64,
}

/// Emitted when a request is reaped after its deadline
#[event]
pub struct ValidationExpired {
    pub request_id: [u8; 32],
    pub reaper: Pubkey,
    pub refunded_stake: u64,
    pub refunded_collateral: u64,
    pub response_count: u8,
    pub timestamp: i64,
}

/// Emitted when a pending balance is pulled
#[event]
pub struct Withdrawal {
    pub owner: Pubkey,
    pub amount: u64,
    pub timestamp: i64,
}

/// Outcome codes carried by `ValidationFinalized` and `SettlementCompleted`
pub mod outcome {
    pub const VALIDATED: u8 = 1;
    pub const FAILED: u8 = 2;
    pub const DISPUTED: u8 = 3;
    pub const EXPIRED: u8 = 4;
}
