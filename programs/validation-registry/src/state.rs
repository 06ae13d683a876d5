//! Account state structures for the Validation Registry

use crate::errors::RegistryError;
use anchor_lang::prelude::*;

// ============================================================================
// Size Constants
// ============================================================================

/// Size of cryptographic hashes and IDs (SHA256, Pubkey bytes)
pub const HASH_SIZE: usize = 32;

/// Hard ceiling on responses stored per request.
///
/// This bounds the request account size and the number of accounts a
/// settlement has to touch. `RegistryConfig::max_responses_per_request` can
/// only be configured at or below this value.
pub const MAX_RESPONSES_CAP: usize = 16;

/// Validation type requested by the requester.
///
/// Encoded on the wire as `u8` with `0` reserved for "unset" so that a
/// zero-initialised argument is rejected instead of silently meaning STAKE.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default, InitSpace)]
#[repr(u8)]
pub enum ValidationType {
    /// Validators re-execute and lock collateral on the computed hash
    #[default]
    Stake = 1,
    /// Validators submit attestations signed by a governance-approved TEE key
    Tee = 2,
    /// Both stake submissions and TEE attestations are accepted
    Hybrid = 3,
}

impl ValidationType {
    /// Parses the wire encoding. Returns `None` for `0` (unset) and unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ValidationType::Stake),
            2 => Some(ValidationType::Tee),
            3 => Some(ValidationType::Hybrid),
            _ => None,
        }
    }

    /// Whether a response of the given kind may be submitted to a request of this type.
    pub fn accepts(&self, kind: ResponseKind) -> bool {
        matches!(
            (self, kind),
            (ValidationType::Stake, ResponseKind::Stake)
                | (ValidationType::Tee, ResponseKind::Tee)
                | (ValidationType::Hybrid, _)
        )
    }
}

/// Kind of an individual response
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default, InitSpace)]
#[repr(u8)]
pub enum ResponseKind {
    #[default]
    Stake = 0,
    Tee = 1,
}

/// Validation request status
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default, InitSpace)]
#[repr(u8)]
pub enum ValidationStatus {
    #[default]
    Pending = 0,
    Validated = 1,
    Failed = 2,
    Disputed = 3,
    Expired = 4,
}

impl ValidationStatus {
    /// Every status other than Pending is terminal and absorbing.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ValidationStatus::Pending)
    }

    /// Validates whether a status transition is allowed.
    ///
    /// Valid transitions:
    /// - Pending → Validated (consensus reached on the success side)
    /// - Pending → Failed (consensus reached on the failure side)
    /// - Pending → Disputed (minimum validators reached without supermajority)
    /// - Pending → Expired (deadline passed without consensus)
    pub fn can_transition_to(&self, new_status: ValidationStatus) -> bool {
        matches!(self, ValidationStatus::Pending) && new_status.is_terminal()
    }
}

/// Current protocol version
pub const CURRENT_PROTOCOL_VERSION: u8 = 1;

/// Minimum supported protocol version for backward compatibility
pub const MIN_SUPPORTED_VERSION: u8 = 1;

/// Registry configuration account
/// PDA seeds: ["registry"]
#[account]
#[derive(InitSpace)]
pub struct RegistryConfig {
    /// Account that initialized the registry
    pub authority: Pubkey,
    /// Program owning agent identity records (Identity Oracle)
    pub identity_program: Pubkey,
    /// Program owning trusted attestation key records (Governance)
    pub governance_program: Pubkey,
    /// Minimum stake a requester must lock (lamports)
    pub min_requester_stake: u64,
    /// Base collateral a validator must lock before reputation weighting (lamports)
    pub min_validator_stake: u64,
    /// Share of the requester stake paid to honest validators (percent)
    pub reward_percentage: u8,
    /// Share of a dishonest validator's collateral forfeited to the requester (percent)
    pub slashing_percentage: u8,
    /// Weighted agreement required to decide an outcome (percent, 51-100)
    pub consensus_threshold: u8,
    /// Responses required before consensus is evaluated
    pub min_validators_required: u8,
    /// Responses accepted per request (<= MAX_RESPONSES_CAP)
    pub max_responses_per_request: u8,
    /// Total requests created
    pub total_requests: u64,
    /// Total responses accepted
    pub total_responses: u64,
    /// Total requests that reached a terminal status
    pub total_finalized: u64,
    /// Lamports currently locked in pending requests
    pub total_locked: u64,
    /// Lamports ever credited to pending-withdrawal balances
    pub total_credited: u64,
    /// Lamports ever withdrawn from pending-withdrawal balances
    pub total_withdrawn: u64,
    /// Bump seed for PDA
    pub bump: u8,
    /// Multisig threshold
    pub multisig_threshold: u8,
    /// Length of configured multisig owners
    pub multisig_owners_len: u8,
    /// Current protocol version (for upgrades)
    pub protocol_version: u8,
    /// Minimum supported version for backward compatibility
    pub min_supported_version: u8,
    /// Reserved for backwards-compatible additions
    pub _padding: [u8; 2],
    /// Multisig owners allowed to approve configuration updates.
    ///
    /// Only the first `multisig_owners_len` entries are valid; remaining slots
    /// are always `Pubkey::default()`.
    pub multisig_owners: [Pubkey; RegistryConfig::MAX_MULTISIG_OWNERS],
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            authority: Pubkey::default(),
            identity_program: Pubkey::default(),
            governance_program: Pubkey::default(),
            min_requester_stake: RegistryConfig::DEFAULT_MIN_REQUESTER_STAKE,
            min_validator_stake: RegistryConfig::DEFAULT_MIN_VALIDATOR_STAKE,
            reward_percentage: RegistryConfig::DEFAULT_REWARD_PERCENTAGE,
            slashing_percentage: RegistryConfig::DEFAULT_SLASHING_PERCENTAGE,
            consensus_threshold: RegistryConfig::DEFAULT_CONSENSUS_THRESHOLD,
            min_validators_required: RegistryConfig::DEFAULT_MIN_VALIDATORS,
            max_responses_per_request: RegistryConfig::DEFAULT_MAX_RESPONSES,
            total_requests: 0,
            total_responses: 0,
            total_finalized: 0,
            total_locked: 0,
            total_credited: 0,
            total_withdrawn: 0,
            bump: 0,
            multisig_threshold: 0,
            multisig_owners_len: 0,
            protocol_version: CURRENT_PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
            _padding: [0u8; 2],
            multisig_owners: [Pubkey::default(); RegistryConfig::MAX_MULTISIG_OWNERS],
        }
    }
}

impl RegistryConfig {
    pub const MAX_MULTISIG_OWNERS: usize = 5;
    /// 0.01 SOL
    pub const DEFAULT_MIN_REQUESTER_STAKE: u64 = 10_000_000;
    /// 0.1 SOL
    pub const DEFAULT_MIN_VALIDATOR_STAKE: u64 = 100_000_000;
    pub const DEFAULT_REWARD_PERCENTAGE: u8 = 10;
    pub const DEFAULT_SLASHING_PERCENTAGE: u8 = 50;
    pub const DEFAULT_CONSENSUS_THRESHOLD: u8 = 66;
    pub const DEFAULT_MIN_VALIDATORS: u8 = 3;
    pub const DEFAULT_MAX_RESPONSES: u8 = 10;
    pub const SIZE: usize = 8 + // discriminator
        32 + // authority
        32 + // identity_program
        32 + // governance_program
        8 +  // min_requester_stake
        8 +  // min_validator_stake
        1 +  // reward_percentage
        1 +  // slashing_percentage
        1 +  // consensus_threshold
        1 +  // min_validators_required
        1 +  // max_responses_per_request
        8 +  // total_requests
        8 +  // total_responses
        8 +  // total_finalized
        8 +  // total_locked
        8 +  // total_credited
        8 +  // total_withdrawn
        1 +  // bump
        1 +  // multisig_threshold
        1 +  // multisig_owners_len
        1 +  // protocol_version
        1 +  // min_supported_version
        2 +  // padding
        (32 * Self::MAX_MULTISIG_OWNERS); // multisig owners

    /// Validates that padding bytes are zeroed.
    pub fn validate_padding_fields(&self) -> bool {
        self._padding == [0u8; 2]
    }
}

/// Economic parameters supplied to `initialize_registry`
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegistryParams {
    pub min_requester_stake: u64,
    pub min_validator_stake: u64,
    pub reward_percentage: u8,
    pub slashing_percentage: u8,
    pub consensus_threshold: u8,
    pub min_validators_required: u8,
    pub max_responses_per_request: u8,
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            min_requester_stake: RegistryConfig::DEFAULT_MIN_REQUESTER_STAKE,
            min_validator_stake: RegistryConfig::DEFAULT_MIN_VALIDATOR_STAKE,
            reward_percentage: RegistryConfig::DEFAULT_REWARD_PERCENTAGE,
            slashing_percentage: RegistryConfig::DEFAULT_SLASHING_PERCENTAGE,
            consensus_threshold: RegistryConfig::DEFAULT_CONSENSUS_THRESHOLD,
            min_validators_required: RegistryConfig::DEFAULT_MIN_VALIDATORS,
            max_responses_per_request: RegistryConfig::DEFAULT_MAX_RESPONSES,
        }
    }
}

/// A single bounded configuration change
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConfigUpdate {
    MinRequesterStake(u64),
    MinValidatorStake(u64),
    RewardPercentage(u8),
    SlashingPercentage(u8),
    ConsensusThreshold(u8),
    MinValidatorsRequired(u8),
    MaxResponsesPerRequest(u8),
}

/// TEE attestation payload
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TeeAttestation {
    /// Hash of the enclave signing key; must be approved by governance
    pub key_hash: [u8; 32],
    /// Result hash produced inside the enclave
    pub result_hash: [u8; 32],
}

/// A single validator attestation on a request.
///
/// Stored inline in the request account so that consensus and settlement read
/// one account. Append-only.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, Default, InitSpace)]
pub struct ValidationResponse {
    /// Validator wallet
    pub validator: Pubkey,
    /// Stake submission or TEE attestation
    pub kind: ResponseKind,
    /// Whether the validator claims the output matches `data_hash`
    pub success: bool,
    /// Validator's own result hash
    pub computed_hash: [u8; 32],
    /// Hash of the TEE key that signed the attestation (zero for stake responses)
    pub attestation_key: [u8; 32],
    /// SHA-256 of the opaque proof bytes (zero for stake responses)
    pub proof_hash: [u8; 32],
    /// Collateral locked for this response (zero for TEE responses)
    pub validator_stake: u64,
    /// Weight of this response in consensus
    pub weight: u64,
    /// Submission timestamp
    pub responded_at: i64,
}

impl ValidationResponse {
    pub const SIZE: usize = 32 + // validator
        1 +  // kind
        1 +  // success
        32 + // computed_hash
        32 + // attestation_key
        32 + // proof_hash
        8 +  // validator_stake
        8 +  // weight
        8; // responded_at
}

/// Validation request account. Also escrows every lamport locked for the
/// request until settlement or expiry credits it out.
/// PDA seeds: ["request", request_id]
#[account]
#[derive(Default, InitSpace)]
pub struct ValidationRequest {
    /// Deterministic request identifier (see `derive_request_id`)
    pub request_id: [u8; 32],
    /// Content-addressed task identifier supplied by the requester
    pub task_id: [u8; 32],
    /// Wallet that locked the stake
    pub requester: Pubkey,
    /// Agent whose output is being checked
    pub server_agent: Pubkey,
    /// Commitment to the claimed result
    pub data_hash: [u8; 32],
    /// Requested validation type
    pub validation_type: ValidationType,
    /// Lamports locked by the requester; funds the reward pool
    pub stake: u64,
    /// No responses accepted after this timestamp; reapable once it has passed
    pub deadline: i64,
    /// Request status
    pub status: ValidationStatus,
    /// Creation timestamp
    pub created_at: i64,
    /// Timestamp of the terminal transition (0 while pending)
    pub finalized_at: i64,
    /// Set exactly once, together with the terminal transition
    pub finalized: bool,
    /// Success-side weight at finalization
    pub success_weight: u64,
    /// Failure-side weight at finalization
    pub fail_weight: u64,
    /// Bump seed
    pub bump: u8,
    /// Responses in submission order
    #[max_len(16)]
    pub responses: Vec<ValidationResponse>,
}

impl ValidationRequest {
    pub const SIZE: usize = 8 + // discriminator
        32 + // request_id
        32 + // task_id
        32 + // requester
        32 + // server_agent
        32 + // data_hash
        1 +  // validation_type
        8 +  // stake
        8 +  // deadline
        1 +  // status
        8 +  // created_at
        8 +  // finalized_at
        1 +  // finalized
        8 +  // success_weight
        8 +  // fail_weight
        1 +  // bump
        4 + (ValidationResponse::SIZE * MAX_RESPONSES_CAP); // responses (vec)

    pub fn has_responded(&self, validator: &Pubkey) -> bool {
        self.responses.iter().any(|r| r.validator == *validator)
    }

    /// Sum of all validator collateral locked in this request.
    pub fn total_validator_stake(&self) -> Result<u64> {
        self.responses.iter().try_fold(0u64, |acc, r| {
            acc.checked_add(r.validator_stake)
                .ok_or(error!(RegistryError::ArithmeticOverflow))
        })
    }

    /// Requester stake plus all validator collateral.
    pub fn locked_value(&self) -> Result<u64> {
        self.stake
            .checked_add(self.total_validator_stake()?)
            .ok_or(error!(RegistryError::ArithmeticOverflow))
    }

    /// Moves the request to a terminal status and raises the idempotency flag.
    pub fn finalize(&mut self, status: ValidationStatus, timestamp: i64) -> Result<()> {
        require!(!self.finalized, RegistryError::RequestAlreadyFinalized);
        require!(
            self.status.can_transition_to(status),
            RegistryError::InvalidStatusTransition
        );
        self.status = status;
        self.finalized = true;
        self.finalized_at = timestamp;
        Ok(())
    }
}

/// Cumulative per-validator history, the input of the reputation-weighted
/// collateral minimum.
/// PDA seeds: ["validator_stats", validator]
#[account]
#[derive(Debug, Default, InitSpace)]
pub struct ValidatorStats {
    /// Validator wallet
    pub validator: Pubkey,
    /// Responses submitted
    pub total_validations: u64,
    /// Responses on the winning side of a VALIDATED/FAILED decision
    pub successful_validations: u64,
    /// Responses on the losing side of a VALIDATED/FAILED decision
    pub failed_validations: u64,
    /// Rewards earned (excluding returned collateral)
    pub total_rewards: u64,
    /// Collateral forfeited
    pub total_slashed: u64,
    /// Set on first submission
    pub active: bool,
    /// Timestamp of the last submission
    pub last_validation_at: i64,
    /// Bump seed
    pub bump: u8,
}

impl ValidatorStats {
    pub const SIZE: usize = 8 + // discriminator
        32 + // validator
        8 +  // total_validations
        8 +  // successful_validations
        8 +  // failed_validations
        8 +  // total_rewards
        8 +  // total_slashed
        1 +  // active
        8 +  // last_validation_at
        1; // bump

    /// Responses whose request reached a VALIDATED or FAILED decision.
    pub fn completed_validations(&self) -> u64 {
        self.successful_validations
            .saturating_add(self.failed_validations)
    }

    /// Historical success rate in whole percent, or `None` without history.
    pub fn success_rate_pct(&self) -> Option<u64> {
        let completed = self.completed_validations();
        if completed == 0 {
            return None;
        }
        // successful <= completed, so the product stays below u64::MAX for any
        // realistic count; saturate instead of failing on absurd values.
        Some(self.successful_validations.saturating_mul(100) / completed)
    }
}

/// Pull-payment balance for one wallet. The PDA holds the credited lamports on
/// top of its rent-exempt reserve.
/// PDA seeds: ["pending", owner]
#[account]
#[derive(Default, InitSpace)]
pub struct PendingWithdrawal {
    /// Wallet allowed to withdraw
    pub owner: Pubkey,
    /// Lamports currently owed
    pub amount: u64,
    /// Lamports ever credited
    pub total_credited: u64,
    /// Lamports ever withdrawn
    pub total_withdrawn: u64,
    /// Bump seed
    pub bump: u8,
}

impl PendingWithdrawal {
    pub const SIZE: usize = 8 + // discriminator
        32 + // owner
        8 +  // amount
        8 +  // total_credited
        8 +  // total_withdrawn
        1; // bump

    /// Record a settlement credit.
    pub fn credit(&mut self, amount: u64) -> Result<()> {
        self.amount = self
            .amount
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        self.total_credited = self
            .total_credited
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn require_owner(&self, signer: &Pubkey) -> Result<()> {
        require_keys_eq!(self.owner, *signer, RegistryError::NotPendingOwner);
        Ok(())
    }

    /// Zero the balance and return what was owed.
    ///
    /// Must run before any lamports leave the account: a second call in the
    /// same or a later transaction observes a zero balance.
    pub fn take_balance(&mut self) -> Result<u64> {
        let amount = self.amount;
        require!(amount > 0, RegistryError::NothingToWithdraw);
        self.amount = 0;
        self.total_withdrawn = self
            .total_withdrawn
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        Ok(amount)
    }
}
