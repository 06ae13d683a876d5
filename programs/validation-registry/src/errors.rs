//! Error codes for the Validation Registry

use anchor_lang::prelude::*;

#[error_code]
pub enum RegistryError {
    // Input validation errors (6000-6099)
    #[msg("Task ID cannot be zero")]
    InvalidTaskId,

    #[msg("Data hash cannot be zero")]
    InvalidDataHash,

    #[msg("Validation type is unset or unknown")]
    InvalidValidationType,

    #[msg("Deadline must be strictly between now + minimum and now + maximum window")]
    InvalidDeadline,

    #[msg("Request ID does not match the request inputs")]
    InvalidRequestId,

    #[msg("Attestation proof is empty or exceeds maximum length")]
    InvalidProof,

    // Request state errors (6100-6199)
    #[msg("Validation request is not pending")]
    RequestNotPending,

    #[msg("Validation request has already been finalized")]
    RequestAlreadyFinalized,

    #[msg("Validation deadline has passed")]
    DeadlinePassed,

    #[msg("Validation deadline has not passed")]
    DeadlineNotPassed,

    #[msg("Invalid validation status transition")]
    InvalidStatusTransition,

    // Response errors (6200-6299)
    #[msg("Validator has already responded to this request")]
    DuplicateResponse,

    #[msg("Requester and server agent cannot validate their own request")]
    ValidatorIsParticipant,

    #[msg("Response kind is not accepted by this request's validation type")]
    ValidationTypeMismatch,

    // Economic errors (6300-6399)
    #[msg("Requester stake is below the configured minimum")]
    InsufficientRequesterStake,

    #[msg("Validator collateral is below the reputation-weighted minimum")]
    InsufficientValidatorStake,

    #[msg("Nothing owed to this account")]
    NothingToWithdraw,

    #[msg("Insufficient funds")]
    InsufficientFunds,

    #[msg("Pending balance does not belong to the signer")]
    NotPendingOwner,

    // Trust errors (6400-6499)
    #[msg("Agent is not registered or not active")]
    AgentNotActive,

    #[msg("Identity account is not owned by the identity program or is malformed")]
    InvalidIdentityAccount,

    #[msg("Attestation key is not approved by governance")]
    UntrustedAttestationKey,

    #[msg("Trusted key account is not owned by the governance program or is malformed")]
    InvalidTrustedKeyAccount,

    #[msg("Instruction cannot be invoked through CPI")]
    ReentrantCall,

    // Resource errors (6500-6599)
    #[msg("Request has reached the maximum number of responses")]
    ResponseCapReached,

    // Settlement errors (6600-6699)
    #[msg("Settlement accounts are missing, out of order, or do not match the responses")]
    InvalidSettlementAccounts,

    #[msg("Settlement credits do not match locked value")]
    SettlementImbalance,

    #[msg("Account is not owned by this program")]
    InvalidAccountOwner,

    // Configuration errors (6700-6799)
    #[msg("Invalid stake minimum (must be non-zero)")]
    InvalidStakeMinimum,

    #[msg("Invalid reward percentage")]
    InvalidRewardPercentage,

    #[msg("Invalid slashing percentage")]
    InvalidSlashingPercentage,

    #[msg("Invalid consensus threshold")]
    InvalidConsensusThreshold,

    #[msg("Invalid minimum validator count")]
    InvalidMinValidators,

    #[msg("Invalid maximum responses per request")]
    InvalidMaxResponses,

    #[msg("Invalid multisig threshold")]
    MultisigInvalidThreshold,

    #[msg("Invalid multisig signer configuration")]
    MultisigInvalidSigners,

    #[msg("Not enough multisig signers")]
    MultisigNotEnoughSigners,

    #[msg("Duplicate multisig signer provided")]
    MultisigDuplicateSigner,

    #[msg("Multisig signer cannot be default pubkey")]
    MultisigDefaultSigner,

    // Version errors (6800-6899)
    #[msg("Protocol version mismatch: account version incompatible with current program")]
    VersionMismatchProtocol,

    #[msg("Account version too old: migration required")]
    AccountVersionTooOld,

    #[msg("Account version too new: program upgrade required")]
    AccountVersionTooNew,

    // General errors (6900-6999)
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
}
