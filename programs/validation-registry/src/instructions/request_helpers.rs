//! Input validation and id derivation for new validation requests.

use crate::errors::RegistryError;
use crate::instructions::constants::{MAX_DEADLINE_SECONDS, MIN_DEADLINE_SECONDS, REQUEST_ID_DOMAIN};
use crate::state::ValidationType;
use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

/// Arguments of `request_validation` that are checked before any state is written
#[derive(Clone, Copy, Debug)]
pub struct RequestParams {
    pub task_id: [u8; 32],
    pub server_agent: Pubkey,
    pub data_hash: [u8; 32],
    pub validation_type: u8,
    pub deadline: i64,
    pub stake: u64,
}

/// Validate request inputs and parse the validation type.
///
/// Checks run in a fixed order so that callers get the first failing reason:
/// task id, data hash, validation type, deadline window, stake.
pub fn validate_request_params(
    params: &RequestParams,
    min_requester_stake: u64,
    now: i64,
) -> Result<ValidationType> {
    require!(params.task_id != [0u8; 32], RegistryError::InvalidTaskId);
    require!(params.data_hash != [0u8; 32], RegistryError::InvalidDataHash);

    let validation_type = ValidationType::from_u8(params.validation_type)
        .ok_or(RegistryError::InvalidValidationType)?;

    let earliest = now
        .checked_add(MIN_DEADLINE_SECONDS)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    let latest = now
        .checked_add(MAX_DEADLINE_SECONDS)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    require!(
        params.deadline > earliest && params.deadline < latest,
        RegistryError::InvalidDeadline
    );

    require!(
        params.stake >= min_requester_stake,
        RegistryError::InsufficientRequesterStake
    );

    Ok(validation_type)
}

/// Deterministic request id.
///
/// `sha256("validation_request" || task_id || requester || server_agent ||
/// data_hash || validation_type || deadline_le)`
pub fn derive_request_id(params: &RequestParams, requester: &Pubkey) -> [u8; 32] {
    hashv(&[
        REQUEST_ID_DOMAIN,
        &params.task_id,
        requester.as_ref(),
        params.server_agent.as_ref(),
        &params.data_hash,
        &[params.validation_type],
        &params.deadline.to_le_bytes(),
    ])
    .to_bytes()
}

/// Reject a caller-supplied id that does not match the derivation.
pub fn verify_request_id(request_id: &[u8; 32], params: &RequestParams, requester: &Pubkey) -> Result<()> {
    require!(
        *request_id == derive_request_id(params, requester),
        RegistryError::InvalidRequestId
    );
    Ok(())
}
