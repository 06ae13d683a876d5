//! Submit a TEE attestation as a validation response
//!
//! Attestations lock no collateral. Their weight is one base collateral unit
//! (`min_validator_stake` at submission time), and a false attestation cannot
//! be slashed: trust rests entirely on governance approving the signing key.

use crate::errors::RegistryError;
use crate::instructions::constants::MAX_PROOF_LEN;
use crate::instructions::response_helpers::{
    accept_response, check_request_open, check_response_admissible, init_validator_accounts,
    ResponseAccounts,
};
use crate::state::{
    PendingWithdrawal, RegistryConfig, ResponseKind, TeeAttestation, ValidationRequest,
    ValidationResponse, ValidatorStats,
};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::oracles::{require_active_agent, require_trusted_key};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use solana_sha256_hasher::hash;

/// remaining_accounts: same layout as `SubmitStakeValidation`.
#[derive(Accounts)]
pub struct SubmitTeeAttestation<'info> {
    #[account(
        mut,
        seeds = [b"registry"],
        bump = registry_config.bump
    )]
    pub registry_config: Account<'info, RegistryConfig>,

    #[account(
        mut,
        seeds = [b"request", request.request_id.as_ref()],
        bump = request.bump
    )]
    pub request: Box<Account<'info, ValidationRequest>>,

    #[account(
        init_if_needed,
        payer = validator,
        space = ValidatorStats::SIZE,
        seeds = [b"validator_stats", validator.key().as_ref()],
        bump
    )]
    pub validator_stats: Account<'info, ValidatorStats>,

    #[account(
        init_if_needed,
        payer = validator,
        space = PendingWithdrawal::SIZE,
        seeds = [b"pending", validator.key().as_ref()],
        bump
    )]
    pub validator_pending: Account<'info, PendingWithdrawal>,

    #[account(
        mut,
        seeds = [b"pending", request.requester.as_ref()],
        bump = requester_pending.bump
    )]
    pub requester_pending: Account<'info, PendingWithdrawal>,

    /// CHECK: Identity Oracle record of the validator, verified in handler
    pub validator_identity: UncheckedAccount<'info>,

    /// CHECK: Governance record of the attestation key, verified in handler
    pub trusted_key: UncheckedAccount<'info>,

    #[account(mut)]
    pub validator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(
    mut ctx: Context<SubmitTeeAttestation>,
    attestation: TeeAttestation,
    proof: Vec<u8>,
) -> Result<()> {
    require_top_level_invocation()?;
    check_version_compatible(&ctx.accounts.registry_config)?;

    let now = Clock::get()?.unix_timestamp;
    let validator = ctx.accounts.validator.key();

    check_request_open(&ctx.accounts.request, &validator, now)?;
    require_active_agent(
        &ctx.accounts.validator_identity,
        &validator,
        &ctx.accounts.registry_config.identity_program,
    )?;
    check_response_admissible(
        &ctx.accounts.request,
        &ctx.accounts.registry_config,
        ResponseKind::Tee,
    )?;

    require_trusted_key(
        &ctx.accounts.trusted_key,
        &attestation.key_hash,
        &ctx.accounts.registry_config.governance_program,
    )?;
    require!(
        !proof.is_empty() && proof.len() <= MAX_PROOF_LEN,
        RegistryError::InvalidProof
    );

    init_validator_accounts(
        &mut ctx.accounts.validator_stats,
        &mut ctx.accounts.validator_pending,
        validator,
        ctx.bumps.validator_stats,
        ctx.bumps.validator_pending,
    );

    let response = ValidationResponse {
        validator,
        kind: ResponseKind::Tee,
        success: attestation.result_hash == ctx.accounts.request.data_hash,
        computed_hash: attestation.result_hash,
        attestation_key: attestation.key_hash,
        proof_hash: hash(&proof).to_bytes(),
        validator_stake: 0,
        weight: ctx.accounts.registry_config.min_validator_stake,
        responded_at: now,
    };

    let accounts = &mut ctx.accounts;
    accept_response(
        ResponseAccounts {
            request: &mut accounts.request,
            config: &mut accounts.registry_config,
            validator_stats: &mut accounts.validator_stats,
            validator_pending: &mut accounts.validator_pending,
            requester_pending: &mut accounts.requester_pending,
        },
        response,
        proof,
        ctx.remaining_accounts,
        ctx.program_id,
    )
}
