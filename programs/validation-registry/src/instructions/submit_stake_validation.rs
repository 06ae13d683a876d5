//! Submit a stake-backed validation response

use crate::errors::RegistryError;
use crate::instructions::response_helpers::{
    accept_response, check_request_open, check_response_admissible, init_validator_accounts,
    ResponseAccounts,
};
use crate::instructions::stake_helpers::required_validator_stake;
use crate::state::{
    PendingWithdrawal, RegistryConfig, ResponseKind, ValidationRequest, ValidationResponse,
    ValidatorStats,
};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::oracles::require_active_agent;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_lang::system_program;

/// remaining_accounts: `(validator_stats, pending_withdrawal)` for every
/// earlier responder, in submission order. Only read when this response
/// triggers settlement.
#[derive(Accounts)]
pub struct SubmitStakeValidation<'info> {
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

    #[account(mut)]
    pub validator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(
    mut ctx: Context<SubmitStakeValidation>,
    computed_hash: [u8; 32],
    collateral: u64,
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
        ResponseKind::Stake,
    )?;

    init_validator_accounts(
        &mut ctx.accounts.validator_stats,
        &mut ctx.accounts.validator_pending,
        validator,
        ctx.bumps.validator_stats,
        ctx.bumps.validator_pending,
    );

    let required = required_validator_stake(
        ctx.accounts.registry_config.min_validator_stake,
        &ctx.accounts.validator_stats,
    )?;
    require!(
        collateral >= required,
        RegistryError::InsufficientValidatorStake
    );

    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: ctx.accounts.validator.to_account_info(),
                to: ctx.accounts.request.to_account_info(),
            },
        ),
        collateral,
    )?;

    let response = ValidationResponse {
        validator,
        kind: ResponseKind::Stake,
        success: computed_hash == ctx.accounts.request.data_hash,
        computed_hash,
        attestation_key: [0u8; 32],
        proof_hash: [0u8; 32],
        validator_stake: collateral,
        weight: collateral,
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
        Vec::new(),
        ctx.remaining_accounts,
        ctx.program_id,
    )
}
