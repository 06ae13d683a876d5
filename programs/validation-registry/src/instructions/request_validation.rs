//! Open a validation request and lock the requester's stake

use crate::errors::RegistryError;
use crate::events::ValidationRequested;
use crate::instructions::request_helpers::{validate_request_params, verify_request_id, RequestParams};
use crate::state::{PendingWithdrawal, RegistryConfig, ValidationRequest, ValidationStatus};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::oracles::require_active_agent;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_lang::system_program;

#[derive(Accounts)]
#[instruction(request_id: [u8; 32])]
pub struct RequestValidation<'info> {
    #[account(
        mut,
        seeds = [b"registry"],
        bump = registry_config.bump
    )]
    pub registry_config: Account<'info, RegistryConfig>,

    /// Request record and stake escrow. `init` makes a request id single-use.
    #[account(
        init,
        payer = requester,
        space = ValidationRequest::SIZE,
        seeds = [b"request", request_id.as_ref()],
        bump
    )]
    pub request: Box<Account<'info, ValidationRequest>>,

    /// Where the requester's refunds and slash proceeds are credited
    #[account(
        init_if_needed,
        payer = requester,
        space = PendingWithdrawal::SIZE,
        seeds = [b"pending", requester.key().as_ref()],
        bump
    )]
    pub requester_pending: Account<'info, PendingWithdrawal>,

    /// CHECK: Identity Oracle record of the server agent, verified in handler
    pub server_agent_identity: UncheckedAccount<'info>,

    #[account(mut)]
    pub requester: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[allow(clippy::too_many_arguments)]
pub fn handler(
    ctx: Context<RequestValidation>,
    request_id: [u8; 32],
    task_id: [u8; 32],
    server_agent: Pubkey,
    data_hash: [u8; 32],
    validation_type: u8,
    deadline: i64,
    stake: u64,
) -> Result<()> {
    require_top_level_invocation()?;
    check_version_compatible(&ctx.accounts.registry_config)?;

    let clock = Clock::get()?;
    let requester = ctx.accounts.requester.key();
    let params = RequestParams {
        task_id,
        server_agent,
        data_hash,
        validation_type,
        deadline,
        stake,
    };

    let parsed_type = validate_request_params(
        &params,
        ctx.accounts.registry_config.min_requester_stake,
        clock.unix_timestamp,
    )?;
    require_active_agent(
        &ctx.accounts.server_agent_identity,
        &server_agent,
        &ctx.accounts.registry_config.identity_program,
    )?;
    verify_request_id(&request_id, &params, &requester)?;

    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: ctx.accounts.requester.to_account_info(),
                to: ctx.accounts.request.to_account_info(),
            },
        ),
        stake,
    )?;

    let request = &mut ctx.accounts.request;
    request.request_id = request_id;
    request.task_id = task_id;
    request.requester = requester;
    request.server_agent = server_agent;
    request.data_hash = data_hash;
    request.validation_type = parsed_type;
    request.stake = stake;
    request.deadline = deadline;
    request.status = ValidationStatus::Pending;
    request.created_at = clock.unix_timestamp;
    request.finalized_at = 0;
    request.finalized = false;
    request.success_weight = 0;
    request.fail_weight = 0;
    request.bump = ctx.bumps.request;
    request.responses = Vec::new();

    let pending = &mut ctx.accounts.requester_pending;
    if pending.owner == Pubkey::default() {
        pending.owner = requester;
        pending.bump = ctx.bumps.requester_pending;
    }

    let config = &mut ctx.accounts.registry_config;
    config.total_requests = config
        .total_requests
        .checked_add(1)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    config.total_locked = config
        .total_locked
        .checked_add(stake)
        .ok_or(RegistryError::ArithmeticOverflow)?;

    emit!(ValidationRequested {
        request_id,
        task_id,
        requester,
        server_agent,
        data_hash,
        validation_type,
        stake,
        deadline,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
