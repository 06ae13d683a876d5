//! Reap a request whose deadline passed without consensus

use crate::errors::RegistryError;
use crate::events::{outcome, ValidationExpired, ValidationFinalized};
use crate::instructions::response_helpers::record_finalization;
use crate::instructions::settlement_helpers::{apply_refund, compute_refund};
use crate::state::{PendingWithdrawal, RegistryConfig, ValidationRequest, ValidationStatus};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

/// Callable by anyone once the deadline has passed.
///
/// remaining_accounts: one `pending_withdrawal` per response, in submission
/// order.
#[derive(Accounts)]
pub struct FinalizeExpiredValidation<'info> {
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
        mut,
        seeds = [b"pending", request.requester.as_ref()],
        bump = requester_pending.bump
    )]
    pub requester_pending: Account<'info, PendingWithdrawal>,

    pub reaper: Signer<'info>,
}

pub fn handler(ctx: Context<FinalizeExpiredValidation>) -> Result<()> {
    require_top_level_invocation()?;
    check_version_compatible(&ctx.accounts.registry_config)?;

    let now = Clock::get()?.unix_timestamp;
    let request = &mut ctx.accounts.request;

    require!(
        request.status == ValidationStatus::Pending,
        RegistryError::RequestNotPending
    );
    require!(!request.finalized, RegistryError::RequestAlreadyFinalized);
    require!(now > request.deadline, RegistryError::DeadlineNotPassed);

    let locked_value = request.locked_value()?;
    let plan = compute_refund(request.stake, &request.responses)?;
    plan.verify_balanced(locked_value)?;

    let request_info = request.to_account_info();
    apply_refund(
        &plan,
        &request_info,
        &mut ctx.accounts.requester_pending,
        ctx.remaining_accounts,
        ctx.program_id,
    )?;

    request.finalize(ValidationStatus::Expired, now)?;
    record_finalization(&mut ctx.accounts.registry_config, locked_value)?;

    let refunded_collateral = plan.validator_credits()?;
    emit!(ValidationExpired {
        request_id: request.request_id,
        reaper: ctx.accounts.reaper.key(),
        refunded_stake: plan.requester_credit,
        refunded_collateral,
        response_count: request.responses.len() as u8,
        timestamp: now,
    });
    emit!(ValidationFinalized {
        request_id: request.request_id,
        task_id: request.task_id,
        server_agent: request.server_agent,
        outcome: outcome::EXPIRED,
        success_weight: request.success_weight,
        fail_weight: request.fail_weight,
        timestamp: now,
    });

    Ok(())
}
