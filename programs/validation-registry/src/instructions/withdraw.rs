//! Pull a credited balance

use crate::errors::RegistryError;
use crate::events::Withdrawal;
use crate::instructions::lamport_transfer::transfer_lamports;
use crate::state::{PendingWithdrawal, RegistryConfig};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct Withdraw<'info> {
    #[account(
        mut,
        seeds = [b"registry"],
        bump = registry_config.bump
    )]
    pub registry_config: Account<'info, RegistryConfig>,

    #[account(
        mut,
        seeds = [b"pending", owner.key().as_ref()],
        bump = pending.bump
    )]
    pub pending: Account<'info, PendingWithdrawal>,

    #[account(mut)]
    pub owner: Signer<'info>,
}

/// The pending account must keep its rent-exempt reserve after paying `amount`.
pub fn check_withdrawable(account_lamports: u64, rent_reserve: u64, amount: u64) -> Result<()> {
    let available = account_lamports
        .checked_sub(rent_reserve)
        .ok_or(RegistryError::InsufficientFunds)?;
    require!(available >= amount, RegistryError::InsufficientFunds);
    Ok(())
}

pub fn handler(ctx: Context<Withdraw>) -> Result<()> {
    require_top_level_invocation()?;
    check_version_compatible(&ctx.accounts.registry_config)?;

    ctx.accounts.pending.require_owner(&ctx.accounts.owner.key())?;

    // Zero the balance before any lamports move
    let amount = ctx.accounts.pending.take_balance()?;

    let pending_info = ctx.accounts.pending.to_account_info();
    let rent_reserve = Rent::get()?.minimum_balance(pending_info.data_len());
    check_withdrawable(pending_info.lamports(), rent_reserve, amount)?;

    transfer_lamports(
        &pending_info,
        &ctx.accounts.owner.to_account_info(),
        amount,
    )?;

    let config = &mut ctx.accounts.registry_config;
    config.total_withdrawn = config
        .total_withdrawn
        .checked_add(amount)
        .ok_or(RegistryError::ArithmeticOverflow)?;

    emit!(Withdrawal {
        owner: ctx.accounts.owner.key(),
        amount,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVE: u64 = 1_336_320;

    #[test]
    fn test_withdrawable_up_to_reserve() {
        check_withdrawable(RESERVE + 500, RESERVE, 500).unwrap();
        check_withdrawable(RESERVE + 500, RESERVE, 499).unwrap();
        check_withdrawable(RESERVE, RESERVE, 0).unwrap();
    }

    #[test]
    fn test_payout_may_not_touch_reserve() {
        assert_eq!(
            check_withdrawable(RESERVE + 500, RESERVE, 501).unwrap_err(),
            RegistryError::InsufficientFunds.into()
        );
        assert_eq!(
            check_withdrawable(RESERVE - 1, RESERVE, 0).unwrap_err(),
            RegistryError::InsufficientFunds.into()
        );
    }
}
