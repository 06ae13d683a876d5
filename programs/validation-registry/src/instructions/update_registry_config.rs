//! Update one registry parameter (multisig gated)

use anchor_lang::prelude::*;

use crate::events::RegistryConfigUpdated;
use crate::instructions::config_helpers::apply_config_update;
use crate::state::{ConfigUpdate, RegistryConfig};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::multisig::require_multisig;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct UpdateRegistryConfig<'info> {
    #[account(
        mut,
        seeds = [b"registry"],
        bump = registry_config.bump
    )]
    pub registry_config: Account<'info, RegistryConfig>,
}

pub fn handler(ctx: Context<UpdateRegistryConfig>, update: ConfigUpdate) -> Result<()> {
    require_top_level_invocation()?;
    check_version_compatible(&ctx.accounts.registry_config)?;
    let approver = require_multisig(&ctx.accounts.registry_config, ctx.remaining_accounts)?;

    let applied = apply_config_update(&mut ctx.accounts.registry_config, update)?;

    emit!(RegistryConfigUpdated {
        field: applied.field,
        old_value: applied.old_value,
        new_value: applied.new_value,
        updated_by: approver,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
