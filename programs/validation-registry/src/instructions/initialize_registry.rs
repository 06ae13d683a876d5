//! Initialize the registry configuration

use crate::errors::RegistryError;
use crate::events::RegistryInitialized;
use crate::instructions::config_helpers::{validate_registry_params, write_params};
use crate::state::{RegistryConfig, RegistryParams, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use crate::utils::invocation::require_top_level_invocation;
use crate::utils::multisig::{count_approvals, validate_multisig_owners};
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct InitializeRegistry<'info> {
    #[account(
        init,
        payer = authority,
        space = RegistryConfig::SIZE,
        seeds = [b"registry"],
        bump
    )]
    pub registry_config: Account<'info, RegistryConfig>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<InitializeRegistry>,
    params: RegistryParams,
    identity_program: Pubkey,
    governance_program: Pubkey,
    multisig_threshold: u8,
    multisig_owners: Vec<Pubkey>,
) -> Result<()> {
    require_top_level_invocation()?;

    // Validate everything before writing any config
    validate_registry_params(&params)?;
    validate_multisig_owners(&multisig_owners)?;
    require!(
        multisig_threshold > 0 && (multisig_threshold as usize) <= multisig_owners.len(),
        RegistryError::MultisigInvalidThreshold
    );

    // The initial owner set must prove it can reach its own threshold
    let signers: Vec<Pubkey> = ctx
        .remaining_accounts
        .iter()
        .filter(|acc| acc.is_signer)
        .map(|acc| acc.key())
        .collect();
    require!(
        count_approvals(&multisig_owners, &signers)? >= multisig_threshold as usize,
        RegistryError::MultisigNotEnoughSigners
    );

    let config = &mut ctx.accounts.registry_config;
    config.authority = ctx.accounts.authority.key();
    config.identity_program = identity_program;
    config.governance_program = governance_program;
    write_params(config, &params);
    config.total_requests = 0;
    config.total_responses = 0;
    config.total_finalized = 0;
    config.total_locked = 0;
    config.total_credited = 0;
    config.total_withdrawn = 0;
    config.bump = ctx.bumps.registry_config;
    config.multisig_threshold = multisig_threshold;
    config.multisig_owners_len = multisig_owners.len() as u8;
    config.protocol_version = CURRENT_PROTOCOL_VERSION;
    config.min_supported_version = MIN_SUPPORTED_VERSION;
    config._padding = [0u8; 2];
    config.multisig_owners = [Pubkey::default(); RegistryConfig::MAX_MULTISIG_OWNERS];
    for (index, owner) in multisig_owners.iter().enumerate() {
        config.multisig_owners[index] = *owner;
    }

    emit!(RegistryInitialized {
        authority: config.authority,
        identity_program,
        governance_program,
        min_requester_stake: params.min_requester_stake,
        min_validator_stake: params.min_validator_stake,
        reward_percentage: params.reward_percentage,
        slashing_percentage: params.slashing_percentage,
        consensus_threshold: params.consensus_threshold,
        min_validators_required: params.min_validators_required,
        max_responses_per_request: params.max_responses_per_request,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
