#![allow(unexpected_cfgs)]
//! Validation Registry
//!
//! Staked verification of off-chain agent work. A requester locks stake on a
//! claimed result; independent validators re-execute the task and either lock
//! collateral on their answer or submit a TEE attestation. Once enough
//! weighted agreement exists the request is decided and every locked lamport
//! is redistributed (rewards, slashes, refunds) into pull-payment balances.

use anchor_lang::prelude::*;

declare_id!("EVa1idReg1stry5takedVa1idat1onRegistryQ4xZk9");

pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod utils;

use instructions::*;
use state::{ConfigUpdate, RegistryParams, TeeAttestation};

#[program]
pub mod validation_registry {
    use super::*;

    /// Create the registry configuration.
    ///
    /// # Arguments
    /// * `params` - Economic parameters (stake minimums, percentages, validator counts)
    /// * `identity_program` - Program owning agent identity records
    /// * `governance_program` - Program owning trusted TEE key records
    /// * `multisig_threshold` - Approvals required for later config updates
    /// * `multisig_owners` - Keys allowed to approve config updates; at least
    ///   `multisig_threshold` of them must sign via remaining_accounts
    pub fn initialize_registry(
        ctx: Context<InitializeRegistry>,
        params: RegistryParams,
        identity_program: Pubkey,
        governance_program: Pubkey,
        multisig_threshold: u8,
        multisig_owners: Vec<Pubkey>,
    ) -> Result<()> {
        instructions::initialize_registry::handler(
            ctx,
            params,
            identity_program,
            governance_program,
            multisig_threshold,
            multisig_owners,
        )
    }

    /// Change one registry parameter (multisig gated).
    pub fn update_registry_config(
        ctx: Context<UpdateRegistryConfig>,
        update: ConfigUpdate,
    ) -> Result<()> {
        instructions::update_registry_config::handler(ctx, update)
    }

    /// Open a validation request and lock `stake` in the request PDA.
    ///
    /// # Arguments
    /// * `request_id` - Must equal the id derived from the other arguments
    /// * `task_id` - Non-zero task identifier
    /// * `server_agent` - Agent whose output is checked; must be active
    /// * `data_hash` - Non-zero commitment to the claimed result
    /// * `validation_type` - 1=stake, 2=tee, 3=hybrid
    /// * `deadline` - Unix timestamp, more than 1 hour and less than 30 days out
    /// * `stake` - Lamports to lock, at least `min_requester_stake`
    #[allow(clippy::too_many_arguments)]
    pub fn request_validation(
        ctx: Context<RequestValidation>,
        request_id: [u8; 32],
        task_id: [u8; 32],
        server_agent: Pubkey,
        data_hash: [u8; 32],
        validation_type: u8,
        deadline: i64,
        stake: u64,
    ) -> Result<()> {
        instructions::request_validation::handler(
            ctx,
            request_id,
            task_id,
            server_agent,
            data_hash,
            validation_type,
            deadline,
            stake,
        )
    }

    /// Re-execution result backed by collateral.
    /// Settles the request in the same instruction if consensus is reached.
    pub fn submit_stake_validation(
        ctx: Context<SubmitStakeValidation>,
        computed_hash: [u8; 32],
        collateral: u64,
    ) -> Result<()> {
        instructions::submit_stake_validation::handler(ctx, computed_hash, collateral)
    }

    /// Attestation signed by a governance-approved TEE key.
    /// Settles the request in the same instruction if consensus is reached.
    pub fn submit_tee_attestation(
        ctx: Context<SubmitTeeAttestation>,
        attestation: TeeAttestation,
        proof: Vec<u8>,
    ) -> Result<()> {
        instructions::submit_tee_attestation::handler(ctx, attestation, proof)
    }

    /// Expire a request past its deadline and refund all locked value.
    pub fn finalize_expired_validation(ctx: Context<FinalizeExpiredValidation>) -> Result<()> {
        instructions::finalize_expired_validation::handler(ctx)
    }

    /// Withdraw the caller's pending balance.
    pub fn withdraw(ctx: Context<Withdraw>) -> Result<()> {
        instructions::withdraw::handler(ctx)
    }
}
