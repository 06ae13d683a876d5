//! Response collection shared by `submit_stake_validation` and
//! `submit_tee_attestation`.
//!
//! Admission checks are split around the identity lookup so handlers run
//! them in a fixed order:
//! 1. `check_request_open` (status, finality, deadline, participants, duplicates)
//! 2. identity oracle (in the handler)
//! 3. `check_response_admissible` (validation type, response cap)
//!
//! `accept_response` then records the response, evaluates consensus and, on a
//! decision, settles and finalizes in the same instruction.

use crate::errors::RegistryError;
use crate::events::{
    SettlementCompleted, ValidationFinalized, ValidationResponseSubmitted, ValidatorRewarded,
    ValidatorSlashed,
};
use crate::instructions::consensus_helpers::{decide, outcome_code, tally, ConsensusOutcome, Tally};
use crate::instructions::settlement_helpers::{
    apply_settlement, compute_settlement, PayoutRole, SettlementPlan, SubmitterAccounts,
};
use crate::state::{
    PendingWithdrawal, RegistryConfig, ResponseKind, ValidationRequest, ValidationResponse,
    ValidationStatus, ValidatorStats,
};
use anchor_lang::prelude::*;

/// First group of admission checks, independent of the response payload.
pub fn check_request_open(request: &ValidationRequest, validator: &Pubkey, now: i64) -> Result<()> {
    require!(
        request.status == ValidationStatus::Pending,
        RegistryError::RequestNotPending
    );
    require!(!request.finalized, RegistryError::RequestAlreadyFinalized);
    require!(now <= request.deadline, RegistryError::DeadlinePassed);
    require!(
        *validator != request.requester && *validator != request.server_agent,
        RegistryError::ValidatorIsParticipant
    );
    require!(
        !request.has_responded(validator),
        RegistryError::DuplicateResponse
    );
    Ok(())
}

/// Second group of admission checks: response kind and capacity.
pub fn check_response_admissible(
    request: &ValidationRequest,
    config: &RegistryConfig,
    kind: ResponseKind,
) -> Result<()> {
    require!(
        request.validation_type.accepts(kind),
        RegistryError::ValidationTypeMismatch
    );
    require!(
        request.responses.len() < config.max_responses_per_request as usize,
        RegistryError::ResponseCapReached
    );
    Ok(())
}

/// Fill in identity fields of validator accounts created by `init_if_needed`.
pub fn init_validator_accounts(
    stats: &mut ValidatorStats,
    pending: &mut PendingWithdrawal,
    validator: Pubkey,
    stats_bump: u8,
    pending_bump: u8,
) {
    if stats.validator == Pubkey::default() {
        stats.validator = validator;
        stats.bump = stats_bump;
    }
    if pending.owner == Pubkey::default() {
        pending.owner = validator;
        pending.bump = pending_bump;
    }
}

/// Append a response and count it in the validator's history.
pub fn record_response(
    request: &mut ValidationRequest,
    stats: &mut ValidatorStats,
    response: ValidationResponse,
) -> Result<()> {
    request.responses.push(response);
    stats.total_validations = stats
        .total_validations
        .checked_add(1)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    stats.active = true;
    stats.last_validation_at = response.responded_at;
    Ok(())
}

/// Tally the request and decide whether it reached a terminal outcome.
pub fn evaluate_consensus(
    request: &ValidationRequest,
    config: &RegistryConfig,
) -> Result<(Tally, ConsensusOutcome)> {
    let current = tally(&request.responses)?;
    let decision = decide(
        &current,
        config.min_validators_required,
        config.consensus_threshold,
    )?;
    Ok((current, decision))
}

/// Accounts touched by an accepted response
pub struct ResponseAccounts<'a, 'info> {
    pub request: &'a mut Account<'info, ValidationRequest>,
    pub config: &'a mut Account<'info, RegistryConfig>,
    pub validator_stats: &'a mut Account<'info, ValidatorStats>,
    pub validator_pending: &'a mut Account<'info, PendingWithdrawal>,
    pub requester_pending: &'a mut Account<'info, PendingWithdrawal>,
}

/// Record an admitted response, then settle if it produced a decision.
///
/// Collateral (if any) must already sit in the request escrow.
pub fn accept_response<'info>(
    accounts: ResponseAccounts<'_, 'info>,
    response: ValidationResponse,
    proof: Vec<u8>,
    remaining_accounts: &[AccountInfo],
    program_id: &Pubkey,
) -> Result<()> {
    let ResponseAccounts {
        request,
        config,
        validator_stats,
        validator_pending,
        requester_pending,
    } = accounts;
    let now = response.responded_at;

    record_response(request, validator_stats, response)?;
    config.total_responses = config
        .total_responses
        .checked_add(1)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    config.total_locked = config
        .total_locked
        .checked_add(response.validator_stake)
        .ok_or(RegistryError::ArithmeticOverflow)?;

    emit!(ValidationResponseSubmitted {
        request_id: request.request_id,
        validator: response.validator,
        kind: response.kind as u8,
        success: response.success,
        computed_hash: response.computed_hash,
        validator_stake: response.validator_stake,
        weight: response.weight,
        response_count: request.responses.len() as u8,
        attestation_key: response.attestation_key,
        proof,
        timestamp: now,
    });

    let (current, decision) = evaluate_consensus(request, config)?;
    let Some(status) = decision.status() else {
        return Ok(());
    };

    let locked_value = request.locked_value()?;
    let plan = compute_settlement(
        request.stake,
        &request.responses,
        status,
        config.reward_percentage,
        config.slashing_percentage,
    )?;
    plan.verify_balanced(locked_value)?;

    let request_info = request.to_account_info();
    apply_settlement(
        &plan,
        &request_info,
        requester_pending,
        SubmitterAccounts {
            stats: validator_stats,
            pending: validator_pending,
        },
        remaining_accounts,
        program_id,
    )?;

    request.success_weight = current.success_weight;
    request.fail_weight = current.fail_weight;
    request.finalize(status, now)?;

    record_finalization(config, locked_value)?;

    msg!(
        "Settled request: outcome={} responses={} requester_credit={} reward_paid={} slashed={}",
        outcome_code(status),
        request.responses.len(),
        plan.requester_credit,
        plan.reward_paid,
        plan.total_slashed
    );
    emit_settlement_events(request, &plan, status, now)?;

    Ok(())
}

/// Move a request's locked value from the locked counter to the credited one.
pub fn record_finalization(config: &mut RegistryConfig, locked_value: u64) -> Result<()> {
    config.total_locked = config
        .total_locked
        .checked_sub(locked_value)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    config.total_credited = config
        .total_credited
        .checked_add(locked_value)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    config.total_finalized = config
        .total_finalized
        .checked_add(1)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    Ok(())
}

fn emit_settlement_events(
    request: &ValidationRequest,
    plan: &SettlementPlan,
    status: ValidationStatus,
    timestamp: i64,
) -> Result<()> {
    for payout in &plan.payouts {
        match payout.role {
            PayoutRole::Honest => emit!(ValidatorRewarded {
                request_id: request.request_id,
                validator: payout.validator,
                reward: payout.reward,
                collateral_returned: payout.collateral_returned,
                timestamp,
            }),
            PayoutRole::Dishonest => emit!(ValidatorSlashed {
                request_id: request.request_id,
                validator: payout.validator,
                slashed: payout.slashed,
                collateral_returned: payout.collateral_returned,
                timestamp,
            }),
            PayoutRole::Neutral => {}
        }
    }

    emit!(SettlementCompleted {
        request_id: request.request_id,
        outcome: outcome_code(status),
        reward_pool: plan.reward_pool,
        reward_paid: plan.reward_paid,
        total_slashed: plan.total_slashed,
        requester_credit: plan.requester_credit,
        validator_credits: plan.validator_credits()?,
        timestamp,
    });

    emit!(ValidationFinalized {
        request_id: request.request_id,
        task_id: request.task_id,
        server_agent: request.server_agent,
        outcome: outcome_code(status),
        success_weight: request.success_weight,
        fail_weight: request.fail_weight,
        timestamp,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ValidationType;

    const NOW: i64 = 1_700_000_000;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn pending_request(validation_type: ValidationType) -> ValidationRequest {
        ValidationRequest {
            requester: key(1),
            server_agent: key(2),
            validation_type,
            stake: 1_000,
            deadline: NOW + 3600,
            ..Default::default()
        }
    }

    fn response_from(n: u8, success: bool) -> ValidationResponse {
        ValidationResponse {
            validator: key(n),
            success,
            validator_stake: 100,
            weight: 100,
            responded_at: NOW,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_request_accepts_new_validator() {
        check_request_open(&pending_request(ValidationType::Stake), &key(10), NOW).unwrap();
    }

    #[test]
    fn test_terminal_request_rejects() {
        let mut request = pending_request(ValidationType::Stake);
        request.finalize(ValidationStatus::Validated, NOW).unwrap();
        assert_eq!(
            check_request_open(&request, &key(10), NOW).unwrap_err(),
            RegistryError::RequestNotPending.into()
        );
    }

    #[test]
    fn test_finalized_flag_rejects_even_if_pending() {
        let mut request = pending_request(ValidationType::Stake);
        request.finalized = true;
        assert_eq!(
            check_request_open(&request, &key(10), NOW).unwrap_err(),
            RegistryError::RequestAlreadyFinalized.into()
        );
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let request = pending_request(ValidationType::Stake);
        check_request_open(&request, &key(10), request.deadline).unwrap();
        assert_eq!(
            check_request_open(&request, &key(10), request.deadline + 1).unwrap_err(),
            RegistryError::DeadlinePassed.into()
        );
    }

    #[test]
    fn test_participants_cannot_validate() {
        let request = pending_request(ValidationType::Stake);
        for participant in [request.requester, request.server_agent] {
            assert_eq!(
                check_request_open(&request, &participant, NOW).unwrap_err(),
                RegistryError::ValidatorIsParticipant.into()
            );
        }
    }

    #[test]
    fn test_duplicate_response_rejected() {
        let mut request = pending_request(ValidationType::Stake);
        let mut stats = ValidatorStats::default();
        record_response(&mut request, &mut stats, response_from(10, true)).unwrap();
        assert_eq!(
            check_request_open(&request, &key(10), NOW).unwrap_err(),
            RegistryError::DuplicateResponse.into()
        );
        check_request_open(&request, &key(11), NOW).unwrap();
    }

    #[test]
    fn test_type_mismatch() {
        let config = RegistryConfig::default();
        let stake_only = pending_request(ValidationType::Stake);
        let tee_only = pending_request(ValidationType::Tee);
        let hybrid = pending_request(ValidationType::Hybrid);

        assert_eq!(
            check_response_admissible(&stake_only, &config, ResponseKind::Tee).unwrap_err(),
            RegistryError::ValidationTypeMismatch.into()
        );
        assert_eq!(
            check_response_admissible(&tee_only, &config, ResponseKind::Stake).unwrap_err(),
            RegistryError::ValidationTypeMismatch.into()
        );
        check_response_admissible(&hybrid, &config, ResponseKind::Stake).unwrap();
        check_response_admissible(&hybrid, &config, ResponseKind::Tee).unwrap();
    }

    #[test]
    fn test_response_cap() {
        let config = RegistryConfig {
            max_responses_per_request: 2,
            ..Default::default()
        };
        let mut request = pending_request(ValidationType::Stake);
        let mut stats = ValidatorStats::default();
        record_response(&mut request, &mut stats, response_from(10, true)).unwrap();
        check_response_admissible(&request, &config, ResponseKind::Stake).unwrap();
        record_response(&mut request, &mut stats, response_from(11, true)).unwrap();
        assert_eq!(
            check_response_admissible(&request, &config, ResponseKind::Stake).unwrap_err(),
            RegistryError::ResponseCapReached.into()
        );
    }

    #[test]
    fn test_record_response_updates_stats() {
        let mut request = pending_request(ValidationType::Stake);
        let mut stats = ValidatorStats::default();
        record_response(&mut request, &mut stats, response_from(10, false)).unwrap();
        assert_eq!(request.responses.len(), 1);
        assert_eq!(stats.total_validations, 1);
        assert!(stats.active);
        assert_eq!(stats.last_validation_at, NOW);
        // Outcome counters only move at settlement
        assert_eq!(stats.successful_validations, 0);
        assert_eq!(stats.failed_validations, 0);
    }

    #[test]
    fn test_consensus_defers_until_minimum() {
        let config = RegistryConfig::default();
        let mut request = pending_request(ValidationType::Stake);
        let mut stats = ValidatorStats::default();
        for n in 10..12 {
            record_response(&mut request, &mut stats, response_from(n, true)).unwrap();
            let (_, decision) = evaluate_consensus(&request, &config).unwrap();
            assert_eq!(decision, ConsensusOutcome::Deferred);
        }
        record_response(&mut request, &mut stats, response_from(12, true)).unwrap();
        let (current, decision) = evaluate_consensus(&request, &config).unwrap();
        assert_eq!(decision, ConsensusOutcome::Validated);
        assert_eq!(current.success_weight, 300);
    }

    #[test]
    fn test_record_finalization_moves_locked_to_credited() {
        let mut config = RegistryConfig {
            total_locked: 1_500,
            ..Default::default()
        };
        record_finalization(&mut config, 1_200).unwrap();
        assert_eq!(config.total_locked, 300);
        assert_eq!(config.total_credited, 1_200);
        assert_eq!(config.total_finalized, 1);
        assert!(record_finalization(&mut config, 301).is_err());
    }
}
