//! Settlement of a decided or expired validation request.
//!
//! Settlement is split in two steps:
//! 1. `compute_settlement` / `compute_refund` build a `SettlementPlan` from the
//!    request alone. The plan is pure data and must balance against the value
//!    locked in the request.
//! 2. `apply_settlement` / `apply_refund` move the planned lamports out of the
//!    request escrow into pending-withdrawal accounts and update validator
//!    stats.
//!
//! Nothing is ever pushed to a wallet; every credit lands in a
//! `PendingWithdrawal` and is pulled later through `withdraw`.
//!
//! # remaining_accounts layout
//!
//! - Decision path (`submit_*`): one `(validator_stats, pending_withdrawal)`
//!   pair per response in submission order, skipping the submitter whose
//!   accounts are fixed instruction accounts.
//! - Expiry path: one `pending_withdrawal` per response in submission order.

use crate::errors::RegistryError;
use crate::instructions::constants::PERCENT_BASE;
use crate::instructions::lamport_transfer::{credit_lamports, debit_lamports};
use crate::state::{PendingWithdrawal, ValidationResponse, ValidationStatus, ValidatorStats};
use anchor_lang::prelude::*;

/// Seed prefix of `ValidatorStats` PDAs
pub const VALIDATOR_STATS_SEED: &[u8] = b"validator_stats";

/// Seed prefix of `PendingWithdrawal` PDAs
pub const PENDING_SEED: &[u8] = b"pending";

/// How a validator's response relates to the decided outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayoutRole {
    /// Matched the outcome: collateral back plus a reward share
    Honest,
    /// Contradicted the outcome: collateral slashed
    Dishonest,
    /// Disputed or expired request: collateral back, no stats change
    Neutral,
}

/// Credits owed to one validator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatorPayout {
    pub validator: Pubkey,
    pub role: PayoutRole,
    pub collateral_returned: u64,
    pub reward: u64,
    pub slashed: u64,
}

impl ValidatorPayout {
    /// Lamports credited to the validator's pending balance.
    pub fn credit(&self) -> Result<u64> {
        self.collateral_returned
            .checked_add(self.reward)
            .ok_or(error!(RegistryError::ArithmeticOverflow))
    }
}

/// Full distribution of a request's locked value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementPlan {
    pub reward_pool: u64,
    pub reward_paid: u64,
    pub total_slashed: u64,
    pub requester_credit: u64,
    /// One entry per response, in submission order
    pub payouts: Vec<ValidatorPayout>,
}

impl SettlementPlan {
    pub fn validator_credits(&self) -> Result<u64> {
        self.payouts.iter().try_fold(0u64, |acc, payout| {
            acc.checked_add(payout.credit()?)
                .ok_or(error!(RegistryError::ArithmeticOverflow))
        })
    }

    pub fn total_credits(&self) -> Result<u64> {
        self.requester_credit
            .checked_add(self.validator_credits()?)
            .ok_or(error!(RegistryError::ArithmeticOverflow))
    }

    /// Every locked lamport must be credited exactly once.
    pub fn verify_balanced(&self, locked_value: u64) -> Result<()> {
        require!(
            self.total_credits()? == locked_value,
            RegistryError::SettlementImbalance
        );
        Ok(())
    }
}

/// `amount * percentage / 100`, rounded down.
fn percent_of(amount: u64, percentage: u8) -> u64 {
    // Result is <= amount for percentage <= 100
    ((amount as u128) * (percentage as u128) / (PERCENT_BASE as u128)) as u64
}

/// Plan the distribution of a request that reached VALIDATED or FAILED.
///
/// DISPUTED and EXPIRED delegate to `compute_refund`.
pub fn compute_settlement(
    stake: u64,
    responses: &[ValidationResponse],
    outcome: ValidationStatus,
    reward_percentage: u8,
    slashing_percentage: u8,
) -> Result<SettlementPlan> {
    let winning_side = match outcome {
        ValidationStatus::Validated => true,
        ValidationStatus::Failed => false,
        ValidationStatus::Disputed | ValidationStatus::Expired => {
            return compute_refund(stake, responses)
        }
        ValidationStatus::Pending => return Err(RegistryError::InvalidStatusTransition.into()),
    };
    require!(
        reward_percentage as u64 <= PERCENT_BASE && slashing_percentage as u64 <= PERCENT_BASE,
        RegistryError::ArithmeticOverflow
    );

    let reward_pool = percent_of(stake, reward_percentage);
    let honest_count = responses
        .iter()
        .filter(|r| r.success == winning_side)
        .count() as u64;

    // With nobody to pay, the pool stays with the requester
    let (share, mut remainder, reward_paid) = if honest_count == 0 {
        (0, 0, 0)
    } else {
        (
            reward_pool / honest_count,
            reward_pool % honest_count,
            reward_pool,
        )
    };

    let mut total_slashed: u64 = 0;
    let mut payouts = Vec::with_capacity(responses.len());
    for response in responses {
        if response.success == winning_side {
            let reward = share
                .checked_add(remainder)
                .ok_or(RegistryError::ArithmeticOverflow)?;
            remainder = 0;
            payouts.push(ValidatorPayout {
                validator: response.validator,
                role: PayoutRole::Honest,
                collateral_returned: response.validator_stake,
                reward,
                slashed: 0,
            });
        } else {
            let slashed = percent_of(response.validator_stake, slashing_percentage);
            total_slashed = total_slashed
                .checked_add(slashed)
                .ok_or(RegistryError::ArithmeticOverflow)?;
            payouts.push(ValidatorPayout {
                validator: response.validator,
                role: PayoutRole::Dishonest,
                collateral_returned: response.validator_stake - slashed,
                reward: 0,
                slashed,
            });
        }
    }

    let requester_credit = stake
        .checked_sub(reward_paid)
        .and_then(|v| v.checked_add(total_slashed))
        .ok_or(RegistryError::ArithmeticOverflow)?;

    Ok(SettlementPlan {
        reward_pool,
        reward_paid,
        total_slashed,
        requester_credit,
        payouts,
    })
}

/// Plan a full refund: stake to the requester, collateral to each validator.
pub fn compute_refund(stake: u64, responses: &[ValidationResponse]) -> Result<SettlementPlan> {
    Ok(SettlementPlan {
        reward_pool: 0,
        reward_paid: 0,
        total_slashed: 0,
        requester_credit: stake,
        payouts: responses
            .iter()
            .map(|r| ValidatorPayout {
                validator: r.validator,
                role: PayoutRole::Neutral,
                collateral_returned: r.validator_stake,
                reward: 0,
                slashed: 0,
            })
            .collect(),
    })
}

/// Fold a payout into the validator's cumulative history.
pub fn record_payout(stats: &mut ValidatorStats, payout: &ValidatorPayout) -> Result<()> {
    match payout.role {
        PayoutRole::Honest => {
            stats.successful_validations = stats
                .successful_validations
                .checked_add(1)
                .ok_or(RegistryError::ArithmeticOverflow)?;
            stats.total_rewards = stats
                .total_rewards
                .checked_add(payout.reward)
                .ok_or(RegistryError::ArithmeticOverflow)?;
        }
        PayoutRole::Dishonest => {
            stats.failed_validations = stats
                .failed_validations
                .checked_add(1)
                .ok_or(RegistryError::ArithmeticOverflow)?;
            stats.total_slashed = stats
                .total_slashed
                .checked_add(payout.slashed)
                .ok_or(RegistryError::ArithmeticOverflow)?;
        }
        PayoutRole::Neutral => {}
    }
    Ok(())
}

/// Accounts fixed by the submitting instruction
pub struct SubmitterAccounts<'a, 'info> {
    pub stats: &'a mut Account<'info, ValidatorStats>,
    pub pending: &'a mut Account<'info, PendingWithdrawal>,
}

/// Distribute a decision plan.
///
/// The last payout belongs to the submitter (its response was just appended);
/// all earlier payouts are matched against `(stats, pending)` pairs in
/// `remaining_accounts`.
pub fn apply_settlement<'info>(
    plan: &SettlementPlan,
    request_info: &AccountInfo<'info>,
    requester_pending: &mut Account<'info, PendingWithdrawal>,
    submitter: SubmitterAccounts<'_, 'info>,
    remaining_accounts: &[AccountInfo],
    program_id: &Pubkey,
) -> Result<()> {
    let (own_payout, others) = plan
        .payouts
        .split_last()
        .ok_or(RegistryError::InvalidSettlementAccounts)?;
    require!(
        remaining_accounts.len() == others.len() * 2,
        RegistryError::InvalidSettlementAccounts
    );
    require_keys_eq!(
        submitter.stats.validator,
        own_payout.validator,
        RegistryError::InvalidSettlementAccounts
    );
    require_keys_eq!(
        submitter.pending.owner,
        own_payout.validator,
        RegistryError::InvalidSettlementAccounts
    );

    debit_lamports(request_info, plan.total_credits()?)?;

    for (payout, pair) in others.iter().zip(remaining_accounts.chunks_exact(2)) {
        update_stats_account(&pair[0], payout, program_id)?;
        credit_pending_account(&pair[1], &payout.validator, payout.credit()?, program_id)?;
    }

    record_payout(submitter.stats, own_payout)?;
    let own_credit = own_payout.credit()?;
    submitter.pending.credit(own_credit)?;
    credit_lamports(&submitter.pending.to_account_info(), own_credit)?;

    requester_pending.credit(plan.requester_credit)?;
    credit_lamports(&requester_pending.to_account_info(), plan.requester_credit)?;

    Ok(())
}

/// Distribute a refund plan for an expired request.
///
/// Stats are left untouched; `remaining_accounts` holds one pending account
/// per response.
pub fn apply_refund<'info>(
    plan: &SettlementPlan,
    request_info: &AccountInfo<'info>,
    requester_pending: &mut Account<'info, PendingWithdrawal>,
    remaining_accounts: &[AccountInfo],
    program_id: &Pubkey,
) -> Result<()> {
    require!(
        remaining_accounts.len() == plan.payouts.len(),
        RegistryError::InvalidSettlementAccounts
    );

    debit_lamports(request_info, plan.total_credits()?)?;

    for (payout, pending_info) in plan.payouts.iter().zip(remaining_accounts) {
        credit_pending_account(pending_info, &payout.validator, payout.credit()?, program_id)?;
    }

    requester_pending.credit(plan.requester_credit)?;
    credit_lamports(&requester_pending.to_account_info(), plan.requester_credit)?;

    Ok(())
}

/// Load, verify, update and store a `ValidatorStats` passed as a raw account.
fn update_stats_account(
    stats_info: &AccountInfo,
    payout: &ValidatorPayout,
    program_id: &Pubkey,
) -> Result<()> {
    require!(
        stats_info.owner == program_id,
        RegistryError::InvalidAccountOwner
    );
    require!(
        stats_info.is_writable,
        RegistryError::InvalidSettlementAccounts
    );

    let mut data = stats_info.try_borrow_mut_data()?;
    let mut stats = ValidatorStats::try_deserialize(&mut &data[..])?;
    require_keys_eq!(
        stats.validator,
        payout.validator,
        RegistryError::InvalidSettlementAccounts
    );
    let expected = Pubkey::create_program_address(
        &[VALIDATOR_STATS_SEED, payout.validator.as_ref(), &[stats.bump]],
        program_id,
    )
    .map_err(|_| error!(RegistryError::InvalidSettlementAccounts))?;
    require_keys_eq!(
        stats_info.key(),
        expected,
        RegistryError::InvalidSettlementAccounts
    );

    record_payout(&mut stats, payout)?;

    let mut writer: &mut [u8] = &mut data[..];
    stats.try_serialize(&mut writer)?;
    Ok(())
}

/// Load, verify and credit a `PendingWithdrawal` passed as a raw account.
fn credit_pending_account(
    pending_info: &AccountInfo,
    owner: &Pubkey,
    amount: u64,
    program_id: &Pubkey,
) -> Result<()> {
    require!(
        pending_info.owner == program_id,
        RegistryError::InvalidAccountOwner
    );
    require!(
        pending_info.is_writable,
        RegistryError::InvalidSettlementAccounts
    );

    {
        let mut data = pending_info.try_borrow_mut_data()?;
        let mut pending = PendingWithdrawal::try_deserialize(&mut &data[..])?;
        require_keys_eq!(
            pending.owner,
            *owner,
            RegistryError::InvalidSettlementAccounts
        );
        let expected = Pubkey::create_program_address(
            &[PENDING_SEED, owner.as_ref(), &[pending.bump]],
            program_id,
        )
        .map_err(|_| error!(RegistryError::InvalidSettlementAccounts))?;
        require_keys_eq!(
            pending_info.key(),
            expected,
            RegistryError::InvalidSettlementAccounts
        );

        pending.credit(amount)?;

        let mut writer: &mut [u8] = &mut data[..];
        pending.try_serialize(&mut writer)?;
    }

    credit_lamports(pending_info, amount)
}
