//! Registry invariant checks for fuzz testing
//!
//! Each check returns a result enum instead of panicking so targets can
//! report the violated invariant together with the offending values.

use validation_registry::instructions::settlement_helpers::{PayoutRole, SettlementPlan};
use validation_registry::state::{ValidationRequest, ValidationResponse, ValidatorStats};

/// Value conservation results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationInvariantResult {
    Valid,
    /// Escrowed lamports differ from the locked counter
    LockedMismatch { escrowed: u64, total_locked: u64 },
    /// Pending balances differ from credited minus withdrawn
    CreditedMismatch { pending: u64, credited: u64, withdrawn: u64 },
    /// Deposits are not fully accounted for as locked or credited
    DepositLeak { deposited: u64, locked: u64, credited: u64 },
    /// A pending account holds fewer lamports than it owes
    UnbackedPending { owed: u64, lamports: u64 },
    CounterOverflow,
}

/// Settlement plan results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementInvariantResult {
    Valid,
    Imbalance { credits: u64, locked: u64 },
    RewardExceedsPool { paid: u64, pool: u64 },
    PoolExceedsStake { pool: u64, stake: u64 },
    SlashExceedsCollateral { slashed: u64, collateral: u64 },
    HonestLostCollateral { returned: u64, collateral: u64 },
    PayoutOrderMismatch { index: usize },
}

/// Request state results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestInvariantResult {
    Valid,
    ResponsesExceedCap { count: usize, cap: usize },
    DuplicateValidator { index: usize },
    FinalizedFlagMismatch { status: u8, finalized: bool },
    TerminalStateModified { status: u8 },
    EscrowNotDrained { remaining: u64 },
}

/// Validator stats results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsInvariantResult {
    Valid,
    OutcomesExceedTotal { successful: u64, failed: u64, total: u64 },
}

/// Withdrawal results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalInvariantResult {
    Valid,
    BalanceNotZeroed { remaining: u64 },
    DoubleWithdrawal { amount: u64 },
}

// ============================================================================
// Conservation
// ============================================================================

/// Every lamport sitting in request escrows is counted in `total_locked`.
pub fn check_locked_conservation(escrowed: u64, total_locked: u64) -> ConservationInvariantResult {
    if escrowed != total_locked {
        ConservationInvariantResult::LockedMismatch {
            escrowed,
            total_locked,
        }
    } else {
        ConservationInvariantResult::Valid
    }
}

/// `total_credited == total_withdrawn + sum(pending.amount)`
pub fn check_credit_conservation(
    pending: u64,
    credited: u64,
    withdrawn: u64,
) -> ConservationInvariantResult {
    match withdrawn.checked_add(pending) {
        Some(sum) if sum == credited => ConservationInvariantResult::Valid,
        Some(_) => ConservationInvariantResult::CreditedMismatch {
            pending,
            credited,
            withdrawn,
        },
        None => ConservationInvariantResult::CounterOverflow,
    }
}

/// Every deposited lamport is either still locked or has been credited.
pub fn check_deposit_conservation(
    deposited: u64,
    locked: u64,
    credited: u64,
) -> ConservationInvariantResult {
    match locked.checked_add(credited) {
        Some(sum) if sum == deposited => ConservationInvariantResult::Valid,
        Some(_) => ConservationInvariantResult::DepositLeak {
            deposited,
            locked,
            credited,
        },
        None => ConservationInvariantResult::CounterOverflow,
    }
}

pub fn check_pending_backed(owed: u64, lamports: u64) -> ConservationInvariantResult {
    if lamports < owed {
        ConservationInvariantResult::UnbackedPending { owed, lamports }
    } else {
        ConservationInvariantResult::Valid
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Structural checks on a plan against the responses it was built from.
pub fn check_settlement_plan(
    plan: &SettlementPlan,
    stake: u64,
    responses: &[ValidationResponse],
) -> SettlementInvariantResult {
    let locked = responses
        .iter()
        .try_fold(stake, |acc, r| acc.checked_add(r.validator_stake));
    let credits = plan.total_credits().ok();
    match (credits, locked) {
        (Some(credits), Some(locked)) if credits != locked => {
            return SettlementInvariantResult::Imbalance { credits, locked };
        }
        (None, _) | (_, None) => {
            return SettlementInvariantResult::Imbalance {
                credits: credits.unwrap_or(u64::MAX),
                locked: locked.unwrap_or(u64::MAX),
            };
        }
        _ => {}
    }

    if plan.reward_paid > plan.reward_pool {
        return SettlementInvariantResult::RewardExceedsPool {
            paid: plan.reward_paid,
            pool: plan.reward_pool,
        };
    }
    if plan.reward_pool > stake {
        return SettlementInvariantResult::PoolExceedsStake {
            pool: plan.reward_pool,
            stake,
        };
    }

    for (index, (payout, response)) in plan.payouts.iter().zip(responses).enumerate() {
        if payout.validator != response.validator {
            return SettlementInvariantResult::PayoutOrderMismatch { index };
        }
        if payout.slashed > response.validator_stake {
            return SettlementInvariantResult::SlashExceedsCollateral {
                slashed: payout.slashed,
                collateral: response.validator_stake,
            };
        }
        if payout.role != PayoutRole::Dishonest
            && payout.collateral_returned != response.validator_stake
        {
            return SettlementInvariantResult::HonestLostCollateral {
                returned: payout.collateral_returned,
                collateral: response.validator_stake,
            };
        }
    }
    if plan.payouts.len() != responses.len() {
        return SettlementInvariantResult::PayoutOrderMismatch {
            index: plan.payouts.len().min(responses.len()),
        };
    }

    SettlementInvariantResult::Valid
}

// ============================================================================
// Request State
// ============================================================================

pub fn check_request_state(request: &ValidationRequest, cap: usize) -> RequestInvariantResult {
    if request.responses.len() > cap {
        return RequestInvariantResult::ResponsesExceedCap {
            count: request.responses.len(),
            cap,
        };
    }
    for (index, response) in request.responses.iter().enumerate() {
        if request.responses[..index]
            .iter()
            .any(|earlier| earlier.validator == response.validator)
        {
            return RequestInvariantResult::DuplicateValidator { index };
        }
    }
    if request.finalized != request.status.is_terminal() {
        return RequestInvariantResult::FinalizedFlagMismatch {
            status: request.status as u8,
            finalized: request.finalized,
        };
    }
    RequestInvariantResult::Valid
}

/// Terminal requests never change status, stake, or responses.
pub fn check_terminal_immutable(
    before: &ValidationRequest,
    after: &ValidationRequest,
) -> RequestInvariantResult {
    if !before.status.is_terminal() {
        return RequestInvariantResult::Valid;
    }
    if before.status != after.status
        || before.stake != after.stake
        || before.responses != after.responses
        || before.finalized_at != after.finalized_at
    {
        return RequestInvariantResult::TerminalStateModified {
            status: before.status as u8,
        };
    }
    RequestInvariantResult::Valid
}

/// A terminal request has paid out its whole escrow.
pub fn check_escrow_drained(request: &ValidationRequest, escrow: u64) -> RequestInvariantResult {
    if request.status.is_terminal() && escrow != 0 {
        RequestInvariantResult::EscrowNotDrained { remaining: escrow }
    } else {
        RequestInvariantResult::Valid
    }
}

// ============================================================================
// Stats and Withdrawals
// ============================================================================

pub fn check_stats_consistency(stats: &ValidatorStats) -> StatsInvariantResult {
    let decided = stats
        .successful_validations
        .checked_add(stats.failed_validations);
    match decided {
        Some(decided) if decided <= stats.total_validations => StatsInvariantResult::Valid,
        _ => StatsInvariantResult::OutcomesExceedTotal {
            successful: stats.successful_validations,
            failed: stats.failed_validations,
            total: stats.total_validations,
        },
    }
}

/// After a successful withdrawal the balance is zero; a second withdrawal
/// must not pay anything.
pub fn check_withdrawal(
    balance_after: u64,
    second_attempt_paid: Option<u64>,
) -> WithdrawalInvariantResult {
    if balance_after != 0 {
        return WithdrawalInvariantResult::BalanceNotZeroed {
            remaining: balance_after,
        };
    }
    if let Some(amount) = second_attempt_paid {
        return WithdrawalInvariantResult::DoubleWithdrawal { amount };
    }
    WithdrawalInvariantResult::Valid
}
