//! Compute unit budgets for registry instructions.
//!
//! Clients should request these limits with
//! `ComputeBudgetInstruction::set_compute_unit_limit()` rather than relying
//! on the 200k default. The settlement estimate also bounds how many
//! responses a request may collect: a submission that triggers settlement
//! must finish inside one transaction.

// ============================================================================
// Recommended Compute Unit Budgets per Instruction
// ============================================================================

/// Initialize registry: one-time config init + multisig validation
pub const RECOMMENDED_CU_INITIALIZE_REGISTRY: u32 = 40_000;

/// Update registry config: multisig counting + bounds check
pub const RECOMMENDED_CU_UPDATE_REGISTRY_CONFIG: u32 = 20_000;

/// Request validation: id hash + identity PDA check + request/pending init + CPI transfer
pub const RECOMMENDED_CU_REQUEST_VALIDATION: u32 = 60_000;

/// Submit without settlement: identity check + stats/pending init + CPI transfer
pub const RECOMMENDED_CU_SUBMIT_RESPONSE: u32 = 60_000;

/// Withdraw: balance zeroing + direct lamport move
pub const RECOMMENDED_CU_WITHDRAW: u32 = 15_000;

/// Fixed part of a settlement: tally, plan, requester credit, events
pub const SETTLEMENT_BASE_CU: u32 = 40_000;

/// Per response: PDA re-derivation + stats and pending deserialize/serialize
pub const SETTLEMENT_PER_RESPONSE_CU: u32 = 12_000;

/// Per response for expiry refunds (pending account only)
pub const REFUND_PER_RESPONSE_CU: u32 = 6_000;

/// Solana per-transaction compute ceiling
pub const MAX_TRANSACTION_CU: u32 = 1_400_000;

/// Budget for a submission that triggers settlement over `responses` responses.
pub fn settlement_compute_units(responses: u8) -> u32 {
    RECOMMENDED_CU_SUBMIT_RESPONSE
        .saturating_add(SETTLEMENT_BASE_CU)
        .saturating_add(SETTLEMENT_PER_RESPONSE_CU.saturating_mul(responses as u32))
}

/// Budget for reaping an expired request with `responses` responses.
pub fn expiry_compute_units(responses: u8) -> u32 {
    SETTLEMENT_BASE_CU.saturating_add(REFUND_PER_RESPONSE_CU.saturating_mul(responses as u32))
}

/// Whether a request with `max_responses` responses can always be settled
/// inside one transaction.
pub fn settlement_fits_compute_budget(max_responses: u8) -> bool {
    settlement_compute_units(max_responses) <= MAX_TRANSACTION_CU
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MAX_RESPONSES_CAP;

    #[test]
    fn test_cu_budgets_are_reasonable() {
        assert!(RECOMMENDED_CU_INITIALIZE_REGISTRY <= MAX_TRANSACTION_CU);
        assert!(RECOMMENDED_CU_UPDATE_REGISTRY_CONFIG <= MAX_TRANSACTION_CU);
        assert!(RECOMMENDED_CU_REQUEST_VALIDATION <= MAX_TRANSACTION_CU);
        assert!(RECOMMENDED_CU_SUBMIT_RESPONSE <= MAX_TRANSACTION_CU);
        assert!(RECOMMENDED_CU_WITHDRAW <= MAX_TRANSACTION_CU);
    }

    #[test]
    fn test_response_cap_settles_in_one_transaction() {
        assert!(settlement_fits_compute_budget(MAX_RESPONSES_CAP as u8));
        assert!(expiry_compute_units(MAX_RESPONSES_CAP as u8) <= MAX_TRANSACTION_CU);
    }

    #[test]
    fn test_settlement_grows_with_responses() {
        assert!(settlement_compute_units(10) > settlement_compute_units(3));
        assert_eq!(
            settlement_compute_units(1) - settlement_compute_units(0),
            SETTLEMENT_PER_RESPONSE_CU
        );
    }

    #[test]
    fn test_absurd_response_counts_do_not_fit() {
        assert!(!settlement_fits_compute_budget(u8::MAX));
    }
}
