//! Shared constants for instruction handlers

/// Base for percentage calculations (100 = 100%)
pub const PERCENT_BASE: u64 = 100;

/// Maximum valid percentage value
pub const MAX_PERCENT: u8 = 100;

/// Fixed-point scale applied to consensus rates
pub const CONSENSUS_PRECISION: u128 = 1_000_000;

// ============================================================================
// Request Window Constants
// ============================================================================

/// Deadline must be more than this far in the future (1 hour)
pub const MIN_DEADLINE_SECONDS: i64 = 3600;

/// Deadline must be less than this far in the future (30 days)
pub const MAX_DEADLINE_SECONDS: i64 = 30 * 24 * 3600;

/// Domain separator for request id derivation
pub const REQUEST_ID_DOMAIN: &[u8] = b"validation_request";

// ============================================================================
// Configuration Bounds
// ============================================================================

/// Reward pool may never exceed half the requester stake
pub const MAX_REWARD_PERCENTAGE: u8 = 50;

/// A decision needs a strict majority of weight
pub const MIN_CONSENSUS_THRESHOLD: u8 = 51;

// ============================================================================
// Reputation-Weighted Stake Constants
// ============================================================================

/// Success rate (percent) at or above which collateral is discounted
pub const HIGH_REPUTATION_RATE: u64 = 90;

/// Success rate (percent) below which collateral is doubled
pub const LOW_REPUTATION_RATE: u64 = 70;

/// Collateral multiplier for high-reputation validators (percent of base)
pub const HIGH_REPUTATION_STAKE_PCT: u64 = 50;

/// Collateral multiplier for low-reputation validators (percent of base)
pub const LOW_REPUTATION_STAKE_PCT: u64 = 200;

// ============================================================================
// TEE Attestation Constants
// ============================================================================

/// Maximum attestation proof length in bytes
pub const MAX_PROOF_LEN: usize = 512;
