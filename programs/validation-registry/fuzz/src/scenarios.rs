//! Fuzz testing scenarios that simulate instruction execution
//!
//! The simulated registry keeps accounts in in-memory maps and lamports as
//! plain counters, then drives the program's own helpers for every check
//! and state change. Each operation runs against a draft copy that only
//! replaces the live state on success, so a failed operation leaves nothing
//! behind, like a reverted transaction.

use std::collections::{BTreeMap, BTreeSet};

use anchor_lang::error::{Error, ErrorCode};
use anchor_lang::prelude::{ProgramError, Pubkey};
use solana_sha256_hasher::hash;
use validation_registry::errors::RegistryError;
use validation_registry::instructions::config_helpers::{
    apply_config_update, validate_registry_params, write_params,
};
use validation_registry::instructions::constants::MAX_PROOF_LEN;
use validation_registry::instructions::request_helpers::{
    derive_request_id, validate_request_params, RequestParams,
};
use validation_registry::instructions::response_helpers::{
    check_request_open, check_response_admissible, evaluate_consensus, record_finalization,
    record_response,
};
use validation_registry::instructions::settlement_helpers::{
    compute_refund, compute_settlement, record_payout, SettlementPlan,
};
use validation_registry::instructions::stake_helpers::required_validator_stake;
use validation_registry::state::{
    ConfigUpdate, PendingWithdrawal, RegistryConfig, RegistryParams, ResponseKind,
    TeeAttestation, ValidationRequest, ValidationResponse, ValidationStatus, ValidatorStats,
    MAX_RESPONSES_CAP,
};

use crate::arbitrary::{LifecycleInput, RegistryAction, ResponseSpec};
use crate::invariants::*;

/// Result of a simulated operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationResult {
    Success,
    Error(String),
    InvariantViolation(String),
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SimulationResult::Error(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimulationResult::InvariantViolation(_))
    }

    /// Whether the operation failed with the given registry error.
    pub fn is_registry_error(&self, code: RegistryError) -> bool {
        matches!(self, SimulationResult::Error(name) if *name == code.name())
    }
}

impl From<Error> for SimulationResult {
    fn from(err: Error) -> Self {
        let name = match &err {
            Error::AnchorError(e) => e.error_name.clone(),
            Error::ProgramError(e) => e.program_error.to_string(),
        };
        // A plan that does not balance is a bug, never a user error
        if name == RegistryError::SettlementImbalance.name() {
            SimulationResult::InvariantViolation(name)
        } else {
            SimulationResult::Error(name)
        }
    }
}

/// Payload of a validator response
#[derive(Debug, Clone)]
pub enum Submission {
    Stake {
        computed_hash: [u8; 32],
        collateral: u64,
    },
    Tee {
        attestation: TeeAttestation,
        proof: Vec<u8>,
    },
}

impl Submission {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Submission::Stake { .. } => ResponseKind::Stake,
            Submission::Tee { .. } => ResponseKind::Tee,
        }
    }
}

/// In-memory registry
#[derive(Clone)]
pub struct SimulatedRegistry {
    pub config: RegistryConfig,
    pub now: i64,
    pub requests: BTreeMap<[u8; 32], ValidationRequest>,
    /// Lamports escrowed by each request account
    pub escrow: BTreeMap<[u8; 32], u64>,
    pub stats: BTreeMap<Pubkey, ValidatorStats>,
    pub pending: BTreeMap<Pubkey, PendingWithdrawal>,
    /// Lamports held by each pending account above its rent reserve
    pub pending_lamports: BTreeMap<Pubkey, u64>,
    /// Plans applied by settlements and expiries, by request id
    pub settlements: BTreeMap<[u8; 32], SettlementPlan>,
    /// Agents the identity oracle reports as active
    pub active_agents: BTreeSet<Pubkey>,
    /// Key hashes approved by governance
    pub trusted_keys: BTreeSet<[u8; 32]>,
    /// Lamports moved from wallets into escrows
    pub deposited: u64,
    /// Lamports moved from pending accounts back to wallets
    pub paid_out: u64,
}

impl SimulatedRegistry {
    /// Set up a registry with validated parameters.
    pub fn initialize(params: RegistryParams, now: i64) -> Result<Self, SimulationResult> {
        validate_registry_params(&params).map_err(SimulationResult::from)?;
        let mut config = RegistryConfig::default();
        write_params(&mut config, &params);
        Ok(Self {
            config,
            now,
            requests: BTreeMap::new(),
            escrow: BTreeMap::new(),
            stats: BTreeMap::new(),
            pending: BTreeMap::new(),
            pending_lamports: BTreeMap::new(),
            settlements: BTreeMap::new(),
            active_agents: BTreeSet::new(),
            trusted_keys: BTreeSet::new(),
            deposited: 0,
            paid_out: 0,
        })
    }

    pub fn register_agent(&mut self, agent: Pubkey) {
        self.active_agents.insert(agent);
    }

    pub fn deactivate_agent(&mut self, agent: &Pubkey) {
        self.active_agents.remove(agent);
    }

    pub fn approve_key(&mut self, key_hash: [u8; 32]) {
        self.trusted_keys.insert(key_hash);
    }

    pub fn advance_time(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds);
    }

    pub fn request(&self, request_id: &[u8; 32]) -> Option<&ValidationRequest> {
        self.requests.get(request_id)
    }

    pub fn pending_balance(&self, owner: &Pubkey) -> u64 {
        self.pending.get(owner).map(|p| p.amount).unwrap_or(0)
    }

    /// Run `op` on a draft and commit it only if it succeeds.
    fn transact(
        &mut self,
        op: impl FnOnce(&mut Self) -> anchor_lang::Result<()>,
    ) -> SimulationResult {
        let mut draft = self.clone();
        match op(&mut draft) {
            Ok(()) => {
                *self = draft;
                SimulationResult::Success
            }
            Err(err) => SimulationResult::from(err),
        }
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    pub fn update_config(&mut self, update: ConfigUpdate) -> SimulationResult {
        self.transact(|reg| apply_config_update(&mut reg.config, update).map(|_| ()))
    }

    pub fn request_validation(&mut self, requester: Pubkey, params: RequestParams) -> SimulationResult {
        self.transact(|reg| reg.apply_request(requester, params))
    }

    pub fn submit(
        &mut self,
        request_id: [u8; 32],
        validator: Pubkey,
        submission: Submission,
    ) -> SimulationResult {
        self.transact(|reg| reg.apply_submission(request_id, validator, submission))
    }

    pub fn finalize_expired(&mut self, request_id: [u8; 32]) -> SimulationResult {
        self.transact(|reg| reg.apply_expiry(request_id))
    }

    pub fn withdraw(&mut self, owner: Pubkey) -> SimulationResult {
        self.transact(|reg| reg.apply_withdrawal(owner))
    }

    fn apply_request(&mut self, requester: Pubkey, params: RequestParams) -> anchor_lang::Result<()> {
        let validation_type =
            validate_request_params(&params, self.config.min_requester_stake, self.now)?;
        if !self.active_agents.contains(&params.server_agent) {
            return Err(RegistryError::AgentNotActive.into());
        }

        let request_id = derive_request_id(&params, &requester);
        if self.requests.contains_key(&request_id) {
            return Err(ProgramError::AccountAlreadyInitialized.into());
        }

        self.lock(request_id, params.stake)?;
        self.ensure_pending(requester);
        self.config.total_requests = self
            .config
            .total_requests
            .checked_add(1)
            .ok_or(RegistryError::ArithmeticOverflow)?;

        self.requests.insert(
            request_id,
            ValidationRequest {
                request_id,
                task_id: params.task_id,
                requester,
                server_agent: params.server_agent,
                data_hash: params.data_hash,
                validation_type,
                stake: params.stake,
                deadline: params.deadline,
                status: ValidationStatus::Pending,
                created_at: self.now,
                ..Default::default()
            },
        );
        Ok(())
    }

    fn apply_submission(
        &mut self,
        request_id: [u8; 32],
        validator: Pubkey,
        submission: Submission,
    ) -> anchor_lang::Result<()> {
        let now = self.now;
        let mut request = self
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(ErrorCode::AccountNotInitialized)?;

        check_request_open(&request, &validator, now)?;
        if !self.active_agents.contains(&validator) {
            return Err(RegistryError::AgentNotActive.into());
        }
        check_response_admissible(&request, &self.config, submission.kind())?;

        let mut stats = self
            .stats
            .get(&validator)
            .cloned()
            .unwrap_or_else(|| ValidatorStats {
                validator,
                ..Default::default()
            });
        self.ensure_pending(validator);

        let response = match submission {
            Submission::Stake {
                computed_hash,
                collateral,
            } => {
                let required = required_validator_stake(self.config.min_validator_stake, &stats)?;
                if collateral < required {
                    return Err(RegistryError::InsufficientValidatorStake.into());
                }
                ValidationResponse {
                    validator,
                    kind: ResponseKind::Stake,
                    success: computed_hash == request.data_hash,
                    computed_hash,
                    validator_stake: collateral,
                    weight: collateral,
                    responded_at: now,
                    ..Default::default()
                }
            }
            Submission::Tee { attestation, proof } => {
                if !self.trusted_keys.contains(&attestation.key_hash) {
                    return Err(RegistryError::UntrustedAttestationKey.into());
                }
                if proof.is_empty() || proof.len() > MAX_PROOF_LEN {
                    return Err(RegistryError::InvalidProof.into());
                }
                ValidationResponse {
                    validator,
                    kind: ResponseKind::Tee,
                    success: attestation.result_hash == request.data_hash,
                    computed_hash: attestation.result_hash,
                    attestation_key: attestation.key_hash,
                    proof_hash: hash(&proof).to_bytes(),
                    validator_stake: 0,
                    weight: self.config.min_validator_stake,
                    responded_at: now,
                }
            }
        };

        self.lock(request_id, response.validator_stake)?;
        record_response(&mut request, &mut stats, response)?;
        self.config.total_responses = self
            .config
            .total_responses
            .checked_add(1)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        self.stats.insert(validator, stats);

        let (current, decision) = evaluate_consensus(&request, &self.config)?;
        if let Some(status) = decision.status() {
            let plan = compute_settlement(
                request.stake,
                &request.responses,
                status,
                self.config.reward_percentage,
                self.config.slashing_percentage,
            )?;
            self.settle(&request, &plan, true)?;
            request.success_weight = current.success_weight;
            request.fail_weight = current.fail_weight;
            request.finalize(status, now)?;
            self.settlements.insert(request_id, plan);
        }

        self.requests.insert(request_id, request);
        Ok(())
    }

    fn apply_expiry(&mut self, request_id: [u8; 32]) -> anchor_lang::Result<()> {
        let mut request = self
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(ErrorCode::AccountNotInitialized)?;

        if request.status != ValidationStatus::Pending {
            return Err(RegistryError::RequestNotPending.into());
        }
        if request.finalized {
            return Err(RegistryError::RequestAlreadyFinalized.into());
        }
        if self.now <= request.deadline {
            return Err(RegistryError::DeadlineNotPassed.into());
        }

        let plan = compute_refund(request.stake, &request.responses)?;
        self.settle(&request, &plan, false)?;
        request.finalize(ValidationStatus::Expired, self.now)?;
        self.settlements.insert(request_id, plan);
        self.requests.insert(request_id, request);
        Ok(())
    }

    fn apply_withdrawal(&mut self, owner: Pubkey) -> anchor_lang::Result<()> {
        let pending = self
            .pending
            .get_mut(&owner)
            .ok_or(ErrorCode::AccountNotInitialized)?;
        let amount = pending.take_balance()?;

        let lamports = self.pending_lamports.entry(owner).or_insert(0);
        *lamports = lamports
            .checked_sub(amount)
            .ok_or(RegistryError::InsufficientFunds)?;

        self.paid_out = self
            .paid_out
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        self.config.total_withdrawn = self
            .config
            .total_withdrawn
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        Ok(())
    }

    // ========================================================================
    // Lamport movements
    // ========================================================================

    fn ensure_pending(&mut self, owner: Pubkey) {
        self.pending.entry(owner).or_insert_with(|| PendingWithdrawal {
            owner,
            ..Default::default()
        });
    }

    fn lock(&mut self, request_id: [u8; 32], amount: u64) -> anchor_lang::Result<()> {
        let escrow = self.escrow.entry(request_id).or_insert(0);
        *escrow = escrow
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        self.deposited = self
            .deposited
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        self.config.total_locked = self
            .config
            .total_locked
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        Ok(())
    }

    fn credit(&mut self, owner: Pubkey, amount: u64) -> anchor_lang::Result<()> {
        self.ensure_pending(owner);
        if let Some(pending) = self.pending.get_mut(&owner) {
            pending.credit(amount)?;
        }
        let lamports = self.pending_lamports.entry(owner).or_insert(0);
        *lamports = lamports
            .checked_add(amount)
            .ok_or(RegistryError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Drain the request escrow into pending balances according to `plan`.
    fn settle(
        &mut self,
        request: &ValidationRequest,
        plan: &SettlementPlan,
        update_stats: bool,
    ) -> anchor_lang::Result<()> {
        let locked = request.locked_value()?;
        plan.verify_balanced(locked)?;

        let escrow = self.escrow.entry(request.request_id).or_insert(0);
        *escrow = escrow
            .checked_sub(locked)
            .ok_or(RegistryError::InsufficientFunds)?;

        for payout in &plan.payouts {
            if update_stats {
                let stats = self
                    .stats
                    .entry(payout.validator)
                    .or_insert_with(|| ValidatorStats {
                        validator: payout.validator,
                        ..Default::default()
                    });
                record_payout(stats, payout)?;
            }
            self.credit(payout.validator, payout.credit()?)?;
        }
        self.credit(request.requester, plan.requester_credit)?;

        record_finalization(&mut self.config, locked)
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Check every registry-wide invariant against the current state.
    pub fn check_invariants(&self) -> SimulationResult {
        let escrowed = self.escrow.values().fold(0u64, |acc, v| acc.saturating_add(*v));
        let result = check_locked_conservation(escrowed, self.config.total_locked);
        if result != ConservationInvariantResult::Valid {
            return SimulationResult::InvariantViolation(format!("{:?}", result));
        }

        let owed = self.pending.values().fold(0u64, |acc, p| acc.saturating_add(p.amount));
        let result = check_credit_conservation(
            owed,
            self.config.total_credited,
            self.config.total_withdrawn,
        );
        if result != ConservationInvariantResult::Valid {
            return SimulationResult::InvariantViolation(format!("{:?}", result));
        }

        let result = check_deposit_conservation(
            self.deposited,
            self.config.total_locked,
            self.config.total_credited,
        );
        if result != ConservationInvariantResult::Valid {
            return SimulationResult::InvariantViolation(format!("{:?}", result));
        }
        if self.paid_out != self.config.total_withdrawn {
            return SimulationResult::InvariantViolation(format!(
                "paid out {} but recorded {} withdrawn",
                self.paid_out, self.config.total_withdrawn
            ));
        }

        for (owner, pending) in &self.pending {
            let lamports = self.pending_lamports.get(owner).copied().unwrap_or(0);
            let result = check_pending_backed(pending.amount, lamports);
            if result != ConservationInvariantResult::Valid {
                return SimulationResult::InvariantViolation(format!("{:?}", result));
            }
        }

        for (request_id, request) in &self.requests {
            let result = check_request_state(request, MAX_RESPONSES_CAP);
            if result != RequestInvariantResult::Valid {
                return SimulationResult::InvariantViolation(format!("{:?}", result));
            }
            let escrow = self.escrow.get(request_id).copied().unwrap_or(0);
            let result = check_escrow_drained(request, escrow);
            if result != RequestInvariantResult::Valid {
                return SimulationResult::InvariantViolation(format!("{:?}", result));
            }
            if let Some(plan) = self.settlements.get(request_id) {
                let result = check_settlement_plan(plan, request.stake, &request.responses);
                if result != SettlementInvariantResult::Valid {
                    return SimulationResult::InvariantViolation(format!("{:?}", result));
                }
            }
        }

        for stats in self.stats.values() {
            let result = check_stats_consistency(stats);
            if result != StatsInvariantResult::Valid {
                return SimulationResult::InvariantViolation(format!("{:?}", result));
            }
        }

        SimulationResult::Success
    }

    /// Terminal requests present in `before` must be unchanged here.
    pub fn check_terminal_requests_unchanged(&self, before: &SimulatedRegistry) -> SimulationResult {
        for (request_id, old) in &before.requests {
            let Some(new) = self.requests.get(request_id) else {
                return SimulationResult::InvariantViolation("request disappeared".to_string());
            };
            let result = check_terminal_immutable(old, new);
            if result != RequestInvariantResult::Valid {
                return SimulationResult::InvariantViolation(format!("{:?}", result));
            }
        }
        SimulationResult::Success
    }
}

// ============================================================================
// Input helpers
// ============================================================================

/// Start time used by generated lifecycles
pub const SIM_START: i64 = 1_700_000_000;

/// Requester wallet in generated lifecycles
pub const SIM_REQUESTER: u8 = 1;

/// Server agent in generated lifecycles
pub const SIM_SERVER: u8 = 2;

/// Approved TEE key hash in generated lifecycles
pub const SIM_TRUSTED_KEY: [u8; 32] = [0xEE; 32];

/// Validators at or above this pool index are not registered as active
pub const SIM_INACTIVE_FROM: u8 = 16;

pub fn sim_key(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

/// Wallet of the validator at `index` in the generated pool.
pub fn sim_validator(index: u8) -> Pubkey {
    sim_key(index.saturating_add(10))
}

/// Turn generated response specs into stored responses, one validator each.
pub fn build_responses(specs: &[ResponseSpec]) -> Vec<ValidationResponse> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| ValidationResponse {
            validator: sim_key(i as u8 + 100),
            kind: if spec.collateral == 0 && spec.weight > 0 {
                ResponseKind::Tee
            } else {
                ResponseKind::Stake
            },
            success: spec.success,
            validator_stake: spec.collateral,
            weight: spec.weight,
            ..Default::default()
        })
        .collect()
}

/// Terminal status for an outcome code (1-4).
pub fn status_from_code(code: u8) -> ValidationStatus {
    match code {
        1 => ValidationStatus::Validated,
        2 => ValidationStatus::Failed,
        3 => ValidationStatus::Disputed,
        _ => ValidationStatus::Expired,
    }
}

/// Drive one request through a generated sequence of actions.
///
/// Individual operations may fail; only invariant violations are reported.
pub fn run_lifecycle(input: &LifecycleInput) -> SimulationResult {
    let mut reg = match SimulatedRegistry::initialize(input.params, SIM_START) {
        Ok(reg) => reg,
        Err(result) => return result,
    };
    reg.register_agent(sim_key(SIM_REQUESTER));
    reg.register_agent(sim_key(SIM_SERVER));
    for index in 0..SIM_INACTIVE_FROM {
        reg.register_agent(sim_validator(index));
    }
    reg.approve_key(SIM_TRUSTED_KEY);

    let params = RequestParams {
        task_id: input.task_id,
        server_agent: sim_key(SIM_SERVER),
        data_hash: input.data_hash,
        validation_type: input.validation_type,
        deadline: SIM_START.saturating_add(input.deadline_offset),
        stake: input.stake,
    };
    let requester = sim_key(SIM_REQUESTER);
    let created = reg.request_validation(requester, params);
    if created.is_invariant_violation() {
        return created;
    }
    if !created.is_success() {
        // Rejected requests lock nothing
        if reg.config.total_requests != 0 || reg.config.total_locked != 0 {
            return SimulationResult::InvariantViolation(format!(
                "rejected request changed state: {:?}",
                created
            ));
        }
        return reg.check_invariants();
    }
    let request_id = derive_request_id(&params, &requester);

    let mismatch = {
        let mut hash = input.data_hash;
        hash[0] ^= 0xFF;
        hash
    };

    for action in &input.actions {
        let before = reg.clone();
        let result = match action {
            RegistryAction::SubmitStake {
                validator,
                matches,
                collateral_pct,
            } => {
                let collateral = reg
                    .config
                    .min_validator_stake
                    .saturating_mul(*collateral_pct as u64)
                    / 100;
                reg.submit(
                    request_id,
                    sim_validator(*validator),
                    Submission::Stake {
                        computed_hash: if *matches { input.data_hash } else { mismatch },
                        collateral,
                    },
                )
            }
            RegistryAction::SubmitTee {
                validator,
                matches,
                trusted,
            } => reg.submit(
                request_id,
                sim_validator(*validator),
                Submission::Tee {
                    attestation: TeeAttestation {
                        key_hash: if *trusted { SIM_TRUSTED_KEY } else { [0u8; 32] },
                        result_hash: if *matches { input.data_hash } else { mismatch },
                    },
                    proof: vec![*validator; 8],
                },
            ),
            RegistryAction::AdvanceTime(seconds) => {
                reg.advance_time(*seconds);
                SimulationResult::Success
            }
            RegistryAction::FinalizeExpired => reg.finalize_expired(request_id),
            RegistryAction::Withdraw(None) => reg.withdraw(requester),
            RegistryAction::Withdraw(Some(index)) => reg.withdraw(sim_validator(*index)),
        };

        if result.is_invariant_violation() {
            return result;
        }
        let checked = reg.check_invariants();
        if !checked.is_success() {
            return checked;
        }
        let checked = reg.check_terminal_requests_unchanged(&before);
        if !checked.is_success() {
            return checked;
        }
    }

    SimulationResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL: u64 = 1_000_000_000;
    const NOW: i64 = 1_700_000_000;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn registry(params: RegistryParams) -> SimulatedRegistry {
        let mut reg = SimulatedRegistry::initialize(params, NOW).unwrap();
        for n in 1..=20 {
            reg.register_agent(key(n));
        }
        reg
    }

    fn params(stake: u64) -> RequestParams {
        RequestParams {
            task_id: [7u8; 32],
            server_agent: key(2),
            data_hash: [0xAA; 32],
            validation_type: 1,
            deadline: NOW + 7_200,
            stake,
        }
    }

    fn stake(collateral: u64, matches: bool) -> Submission {
        Submission::Stake {
            computed_hash: if matches { [0xAA; 32] } else { [0xBB; 32] },
            collateral,
        }
    }

    fn open_request(reg: &mut SimulatedRegistry, p: RequestParams) -> [u8; 32] {
        assert!(reg.request_validation(key(1), p).is_success());
        derive_request_id(&p, &key(1))
    }

    #[test]
    fn test_three_agreeing_validators_validate() {
        let mut reg = registry(RegistryParams::default());
        let id = open_request(&mut reg, params(SOL));

        for n in 10..=11 {
            assert!(reg.submit(id, key(n), stake(SOL / 10, true)).is_success());
            assert_eq!(reg.request(&id).unwrap().status, ValidationStatus::Pending);
        }
        assert!(reg.submit(id, key(12), stake(SOL / 10, true)).is_success());

        let request = reg.request(&id).unwrap();
        assert_eq!(request.status, ValidationStatus::Validated);
        assert!(request.finalized);
        assert_eq!(request.success_weight, 3 * SOL / 10);

        // 0.1 SOL pool split three ways, remainder to the first responder
        let share = (SOL / 10) / 3;
        assert_eq!(reg.pending_balance(&key(10)), SOL / 10 + share + 1);
        assert_eq!(reg.pending_balance(&key(11)), SOL / 10 + share);
        assert_eq!(reg.pending_balance(&key(1)), 9 * SOL / 10);
        assert_eq!(reg.config.total_locked, 0);
        assert_eq!(reg.stats[&key(10)].successful_validations, 1);
        assert!(reg.check_invariants().is_success());
    }

    #[test]
    fn test_even_split_disputes_and_refunds() {
        let mut reg = registry(RegistryParams {
            min_validators_required: 2,
            ..Default::default()
        });
        let id = open_request(&mut reg, params(SOL));

        assert!(reg.submit(id, key(10), stake(SOL / 10, true)).is_success());
        assert!(reg.submit(id, key(11), stake(SOL / 10, false)).is_success());

        let request = reg.request(&id).unwrap();
        assert_eq!(request.status, ValidationStatus::Disputed);
        assert_eq!(reg.pending_balance(&key(1)), SOL);
        assert_eq!(reg.pending_balance(&key(10)), SOL / 10);
        assert_eq!(reg.pending_balance(&key(11)), SOL / 10);
        // Disputes leave the validators' history alone
        assert_eq!(reg.stats[&key(11)].failed_validations, 0);
        assert!(reg.check_invariants().is_success());
    }

    #[test]
    fn test_expiry_refunds_after_deadline() {
        let mut reg = registry(RegistryParams::default());
        let id = open_request(&mut reg, params(SOL));
        assert!(reg.submit(id, key(10), stake(SOL / 10, true)).is_success());

        assert!(reg
            .finalize_expired(id)
            .is_registry_error(RegistryError::DeadlineNotPassed));

        // The deadline itself still accepts responses
        reg.advance_time(7_200);
        assert!(reg
            .finalize_expired(id)
            .is_registry_error(RegistryError::DeadlineNotPassed));
        reg.advance_time(1);

        assert!(reg
            .submit(id, key(11), stake(SOL / 10, true))
            .is_registry_error(RegistryError::DeadlinePassed));
        assert!(reg.finalize_expired(id).is_success());
        assert_eq!(reg.request(&id).unwrap().status, ValidationStatus::Expired);
        assert_eq!(reg.pending_balance(&key(1)), SOL);
        assert_eq!(reg.pending_balance(&key(10)), SOL / 10);

        assert!(reg
            .finalize_expired(id)
            .is_registry_error(RegistryError::RequestNotPending));
        assert!(reg.check_invariants().is_success());
    }

    #[test]
    fn test_unanswered_request_expires_with_full_refund() {
        let mut reg = registry(RegistryParams::default());
        let id = open_request(&mut reg, params(SOL));

        reg.advance_time(7_201);
        assert!(reg.finalize_expired(id).is_success());

        let request = reg.request(&id).unwrap();
        assert_eq!(request.status, ValidationStatus::Expired);
        assert_eq!(request.finalized_at, NOW + 7_201);
        assert_eq!(reg.config.total_finalized, 1);
        assert!(reg.withdraw(key(1)).is_success());
        assert_eq!(reg.paid_out, SOL);
        assert!(reg.check_invariants().is_success());
    }

    #[test]
    fn test_poor_history_doubles_required_collateral() {
        let mut reg = registry(RegistryParams::default());
        reg.stats.insert(
            key(10),
            ValidatorStats {
                validator: key(10),
                total_validations: 5,
                successful_validations: 3,
                failed_validations: 2,
                ..Default::default()
            },
        );
        let id = open_request(&mut reg, params(SOL));

        assert!(reg
            .submit(id, key(10), stake(SOL / 10, true))
            .is_registry_error(RegistryError::InsufficientValidatorStake));
        assert!(reg.submit(id, key(10), stake(2 * SOL / 10, true)).is_success());
    }

    #[test]
    fn test_discounted_one_lamport_base_still_needs_collateral() {
        let mut reg = registry(RegistryParams {
            min_validator_stake: 1,
            ..RegistryParams::default()
        });
        reg.stats.insert(
            key(10),
            ValidatorStats {
                validator: key(10),
                total_validations: 10,
                successful_validations: 10,
                ..Default::default()
            },
        );
        let id = open_request(&mut reg, params(SOL));

        assert!(reg
            .submit(id, key(10), stake(0, true))
            .is_registry_error(RegistryError::InsufficientValidatorStake));
        assert!(reg.submit(id, key(10), stake(1, true)).is_success());
        assert_eq!(reg.request(&id).map(|r| r.responses[0].weight), Some(1));
    }

    #[test]
    fn test_admission_rejections() {
        let mut reg = registry(RegistryParams::default());
        let id = open_request(&mut reg, params(SOL));

        assert!(reg
            .submit(id, key(1), stake(SOL, true))
            .is_registry_error(RegistryError::ValidatorIsParticipant));
        assert!(reg
            .submit(id, key(2), stake(SOL, true))
            .is_registry_error(RegistryError::ValidatorIsParticipant));
        assert!(reg
            .submit(id, key(99), stake(SOL, true))
            .is_registry_error(RegistryError::AgentNotActive));
        assert!(reg.submit(id, key(10), stake(SOL, true)).is_success());
        assert!(reg
            .submit(id, key(10), stake(SOL, true))
            .is_registry_error(RegistryError::DuplicateResponse));

        let tee = Submission::Tee {
            attestation: TeeAttestation {
                key_hash: [3u8; 32],
                result_hash: [0xAA; 32],
            },
            proof: vec![1, 2, 3],
        };
        assert!(reg
            .submit(id, key(11), tee)
            .is_registry_error(RegistryError::ValidationTypeMismatch));
        assert!(reg
            .submit([9u8; 32], key(11), stake(SOL, true))
            .is_error());
    }

    #[test]
    fn test_hybrid_accepts_tee_attestations() {
        let mut reg = registry(RegistryParams::default());
        reg.approve_key([3u8; 32]);
        let id = open_request(
            &mut reg,
            RequestParams {
                validation_type: 3,
                ..params(SOL)
            },
        );
        let attest = |key_hash: [u8; 32], proof: Vec<u8>| Submission::Tee {
            attestation: TeeAttestation {
                key_hash,
                result_hash: [0xAA; 32],
            },
            proof,
        };

        assert!(reg
            .submit(id, key(10), attest([4u8; 32], vec![1]))
            .is_registry_error(RegistryError::UntrustedAttestationKey));
        assert!(reg
            .submit(id, key(10), attest([3u8; 32], vec![]))
            .is_registry_error(RegistryError::InvalidProof));
        assert!(reg
            .submit(id, key(10), attest([3u8; 32], vec![0u8; MAX_PROOF_LEN + 1]))
            .is_registry_error(RegistryError::InvalidProof));
        assert!(reg.submit(id, key(10), attest([3u8; 32], vec![1])).is_success());

        let response = reg.request(&id).unwrap().responses[0];
        assert_eq!(response.validator_stake, 0);
        assert_eq!(response.weight, reg.config.min_validator_stake);
        assert!(response.success);
    }

    #[test]
    fn test_terminal_request_rejects_further_responses() {
        let mut reg = registry(RegistryParams {
            min_validators_required: 1,
            ..Default::default()
        });
        let id = open_request(&mut reg, params(SOL));
        assert!(reg.submit(id, key(10), stake(SOL / 10, false)).is_success());
        assert_eq!(reg.request(&id).unwrap().status, ValidationStatus::Failed);

        let before = reg.clone();
        assert!(reg
            .submit(id, key(11), stake(SOL / 10, true))
            .is_registry_error(RegistryError::RequestNotPending));
        reg.advance_time(30 * 24 * 3600);
        assert!(reg
            .finalize_expired(id)
            .is_registry_error(RegistryError::RequestNotPending));
        assert!(reg.check_terminal_requests_unchanged(&before).is_success());
    }

    #[test]
    fn test_duplicate_request_rejected() {
        let mut reg = registry(RegistryParams::default());
        open_request(&mut reg, params(SOL));
        assert!(reg.request_validation(key(1), params(SOL)).is_error());
        assert_eq!(reg.config.total_requests, 1);
        assert_eq!(reg.config.total_locked, SOL);
    }

    #[test]
    fn test_withdrawal_pays_once() {
        let mut reg = registry(RegistryParams {
            min_validators_required: 1,
            ..Default::default()
        });
        let id = open_request(&mut reg, params(SOL));
        assert!(reg.submit(id, key(10), stake(SOL / 10, true)).is_success());

        let owed = reg.pending_balance(&key(10));
        assert!(owed > 0);
        assert!(reg.withdraw(key(10)).is_success());
        assert_eq!(reg.paid_out, owed);
        assert_eq!(reg.pending_balance(&key(10)), 0);

        assert!(reg
            .withdraw(key(10))
            .is_registry_error(RegistryError::NothingToWithdraw));
        assert_eq!(reg.paid_out, owed);
        assert!(reg.withdraw(key(42)).is_error());
        assert!(reg.check_invariants().is_success());
    }

    #[test]
    fn test_failed_operation_leaves_state_untouched() {
        let mut reg = registry(RegistryParams::default());
        let id = open_request(&mut reg, params(SOL));
        let total_responses = reg.config.total_responses;

        assert!(reg
            .submit(id, key(10), stake(1, true))
            .is_registry_error(RegistryError::InsufficientValidatorStake));
        assert_eq!(reg.config.total_responses, total_responses);
        assert!(reg.request(&id).unwrap().responses.is_empty());
        assert!(!reg.stats.contains_key(&key(10)));
    }
}
