//! Registry parameter bounds and configuration updates.

use crate::errors::RegistryError;
use crate::instructions::constants::{MAX_PERCENT, MAX_REWARD_PERCENTAGE, MIN_CONSENSUS_THRESHOLD};
use crate::state::{ConfigUpdate, RegistryConfig, RegistryParams, MAX_RESPONSES_CAP};
use crate::utils::compute_budget::settlement_fits_compute_budget;
use anchor_lang::prelude::*;

/// Field codes reported in `RegistryConfigUpdated`
pub mod config_field {
    pub const MIN_REQUESTER_STAKE: u8 = 0;
    pub const MIN_VALIDATOR_STAKE: u8 = 1;
    pub const REWARD_PERCENTAGE: u8 = 2;
    pub const SLASHING_PERCENTAGE: u8 = 3;
    pub const CONSENSUS_THRESHOLD: u8 = 4;
    pub const MIN_VALIDATORS_REQUIRED: u8 = 5;
    pub const MAX_RESPONSES_PER_REQUEST: u8 = 6;
}

/// Validate every economic parameter, including the cross-field bounds.
pub fn validate_registry_params(params: &RegistryParams) -> Result<()> {
    require!(
        params.min_requester_stake > 0,
        RegistryError::InvalidStakeMinimum
    );
    require!(
        params.min_validator_stake > 0,
        RegistryError::InvalidStakeMinimum
    );
    require!(
        params.reward_percentage >= 1 && params.reward_percentage <= MAX_REWARD_PERCENTAGE,
        RegistryError::InvalidRewardPercentage
    );
    require!(
        params.slashing_percentage <= MAX_PERCENT,
        RegistryError::InvalidSlashingPercentage
    );
    require!(
        params.consensus_threshold >= MIN_CONSENSUS_THRESHOLD
            && params.consensus_threshold <= MAX_PERCENT,
        RegistryError::InvalidConsensusThreshold
    );
    require!(
        params.max_responses_per_request >= 1
            && params.max_responses_per_request as usize <= MAX_RESPONSES_CAP
            && settlement_fits_compute_budget(params.max_responses_per_request),
        RegistryError::InvalidMaxResponses
    );
    require!(
        params.min_validators_required >= 1
            && params.min_validators_required <= params.max_responses_per_request,
        RegistryError::InvalidMinValidators
    );
    Ok(())
}

/// Current economic parameters of a config
pub fn params_of(config: &RegistryConfig) -> RegistryParams {
    RegistryParams {
        min_requester_stake: config.min_requester_stake,
        min_validator_stake: config.min_validator_stake,
        reward_percentage: config.reward_percentage,
        slashing_percentage: config.slashing_percentage,
        consensus_threshold: config.consensus_threshold,
        min_validators_required: config.min_validators_required,
        max_responses_per_request: config.max_responses_per_request,
    }
}

/// Write validated parameters into the config.
pub fn write_params(config: &mut RegistryConfig, params: &RegistryParams) {
    config.min_requester_stake = params.min_requester_stake;
    config.min_validator_stake = params.min_validator_stake;
    config.reward_percentage = params.reward_percentage;
    config.slashing_percentage = params.slashing_percentage;
    config.consensus_threshold = params.consensus_threshold;
    config.min_validators_required = params.min_validators_required;
    config.max_responses_per_request = params.max_responses_per_request;
}

/// Outcome of an applied update, for the event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub field: u8,
    pub old_value: u64,
    pub new_value: u64,
}

/// Apply one update. The whole parameter set is re-validated so that
/// cross-field bounds (min validators <= max responses) keep holding.
pub fn apply_config_update(config: &mut RegistryConfig, update: ConfigUpdate) -> Result<AppliedUpdate> {
    let mut params = params_of(config);
    let applied = match update {
        ConfigUpdate::MinRequesterStake(value) => {
            let old = params.min_requester_stake;
            params.min_requester_stake = value;
            AppliedUpdate {
                field: config_field::MIN_REQUESTER_STAKE,
                old_value: old,
                new_value: value,
            }
        }
        ConfigUpdate::MinValidatorStake(value) => {
            let old = params.min_validator_stake;
            params.min_validator_stake = value;
            AppliedUpdate {
                field: config_field::MIN_VALIDATOR_STAKE,
                old_value: old,
                new_value: value,
            }
        }
        ConfigUpdate::RewardPercentage(value) => {
            let old = params.reward_percentage;
            params.reward_percentage = value;
            AppliedUpdate {
                field: config_field::REWARD_PERCENTAGE,
                old_value: old.into(),
                new_value: value.into(),
            }
        }
        ConfigUpdate::SlashingPercentage(value) => {
            let old = params.slashing_percentage;
            params.slashing_percentage = value;
            AppliedUpdate {
                field: config_field::SLASHING_PERCENTAGE,
                old_value: old.into(),
                new_value: value.into(),
            }
        }
        ConfigUpdate::ConsensusThreshold(value) => {
            let old = params.consensus_threshold;
            params.consensus_threshold = value;
            AppliedUpdate {
                field: config_field::CONSENSUS_THRESHOLD,
                old_value: old.into(),
                new_value: value.into(),
            }
        }
        ConfigUpdate::MinValidatorsRequired(value) => {
            let old = params.min_validators_required;
            params.min_validators_required = value;
            AppliedUpdate {
                field: config_field::MIN_VALIDATORS_REQUIRED,
                old_value: old.into(),
                new_value: value.into(),
            }
        }
        ConfigUpdate::MaxResponsesPerRequest(value) => {
            let old = params.max_responses_per_request;
            params.max_responses_per_request = value;
            AppliedUpdate {
                field: config_field::MAX_RESPONSES_PER_REQUEST,
                old_value: old.into(),
                new_value: value.into(),
            }
        }
    };

    validate_registry_params(&params)?;
    write_params(config, &params);
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        validate_registry_params(&RegistryParams::default()).unwrap();
    }

    #[test]
    fn test_zero_stake_minimums_rejected() {
        let p = RegistryParams {
            min_requester_stake: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_registry_params(&p).unwrap_err(),
            RegistryError::InvalidStakeMinimum.into()
        );
        let p = RegistryParams {
            min_validator_stake: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_registry_params(&p).unwrap_err(),
            RegistryError::InvalidStakeMinimum.into()
        );
    }

    #[test]
    fn test_reward_percentage_bounds() {
        for (value, ok) in [(0u8, false), (1, true), (50, true), (51, false)] {
            let p = RegistryParams {
                reward_percentage: value,
                ..Default::default()
            };
            assert_eq!(validate_registry_params(&p).is_ok(), ok, "reward {}", value);
        }
    }

    #[test]
    fn test_slashing_percentage_bounds() {
        for (value, ok) in [(0u8, true), (100, true), (101, false)] {
            let p = RegistryParams {
                slashing_percentage: value,
                ..Default::default()
            };
            assert_eq!(validate_registry_params(&p).is_ok(), ok, "slash {}", value);
        }
    }

    #[test]
    fn test_consensus_threshold_bounds() {
        for (value, ok) in [(50u8, false), (51, true), (100, true), (101, false)] {
            let p = RegistryParams {
                consensus_threshold: value,
                ..Default::default()
            };
            assert_eq!(validate_registry_params(&p).is_ok(), ok, "threshold {}", value);
        }
    }

    #[test]
    fn test_response_bounds() {
        let p = RegistryParams {
            max_responses_per_request: 17,
            ..Default::default()
        };
        assert_eq!(
            validate_registry_params(&p).unwrap_err(),
            RegistryError::InvalidMaxResponses.into()
        );
        let p = RegistryParams {
            max_responses_per_request: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_registry_params(&p).unwrap_err(),
            RegistryError::InvalidMaxResponses.into()
        );
        let p = RegistryParams {
            min_validators_required: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_registry_params(&p).unwrap_err(),
            RegistryError::InvalidMinValidators.into()
        );
        let p = RegistryParams {
            min_validators_required: 11,
            max_responses_per_request: 10,
            ..Default::default()
        };
        assert_eq!(
            validate_registry_params(&p).unwrap_err(),
            RegistryError::InvalidMinValidators.into()
        );
        let p = RegistryParams {
            min_validators_required: 16,
            max_responses_per_request: 16,
            ..Default::default()
        };
        validate_registry_params(&p).unwrap();
    }

    #[test]
    fn test_apply_update_reports_old_and_new() {
        let mut config = RegistryConfig::default();
        let applied = apply_config_update(&mut config, ConfigUpdate::RewardPercentage(20)).unwrap();
        assert_eq!(
            applied,
            AppliedUpdate {
                field: config_field::REWARD_PERCENTAGE,
                old_value: 10,
                new_value: 20,
            }
        );
        assert_eq!(config.reward_percentage, 20);
    }

    #[test]
    fn test_rejected_update_leaves_config_untouched() {
        let mut config = RegistryConfig::default();
        let before = params_of(&config);

        let err = apply_config_update(&mut config, ConfigUpdate::ConsensusThreshold(50)).unwrap_err();
        assert_eq!(err, RegistryError::InvalidConsensusThreshold.into());
        // min validators (3) would exceed max responses
        let err = apply_config_update(&mut config, ConfigUpdate::MaxResponsesPerRequest(2)).unwrap_err();
        assert_eq!(err, RegistryError::InvalidMinValidators.into());

        assert_eq!(params_of(&config), before);
    }

    #[test]
    fn test_every_setter_writes_its_field() {
        let mut config = RegistryConfig::default();
        apply_config_update(&mut config, ConfigUpdate::MinRequesterStake(1)).unwrap();
        apply_config_update(&mut config, ConfigUpdate::MinValidatorStake(2)).unwrap();
        apply_config_update(&mut config, ConfigUpdate::SlashingPercentage(100)).unwrap();
        apply_config_update(&mut config, ConfigUpdate::ConsensusThreshold(75)).unwrap();
        apply_config_update(&mut config, ConfigUpdate::MaxResponsesPerRequest(16)).unwrap();
        apply_config_update(&mut config, ConfigUpdate::MinValidatorsRequired(16)).unwrap();

        assert_eq!(config.min_requester_stake, 1);
        assert_eq!(config.min_validator_stake, 2);
        assert_eq!(config.slashing_percentage, 100);
        assert_eq!(config.consensus_threshold, 75);
        assert_eq!(config.max_responses_per_request, 16);
        assert_eq!(config.min_validators_required, 16);
    }
}
