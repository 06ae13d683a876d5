//! Version checking for the registry configuration account

use crate::errors::RegistryError;
use crate::state::{RegistryConfig, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use anchor_lang::prelude::*;

/// Check that the registry config version is compatible with this program.
///
/// # Returns
/// * `Err(RegistryError::AccountVersionTooOld)` if the account needs migration
/// * `Err(RegistryError::AccountVersionTooNew)` if the program needs an upgrade
/// * `Err(RegistryError::VersionMismatchProtocol)` if the config is inconsistent
pub fn check_version_compatible(config: &RegistryConfig) -> Result<()> {
    if config.protocol_version < config.min_supported_version {
        msg!(
            "Account version {} is below its minimum supported {}",
            config.protocol_version,
            config.min_supported_version
        );
        return Err(RegistryError::AccountVersionTooOld.into());
    }

    if config.protocol_version > CURRENT_PROTOCOL_VERSION {
        msg!(
            "Account version {} is newer than program version {}",
            config.protocol_version,
            CURRENT_PROTOCOL_VERSION
        );
        return Err(RegistryError::AccountVersionTooNew.into());
    }

    if config.min_supported_version < MIN_SUPPORTED_VERSION
        || config.min_supported_version > CURRENT_PROTOCOL_VERSION
    {
        msg!(
            "Account min_supported_version {} is outside supported range {}-{}",
            config.min_supported_version,
            MIN_SUPPORTED_VERSION,
            CURRENT_PROTOCOL_VERSION
        );
        return Err(RegistryError::VersionMismatchProtocol.into());
    }

    Ok(())
}
