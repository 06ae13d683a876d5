//! Multisig approval helpers for registry configuration

use anchor_lang::prelude::*;

use crate::errors::RegistryError;
use crate::state::RegistryConfig;

/// Validate multisig owner pubkeys before config is written
pub fn validate_multisig_owners(owners: &[Pubkey]) -> Result<()> {
    require!(
        !owners.is_empty() && owners.len() <= RegistryConfig::MAX_MULTISIG_OWNERS,
        RegistryError::MultisigInvalidSigners
    );
    for (index, owner) in owners.iter().enumerate() {
        require!(
            *owner != Pubkey::default(),
            RegistryError::MultisigDefaultSigner
        );
        for other in owners.iter().skip(index + 1) {
            require!(*owner != *other, RegistryError::MultisigDuplicateSigner);
        }
    }
    Ok(())
}

/// Count distinct owners among `signers`.
///
/// Fails on a default owner slot or on the same owner signing twice.
pub fn count_approvals(owners: &[Pubkey], signers: &[Pubkey]) -> Result<usize> {
    let mut approvals = 0usize;
    let mut seen_owner = [false; RegistryConfig::MAX_MULTISIG_OWNERS];

    for signer in signers {
        for (index, owner) in owners.iter().enumerate() {
            if *owner == Pubkey::default() {
                return Err(error!(RegistryError::MultisigDefaultSigner));
            }
            if signer == owner {
                if seen_owner[index] {
                    return Err(error!(RegistryError::MultisigDuplicateSigner));
                }
                seen_owner[index] = true;
                approvals += 1;
            }
        }
    }
    Ok(approvals)
}

/// Require `multisig_threshold` configured owners to have signed.
/// Signers are taken from `remaining_accounts`.
///
/// Returns the first signer that is a configured owner, reported as the
/// approver in config events.
pub fn require_multisig(
    config: &RegistryConfig,
    remaining_accounts: &[AccountInfo],
) -> Result<Pubkey> {
    let owners_len = config.multisig_owners_len as usize;
    let threshold = config.multisig_threshold as usize;

    if owners_len == 0 || owners_len > RegistryConfig::MAX_MULTISIG_OWNERS {
        return Err(error!(RegistryError::MultisigInvalidSigners));
    }
    if threshold == 0 || threshold > owners_len {
        return Err(error!(RegistryError::MultisigInvalidThreshold));
    }

    let owners = &config.multisig_owners[..owners_len];
    let signers: Vec<Pubkey> = remaining_accounts
        .iter()
        .filter(|account| account.is_signer)
        .map(|account| account.key())
        .collect();
    let approvals = count_approvals(owners, &signers)?;

    require!(
        approvals >= threshold,
        RegistryError::MultisigNotEnoughSigners
    );
    signers
        .into_iter()
        .find(|signer| owners.contains(signer))
        .ok_or_else(|| error!(RegistryError::MultisigNotEnoughSigners))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_accounts::TestAccount;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    #[test]
    fn test_validate_owners() {
        validate_multisig_owners(&[key(1), key(2), key(3)]).unwrap();
        assert_eq!(
            validate_multisig_owners(&[]).unwrap_err(),
            RegistryError::MultisigInvalidSigners.into()
        );
        assert_eq!(
            validate_multisig_owners(&[key(1); 6]).unwrap_err(),
            RegistryError::MultisigInvalidSigners.into()
        );
        assert_eq!(
            validate_multisig_owners(&[key(1), Pubkey::default()]).unwrap_err(),
            RegistryError::MultisigDefaultSigner.into()
        );
        assert_eq!(
            validate_multisig_owners(&[key(1), key(2), key(1)]).unwrap_err(),
            RegistryError::MultisigDuplicateSigner.into()
        );
    }

    #[test]
    fn test_count_approvals_ignores_strangers() {
        let owners = [key(1), key(2), key(3)];
        assert_eq!(count_approvals(&owners, &[key(1), key(9), key(3)]).unwrap(), 2);
        assert_eq!(count_approvals(&owners, &[]).unwrap(), 0);
    }

    #[test]
    fn test_count_approvals_rejects_double_signing() {
        let owners = [key(1), key(2)];
        assert_eq!(
            count_approvals(&owners, &[key(1), key(1)]).unwrap_err(),
            RegistryError::MultisigDuplicateSigner.into()
        );
    }

    fn config(owners: &[Pubkey], threshold: u8) -> RegistryConfig {
        let mut config = RegistryConfig {
            multisig_threshold: threshold,
            multisig_owners_len: owners.len() as u8,
            ..Default::default()
        };
        config.multisig_owners[..owners.len()].copy_from_slice(owners);
        config
    }

    #[test]
    fn test_require_multisig_reports_first_owner_signer() {
        let config = config(&[key(1), key(2), key(3)], 2);
        let mut stranger = TestAccount::signer(key(9));
        let mut second = TestAccount::signer(key(2));
        let mut third = TestAccount::signer(key(3));

        let approver =
            require_multisig(&config, &[stranger.info(), third.info(), second.info()]).unwrap();
        assert_eq!(approver, key(3));
    }

    #[test]
    fn test_require_multisig_ignores_unsigned_owners() {
        let config = config(&[key(1), key(2)], 2);
        let mut first = TestAccount::signer(key(1));
        let mut second = TestAccount::signer(key(2));
        second.is_signer = false;

        assert_eq!(
            require_multisig(&config, &[first.info(), second.info()]).unwrap_err(),
            RegistryError::MultisigNotEnoughSigners.into()
        );
    }
}
