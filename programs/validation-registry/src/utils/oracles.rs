//! Read-only views of records owned by external programs.
//!
//! The registry never writes these accounts. Each record is trusted only when
//! it is owned by the program configured in `RegistryConfig` and sits at the
//! PDA that program derives for the looked-up key. Record layout is an 8-byte
//! discriminator followed by the borsh fields below.

use crate::errors::RegistryError;
use anchor_lang::prelude::*;

/// Seed prefix of identity records in the identity program
pub const AGENT_IDENTITY_SEED: &[u8] = b"agent";

/// Seed prefix of trusted key records in the governance program
pub const TRUSTED_KEY_SEED: &[u8] = b"trusted_key";

/// Identity Oracle record for one agent
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentIdentityRecord {
    pub principal: Pubkey,
    pub active: bool,
}

/// Governance record approving a TEE signing key
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrustedKeyRecord {
    pub key_hash: [u8; 32],
    pub approved: bool,
}

/// Decode a record body, skipping the discriminator. Trailing bytes are ignored.
fn decode_record<T: AnchorDeserialize>(data: &[u8], error: RegistryError) -> Result<T> {
    if data.len() < 8 {
        return Err(error!(error));
    }
    let mut body = &data[8..];
    T::deserialize(&mut body).map_err(|_| error!(error))
}

pub fn decode_agent_identity(data: &[u8]) -> Result<AgentIdentityRecord> {
    decode_record(data, RegistryError::InvalidIdentityAccount)
}

pub fn decode_trusted_key(data: &[u8]) -> Result<TrustedKeyRecord> {
    decode_record(data, RegistryError::InvalidTrustedKeyAccount)
}

pub fn agent_identity_address(principal: &Pubkey, identity_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[AGENT_IDENTITY_SEED, principal.as_ref()], identity_program).0
}

pub fn trusted_key_address(key_hash: &[u8; 32], governance_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[TRUSTED_KEY_SEED, key_hash.as_ref()], governance_program).0
}

/// `is_active_agent(principal)` against the Identity Oracle.
///
/// A missing record means the agent never registered and is reported as
/// `AgentNotActive`; a record at the wrong address or with the wrong owner is
/// `InvalidIdentityAccount`.
pub fn require_active_agent(
    identity_account: &AccountInfo,
    principal: &Pubkey,
    identity_program: &Pubkey,
) -> Result<()> {
    require_keys_eq!(
        identity_account.key(),
        agent_identity_address(principal, identity_program),
        RegistryError::InvalidIdentityAccount
    );
    require!(
        !identity_account.data_is_empty(),
        RegistryError::AgentNotActive
    );
    require_keys_eq!(
        *identity_account.owner,
        *identity_program,
        RegistryError::InvalidIdentityAccount
    );

    let record = decode_agent_identity(&identity_account.try_borrow_data()?)?;
    require_keys_eq!(
        record.principal,
        *principal,
        RegistryError::InvalidIdentityAccount
    );
    require!(record.active, RegistryError::AgentNotActive);
    Ok(())
}

/// Governance predicate: is this TEE key hash approved?
pub fn require_trusted_key(
    trusted_key_account: &AccountInfo,
    key_hash: &[u8; 32],
    governance_program: &Pubkey,
) -> Result<()> {
    require_keys_eq!(
        trusted_key_account.key(),
        trusted_key_address(key_hash, governance_program),
        RegistryError::InvalidTrustedKeyAccount
    );
    require!(
        !trusted_key_account.data_is_empty(),
        RegistryError::UntrustedAttestationKey
    );
    require_keys_eq!(
        *trusted_key_account.owner,
        *governance_program,
        RegistryError::InvalidTrustedKeyAccount
    );

    let record = decode_trusted_key(&trusted_key_account.try_borrow_data()?)?;
    require!(
        record.key_hash == *key_hash,
        RegistryError::InvalidTrustedKeyAccount
    );
    require!(record.approved, RegistryError::UntrustedAttestationKey);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: AnchorSerialize>(record: &T) -> Vec<u8> {
        let mut data = vec![0xAB; 8];
        record.serialize(&mut data).unwrap();
        data
    }

    #[test]
    fn test_decode_agent_identity() {
        let record = AgentIdentityRecord {
            principal: Pubkey::new_from_array([4u8; 32]),
            active: true,
        };
        let mut data = encode(&record);
        data.extend_from_slice(&[0u8; 16]);
        assert_eq!(decode_agent_identity(&data).unwrap(), record);
    }

    #[test]
    fn test_decode_rejects_short_data() {
        assert_eq!(
            decode_agent_identity(&[0u8; 7]).unwrap_err(),
            RegistryError::InvalidIdentityAccount.into()
        );
        assert_eq!(
            decode_agent_identity(&[0u8; 20]).unwrap_err(),
            RegistryError::InvalidIdentityAccount.into()
        );
        assert_eq!(
            decode_trusted_key(&[0u8; 8]).unwrap_err(),
            RegistryError::InvalidTrustedKeyAccount.into()
        );
    }

    #[test]
    fn test_decode_trusted_key() {
        let record = TrustedKeyRecord {
            key_hash: [6u8; 32],
            approved: false,
        };
        assert_eq!(decode_trusted_key(&encode(&record)).unwrap(), record);
    }

    #[test]
    fn test_record_addresses_are_program_scoped() {
        let principal = Pubkey::new_from_array([1u8; 32]);
        let program_a = Pubkey::new_from_array([2u8; 32]);
        let program_b = Pubkey::new_from_array([3u8; 32]);
        assert_eq!(
            agent_identity_address(&principal, &program_a),
            agent_identity_address(&principal, &program_a)
        );
        assert_ne!(
            agent_identity_address(&principal, &program_a),
            agent_identity_address(&principal, &program_b)
        );
        assert_ne!(
            agent_identity_address(&principal, &program_a),
            trusted_key_address(&principal.to_bytes(), &program_a)
        );
    }

    mod lookups {
        use super::*;
        use crate::utils::test_accounts::{key, TestAccount};

        const IDENTITY_PROGRAM: Pubkey = Pubkey::new_from_array([40u8; 32]);
        const GOVERNANCE_PROGRAM: Pubkey = Pubkey::new_from_array([41u8; 32]);

        fn identity(principal: Pubkey, active: bool) -> TestAccount {
            TestAccount::new(
                agent_identity_address(&principal, &IDENTITY_PROGRAM),
                IDENTITY_PROGRAM,
                1_000,
                encode(&AgentIdentityRecord { principal, active }),
            )
        }

        fn trusted(key_hash: [u8; 32], approved: bool) -> TestAccount {
            TestAccount::new(
                trusted_key_address(&key_hash, &GOVERNANCE_PROGRAM),
                GOVERNANCE_PROGRAM,
                1_000,
                encode(&TrustedKeyRecord { key_hash, approved }),
            )
        }

        fn check_agent(account: &mut TestAccount, principal: Pubkey) -> Result<()> {
            require_active_agent(&account.info(), &principal, &IDENTITY_PROGRAM)
        }

        fn check_key(account: &mut TestAccount, key_hash: [u8; 32]) -> Result<()> {
            require_trusted_key(&account.info(), &key_hash, &GOVERNANCE_PROGRAM)
        }

        #[test]
        fn test_active_agent_accepted() {
            check_agent(&mut identity(key(5), true), key(5)).unwrap();
        }

        #[test]
        fn test_inactive_or_unregistered_agent() {
            assert_eq!(
                check_agent(&mut identity(key(5), false), key(5)).unwrap_err(),
                RegistryError::AgentNotActive.into()
            );

            let mut missing = identity(key(5), true);
            missing.data.clear();
            missing.owner = Pubkey::default();
            assert_eq!(
                check_agent(&mut missing, key(5)).unwrap_err(),
                RegistryError::AgentNotActive.into()
            );
        }

        #[test]
        fn test_identity_record_at_wrong_address() {
            let mut record = identity(key(5), true);
            record.key = key(6);
            assert_eq!(
                check_agent(&mut record, key(5)).unwrap_err(),
                RegistryError::InvalidIdentityAccount.into()
            );

            // Another agent's record does not vouch for this one
            assert_eq!(
                check_agent(&mut identity(key(6), true), key(5)).unwrap_err(),
                RegistryError::InvalidIdentityAccount.into()
            );
        }

        #[test]
        fn test_identity_record_with_wrong_owner() {
            let mut forged = identity(key(5), true);
            forged.owner = key(99);
            assert_eq!(
                check_agent(&mut forged, key(5)).unwrap_err(),
                RegistryError::InvalidIdentityAccount.into()
            );
        }

        #[test]
        fn test_identity_record_for_other_principal() {
            let mut record = identity(key(5), true);
            record.data = encode(&AgentIdentityRecord {
                principal: key(6),
                active: true,
            });
            assert_eq!(
                check_agent(&mut record, key(5)).unwrap_err(),
                RegistryError::InvalidIdentityAccount.into()
            );
        }

        #[test]
        fn test_approved_key_accepted() {
            check_key(&mut trusted([7u8; 32], true), [7u8; 32]).unwrap();
        }

        #[test]
        fn test_unapproved_or_missing_key() {
            assert_eq!(
                check_key(&mut trusted([7u8; 32], false), [7u8; 32]).unwrap_err(),
                RegistryError::UntrustedAttestationKey.into()
            );

            let mut missing = trusted([7u8; 32], true);
            missing.data.clear();
            assert_eq!(
                check_key(&mut missing, [7u8; 32]).unwrap_err(),
                RegistryError::UntrustedAttestationKey.into()
            );
        }

        #[test]
        fn test_trusted_key_record_at_wrong_address_or_owner() {
            let mut moved = trusted([7u8; 32], true);
            moved.key = key(8);
            assert_eq!(
                check_key(&mut moved, [7u8; 32]).unwrap_err(),
                RegistryError::InvalidTrustedKeyAccount.into()
            );

            let mut forged = trusted([7u8; 32], true);
            forged.owner = IDENTITY_PROGRAM;
            assert_eq!(
                check_key(&mut forged, [7u8; 32]).unwrap_err(),
                RegistryError::InvalidTrustedKeyAccount.into()
            );

            let mut mismatched = trusted([7u8; 32], true);
            mismatched.data = encode(&TrustedKeyRecord {
                key_hash: [9u8; 32],
                approved: true,
            });
            assert_eq!(
                check_key(&mut mismatched, [7u8; 32]).unwrap_err(),
                RegistryError::InvalidTrustedKeyAccount.into()
            );
        }
    }
}
