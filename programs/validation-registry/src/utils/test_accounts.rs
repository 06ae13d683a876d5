//! Owned account fixtures for unit tests that exercise raw `AccountInfo` paths.

use crate::instructions::settlement_helpers::{PENDING_SEED, VALIDATOR_STATS_SEED};
use crate::state::{PendingWithdrawal, ValidatorStats};
use anchor_lang::prelude::*;

/// Backing storage for one `AccountInfo`
pub struct TestAccount {
    pub key: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl TestAccount {
    pub fn new(key: Pubkey, owner: Pubkey, lamports: u64, data: Vec<u8>) -> Self {
        Self {
            key,
            owner,
            lamports,
            data,
            is_signer: false,
            is_writable: true,
        }
    }

    /// Program-owned account holding a serialized Anchor account.
    pub fn program_account<T: AccountSerialize>(
        key: Pubkey,
        account: &T,
        size: usize,
        lamports: u64,
    ) -> Self {
        let mut data = Vec::with_capacity(size);
        account.try_serialize(&mut data).unwrap();
        data.resize(size, 0);
        Self::new(key, crate::ID, lamports, data)
    }

    pub fn signer(key: Pubkey) -> Self {
        Self {
            is_signer: true,
            ..Self::new(key, Pubkey::default(), 0, Vec::new())
        }
    }

    pub fn info(&mut self) -> AccountInfo<'_> {
        AccountInfo::new(
            &self.key,
            self.is_signer,
            self.is_writable,
            &mut self.lamports,
            &mut self.data,
            &self.owner,
            false,
            0,
        )
    }

    pub fn pending(&self) -> PendingWithdrawal {
        PendingWithdrawal::try_deserialize(&mut &self.data[..]).unwrap()
    }

    pub fn stats(&self) -> ValidatorStats {
        ValidatorStats::try_deserialize(&mut &self.data[..]).unwrap()
    }
}

pub fn key(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

/// Pending-withdrawal PDA for `owner` with `amount` already owed.
pub fn pending_account(owner: Pubkey, amount: u64, lamports: u64) -> TestAccount {
    let (address, bump) =
        Pubkey::find_program_address(&[PENDING_SEED, owner.as_ref()], &crate::ID);
    let pending = PendingWithdrawal {
        owner,
        amount,
        total_credited: amount,
        total_withdrawn: 0,
        bump,
    };
    TestAccount::program_account(address, &pending, PendingWithdrawal::SIZE, lamports)
}

/// Validator-stats PDA for `validator` with one submission recorded.
pub fn stats_account(validator: Pubkey) -> TestAccount {
    let (address, bump) =
        Pubkey::find_program_address(&[VALIDATOR_STATS_SEED, validator.as_ref()], &crate::ID);
    let stats = ValidatorStats {
        validator,
        total_validations: 1,
        active: true,
        bump,
        ..Default::default()
    };
    TestAccount::program_account(address, &stats, ValidatorStats::SIZE, 1_000)
}
