//! Direct lamport moves between program-owned accounts.
//!
//! Escrowed value leaves a request PDA and a pending-withdrawal PDA by
//! adjusting lamport balances directly, which the runtime allows for accounts
//! owned by this program. All arithmetic is checked.

use crate::errors::RegistryError;
use anchor_lang::prelude::*;

/// Move `amount` lamports from `from` to `to`.
///
/// No-op when `amount == 0`. Underflow or overflow fails with
/// `RegistryError::ArithmeticOverflow`.
pub fn transfer_lamports<'info>(
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    amount: u64,
) -> Result<()> {
    debit_lamports(from, amount)?;
    credit_lamports(to, amount)
}

/// Add `amount` lamports to an account whose source was debited separately.
///
/// Settlement debits the request escrow once for the whole plan and then
/// credits each pending-withdrawal account individually.
pub fn credit_lamports<'info>(to: &AccountInfo<'info>, amount: u64) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    **to.try_borrow_mut_lamports()? = to
        .lamports()
        .checked_add(amount)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    Ok(())
}

/// Remove `amount` lamports from an account whose destination is credited separately.
pub fn debit_lamports<'info>(from: &AccountInfo<'info>, amount: u64) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    **from.try_borrow_mut_lamports()? = from
        .lamports()
        .checked_sub(amount)
        .ok_or(RegistryError::ArithmeticOverflow)?;
    Ok(())
}
