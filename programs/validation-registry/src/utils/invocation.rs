//! Guard against cross-program invocation of state-mutating instructions.

use crate::errors::RegistryError;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{get_stack_height, TRANSACTION_LEVEL_STACK_HEIGHT};

/// Reject the instruction unless it is invoked directly by a transaction.
///
/// A program reached through CPI runs at a deeper stack height, so a caller
/// cannot wrap a registry instruction inside its own and re-enter while an
/// outer registry instruction is mid-flight.
pub fn require_top_level_invocation() -> Result<()> {
    require!(
        get_stack_height() == TRANSACTION_LEVEL_STACK_HEIGHT,
        RegistryError::ReentrantCall
    );
    Ok(())
}
