//! Utility modules shared by instruction handlers

pub mod compute_budget;
pub mod invocation;
pub mod multisig;
pub mod oracles;
pub mod version;

#[cfg(test)]
pub mod test_accounts;
