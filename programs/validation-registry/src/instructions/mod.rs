//! Instruction handlers for the Validation Registry

pub mod config_helpers;
pub mod consensus_helpers;
pub mod constants;
pub mod lamport_transfer;
pub mod request_helpers;
pub mod response_helpers;
pub mod settlement_helpers;
pub mod stake_helpers;

pub mod finalize_expired_validation;
pub mod initialize_registry;
pub mod request_validation;
pub mod submit_stake_validation;
pub mod submit_tee_attestation;
pub mod update_registry_config;
pub mod withdraw;

#[allow(ambiguous_glob_reexports)]
pub use finalize_expired_validation::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_registry::*;
#[allow(ambiguous_glob_reexports)]
pub use request_validation::*;
#[allow(ambiguous_glob_reexports)]
pub use submit_stake_validation::*;
#[allow(ambiguous_glob_reexports)]
pub use submit_tee_attestation::*;
#[allow(ambiguous_glob_reexports)]
pub use update_registry_config::*;
#[allow(ambiguous_glob_reexports)]
pub use withdraw::*;
