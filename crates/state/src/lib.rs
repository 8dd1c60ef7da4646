//! Approval state for the zkmcp bridge.
//!
//! This crate provides:
//! - The approval gate state machine and its audit log.
//! - Atomic JSON persistence of approval records.
//! - Environment lookups for state file locations.

pub mod approval;
pub mod env;
pub mod persistence;

pub use approval::{
    ApprovalError, ApprovalGate, ApprovalLogEntry, ApprovalRecord, ApprovalRequest,
    ApprovalSnapshot,
};
pub use env::{approvals_file, env_flag, env_u64, home_dir, state_dir};
pub use persistence::{load_gate, load_snapshot, save_gate, save_snapshot};
pub use zkmcp_discovery::ApprovalStatus;
