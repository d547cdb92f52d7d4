//! # ipcstress-common
//!
//! Shared types and error definitions for the ipcstress orchestrator:
//! process roles, run outcomes, timing constants, and the error taxonomy
//! used across the workspace.

pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;
