//! # ipcstress-output
//!
//! Output multiplexing for supervised child processes: two reader tasks
//! per child drain its stdout/stderr into one ordered queue, and a single
//! printer task interleaves the tagged lines on the console.

pub mod multiplexer;
pub mod types;

pub use multiplexer::*;
pub use types::*;
