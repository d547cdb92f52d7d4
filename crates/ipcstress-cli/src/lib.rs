//! # ipcstress-cli
//!
//! Library side of the `ipcstress` driver: the named-test catalog and the
//! plumbing shared between the binary and the end-to-end tests.

pub mod catalog;

pub use catalog::*;
