//! Subprocess clients.
//!
//! - [`git`]: runs the git binary for one repository and derives read-only
//!   facts (upstream, rebase state) from it

pub mod git;
