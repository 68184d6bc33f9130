//! Seams between the sync core and the outside world.
//!
//! - [`git`]: git operations used by the committer and orchestrator
//! - [`filter`]: which changed paths stay out of automatic commits
//! - [`identity`]: commit author configuration
//! - [`alert`]: user notification on conflicts
//!
//! Each submodule provides a trait with a real implementation and, in tests,
//! a mockall mock.

pub mod alert;
pub mod filter;
pub mod git;
pub mod identity;
