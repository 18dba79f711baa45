//! files-sync - keep files in sync across GitHub repositories
//!
//! A config file declares patterns: which source files go where, into which
//! destination repositories. For each destination the engine computes the
//! change set within the pattern's scope, lands it as one commit on a
//! dedicated branch, opens or refreshes a pull request (or retires it when
//! nothing is left to propose), and optionally drives the merge.

pub mod auth;
pub mod changeset;
pub mod commit;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod merge;
pub mod platform;
pub mod scope;
pub mod template;
pub mod types;

pub use error::{Error, Result};
