//! cf-core: domain types, session configuration, and API version gating for
//! the cf command-line client.
//!
//! This crate holds everything the command surface needs that is not tied to
//! argument parsing or output: the role model, the saved session/target
//! configuration, and the capability check that decides which user lookup
//! variant the Cloud Controller supports.

pub mod config;
pub mod error;
pub mod models;
pub mod version;

/// Crate identity label used by bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "cf-core"
}
