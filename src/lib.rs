//! keyforge: validator key provisioning CLI (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod config;
pub mod constants;
pub mod deps;
pub mod env;
pub mod keys;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod process;
