//! Subcommand implementations.

pub mod companies;
pub mod files;
pub mod sheets;
