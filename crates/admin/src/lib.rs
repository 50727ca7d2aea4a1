//! Storebridge admin library.
//!
//! Shopify Admin API client, reference resolution, and the per-entity
//! migration flows driven by the `storebridge` CLI.
//!
//! # Security
//!
//! This crate holds HIGH PRIVILEGE access: Admin API tokens for the target
//! store, and optionally the source store. Tokens are kept in
//! [`secrecy::SecretString`] and never logged.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod resolve;
pub mod shopify;
pub mod sync;

pub use config::{ConfigError, FileSettings, MigrateConfig, ShopifyStoreConfig};
pub use context::RunContext;
pub use resolve::{IdentifierMap, KeyResolver, Lookup, LookupKind};
pub use sync::{ExistsPolicy, SyncError};
