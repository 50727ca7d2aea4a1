//! Storebridge Core - reconciliation logic shared by every migration flow.
//!
//! This crate provides the pieces that decide *what* to write, independent
//! of *how* it is written:
//! - [`grouping`] - collapse multi-row spreadsheet exports into logical entities
//! - [`matching`] - ordered-strategy lookup of an entity's existing target record
//! - [`merge`] - source-over-target metafield union with forced overrides
//! - [`discount`] - per-variant discount builders producing a normalized spec
//! - [`types`] - ids, emails, rows, metafields, tiers and run outcomes
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no HTTP
//! clients and no file access. The admin crate supplies the I/O.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod discount;
pub mod grouping;
pub mod matching;
pub mod merge;
pub mod types;

pub use types::*;
