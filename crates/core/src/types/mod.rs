//! Core types for storebridge.
//!
//! This module provides type-safe wrappers for the domain concepts shared
//! by the grouper, matcher and orchestrators.

pub mod email;
pub mod gid;
pub mod metafield;
pub mod outcome;
pub mod row;
pub mod tier;

pub use email::{Email, EmailError};
pub use gid::{Gid, GidError, ResourceKind};
pub use metafield::{
    HeaderError, Metafield, MetafieldColumn, MetafieldInput, MetafieldType, RawMetafield,
};
pub use outcome::{RecordOutcome, RecordStatus, RunSummary};
pub use row::SourceRow;
pub use tier::{OrderFact, Tier, TierPolicy};
