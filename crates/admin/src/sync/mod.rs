//! Per-entity migration flows.
//!
//! Each flow turns one logical entity (a source company, or one merge group
//! of sheet rows) into target writes and returns a
//! [`RecordOutcome`](storebridge_core::RecordOutcome). A `SyncError` aborts
//! that record only; the [`driver`] records it and the run moves on.
//!
//! # Flows
//!
//! - [`company`] - source store to target, with locations, contacts and tier
//! - [`customer`], [`collection`], [`discount`], [`product`] - sheet to target
//! - [`file`] - sheet to target, the one concurrent pipeline
//! - [`definitions`] - metafield definitions for typed header columns

pub mod collection;
pub mod company;
pub mod customer;
pub mod definitions;
pub mod discount;
pub mod driver;
pub mod file;
pub mod product;

use std::str::FromStr;

use storebridge_core::discount::DiscountBuildError;
use storebridge_core::grouping::{GroupingError, MergeGroup};
use storebridge_core::merge::merge_metafields;
use storebridge_core::{Metafield, RawMetafield};
use thiserror::Error;
use tracing::{error, warn};

use crate::shopify::{AdminClient, AdminShopifyError};

/// Record-level failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Target or source API failed.
    #[error("Shopify error: {0}")]
    Api(#[from] AdminShopifyError),

    /// The sheet rows of the record disagree.
    #[error("Grouping error: {0}")]
    Grouping(#[from] GroupingError),

    /// The discount row cannot be built.
    #[error("Discount error: {0}")]
    Discount(#[from] DiscountBuildError),

    /// The record lacks something the target requires.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A reference the record cannot do without did not resolve.
    #[error("Unresolved: {0}")]
    Unresolved(String),

    /// The target could not process an uploaded file.
    #[error("File processing failed: {0}")]
    FileProcessing(String),

    /// The source record does not exist or no source store is configured.
    #[error("Source missing: {0}")]
    MissingSource(String),
}

/// What to do when the target already holds the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsPolicy {
    /// Report it as skipped and write nothing.
    Skip,
    /// Update scalars and merge metafields.
    Update,
}

impl ExistsPolicy {
    /// `Update` when `update` is set, `Skip` otherwise.
    #[must_use]
    pub const fn update_if(update: bool) -> Self {
        if update { Self::Update } else { Self::Skip }
    }
}

impl FromStr for ExistsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "update" => Ok(Self::Update),
            other => Err(format!("unknown exists policy: {other}")),
        }
    }
}

/// Merge `source` over the owner's current metafields, overlay `forced`, and
/// write the result.
///
/// Returns the number of inputs written.
///
/// # Errors
///
/// Returns the first failing `metafieldsSet` chunk.
pub async fn write_metafields(
    client: &AdminClient,
    owner_id: &str,
    source: &[RawMetafield],
    target: &[RawMetafield],
    forced: &[Metafield],
) -> Result<usize, AdminShopifyError> {
    let merged = merge_metafields(owner_id, source, target).with_forced(owner_id, forced);

    for mismatch in &merged.type_mismatches {
        warn!(
            owner = owner_id,
            key = %mismatch.key,
            target_type = %mismatch.target_type,
            source_type = %mismatch.source_type,
            "metafield type differs from target, writing source type"
        );
    }

    if merged.is_empty() {
        return Ok(0);
    }
    client.set_metafields(&merged.inputs).await?;
    Ok(merged.inputs.len())
}

/// Sheet metafields in the shape the merge reads.
pub(crate) fn raw_metafields(group: &MergeGroup) -> Vec<RawMetafield> {
    group.metafields().iter().map(RawMetafield::from).collect()
}

/// Log a child step failure and return the line kept for the report.
pub(crate) fn child_failure(
    record: &str,
    step: &'static str,
    child: &str,
    err: &dyn std::fmt::Display,
) -> String {
    error!(record, step, child, error = %err, "child step failed");
    format!("{step} {child}: {err}")
}

/// Scalar cell, trimmed and non-empty.
pub(crate) fn scalar(group: &MergeGroup, field: &str) -> Option<String> {
    group
        .scalar(field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exists_policy_parse() {
        assert_eq!("Update".parse::<ExistsPolicy>(), Ok(ExistsPolicy::Update));
        assert_eq!(" skip ".parse::<ExistsPolicy>(), Ok(ExistsPolicy::Skip));
        assert!("merge".parse::<ExistsPolicy>().is_err());
        assert_eq!(ExistsPolicy::update_if(true), ExistsPolicy::Update);
        assert_eq!(ExistsPolicy::update_if(false), ExistsPolicy::Skip);
    }
}
