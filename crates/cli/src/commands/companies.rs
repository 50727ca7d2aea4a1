//! Company migration from the source store.
//!
//! # Usage
//!
//! ```bash
//! storebridge companies 123 gid://shopify/Company/456
//! storebridge --report companies.csv companies --manifest companies.txt --skip-existing
//! ```
//!
//! # Environment Variables
//!
//! - `SOURCE_SHOPIFY_STORE` / `SOURCE_SHOPIFY_ACCESS_TOKEN` - store to read from

use std::path::Path;

use storebridge_admin::sync::company::sync_company;
use storebridge_admin::sync::driver::RunTracker;
use storebridge_admin::{ExistsPolicy, RunContext, SyncError};
use storebridge_core::{Gid, GidError, ResourceKind, RunSummary};
use tracing::info;

use crate::error::CliError;
use crate::manifest;
use crate::report::Report;

/// Migrate the listed companies, in order.
///
/// # Errors
///
/// Returns an error if no source store is configured, the manifest cannot
/// be read, or the report cannot be written.
pub async fn run(
    ctx: &mut RunContext,
    ids: &[String],
    manifest_path: Option<&Path>,
    policy: ExistsPolicy,
    report: &mut Report,
) -> Result<RunSummary, CliError> {
    if ctx.source.is_none() {
        return Err(CliError::Usage(
            "companies needs SOURCE_SHOPIFY_STORE and SOURCE_SHOPIFY_ACCESS_TOKEN".to_owned(),
        ));
    }

    let mut entries: Vec<(String, Result<Gid, GidError>)> = ids
        .iter()
        .map(|id| (id.clone(), Gid::from_gid_or_number(id, ResourceKind::Company)))
        .collect();
    if let Some(path) = manifest_path {
        for entry in manifest::load(path)? {
            entries.push(match entry {
                Ok(gid) => (gid.to_string(), Ok(gid)),
                Err((line, e)) => (format!("{}:{line}", path.display()), Err(e)),
            });
        }
    }
    if entries.is_empty() {
        return Err(CliError::Usage("no company ids given".to_owned()));
    }
    info!(companies = entries.len(), ?policy, "migrating companies");

    report.begin(&[])?;
    let mut tracker = RunTracker::new("company");
    for (key, id) in entries {
        let result = match id {
            Ok(gid) => sync_company(ctx, gid.as_str(), policy).await,
            Err(e) => Err(SyncError::Precondition(e.to_string())),
        };
        let outcome = tracker.record(&key, result);
        report.write(&key, None, &outcome)?;
    }

    Ok(tracker.finish())
}
