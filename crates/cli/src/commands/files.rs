//! File uploads, the one concurrent flow.
//!
//! # Usage
//!
//! ```bash
//! storebridge --report files.csv files --sheet files.csv --concurrency 4
//! ```

use futures::StreamExt;
use storebridge_admin::RunContext;
use storebridge_admin::sync::driver::RunTracker;
use storebridge_admin::sync::file::{row_key, upload_files};
use storebridge_core::RunSummary;
use tracing::info;

use crate::error::CliError;
use crate::report::Report;
use crate::sheet::Sheet;

/// Upload every row of `sheet`. Report lines follow completion order.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub async fn run(
    ctx: &RunContext,
    sheet: Sheet,
    report: &mut Report,
) -> Result<RunSummary, CliError> {
    let settings = ctx.files;
    info!(
        files = sheet.rows.len(),
        concurrency = settings.concurrency,
        poll_attempts = settings.poll_attempts,
        "uploading files"
    );
    report.begin(&sheet.headers)?;

    let mut tracker = RunTracker::new("file");
    let mut results = std::pin::pin!(upload_files(&ctx.target, sheet.rows, settings));
    while let Some((row, result)) = results.next().await {
        let key = row_key(&row);
        let outcome = tracker.record(&key, result);
        report.write(&key, Some(&row), &outcome)?;
    }

    Ok(tracker.finish())
}
