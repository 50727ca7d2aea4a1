//! Sheet-driven flows: customers, collections, discounts and products.
//!
//! # Usage
//!
//! ```bash
//! storebridge --report customers-report.csv customers --sheet customers.csv
//! storebridge collections --sheet collections.csv --update-existing
//! storebridge products --sheet products.csv --skip-existing
//! ```

use storebridge_admin::sync::definitions::ensure_definitions;
use storebridge_admin::sync::driver::RunTracker;
use storebridge_admin::sync::{collection, customer, discount, product};
use storebridge_admin::{ExistsPolicy, RunContext, SyncError};
use storebridge_admin::shopify::OwnerType;
use storebridge_core::grouping::{GroupingError, MergeGroup, MergeSpec, group_rows};
use storebridge_core::{MetafieldColumn, RecordOutcome, RunSummary, SourceRow};
use tracing::{info, warn};

use crate::error::CliError;
use crate::report::Report;
use crate::sheet::Sheet;

/// Which grouped entity a sheet holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEntity {
    /// Customer rows, grouped by email.
    Customers,
    /// Collection rows, grouped by handle.
    Collections,
    /// Discount rows, grouped by code or title.
    Discounts,
    /// Product rows, grouped by handle.
    Products,
}

impl SheetEntity {
    const fn label(self) -> &'static str {
        match self {
            Self::Customers => "customer",
            Self::Collections => "collection",
            Self::Discounts => "discount",
            Self::Products => "product",
        }
    }

    const fn owner_type(self) -> Option<OwnerType> {
        match self {
            Self::Customers => Some(OwnerType::Customer),
            Self::Collections => Some(OwnerType::Collection),
            Self::Products => Some(OwnerType::Product),
            Self::Discounts => None,
        }
    }

    fn merge_spec(self, metafields: &[MetafieldColumn]) -> MergeSpec {
        match self {
            Self::Customers => customer::merge_spec(metafields),
            Self::Collections => collection::merge_spec(metafields),
            Self::Products => product::merge_spec(metafields),
            Self::Discounts => discount::merge_spec(),
        }
    }

    fn group_key(self, row: &SourceRow) -> Option<String> {
        match self {
            Self::Customers => customer::group_key(row),
            Self::Collections => collection::group_key(row),
            Self::Products => product::group_key(row),
            Self::Discounts => discount::group_key(row),
        }
    }

    async fn sync(
        self,
        ctx: &mut RunContext,
        group: &MergeGroup,
        policy: ExistsPolicy,
    ) -> Result<RecordOutcome, SyncError> {
        match self {
            Self::Customers => customer::sync_customer(ctx, group, policy).await,
            Self::Collections => collection::sync_collection(ctx, group, policy).await,
            Self::Products => product::sync_product(ctx, group, policy).await,
            Self::Discounts => discount::sync_discount(ctx, group, policy).await,
        }
    }
}

/// Group a sheet and run every group through its flow, one at a time.
///
/// # Errors
///
/// Returns an error for a bad metafield header, a failed definition
/// listing, or a report write failure. Record failures are only counted.
pub async fn run(
    ctx: &mut RunContext,
    entity: SheetEntity,
    sheet: &Sheet,
    policy: ExistsPolicy,
    report: &mut Report,
) -> Result<RunSummary, CliError> {
    let columns = sheet.metafield_columns()?;
    match entity.owner_type() {
        Some(owner_type) => {
            let definitions = ensure_definitions(&ctx.target, owner_type, &columns).await?;
            info!(
                existing = definitions.existing,
                created = definitions.created,
                mismatched = definitions.mismatched.len(),
                failed = definitions.failed.len(),
                "metafield definitions checked"
            );
        }
        None if !columns.is_empty() => {
            warn!(
                columns = columns.len(),
                "metafield columns are not supported on discounts, ignoring"
            );
        }
        None => {}
    }

    report.begin(&sheet.headers)?;
    let grouping = group_rows(
        &sheet.rows,
        |row| entity.group_key(row),
        &entity.merge_spec(&columns),
    );
    info!(
        entity = entity.label(),
        groups = grouping.groups.len(),
        dropped = grouping.dropped.len(),
        ?policy,
        "sheet grouped"
    );

    let mut tracker = RunTracker::new(entity.label());
    for line in grouping.dropped {
        warn!(line, "row has no key, dropping");
        let key = format!("line {line}");
        let outcome = tracker.record(&key, Ok(RecordOutcome::skipped(None, "row has no key")));
        report.write(&key, sheet.row(line), &outcome)?;
    }

    for group in grouping.groups {
        let (key, line, result) = match group {
            Ok(group) => {
                let result = entity.sync(ctx, &group, policy).await;
                (group.key.clone(), group.first_line(), result)
            }
            Err(e) => {
                let GroupingError::Conflict { key, first_line, .. } = &e;
                (key.clone(), *first_line, Err(SyncError::from(e)))
            }
        };
        let outcome = tracker.record(&key, result);
        report.write(&key, sheet.row(line), &outcome)?;
    }

    Ok(tracker.finish())
}
