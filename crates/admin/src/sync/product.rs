//! Products: sheet rows to target.

use storebridge_core::grouping::{ListField, MergeGroup, MergeSpec};
use storebridge_core::matching::{MatchKey, find_existing};
use storebridge_core::{MetafieldColumn, RecordOutcome, SourceRow};
use tracing::instrument;

use super::{ExistsPolicy, SyncError, raw_metafields, scalar, write_metafields};
use crate::context::RunContext;
use crate::resolve::LookupKind;
use crate::shopify::{ProductInput, ProductRecord};

/// Sheet columns.
pub mod columns {
    /// Handle, also the grouping key.
    pub const HANDLE: &str = "Handle";
    /// Title.
    pub const TITLE: &str = "Title";
    /// Description HTML.
    pub const BODY_HTML: &str = "Body HTML";
    /// Vendor.
    pub const VENDOR: &str = "Vendor";
    /// Product type.
    pub const TYPE: &str = "Type";
    /// `active`, `draft` or `archived`.
    pub const STATUS: &str = "Status";
    /// Comma-separated tags.
    pub const TAGS: &str = "Tags";
}

/// Row grouping for product sheets.
#[must_use]
pub fn merge_spec(metafields: &[MetafieldColumn]) -> MergeSpec {
    use columns as c;
    MergeSpec::new()
        .scalar(c::HANDLE, c::HANDLE)
        .scalar(c::TITLE, c::TITLE)
        .scalar(c::BODY_HTML, c::BODY_HTML)
        .scalar(c::VENDOR, c::VENDOR)
        .scalar(c::TYPE, c::TYPE)
        .scalar(c::STATUS, c::STATUS)
        .list(ListField::new(c::TAGS, [c::TAGS]).split_on(','))
        .metafields(metafields.iter().cloned())
}

/// Grouping key: the lowercased handle.
#[must_use]
pub fn group_key(row: &SourceRow) -> Option<String> {
    row.get(columns::HANDLE).map(str::to_lowercase)
}

fn status(value: &str) -> Result<String, SyncError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "active" => Ok("ACTIVE".to_owned()),
        "draft" => Ok("DRAFT".to_owned()),
        "archived" => Ok("ARCHIVED".to_owned()),
        other => Err(SyncError::Precondition(format!("unknown product status {other:?}"))),
    }
}

fn product_input(group: &MergeGroup, id: Option<String>) -> Result<ProductInput, SyncError> {
    let tags: Vec<String> = group
        .list_values(columns::TAGS)
        .into_iter()
        .map(str::to_owned)
        .collect();
    Ok(ProductInput {
        handle: if id.is_none() { scalar(group, columns::HANDLE) } else { None },
        id,
        title: scalar(group, columns::TITLE),
        description_html: scalar(group, columns::BODY_HTML),
        vendor: scalar(group, columns::VENDOR),
        product_type: scalar(group, columns::TYPE),
        status: scalar(group, columns::STATUS).map(|s| status(&s)).transpose()?,
        tags: (!tags.is_empty()).then_some(tags),
    })
}

/// Sync one product merge group.
///
/// # Errors
///
/// Returns an error if the group is invalid or a write fails.
#[instrument(skip(ctx, group), fields(product = %group.key))]
pub async fn sync_product(
    ctx: &mut RunContext,
    group: &MergeGroup,
    policy: ExistsPolicy,
) -> Result<RecordOutcome, SyncError> {
    let handle = scalar(group, columns::HANDLE)
        .ok_or_else(|| SyncError::Precondition("product has no handle".to_owned()))?;
    let target = ctx.target.clone();

    let existing = find_existing::<ProductRecord, _>(&target, &[MatchKey::Handle(handle.clone())])
        .await?
        .into_found();

    let outcome = match existing {
        Some(existing) if policy == ExistsPolicy::Skip => {
            RecordOutcome::skipped(Some(existing.id), "product already exists")
        }
        Some(existing) => {
            let id = target
                .update_product(product_input(group, Some(existing.id))?)
                .await?;
            write_metafields(&target, &id, &raw_metafields(group), &existing.metafields, &[])
                .await?;
            RecordOutcome::updated(id)
        }
        None => {
            if scalar(group, columns::TITLE).is_none() {
                return Err(SyncError::Precondition("new product needs a title".to_owned()));
            }
            let id = target.create_product(product_input(group, None)?).await?;
            write_metafields(&target, &id, &raw_metafields(group), &[], &[]).await?;
            RecordOutcome::created(id)
        }
    };

    if let Some(id) = &outcome.target_id {
        ctx.resolver.remember(LookupKind::Product, &handle, id.clone());
    }
    Ok(outcome)
}
