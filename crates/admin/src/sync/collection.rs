//! Collections: sheet rows to target.

use storebridge_core::grouping::{ListField, ListItem, MergeGroup, MergeSpec};
use storebridge_core::matching::{MatchKey, find_existing};
use storebridge_core::{MetafieldColumn, RecordOutcome, SourceRow};
use tracing::{info, instrument, warn};

use super::{ExistsPolicy, SyncError, child_failure, raw_metafields, scalar, write_metafields};
use crate::context::RunContext;
use crate::resolve::LookupKind;
use crate::shopify::{
    CollectionInput, CollectionRecord, CollectionRuleInput, CollectionRuleSetInput, MoveInput,
};

/// Sheet columns.
pub mod columns {
    /// Handle, also the grouping key.
    pub const HANDLE: &str = "Handle";
    /// Title.
    pub const TITLE: &str = "Title";
    /// Description HTML.
    pub const BODY_HTML: &str = "Body HTML";
    /// Sort order, e.g. `Manual` or `Best Selling`.
    pub const SORT_ORDER: &str = "Sort Order";
    /// `all` or `any` for smart collection rules.
    pub const MUST_MATCH: &str = "Must Match";
    /// Rule column, e.g. `Tag`.
    pub const RULE_COLUMN: &str = "Rule: Product Column";
    /// Rule relation, e.g. `Equals`.
    pub const RULE_RELATION: &str = "Rule: Relation";
    /// Rule condition value.
    pub const RULE_CONDITION: &str = "Rule: Condition";
    /// Member product handle.
    pub const PRODUCT_HANDLE: &str = "Product: Handle";
    /// Member product position.
    pub const PRODUCT_POSITION: &str = "Product: Position";
}

const RULES: &str = "rules";
const PRODUCTS: &str = "products";

/// Row grouping for collection sheets.
#[must_use]
pub fn merge_spec(metafields: &[MetafieldColumn]) -> MergeSpec {
    use columns as c;
    MergeSpec::new()
        .scalar(c::HANDLE, c::HANDLE)
        .scalar(c::TITLE, c::TITLE)
        .scalar(c::BODY_HTML, c::BODY_HTML)
        .scalar(c::SORT_ORDER, c::SORT_ORDER)
        .discriminator(c::MUST_MATCH, c::MUST_MATCH)
        .list(ListField::new(RULES, [c::RULE_COLUMN, c::RULE_RELATION, c::RULE_CONDITION]))
        .list(
            ListField::new(PRODUCTS, [c::PRODUCT_HANDLE, c::PRODUCT_POSITION])
                .positioned(c::PRODUCT_POSITION),
        )
        .metafields(metafields.iter().cloned())
}

/// Grouping key: the lowercased handle.
#[must_use]
pub fn group_key(row: &SourceRow) -> Option<String> {
    row.get(columns::HANDLE).map(str::to_lowercase)
}

/// `Best Selling` / `best-selling` to `BEST_SELLING`.
fn enum_value(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

fn rule_set(group: &MergeGroup) -> Result<Option<CollectionRuleSetInput>, SyncError> {
    let rules: Vec<CollectionRuleInput> = group
        .list(RULES)
        .iter()
        .filter_map(|item| match (item.get(0), item.get(1), item.get(2)) {
            (Some(column), Some(relation), Some(condition)) => Some(CollectionRuleInput {
                column: enum_value(column),
                relation: enum_value(relation),
                condition: condition.to_owned(),
            }),
            _ => {
                warn!(collection = %group.key, rule = ?item.values, "incomplete rule, skipping");
                None
            }
        })
        .collect();
    if rules.is_empty() {
        return Ok(None);
    }

    let applied_disjunctively = match group
        .discriminator(columns::MUST_MATCH)
        .map(|m| m.trim().to_ascii_lowercase())
        .as_deref()
    {
        None | Some("all") => false,
        Some("any") => true,
        Some(other) => {
            return Err(SyncError::Precondition(format!(
                "{}: expected all or any, got {other:?}",
                columns::MUST_MATCH
            )));
        }
    };
    Ok(Some(CollectionRuleSetInput {
        applied_disjunctively,
        rules,
    }))
}

fn collection_input(group: &MergeGroup, id: Option<String>) -> Result<CollectionInput, SyncError> {
    Ok(CollectionInput {
        handle: if id.is_none() { scalar(group, columns::HANDLE) } else { None },
        id,
        title: scalar(group, columns::TITLE),
        description_html: scalar(group, columns::BODY_HTML),
        sort_order: scalar(group, columns::SORT_ORDER).map(|s| enum_value(&s)),
        rule_set: rule_set(group)?,
    })
}

/// Sync one collection merge group.
///
/// # Errors
///
/// Returns an error if the group is invalid or the collection write fails.
/// Product membership failures are reported on the outcome.
#[instrument(skip(ctx, group), fields(collection = %group.key))]
pub async fn sync_collection(
    ctx: &mut RunContext,
    group: &MergeGroup,
    policy: ExistsPolicy,
) -> Result<RecordOutcome, SyncError> {
    let handle = scalar(group, columns::HANDLE)
        .ok_or_else(|| SyncError::Precondition("collection has no handle".to_owned()))?;
    let target = ctx.target.clone();

    let existing =
        find_existing::<CollectionRecord, _>(&target, &[MatchKey::Handle(handle.clone())])
            .await?
            .into_found();

    if let Some(existing) = existing {
        ctx.resolver.remember(LookupKind::Collection, &handle, existing.id.clone());
        if policy == ExistsPolicy::Skip {
            return Ok(RecordOutcome::skipped(
                Some(existing.id),
                "collection already exists",
            ));
        }
        let id = target
            .update_collection(collection_input(group, Some(existing.id))?)
            .await?;
        write_metafields(&target, &id, &raw_metafields(group), &existing.metafields, &[]).await?;
        return Ok(RecordOutcome::updated(id));
    }

    let input = collection_input(group, None)?;
    let smart = input.rule_set.is_some();
    let manual = input.sort_order.as_deref() == Some("MANUAL");
    let id = target.create_collection(input).await?;
    ctx.resolver.remember(LookupKind::Collection, &handle, id.clone());
    info!(collection_id = %id, "collection created");

    let mut failures = Vec::new();
    if let Err(e) = write_metafields(&target, &id, &raw_metafields(group), &[], &[]).await {
        failures.push(child_failure(&handle, "metafields", &id, &e));
    }

    let members = group.list(PRODUCTS);
    if smart && !members.is_empty() {
        warn!(products = members.len(), "smart collection ignores listed products");
    } else if !members.is_empty()
        && let Err(e) = add_products(ctx, &id, members, manual).await
    {
        failures.push(child_failure(&handle, "products", &id, &e));
    }

    Ok(RecordOutcome::created(id).with_child_failures(failures))
}

/// Resolve member handles, add them, and reorder when sorting is manual.
async fn add_products(
    ctx: &mut RunContext,
    collection_id: &str,
    members: &[ListItem],
    manual: bool,
) -> Result<(), SyncError> {
    let mut product_ids = Vec::with_capacity(members.len());
    for member in members {
        match ctx.resolver.resolve(LookupKind::Product, member.value()).await? {
            Some(id) => product_ids.push(id),
            None => warn!(product = member.value(), "product handle did not resolve, excluding"),
        }
    }
    if product_ids.is_empty() {
        return Ok(());
    }

    ctx.target.add_collection_products(collection_id, &product_ids).await?;

    if manual {
        let moves: Vec<MoveInput> = product_ids
            .into_iter()
            .enumerate()
            .map(|(position, id)| MoveInput {
                id,
                new_position: position.to_string(),
            })
            .collect();
        ctx.target.reorder_collection_products(collection_id, &moves).await?;
    }
    Ok(())
}
