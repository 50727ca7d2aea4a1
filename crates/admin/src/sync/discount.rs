//! Discounts: sheet rows to target, one builder per (method, kind) variant.

use std::collections::HashMap;

use storebridge_core::RecordOutcome;
use storebridge_core::discount::{DiscountDraft, DiscountMethod, DiscountSpec, ReferenceKind};
use storebridge_core::grouping::MergeGroup;
use storebridge_core::matching::{MatchKey, find_existing};
use tracing::{info, instrument, warn};

use super::{ExistsPolicy, SyncError};
use crate::context::RunContext;
use crate::resolve::LookupKind;
use crate::shopify::DiscountRecord;

pub use storebridge_core::discount::{group_key, merge_spec};

fn match_key(spec: &DiscountSpec<String>) -> MatchKey {
    match (spec.method, &spec.code) {
        (DiscountMethod::Code, Some(code)) => MatchKey::Code(code.clone()),
        _ => MatchKey::Title(spec.title.clone()),
    }
}

/// Resolve every reference of `spec`.
///
/// Misses are logged and dropped. A list left with no resolved reference
/// fails the record.
///
/// # Errors
///
/// Returns a lookup error, or `Unresolved` for a list with no survivors.
pub async fn resolve_references(
    ctx: &mut RunContext,
    spec: DiscountSpec<String>,
) -> Result<DiscountSpec<String>, SyncError> {
    let wanted: Vec<(ReferenceKind, String)> = spec
        .references()
        .into_iter()
        .flat_map(|(kind, refs)| refs.iter().map(move |r| (kind, r.clone())))
        .collect();

    let mut resolved: HashMap<(ReferenceKind, String), String> = HashMap::new();
    for (kind, reference) in wanted {
        match ctx.resolver.resolve(LookupKind::from(kind), &reference).await? {
            Some(id) => {
                resolved.insert((kind, reference), id);
            }
            None => warn!(
                kind = %LookupKind::from(kind),
                key = %reference,
                "reference did not resolve, excluding"
            ),
        }
    }

    spec.map_references(|kind, refs| {
        let total = refs.len();
        let ids: Vec<String> = refs
            .into_iter()
            .filter_map(|r| resolved.get(&(kind, r)).cloned())
            .collect();
        if ids.is_empty() && total > 0 {
            return Err(SyncError::Unresolved(format!(
                "none of {total} {} references resolved",
                LookupKind::from(kind)
            )));
        }
        Ok(ids)
    })
}

/// Sync one discount merge group.
///
/// # Errors
///
/// Returns an error if the group does not build, a required reference list
/// resolves to nothing, or the write fails.
#[instrument(skip(ctx, group), fields(discount = %group.key))]
pub async fn sync_discount(
    ctx: &mut RunContext,
    group: &MergeGroup,
    policy: ExistsPolicy,
) -> Result<RecordOutcome, SyncError> {
    let spec = DiscountDraft::from_group(group)?.build(ctx.now)?;
    let target = ctx.target.clone();

    let existing = find_existing::<DiscountRecord, _>(&target, &[match_key(&spec)])
        .await?
        .into_found();
    if let Some(existing) = &existing
        && policy == ExistsPolicy::Skip
    {
        return Ok(RecordOutcome::skipped(
            Some(existing.id.clone()),
            "discount already exists",
        ));
    }

    let spec = resolve_references(ctx, spec).await?;
    let variant = spec.variant();
    let outcome = match existing {
        Some(existing) => {
            RecordOutcome::updated(target.update_discount(&existing.id, &spec).await?)
        }
        None => RecordOutcome::created(target.create_discount(&spec).await?),
    };
    info!(operation = variant.create_operation, target_id = ?outcome.target_id, "discount written");
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use storebridge_core::discount::{
        Combinations, DiscountBody, DiscountValue, Eligibility, Items, MinimumRequirement,
    };

    use super::*;

    fn spec(method: DiscountMethod, code: Option<&str>) -> DiscountSpec<String> {
        DiscountSpec {
            method,
            title: "Spring".into(),
            code: code.map(str::to_owned),
            starts_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            ends_at: None,
            usage_limit: None,
            once_per_customer: false,
            combines_with: Combinations::default(),
            eligibility: Eligibility::All,
            body: DiscountBody::Basic {
                value: DiscountValue::Percentage(rust_decimal::Decimal::new(1, 1)),
                items: Items::All,
                minimum: MinimumRequirement::None,
            },
        }
    }

    #[test]
    fn test_match_key_by_method() {
        assert_eq!(
            match_key(&spec(DiscountMethod::Code, Some("SPRING"))),
            MatchKey::Code("SPRING".into())
        );
        assert_eq!(
            match_key(&spec(DiscountMethod::Automatic, None)),
            MatchKey::Title("Spring".into())
        );
    }
}
