//! Customers: sheet rows, and the customers behind company contacts.

use storebridge_core::grouping::{ListField, MergeGroup, MergeSpec};
use storebridge_core::matching::{MatchKey, find_existing};
use storebridge_core::{Email, MetafieldColumn, RawMetafield, RecordOutcome, SourceRow, Tier};
use tracing::{debug, instrument, warn};

use super::{ExistsPolicy, SyncError, raw_metafields, scalar, write_metafields};
use crate::context::RunContext;
use crate::resolve::{IdentifierMap, LookupKind};
use crate::shopify::{AdminClient, Customer, CustomerInput};

/// Sheet columns.
pub mod columns {
    /// Email, also the grouping key.
    pub const EMAIL: &str = "Email";
    /// First name.
    pub const FIRST_NAME: &str = "First Name";
    /// Last name.
    pub const LAST_NAME: &str = "Last Name";
    /// Phone.
    pub const PHONE: &str = "Phone";
    /// Note.
    pub const NOTE: &str = "Note";
    /// Tier label; becomes a `Tier_<Label>` tag.
    pub const TIER: &str = "Tier";
    /// Comma-separated tags.
    pub const TAGS: &str = "Tags";
}

/// Row grouping for customer sheets.
#[must_use]
pub fn merge_spec(metafields: &[MetafieldColumn]) -> MergeSpec {
    use columns as c;
    MergeSpec::new()
        .scalar(c::EMAIL, c::EMAIL)
        .scalar(c::FIRST_NAME, c::FIRST_NAME)
        .scalar(c::LAST_NAME, c::LAST_NAME)
        .scalar(c::PHONE, c::PHONE)
        .scalar(c::NOTE, c::NOTE)
        .scalar(c::TIER, c::TIER)
        .list(ListField::new(c::TAGS, [c::TAGS]).split_on(','))
        .metafields(metafields.iter().cloned())
}

/// Grouping key: the lowercased email.
#[must_use]
pub fn group_key(row: &SourceRow) -> Option<String> {
    row.get(columns::EMAIL).map(str::to_lowercase)
}

/// A customer to write, whichever flow it came from.
#[derive(Debug, Clone, Default)]
pub struct CustomerDraft {
    /// Email.
    pub email: Option<Email>,
    /// Phone.
    pub phone: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Note.
    pub note: Option<String>,
    /// Tags before the tier tag is applied.
    pub tags: Vec<String>,
    /// Forced tier tag.
    pub tier: Option<Tier>,
    /// Metafields merged over the target's.
    pub metafields: Vec<RawMetafield>,
}

impl CustomerDraft {
    /// Build from a merge group.
    ///
    /// # Errors
    ///
    /// Returns a precondition error for an invalid email or unknown tier.
    pub fn from_group(group: &MergeGroup) -> Result<Self, SyncError> {
        let email = scalar(group, columns::EMAIL)
            .map(|e| {
                Email::parse(&e)
                    .map_err(|err| SyncError::Precondition(format!("email {e:?}: {err}")))
            })
            .transpose()?;
        let tier = scalar(group, columns::TIER)
            .map(|t| {
                Tier::from_label(&t)
                    .ok_or_else(|| SyncError::Precondition(format!("unknown tier {t:?}")))
            })
            .transpose()?;

        Ok(Self {
            email,
            phone: scalar(group, columns::PHONE),
            first_name: scalar(group, columns::FIRST_NAME),
            last_name: scalar(group, columns::LAST_NAME),
            note: scalar(group, columns::NOTE),
            tags: group
                .list_values(columns::TAGS)
                .into_iter()
                .map(str::to_owned)
                .collect(),
            tier,
            metafields: raw_metafields(group),
        })
    }

    /// Build from a source-store customer.
    #[must_use]
    pub fn from_customer(customer: &Customer, tier: Option<Tier>) -> Self {
        Self {
            email: Email::from_optional(customer.email.as_deref()),
            phone: customer.phone.clone(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            note: customer.note.clone(),
            tags: customer.tags.clone(),
            tier,
            metafields: customer.metafields.clone(),
        }
    }

    /// Match keys in trust order: email, then phone.
    #[must_use]
    pub fn match_keys(&self) -> Vec<MatchKey> {
        let mut keys = Vec::with_capacity(2);
        keys.extend(self.email.clone().map(MatchKey::Email));
        keys.extend(MatchKey::from_optional(self.phone.as_deref(), MatchKey::Phone));
        keys
    }

    /// Tags to write: the source tags with the tier tag forced in.
    #[must_use]
    pub fn final_tags(&self) -> Vec<String> {
        match self.tier {
            Some(tier) => tier.apply_to_tags(&self.tags),
            None => self.tags.clone(),
        }
    }

    fn input(&self, id: Option<String>) -> CustomerInput {
        CustomerInput {
            email: if id.is_none() {
                self.email.as_ref().map(|e| e.as_str().to_owned())
            } else {
                None
            },
            id,
            phone: self.phone.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            note: self.note.clone(),
            tags: Some(self.final_tags()),
        }
    }

    fn label(&self) -> String {
        self.email
            .as_ref()
            .map(|e| e.as_str().to_owned())
            .or_else(|| self.phone.clone())
            .unwrap_or_default()
    }
}

/// Create the customer, or update it under [`ExistsPolicy::Update`].
///
/// A customer already recorded in `map` for this run counts as the match, so
/// a contact shared by several companies is created once even before the
/// store's search index catches up.
///
/// # Errors
///
/// Returns an error if the draft has no email or phone, or a write fails.
pub async fn upsert_customer(
    client: &AdminClient,
    map: &IdentifierMap,
    draft: &CustomerDraft,
    policy: ExistsPolicy,
) -> Result<RecordOutcome, SyncError> {
    let keys = draft.match_keys();
    if keys.is_empty() {
        return Err(SyncError::Precondition("customer has no email or phone".to_owned()));
    }

    let known = draft
        .email
        .as_ref()
        .and_then(|email| map.get(LookupKind::Customer, email.as_str()).flatten());
    let existing = if let Some(id) = known {
        debug!(customer = %draft.label(), id, "customer already written this run");
        Some(Customer {
            id: id.to_owned(),
            ..Customer::default()
        })
    } else {
        let report = find_existing::<Customer, _>(client, &keys).await?;
        for (key, count) in &report.ambiguous {
            warn!(
                customer = %draft.label(),
                key = %key,
                candidates = count,
                "ambiguous customer match"
            );
        }
        report.into_found()
    };

    match existing {
        Some(existing) if policy == ExistsPolicy::Skip => Ok(RecordOutcome::skipped(
            Some(existing.id),
            "customer already exists",
        )),
        Some(existing) => {
            let id = client.update_customer(draft.input(Some(existing.id))).await?;
            write_metafields(client, &id, &draft.metafields, &existing.metafields, &[]).await?;
            Ok(RecordOutcome::updated(id))
        }
        None => {
            let id = client.create_customer(draft.input(None)).await?;
            write_metafields(client, &id, &draft.metafields, &[], &[]).await?;
            Ok(RecordOutcome::created(id))
        }
    }
}

/// Sync one customer merge group.
///
/// # Errors
///
/// Returns an error if the group is invalid or a write fails.
#[instrument(skip(ctx, group), fields(customer = %group.key))]
pub async fn sync_customer(
    ctx: &mut RunContext,
    group: &MergeGroup,
    policy: ExistsPolicy,
) -> Result<RecordOutcome, SyncError> {
    let draft = CustomerDraft::from_group(group)?;
    let outcome = upsert_customer(&ctx.target, ctx.resolver.map(), &draft, policy).await?;
    if let (Some(email), Some(id)) = (&draft.email, &outcome.target_id) {
        ctx.resolver.remember(LookupKind::Customer, email.as_str(), id.clone());
    }
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storebridge_core::grouping::group_rows;

    use super::*;

    fn group(rows: &[SourceRow]) -> MergeGroup {
        let spec = merge_spec(&[]);
        let mut grouping = group_rows(rows, group_key, &spec);
        grouping.groups.remove(0).unwrap()
    }

    #[test]
    fn test_rows_merge_into_one_draft() {
        let rows = [
            SourceRow::new(
                2,
                [
                    ("Email", "Ada@Example.com"),
                    ("First Name", "Ada"),
                    ("Tags", "vip, wholesale"),
                    ("Tier", ""),
                ],
            ),
            SourceRow::new(
                3,
                [
                    ("Email", "ada@example.com"),
                    ("First Name", "Augusta"),
                    ("Tags", "wholesale,b2b"),
                    ("Tier", "gold"),
                ],
            ),
        ];
        let draft = CustomerDraft::from_group(&group(&rows)).unwrap();

        assert_eq!(draft.first_name.as_deref(), Some("Ada"));
        assert_eq!(draft.email.as_ref().map(Email::as_str), Some("ada@example.com"));
        assert_eq!(draft.tier, Some(Tier::Gold));
        assert_eq!(draft.final_tags(), vec!["vip", "wholesale", "b2b", "Tier_Gold"]);
    }

    #[test]
    fn test_unknown_tier_is_a_precondition_failure() {
        let rows = [SourceRow::new(2, [("Email", "a@b.co"), ("Tier", "platinum")])];
        assert!(matches!(
            CustomerDraft::from_group(&group(&rows)),
            Err(SyncError::Precondition(_))
        ));
    }

    #[test]
    fn test_match_keys_email_before_phone() {
        let draft = CustomerDraft {
            email: Email::from_optional(Some("a@b.co")),
            phone: Some("+15550100".into()),
            ..CustomerDraft::default()
        };
        let keys = draft.match_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.first().map(MatchKey::strategy), Some("email"));
        assert_eq!(keys.get(1).map(MatchKey::strategy), Some("phone"));
    }

    #[test]
    fn test_update_input_carries_id_not_email() {
        let draft = CustomerDraft {
            email: Email::from_optional(Some("a@b.co")),
            tags: vec!["Tier_Bronze".into(), "vip".into()],
            tier: Some(Tier::Silver),
            ..CustomerDraft::default()
        };
        let input = draft.input(Some("gid://shopify/Customer/1".into()));
        assert_eq!(input.id.as_deref(), Some("gid://shopify/Customer/1"));
        assert!(input.email.is_none());
        assert_eq!(input.tags, Some(vec!["vip".to_owned(), "Tier_Silver".to_owned()]));
    }
}
