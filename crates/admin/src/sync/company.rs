//! Companies: source store to target store.
//!
//! One company is one record. The parent write (create or update) must
//! succeed or the record fails; every location and contact step after it is
//! caught on its own and reported as a child failure.

use std::collections::{HashMap, HashSet};

use storebridge_core::matching::{Listed, MatchKey, find_existing};
use storebridge_core::{RecordOutcome, Tier};
use tracing::{info, instrument, warn};

use super::customer::{CustomerDraft, upsert_customer};
use super::{ExistsPolicy, SyncError, child_failure, write_metafields};
use crate::context::RunContext;
use crate::resolve::{LookupKind, scoped};
use crate::shopify::admin::AddressType;
use crate::shopify::{
    AdminClient, Company, CompanyContact, CompanyCreateInput, CompanyInput, CompanyLocation,
    CompanyLocationInput, CompanyLocationUpdateInput, CompanySummary, ContactLink,
    LocationSummary, RoleAssign,
};

/// Orders fetched per source company for tiering.
pub const ORDER_HISTORY: i64 = 250;

fn company_keys(company: &Company) -> Vec<MatchKey> {
    let mut keys = Vec::with_capacity(2);
    keys.extend(MatchKey::from_optional(company.external_id.as_deref(), MatchKey::ExternalId));
    keys.extend(MatchKey::from_optional(Some(&company.name), MatchKey::Name));
    keys
}

fn location_keys(location: &CompanyLocation) -> Vec<MatchKey> {
    let mut keys = Vec::with_capacity(2);
    keys.extend(MatchKey::from_optional(location.external_id.as_deref(), MatchKey::ExternalId));
    keys.extend(MatchKey::from_optional(Some(&location.name), MatchKey::Name));
    keys
}

fn location_matches(location: &LocationSummary, key: &MatchKey) -> bool {
    match key {
        MatchKey::ExternalId(id) => {
            location.external_id.as_deref().map(str::trim) == Some(id.as_str())
        }
        MatchKey::Name(name) => location.name.trim().eq_ignore_ascii_case(name),
        _ => false,
    }
}

fn company_input(company: &Company) -> CompanyInput {
    CompanyInput {
        name: Some(company.name.clone()),
        external_id: company.external_id.clone(),
        note: company.note.clone(),
        customer_since: company.customer_since,
    }
}

/// Per-company state built while the record is processed.
struct CompanyRun<'a> {
    source: &'a Company,
    company_id: String,
    /// Target locations that existed before this run touched the company.
    preexisting: HashSet<String>,
    failures: Vec<String>,
}

impl CompanyRun<'_> {
    fn fail(&mut self, step: &'static str, child: &str, err: &dyn std::fmt::Display) {
        let line = child_failure(&self.source.name, step, child, err);
        self.failures.push(line);
    }
}

/// Migrate one company.
///
/// # Errors
///
/// Returns an error if the source company cannot be read or the parent
/// create/update fails. Later failures are reported on the outcome.
#[instrument(skip(ctx), fields(company = %source_id))]
pub async fn sync_company(
    ctx: &mut RunContext,
    source_id: &str,
    policy: ExistsPolicy,
) -> Result<RecordOutcome, SyncError> {
    let source_client = ctx
        .source
        .clone()
        .ok_or_else(|| SyncError::MissingSource("no source store configured".to_owned()))?;
    let target = ctx.target.clone();

    // 1. Match
    let source = source_client
        .get_company(source_id, ORDER_HISTORY)
        .await?
        .ok_or_else(|| SyncError::MissingSource(format!("company {source_id} not found")))?;

    let report = find_existing::<CompanySummary, _>(&target, &company_keys(&source)).await?;
    for (key, count) in &report.ambiguous {
        warn!(key = %key, candidates = count, "ambiguous company match");
    }
    let existing = report.into_found();

    if let Some(existing) = &existing
        && policy == ExistsPolicy::Skip
    {
        return Ok(RecordOutcome::skipped(
            Some(existing.id.clone()),
            "company already exists",
        ));
    }

    // 2. Create or update the parent
    let tier = ctx.tier_policy.tier_for(&source.order_facts(), ctx.now);
    let mut inline_location = None;
    let created = existing.is_none();
    let company_id = if let Some(existing) = existing {
        target.update_company(&existing.id, company_input(&source)).await?
    } else {
        let first = source.locations.iter().find(|l| l.has_valid_shipping());
        let company = target
            .create_company(CompanyCreateInput {
                company: company_input(&source),
                company_location: first.map(CompanyLocationInput::from),
            })
            .await?;
        if let (Some(first), Some(location)) = (first, company.locations.first()) {
            inline_location = Some(first.id.clone());
            ctx.resolver.remember(
                LookupKind::Location,
                &scoped(&company.id, &first.id),
                location.id.clone(),
            );
        }
        company.id
    };
    info!(company_id = %company_id, created, tier = %tier, "company written");

    let snapshot = target
        .get_company(&company_id, 0)
        .await?
        .ok_or_else(|| SyncError::MissingSource(format!("target company {company_id} vanished")))?;
    for role in &snapshot.contact_roles {
        ctx.resolver.remember(
            LookupKind::Role,
            &scoped(&company_id, &role.name),
            role.id.clone(),
        );
    }

    let mut run = CompanyRun {
        source: &source,
        company_id,
        preexisting: if created {
            HashSet::new()
        } else {
            snapshot.locations.iter().map(|l| l.id.clone()).collect()
        },
        failures: Vec::new(),
    };

    // 3. Reconcile locations
    let target_locations = snapshot.location_summaries();
    for location in &source.locations {
        if inline_location.as_deref() == Some(location.id.as_str()) {
            continue;
        }
        if !location.has_valid_shipping() {
            warn!(location = %location.name, "location has no valid shipping address, skipping");
            continue;
        }
        if let Err(e) =
            reconcile_location(ctx, &target, &run.company_id, location, &target_locations).await
        {
            run.fail("location", &location.name, &e);
        }
    }

    // 4. Addresses and tax settings on resolved locations
    for location in &source.locations {
        let key = scoped(&run.company_id, &location.id);
        let Some(Some(location_id)) = ctx.resolver.map().get(LookupKind::Location, &key) else {
            warn!(
                location = %location.name,
                "location unresolved, skipping addresses and tax settings"
            );
            continue;
        };
        let location_id = location_id.to_owned();
        if let Err(e) = link_location(&target, &run, location, &location_id).await {
            run.fail("location settings", &location.name, &e);
        }
    }

    // 5. Contacts
    let mut contacts: Option<Vec<ContactLink>> = None;
    for contact in &source.contacts {
        let label = contact
            .customer
            .as_ref()
            .and_then(|c| c.email.clone())
            .unwrap_or_else(|| contact.id.clone());
        if let Err(e) = sync_contact(ctx, &target, &run, contact, tier, &mut contacts).await {
            run.fail("contact", &label, &e);
        }
    }

    // 6. Tier and metafields
    if let Err(e) = write_metafields(
        &target,
        &run.company_id,
        &source.metafields,
        &snapshot.metafields,
        &[tier.metafield()],
    )
    .await
    {
        run.fail("metafields", &run.company_id.clone(), &e);
    }

    let outcome = if created {
        RecordOutcome::created(run.company_id)
    } else {
        RecordOutcome::updated(run.company_id)
    };
    Ok(outcome.with_child_failures(run.failures))
}

async fn reconcile_location(
    ctx: &mut RunContext,
    target: &AdminClient,
    company_id: &str,
    location: &CompanyLocation,
    target_locations: &[LocationSummary],
) -> Result<(), SyncError> {
    let listed = Listed::new(target_locations, location_matches);
    let report = find_existing(&listed, &location_keys(location))
        .await
        .unwrap_or_else(|never| match never {});
    for (key, count) in &report.ambiguous {
        warn!(
            location = %location.name,
            key = %key,
            candidates = count,
            "ambiguous location match"
        );
    }

    let location_id = match report.into_found() {
        Some(existing) => {
            target
                .update_location(&existing.id, CompanyLocationUpdateInput::from(location))
                .await?
        }
        None => {
            target
                .create_location(company_id, CompanyLocationInput::from(location))
                .await?
        }
    };
    ctx.resolver.remember(
        LookupKind::Location,
        &scoped(company_id, &location.id),
        location_id,
    );
    Ok(())
}

async fn link_location(
    target: &AdminClient,
    run: &CompanyRun<'_>,
    location: &CompanyLocation,
    location_id: &str,
) -> Result<(), SyncError> {
    if run.preexisting.contains(location_id) {
        match (&location.shipping_address, &location.billing_address) {
            (Some(shipping), Some(billing)) if shipping != billing => {
                target
                    .assign_location_address(
                        location_id,
                        shipping.clone(),
                        vec![AddressType::Shipping],
                    )
                    .await?;
                target
                    .assign_location_address(
                        location_id,
                        billing.clone(),
                        vec![AddressType::Billing],
                    )
                    .await?;
            }
            (Some(shipping), _) => {
                target
                    .assign_location_address(
                        location_id,
                        shipping.clone(),
                        vec![AddressType::Shipping, AddressType::Billing],
                    )
                    .await?;
            }
            (None, Some(billing)) => {
                target
                    .assign_location_address(
                        location_id,
                        billing.clone(),
                        vec![AddressType::Billing],
                    )
                    .await?;
            }
            (None, None) => {}
        }
    }

    if let Some(settings) = location.tax_settings.as_ref().filter(|s| !s.is_empty()) {
        target.update_location_tax_settings(location_id, settings).await?;
    }
    Ok(())
}

async fn sync_contact(
    ctx: &mut RunContext,
    target: &AdminClient,
    run: &CompanyRun<'_>,
    contact: &CompanyContact,
    tier: Tier,
    contacts: &mut Option<Vec<ContactLink>>,
) -> Result<(), SyncError> {
    let Some(customer) = &contact.customer else {
        warn!(contact = %contact.id, "contact has no customer, skipping");
        return Ok(());
    };

    let draft = CustomerDraft::from_customer(customer, Some(tier));
    let outcome =
        upsert_customer(target, ctx.resolver.map(), &draft, ExistsPolicy::Update).await?;
    let customer_id = outcome
        .target_id
        .ok_or_else(|| SyncError::Unresolved(format!("customer for contact {}", contact.id)))?;
    if let Some(email) = &draft.email {
        ctx.resolver.remember(LookupKind::Customer, email.as_str(), customer_id.clone());
    }

    let contact_id = ensure_contact(target, &run.company_id, &customer_id, contacts).await?;

    if contact.is_main_contact {
        target.assign_main_contact(&run.company_id, &contact_id).await?;
    }

    let mut roles: HashMap<String, Vec<RoleAssign>> = HashMap::new();
    for location in &run.source.locations {
        for assignment in &location.role_assignments {
            if assignment.customer_id() != Some(customer.id.as_str()) {
                continue;
            }
            let Some(role_name) = assignment.role_name() else {
                continue;
            };
            let Some(Some(location_id)) = ctx
                .resolver
                .map()
                .get(LookupKind::Location, &scoped(&run.company_id, &location.id))
            else {
                warn!(
                    location = %location.name,
                    role = role_name,
                    "role location unresolved, skipping"
                );
                continue;
            };
            let Some(Some(role_id)) = ctx
                .resolver
                .map()
                .get(LookupKind::Role, &scoped(&run.company_id, role_name))
            else {
                warn!(role = role_name, "role not defined on target company, skipping");
                continue;
            };
            roles
                .entry(location_id.to_owned())
                .or_default()
                .push(RoleAssign {
                    company_contact_id: contact_id.clone(),
                    company_contact_role_id: role_id.to_owned(),
                });
        }
    }

    for (location_id, assignments) in roles {
        target.assign_location_roles(&location_id, assignments).await?;
    }
    Ok(())
}

/// The company contact for `customer_id`, linking the customer if needed.
///
/// The full contact list is fetched once per company and extended as new
/// links are made.
async fn ensure_contact(
    target: &AdminClient,
    company_id: &str,
    customer_id: &str,
    contacts: &mut Option<Vec<ContactLink>>,
) -> Result<String, SyncError> {
    if contacts.is_none() {
        *contacts = Some(target.list_company_contacts(company_id).await?);
    }
    let listed = contacts.get_or_insert_with(Vec::new);

    if let Some(link) = listed
        .iter()
        .find(|c| c.customer.as_ref().is_some_and(|r| r.id == customer_id))
    {
        return Ok(link.id.clone());
    }

    let contact_id = target.assign_customer_as_contact(company_id, customer_id).await?;
    listed.push(ContactLink {
        id: contact_id.clone(),
        customer: Some(crate::shopify::IdRef {
            id: customer_id.to_owned(),
        }),
    });
    Ok(contact_id)
}
