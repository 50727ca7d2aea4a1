//! Company locations on an existing target company: reconcile by name,
//! address re-assignment, role assignment, and multi-page location lists.

use serde_json::{Value, json};
use storebridge_admin::shopify::AdminShopifyError;
use storebridge_admin::sync::company::sync_company;
use storebridge_admin::{ExistsPolicy, LookupKind, RunContext, SyncError};
use storebridge_core::RecordStatus;
use storebridge_integration_tests::{
    client, company, data, metafields_set_ok, now, operation, operation_with, payload,
    recent_orders, source_contact, source_location,
};
use wiremock::MockServer;

const SOURCE_ID: &str = "gid://shopify/Company/900";
const TARGET_ID: &str = "gid://shopify/Company/1";
const HQ: &str = "gid://shopify/CompanyLocation/10";
const WAREHOUSE: &str = "gid://shopify/CompanyLocation/11";
const ROLE: &str = "gid://shopify/CompanyContactRole/3";
const CONTACT: &str = "gid://shopify/CompanyContact/77";
const CUSTOMER: &str = "gid://shopify/Customer/501";
const SOURCE_CUSTOMER: &str = "gid://shopify/Customer/1";

fn context(source: &MockServer, target: &MockServer) -> RunContext {
    RunContext::new(client(target))
        .with_source(client(source))
        .with_now(now())
}

fn location_key(source_location: u64) -> String {
    format!("{TARGET_ID}::gid://shopify/CompanyLocation/{source_location}")
}

/// A source location granting `role` to the contact backed by `customer`.
fn with_role(mut location: Value, role: &str, customer: &str) -> Value {
    location["roleAssignments"] = json!({ "nodes": [{
        "role": { "name": role },
        "companyContact": {
            "id": "gid://shopify/CompanyContact/1",
            "customer": { "id": customer }
        }
    }] });
    location
}

fn target_location(id: &str, name: &str) -> Value {
    let mut location = source_location(0, name);
    location["id"] = json!(id);
    location
}

async fn mount_existing_company(target: &MockServer) {
    operation_with("FindCompanies", json!({ "query": "external_id:\"C1\"" }))
        .respond_with(data(json!({
            "companies": { "nodes": [{ "id": TARGET_ID, "name": "Acme", "externalId": "C1" }] }
        })))
        .expect(1)
        .mount(target)
        .await;
    operation_with("CompanyUpdate", json!({ "companyId": TARGET_ID }))
        .respond_with(payload("companyUpdate", "company", json!({ "id": TARGET_ID }), &[]))
        .expect(1)
        .mount(target)
        .await;
}

// ---------------------------------------------------------------------------
// Reconcile, addresses and roles on an existing company
// ---------------------------------------------------------------------------

#[tokio::test]
async fn existing_company_reconciles_locations_addresses_and_roles() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    let mut popup = with_role(source_location(202, "Pop-up"), "Ordering only", SOURCE_CUSTOMER);
    popup["shippingAddress"] = Value::Null;
    let locations = [
        with_role(source_location(200, "HQ"), "Ordering only", SOURCE_CUSTOMER),
        source_location(201, "Warehouse"),
        popup,
    ];
    operation("GetCompany")
        .respond_with(data(company(
            SOURCE_ID,
            "Acme",
            Some("C1"),
            &locations,
            &[source_contact(1, "ann@example.com", true)],
            recent_orders(2),
        )))
        .expect(1)
        .mount(&source)
        .await;

    mount_existing_company(&target).await;
    let mut snapshot = company(
        TARGET_ID,
        "Acme",
        Some("C1"),
        &[target_location(HQ, "hq")],
        &[],
        json!({ "nodes": [] }),
    );
    snapshot["company"]["contactRoles"] =
        json!({ "nodes": [{ "id": ROLE, "name": "Ordering only" }] });
    operation_with("GetCompany", json!({ "id": TARGET_ID }))
        .respond_with(data(snapshot))
        .expect(1)
        .mount(&target)
        .await;

    // Step 3: HQ matches by name, Warehouse is new, Pop-up has no shipping address
    operation_with(
        "CompanyLocationUpdate",
        json!({ "companyLocationId": HQ, "input": { "name": "HQ" } }),
    )
    .respond_with(payload("companyLocationUpdate", "companyLocation", json!({ "id": HQ }), &[]))
    .expect(1)
    .mount(&target)
    .await;
    operation_with(
        "CompanyLocationCreate",
        json!({ "companyId": TARGET_ID, "input": { "name": "Warehouse" } }),
    )
    .respond_with(payload(
        "companyLocationCreate",
        "companyLocation",
        json!({ "id": WAREHOUSE, "name": "Warehouse" }),
        &[],
    ))
    .expect(1)
    .mount(&target)
    .await;
    operation("CompanyLocationCreate")
        .respond_with(payload(
            "companyLocationCreate",
            "companyLocation",
            json!(null),
            &["unexpected"],
        ))
        .expect(0)
        .mount(&target)
        .await;

    // Step 4: only the location that existed before the run gets its address
    operation_with(
        "CompanyLocationAssignAddress",
        json!({ "locationId": HQ, "addressTypes": ["SHIPPING", "BILLING"] }),
    )
    .respond_with(payload("companyLocationAssignAddress", "addresses", json!([]), &[]))
    .expect(1)
    .mount(&target)
    .await;
    operation("CompanyLocationAssignAddress")
        .respond_with(payload("companyLocationAssignAddress", "addresses", json!([]), &[]))
        .expect(0)
        .mount(&target)
        .await;

    // Step 5: the contact is already linked; the Pop-up role is skipped
    operation("FindCustomers")
        .respond_with(data(json!({ "customers": { "nodes": [] } })))
        .expect(1)
        .mount(&target)
        .await;
    operation_with("CustomerCreate", json!({ "input": { "email": "ann@example.com" } }))
        .respond_with(payload("customerCreate", "customer", json!({ "id": CUSTOMER }), &[]))
        .expect(1)
        .mount(&target)
        .await;
    operation("GetCompanyContacts")
        .respond_with(data(json!({
            "company": { "contacts": {
                "nodes": [{ "id": CONTACT, "customer": { "id": CUSTOMER } }],
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            } }
        })))
        .expect(1)
        .mount(&target)
        .await;
    operation("CompanyAssignCustomerAsContact")
        .respond_with(payload("companyAssignCustomerAsContact", "companyContact", json!(null), &[]))
        .expect(0)
        .mount(&target)
        .await;
    operation_with("CompanyAssignMainContact", json!({ "companyContactId": CONTACT }))
        .respond_with(payload(
            "companyAssignMainContact",
            "company",
            json!({ "id": TARGET_ID }),
            &[],
        ))
        .expect(1)
        .mount(&target)
        .await;
    operation_with(
        "CompanyLocationAssignRoles",
        json!({
            "companyLocationId": HQ,
            "rolesToAssign": [{ "companyContactId": CONTACT, "companyContactRoleId": ROLE }]
        }),
    )
    .respond_with(payload("companyLocationAssignRoles", "roleAssignments", json!([]), &[]))
    .expect(1)
    .mount(&target)
    .await;
    operation("CompanyLocationAssignRoles")
        .respond_with(payload("companyLocationAssignRoles", "roleAssignments", json!([]), &[]))
        .expect(0)
        .mount(&target)
        .await;

    operation("MetafieldsSet")
        .respond_with(metafields_set_ok())
        .expect(1)
        .mount(&target)
        .await;

    let mut ctx = context(&source, &target);
    let outcome = sync_company(&mut ctx, SOURCE_ID, ExistsPolicy::Update)
        .await
        .unwrap_or_else(|e| panic!("company sync failed: {e}"));

    assert_eq!(outcome.status, RecordStatus::Updated);
    assert!(
        outcome.child_failures.is_empty(),
        "unexpected child failures: {:?}",
        outcome.child_failures
    );
    let map = ctx.resolver.map();
    assert_eq!(map.get(LookupKind::Location, &location_key(200)), Some(Some(HQ)));
    assert_eq!(map.get(LookupKind::Location, &location_key(201)), Some(Some(WAREHOUSE)));
    assert_eq!(map.get(LookupKind::Location, &location_key(202)), None);
    assert_eq!(map.get(LookupKind::Customer, "ann@example.com"), Some(Some(CUSTOMER)));

    target.verify().await;
    source.verify().await;
}

// ---------------------------------------------------------------------------
// A target company whose locations span two pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn locations_on_a_later_page_still_match() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    operation("GetCompany")
        .respond_with(data(company(
            SOURCE_ID,
            "Acme",
            Some("C1"),
            &[source_location(200, "HQ"), source_location(201, "Warehouse")],
            &[],
            recent_orders(0),
        )))
        .mount(&source)
        .await;

    mount_existing_company(&target).await;
    let mut snapshot = company(
        TARGET_ID,
        "Acme",
        Some("C1"),
        &[target_location(HQ, "HQ")],
        &[],
        json!({ "nodes": [] }),
    );
    snapshot["company"]["locations"]["pageInfo"] =
        json!({ "hasNextPage": true, "endCursor": "cursor-1" });
    operation_with("GetCompany", json!({ "id": TARGET_ID }))
        .respond_with(data(snapshot))
        .expect(1)
        .mount(&target)
        .await;
    operation_with("GetCompanyLocations", json!({ "companyId": TARGET_ID, "after": "cursor-1" }))
    .respond_with(data(json!({
        "company": { "locations": {
            "nodes": [target_location(WAREHOUSE, "Warehouse")],
            "pageInfo": { "hasNextPage": false, "endCursor": "cursor-2" }
        } }
    })))
    .expect(1)
    .mount(&target)
    .await;

    for id in [HQ, WAREHOUSE] {
        operation_with("CompanyLocationUpdate", json!({ "companyLocationId": id }))
            .respond_with(payload(
                "companyLocationUpdate",
                "companyLocation",
                json!({ "id": id }),
                &[],
            ))
            .expect(1)
            .mount(&target)
            .await;
        operation_with("CompanyLocationAssignAddress", json!({ "locationId": id }))
            .respond_with(payload("companyLocationAssignAddress", "addresses", json!([]), &[]))
            .expect(1)
            .mount(&target)
            .await;
    }
    operation("CompanyLocationCreate")
        .respond_with(payload(
            "companyLocationCreate",
            "companyLocation",
            json!(null),
            &["unexpected"],
        ))
        .expect(0)
        .mount(&target)
        .await;
    operation("MetafieldsSet")
        .respond_with(metafields_set_ok())
        .mount(&target)
        .await;

    let mut ctx = context(&source, &target);
    let outcome = sync_company(&mut ctx, SOURCE_ID, ExistsPolicy::Update)
        .await
        .unwrap_or_else(|e| panic!("company sync failed: {e}"));

    assert_eq!(outcome.status, RecordStatus::Updated);
    assert!(outcome.child_failures.is_empty(), "{:?}", outcome.child_failures);
    assert_eq!(
        ctx.resolver.map().get(LookupKind::Location, &location_key(201)),
        Some(Some(WAREHOUSE))
    );
    target.verify().await;
}

// ---------------------------------------------------------------------------
// A single-page connection that overflows fails the record
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overflowing_metafields_fail_the_record() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    let mut body = company(SOURCE_ID, "Acme", Some("C1"), &[], &[], recent_orders(0));
    body["company"]["metafields"]["pageInfo"] =
        json!({ "hasNextPage": true, "endCursor": "m-100" });
    operation("GetCompany")
        .respond_with(data(body))
        .expect(1)
        .mount(&source)
        .await;
    operation("FindCompanies")
        .respond_with(data(json!({ "companies": { "nodes": [] } })))
        .expect(0)
        .mount(&target)
        .await;

    let mut ctx = context(&source, &target);
    let err = sync_company(&mut ctx, SOURCE_ID, ExistsPolicy::Update)
        .await
        .expect_err("partial metafields must not be copied");

    let truncated = matches!(
        &err,
        SyncError::Api(AdminShopifyError::Parse(e)) if e.to_string().contains("more pages")
    );
    assert!(truncated, "unexpected error: {err}");
    target.verify().await;
}
