//! Company migration scenarios: creation with a nested first location,
//! tier derivation, child-failure isolation across contacts, and a contact
//! shared by two companies.

use serde_json::json;
use storebridge_admin::sync::company::sync_company;
use storebridge_admin::sync::driver::RunTracker;
use storebridge_admin::{ExistsPolicy, LookupKind, RunContext};
use storebridge_core::RecordStatus;
use storebridge_integration_tests::{
    client, company, data, metafields_set_ok, no_companies, now, operation, operation_with, payload,
    recent_orders, source_contact, source_location,
};
use wiremock::MockServer;

const SOURCE_ID: &str = "gid://shopify/Company/900";
const TARGET_ID: &str = "gid://shopify/Company/1";
const TARGET_LOCATION: &str = "gid://shopify/CompanyLocation/10";

fn context(source: &MockServer, target: &MockServer) -> RunContext {
    RunContext::new(client(target))
        .with_source(client(source))
        .with_now(now())
}

/// The target company right after `companyCreate`: one location, nothing else.
///
/// The create must carry `variables`; `{}` accepts any input.
async fn mount_created_company(target: &MockServer, variables: serde_json::Value) {
    operation_with("CompanyCreate", variables)
        .respond_with(payload(
            "companyCreate",
            "company",
            json!({
                "id": TARGET_ID,
                "locations": {
                    "nodes": [{ "id": TARGET_LOCATION, "name": "HQ", "externalId": null }]
                }
            }),
            &[],
        ))
        .expect(1)
        .mount(target)
        .await;

    let mut location = source_location(10, "HQ");
    location["id"] = json!(TARGET_LOCATION);
    operation_with("GetCompany", json!({ "id": TARGET_ID }))
        .respond_with(data(company(
            TARGET_ID,
            "Acme",
            Some("C1"),
            &[location],
            &[],
            json!({ "nodes": [] }),
        )))
        .mount(target)
        .await;
}

// ---------------------------------------------------------------------------
// New company: nested first location, no extra location calls, Silver tier
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_company_is_created_with_nested_location_and_silver_tier() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    operation("GetCompany")
        .respond_with(data(company(
            SOURCE_ID,
            "Acme",
            Some("C1"),
            &[source_location(200, "HQ")],
            &[],
            recent_orders(6),
        )))
        .expect(1)
        .mount(&source)
        .await;

    no_companies(&target).await;
    mount_created_company(
        &target,
        json!({
            "input": {
                "company": { "name": "Acme", "externalId": "C1" },
                "companyLocation": {
                    "name": "HQ",
                    "shippingAddress": { "address1": "1 Main St", "countryCode": "US" }
                }
            }
        }),
    )
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
    operation("CompanyLocationAssignAddress")
        .respond_with(payload("companyLocationAssignAddress", "addresses", json!([]), &[]))
        .expect(0)
        .mount(&target)
        .await;
    operation_with(
        "MetafieldsSet",
        json!({
            "metafields": [{
                "ownerId": TARGET_ID,
                "namespace": "custom",
                "key": "tier",
                "type": "single_line_text_field",
                "value": "Silver"
            }]
        }),
    )
    .respond_with(metafields_set_ok())
    .expect(1)
    .mount(&target)
    .await;

    let mut ctx = context(&source, &target);
    let outcome = sync_company(&mut ctx, SOURCE_ID, ExistsPolicy::Update)
        .await
        .unwrap_or_else(|e| panic!("company sync failed: {e}"));

    assert_eq!(outcome.status, RecordStatus::Created);
    assert_eq!(outcome.target_id.as_deref(), Some(TARGET_ID));
    assert!(
        outcome.child_failures.is_empty(),
        "unexpected child failures: {:?}",
        outcome.child_failures
    );
    assert_eq!(
        ctx.resolver.map().get(
            LookupKind::Location,
            &format!("{TARGET_ID}::gid://shopify/CompanyLocation/200")
        ),
        Some(Some(TARGET_LOCATION))
    );

    target.verify().await;
    source.verify().await;
}

// ---------------------------------------------------------------------------
// Existing company under skip policy: nothing is written
// ---------------------------------------------------------------------------

#[tokio::test]
async fn existing_company_is_skipped_under_skip_policy() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    operation("GetCompany")
        .respond_with(data(company(
            SOURCE_ID,
            "Acme",
            Some("C1"),
            &[],
            &[],
            recent_orders(0),
        )))
        .mount(&source)
        .await;
    operation_with("FindCompanies", json!({ "query": "external_id:\"C1\"" }))
        .respond_with(data(json!({
            "companies": { "nodes": [{ "id": TARGET_ID, "name": "Acme Corp", "externalId": "C1" }] }
        })))
        .expect(1)
        .mount(&target)
        .await;
    operation("CompanyUpdate")
        .respond_with(payload("companyUpdate", "company", json!({ "id": TARGET_ID }), &[]))
        .expect(0)
        .mount(&target)
        .await;

    let mut ctx = context(&source, &target);
    let outcome = sync_company(&mut ctx, SOURCE_ID, ExistsPolicy::Skip)
        .await
        .unwrap_or_else(|e| panic!("company sync failed: {e}"));

    assert_eq!(outcome.status, RecordStatus::Skipped);
    assert_eq!(outcome.target_id.as_deref(), Some(TARGET_ID));
    target.verify().await;
}

// ---------------------------------------------------------------------------
// One failing contact out of three: the others still run, one child failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_contact_is_isolated_from_its_siblings() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    let contacts = [
        source_contact(1, "ann@example.com", true),
        source_contact(2, "bad@example.com", false),
        source_contact(3, "cy@example.com", false),
    ];
    operation("GetCompany")
        .respond_with(data(company(
            SOURCE_ID,
            "Acme",
            Some("C1"),
            &[source_location(200, "HQ")],
            &contacts,
            recent_orders(2),
        )))
        .mount(&source)
        .await;

    no_companies(&target).await;
    mount_created_company(&target, json!({})).await;

    operation("FindCustomers")
        .respond_with(data(json!({ "customers": { "nodes": [] } })))
        .expect(3)
        .mount(&target)
        .await;
    for (email, id) in [("ann@example.com", 501), ("cy@example.com", 503)] {
        operation_with(
            "CustomerCreate",
            json!({ "input": { "email": email, "tags": ["wholesale", "Tier_Bronze"] } }),
        )
            .respond_with(payload(
                "customerCreate",
                "customer",
                json!({ "id": format!("gid://shopify/Customer/{id}") }),
                &[],
            ))
            .expect(1)
            .mount(&target)
            .await;
    }
    operation_with("CustomerCreate", json!({ "input": { "email": "bad@example.com" } }))
        .respond_with(payload(
            "customerCreate",
            "customer",
            json!(null),
            &["Email has already been taken"],
        ))
        .expect(1)
        .mount(&target)
        .await;

    operation("GetCompanyContacts")
        .respond_with(data(json!({
            "company": { "contacts": {
                "nodes": [],
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            } }
        })))
        .expect(1)
        .mount(&target)
        .await;
    operation("CompanyAssignCustomerAsContact")
        .respond_with(payload(
            "companyAssignCustomerAsContact",
            "companyContact",
            json!({ "id": "gid://shopify/CompanyContact/77" }),
            &[],
        ))
        .expect(2)
        .mount(&target)
        .await;
    operation_with("CompanyAssignMainContact", json!({ "companyId": TARGET_ID }))
        .respond_with(payload(
            "companyAssignMainContact",
            "company",
            json!({ "id": TARGET_ID }),
            &[],
        ))
        .expect(1)
        .mount(&target)
        .await;
    operation("MetafieldsSet")
        .respond_with(metafields_set_ok())
        .expect(1)
        .mount(&target)
        .await;

    let mut ctx = context(&source, &target);
    let mut tracker = RunTracker::new("company");
    let outcome = tracker.record(
        "Acme",
        sync_company(&mut ctx, SOURCE_ID, ExistsPolicy::Update).await,
    );

    assert_eq!(outcome.status, RecordStatus::Created);
    assert_eq!(outcome.child_failures.len(), 1, "{:?}", outcome.child_failures);
    assert!(outcome.child_failures.iter().all(|f| f.contains("bad@example.com")));

    let summary = tracker.finish();
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.child_failures, 1);
    assert!(summary.has_failures());
    target.verify().await;
}

// ---------------------------------------------------------------------------
// One customer behind contacts of two companies: created once, then updated
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_contact_is_created_once_across_companies() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    let companies = [
        ("gid://shopify/Company/900", "Acme", "gid://shopify/Company/1"),
        ("gid://shopify/Company/901", "Globex", "gid://shopify/Company/2"),
    ];

    no_companies(&target).await;
    for (source_id, name, target_id) in companies {
        operation_with("GetCompany", json!({ "id": source_id }))
            .respond_with(data(company(
                source_id,
                name,
                None,
                &[],
                &[source_contact(1, "ann@example.com", true)],
                recent_orders(0),
            )))
            .expect(1)
            .mount(&source)
            .await;
        operation_with("CompanyCreate", json!({ "input": { "company": { "name": name } } }))
            .respond_with(payload(
                "companyCreate",
                "company",
                json!({ "id": target_id, "locations": { "nodes": [] } }),
                &[],
            ))
            .expect(1)
            .mount(&target)
            .await;
        operation_with("GetCompany", json!({ "id": target_id }))
            .respond_with(data(company(target_id, name, None, &[], &[], json!({ "nodes": [] }))))
            .expect(1)
            .mount(&target)
            .await;
    }

    // The search index has not caught up with the first create
    operation("FindCustomers")
        .respond_with(data(json!({ "customers": { "nodes": [] } })))
        .expect(1)
        .mount(&target)
        .await;
    operation_with("CustomerCreate", json!({ "input": { "email": "ann@example.com" } }))
        .respond_with(payload(
            "customerCreate",
            "customer",
            json!({ "id": "gid://shopify/Customer/501" }),
            &[],
        ))
        .expect(1)
        .mount(&target)
        .await;
    operation_with(
        "CustomerUpdate",
        json!({ "input": { "id": "gid://shopify/Customer/501" } }),
    )
    .respond_with(payload(
        "customerUpdate",
        "customer",
        json!({ "id": "gid://shopify/Customer/501" }),
        &[],
    ))
    .expect(1)
    .mount(&target)
    .await;

    operation("GetCompanyContacts")
        .respond_with(data(json!({
            "company": { "contacts": {
                "nodes": [],
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            } }
        })))
        .expect(2)
        .mount(&target)
        .await;
    operation_with(
        "CompanyAssignCustomerAsContact",
        json!({ "customerId": "gid://shopify/Customer/501" }),
    )
    .respond_with(payload(
        "companyAssignCustomerAsContact",
        "companyContact",
        json!({ "id": "gid://shopify/CompanyContact/77" }),
        &[],
    ))
    .expect(2)
    .mount(&target)
    .await;
    operation("CompanyAssignMainContact")
        .respond_with(payload(
            "companyAssignMainContact",
            "company",
            json!({ "id": TARGET_ID }),
            &[],
        ))
        .expect(2)
        .mount(&target)
        .await;
    operation("MetafieldsSet")
        .respond_with(metafields_set_ok())
        .expect(2)
        .mount(&target)
        .await;

    let mut ctx = context(&source, &target);
    for (source_id, _, target_id) in companies {
        let outcome = sync_company(&mut ctx, source_id, ExistsPolicy::Update)
            .await
            .unwrap_or_else(|e| panic!("company sync failed: {e}"));
        assert_eq!(outcome.status, RecordStatus::Created);
        assert_eq!(outcome.target_id.as_deref(), Some(target_id));
        assert!(outcome.child_failures.is_empty(), "{:?}", outcome.child_failures);
    }

    target.verify().await;
    source.verify().await;
}
