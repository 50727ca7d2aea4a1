//! Customer sheet import against a store that already has the customer.

use serde_json::json;
use storebridge_admin::sync::customer::{group_key, merge_spec, sync_customer};
use storebridge_admin::{ExistsPolicy, LookupKind, RunContext};
use storebridge_core::grouping::group_rows;
use storebridge_core::{MetafieldColumn, RecordStatus, SourceRow};
use storebridge_integration_tests::{client, data, operation, operation_with, payload};
use wiremock::MockServer;

const CUSTOMER_ID: &str = "gid://shopify/Customer/42";
const LOYALTY: &str = "Metafield: custom.loyalty_id [single_line_text_field]";

fn rows() -> Vec<SourceRow> {
    vec![
        SourceRow::new(
            2,
            [
                ("Email", "ada@example.com"),
                ("First Name", "Ada"),
                ("Last Name", "Lovelace"),
                ("Phone", "+15550100123"),
                ("Note", "Prefers invoices"),
                ("Tags", "vip, Tier_Bronze"),
                ("Tier", "Gold"),
                (LOYALTY, "L-42"),
            ],
        ),
        // Continuation row: only adds a tag
        SourceRow::new(3, [("Email", "ADA@example.com"), ("Tags", "wholesale")]),
    ]
}

async fn mount_existing_customer(server: &MockServer) {
    operation("FindCustomers")
        .respond_with(data(json!({
            "customers": { "nodes": [{
                "id": CUSTOMER_ID,
                "email": "ada@example.com",
                "phone": null,
                "firstName": "A.",
                "lastName": "Lovelace",
                "note": null,
                "tags": ["Tier_Bronze"],
                "metafields": { "nodes": [] }
            }] }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn existing_customer_is_updated_with_merged_rows_and_tier_tag() {
    let server = MockServer::start().await;
    mount_existing_customer(&server).await;

    operation_with(
        "CustomerUpdate",
        json!({
            "input": {
                "id": CUSTOMER_ID,
                "firstName": "Ada",
                "lastName": "Lovelace",
                "phone": "+15550100123",
                "note": "Prefers invoices",
                "tags": ["vip", "wholesale", "Tier_Gold"]
            }
        }),
    )
    .respond_with(payload("customerUpdate", "customer", json!({ "id": CUSTOMER_ID }), &[]))
    .expect(1)
    .mount(&server)
    .await;
    operation("CustomerCreate")
        .respond_with(payload("customerCreate", "customer", json!(null), &["unexpected"]))
        .expect(0)
        .mount(&server)
        .await;
    operation_with(
        "MetafieldsSet",
        json!({
            "metafields": [{
                "ownerId": CUSTOMER_ID,
                "namespace": "custom",
                "key": "loyalty_id",
                "value": "L-42"
            }]
        }),
    )
    .respond_with(payload("metafieldsSet", "metafields", json!([]), &[]))
    .expect(1)
    .mount(&server)
    .await;

    let metafields = MetafieldColumn::parse_headers([LOYALTY]).unwrap_or_else(|e| panic!("{e}"));
    let grouping = group_rows(&rows(), group_key, &merge_spec(&metafields));
    assert!(grouping.dropped.is_empty());
    let [Ok(group)] = grouping.groups.as_slice() else {
        panic!("expected one group, got {:?}", grouping.groups);
    };

    let mut ctx = RunContext::new(client(&server));
    let outcome = sync_customer(&mut ctx, group, ExistsPolicy::Update)
        .await
        .unwrap_or_else(|e| panic!("customer sync failed: {e}"));

    assert_eq!(outcome.status, RecordStatus::Updated);
    assert_eq!(outcome.target_id.as_deref(), Some(CUSTOMER_ID));
    assert_eq!(
        ctx.resolver.map().get(LookupKind::Customer, "Ada@Example.com"),
        Some(Some(CUSTOMER_ID))
    );
    server.verify().await;
}

#[tokio::test]
async fn existing_customer_is_skipped_by_default_policy() {
    let server = MockServer::start().await;
    mount_existing_customer(&server).await;
    operation("CustomerUpdate")
        .respond_with(payload("customerUpdate", "customer", json!({ "id": CUSTOMER_ID }), &[]))
        .expect(0)
        .mount(&server)
        .await;

    let grouping = group_rows(&rows(), group_key, &merge_spec(&[]));
    let [Ok(group)] = grouping.groups.as_slice() else {
        panic!("expected one group, got {:?}", grouping.groups);
    };

    let mut ctx = RunContext::new(client(&server));
    let outcome = sync_customer(&mut ctx, group, ExistsPolicy::Skip)
        .await
        .unwrap_or_else(|e| panic!("customer sync failed: {e}"));

    assert_eq!(outcome.status, RecordStatus::Skipped);
    assert_eq!(outcome.target_id.as_deref(), Some(CUSTOMER_ID));
    server.verify().await;
}
