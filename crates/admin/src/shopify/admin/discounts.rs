//! Discount lookups and variant-driven create/update.
//!
//! The normalized [`DiscountSpec`] is rendered into the input shape of the
//! variant's mutation here; the operation names come from the same variant
//! table entry, so the pairing cannot drift.

use graphql_client::QueryBody;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use storebridge_core::discount::{
    DiscountBody, DiscountMethod, DiscountSpec, DiscountValue, Eligibility, Items,
    MinimumRequirement,
};
use storebridge_core::matching::{CandidateSource, MatchKey};
use tracing::instrument;

use super::queries::{
    DISCOUNTS, DiscountCodeByCode, DiscountPayload, FindAutomaticDiscounts, SearchVariables,
    discount_code_by_code,
};
use super::{AdminClient, SEARCH_PAGE_SIZE, check_user_errors, require_payload, search_term};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::DiscountRecord;

impl AdminClient {
    /// Look up a code discount by its exact code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_code_discount(
        &self,
        code: &str,
    ) -> Result<Option<DiscountRecord>, AdminShopifyError> {
        let data = self
            .execute::<DiscountCodeByCode>(discount_code_by_code::Variables {
                code: code.trim().to_string(),
            })
            .await?;
        Ok(data.code_discount_node_by_code)
    }

    /// Find automatic discounts by exact title.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_automatic_discounts(
        &self,
        title: &str,
    ) -> Result<Vec<DiscountRecord>, AdminShopifyError> {
        let data = self
            .execute::<FindAutomaticDiscounts>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term("title", title),
            ))
            .await?;
        let wanted = title.trim();
        Ok(data
            .automatic_discount_nodes
            .nodes
            .into_iter()
            .filter(|d| d.title().is_some_and(|t| t.trim() == wanted))
            .collect())
    }

    /// Create the discount through its variant's mutation. Returns the node id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, spec), fields(title = %spec.title))]
    pub async fn create_discount(
        &self,
        spec: &DiscountSpec<String>,
    ) -> Result<String, AdminShopifyError> {
        let variant = spec.variant();
        let variables = json!({ "input": discount_input(spec) });
        self.send_discount(variant.create_operation, variant.create_field, variables)
            .await
    }

    /// Update an existing discount node through its variant's mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, spec), fields(title = %spec.title))]
    pub async fn update_discount(
        &self,
        id: &str,
        spec: &DiscountSpec<String>,
    ) -> Result<String, AdminShopifyError> {
        let variant = spec.variant();
        let variables = json!({ "id": id, "input": discount_input(spec) });
        self.send_discount(variant.update_operation, variant.update_field, variables)
            .await
    }

    async fn send_discount(
        &self,
        operation_name: &'static str,
        field: &'static str,
        variables: Value,
    ) -> Result<String, AdminShopifyError> {
        let body = QueryBody {
            variables,
            query: DISCOUNTS,
            operation_name,
        };
        let mut data: HashMap<String, Option<DiscountPayload>> = self.post(&body).await?;
        let mut payload = require_payload(field, data.remove(field).flatten())?;
        check_user_errors(field, std::mem::take(&mut payload.user_errors))?;
        payload
            .node_id()
            .ok_or_else(|| AdminShopifyError::MissingPayload(format!("{field} node")))
    }
}

impl CandidateSource<DiscountRecord> for AdminClient {
    type Error = AdminShopifyError;

    async fn candidates(&self, key: &MatchKey) -> Result<Vec<DiscountRecord>, Self::Error> {
        match key {
            MatchKey::Code(code) => Ok(self.find_code_discount(code).await?.into_iter().collect()),
            MatchKey::Title(title) => self.find_automatic_discounts(title).await,
            _ => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Input rendering
// =============================================================================

fn money(amount: Decimal) -> Value {
    Value::String(amount.normalize().to_string())
}

fn fraction(value: Decimal) -> Value {
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn items(items: &Items<String>) -> Value {
    match items {
        Items::All => json!({ "all": true }),
        Items::Products(ids) => json!({ "products": { "productsToAdd": ids } }),
        Items::Variants(ids) => json!({ "products": { "productVariantsToAdd": ids } }),
        Items::Collections(ids) => json!({ "collections": { "add": ids } }),
    }
}

fn customer_selection(eligibility: &Eligibility<String>) -> Value {
    match eligibility {
        Eligibility::All => json!({ "all": true }),
        Eligibility::Customers(ids) => json!({ "customers": { "add": ids } }),
        Eligibility::Segments(ids) => json!({ "customerSegments": { "add": ids } }),
    }
}

fn minimum_requirement(minimum: MinimumRequirement) -> Option<Value> {
    match minimum {
        MinimumRequirement::None => None,
        MinimumRequirement::Subtotal(amount) => Some(json!({
            "subtotal": { "greaterThanOrEqualToSubtotal": money(amount) }
        })),
        MinimumRequirement::Quantity(quantity) => Some(json!({
            "quantity": { "greaterThanOrEqualToQuantity": quantity.to_string() }
        })),
    }
}

fn value(value: DiscountValue) -> Value {
    match value {
        DiscountValue::Percentage(pct) => json!({ "percentage": fraction(pct) }),
        DiscountValue::FixedAmount {
            amount,
            applies_on_each_item,
        } => json!({
            "discountAmount": {
                "amount": money(amount),
                "appliesOnEachItem": applies_on_each_item,
            }
        }),
    }
}

/// Render the mutation input for a resolved discount.
#[must_use]
pub fn discount_input(spec: &DiscountSpec<String>) -> Value {
    let mut input = Map::new();
    input.insert("title".into(), json!(spec.title));
    input.insert("startsAt".into(), json!(spec.starts_at.to_rfc3339()));
    input.insert(
        "endsAt".into(),
        spec.ends_at.map_or(Value::Null, |t| json!(t.to_rfc3339())),
    );
    input.insert(
        "combinesWith".into(),
        json!({
            "orderDiscounts": spec.combines_with.order,
            "productDiscounts": spec.combines_with.product,
            "shippingDiscounts": spec.combines_with.shipping,
        }),
    );

    if spec.method == DiscountMethod::Code {
        input.insert("code".into(), json!(spec.code));
        input.insert("usageLimit".into(), json!(spec.usage_limit));
        input.insert(
            "appliesOncePerCustomer".into(),
            json!(spec.once_per_customer),
        );
        input.insert(
            "customerSelection".into(),
            customer_selection(&spec.eligibility),
        );
    }

    match &spec.body {
        DiscountBody::Basic {
            value: amount,
            items: entitled,
            minimum,
        } => {
            input.insert(
                "customerGets".into(),
                json!({ "value": value(*amount), "items": items(entitled) }),
            );
            if let Some(requirement) = minimum_requirement(*minimum) {
                input.insert("minimumRequirement".into(), requirement);
            }
        }
        DiscountBody::FreeShipping {
            minimum,
            max_shipping_price,
        } => {
            input.insert("destination".into(), json!({ "all": true }));
            if let Some(requirement) = minimum_requirement(*minimum) {
                input.insert("minimumRequirement".into(), requirement);
            }
            if let Some(max) = max_shipping_price {
                input.insert("maximumShippingPrice".into(), money(*max));
            }
        }
        DiscountBody::BuyXGetY {
            buys,
            buys_quantity,
            gets,
            gets_quantity,
            gets_percentage,
            uses_per_order_limit,
        } => {
            input.insert(
                "customerBuys".into(),
                json!({
                    "value": { "quantity": buys_quantity.to_string() },
                    "items": items(buys),
                }),
            );
            input.insert(
                "customerGets".into(),
                json!({
                    "value": {
                        "discountOnQuantity": {
                            "quantity": gets_quantity.to_string(),
                            "effect": { "percentage": fraction(*gets_percentage) },
                        }
                    },
                    "items": items(gets),
                }),
            );
            if let Some(limit) = uses_per_order_limit {
                input.insert("usesPerOrderLimit".into(), json!(limit.to_string()));
            }
        }
    }

    Value::Object(input)
}
