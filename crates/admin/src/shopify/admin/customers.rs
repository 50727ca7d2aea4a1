//! Customer operations.

use storebridge_core::matching::{CandidateSource, MatchKey};
use tracing::instrument;

use super::queries::{
    CustomerCreate, CustomerUpdate, FindCustomers, SearchVariables, customer_create,
    customer_update,
};
use super::{
    AdminClient, SEARCH_PAGE_SIZE, check_user_errors, require_entity, require_payload, search_term,
};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{Customer, CustomerInput};

impl AdminClient {
    /// Search customers, keeping exact matches for an email or phone key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn find_customers(&self, key: &MatchKey) -> Result<Vec<Customer>, AdminShopifyError> {
        let field = match key {
            MatchKey::Email(_) => "email",
            MatchKey::Phone(_) => "phone",
            _ => return Ok(Vec::new()),
        };
        let data = self
            .execute::<FindCustomers>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term(field, key.value()),
            ))
            .await?;

        Ok(data
            .customers
            .nodes
            .into_iter()
            .filter(|c| customer_matches(c, key))
            .collect())
    }

    /// Create a customer. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn create_customer(&self, input: CustomerInput) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CustomerCreate>(customer_create::Variables { input })
            .await?;
        let payload = require_payload("customerCreate", data.customer_create)?;
        check_user_errors("customerCreate", payload.user_errors)?;
        Ok(require_entity("customer", payload.customer)?.id)
    }

    /// Update a customer. `input.id` must be set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(customer_id = ?input.id))]
    pub async fn update_customer(&self, input: CustomerInput) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CustomerUpdate>(customer_update::Variables { input })
            .await?;
        let payload = require_payload("customerUpdate", data.customer_update)?;
        check_user_errors("customerUpdate", payload.user_errors)?;
        Ok(require_entity("customer", payload.customer)?.id)
    }
}

/// Digits only, so `+1 (555) 010-0000` and `+15550100000` compare equal.
fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

fn customer_matches(customer: &Customer, key: &MatchKey) -> bool {
    match key {
        MatchKey::Email(email) => customer.email.as_deref().is_some_and(|e| email.matches(e)),
        MatchKey::Phone(phone) => {
            let wanted = phone_digits(phone);
            !wanted.is_empty()
                && customer
                    .phone
                    .as_deref()
                    .is_some_and(|p| phone_digits(p) == wanted)
        }
        _ => false,
    }
}

impl CandidateSource<Customer> for AdminClient {
    type Error = AdminShopifyError;

    async fn candidates(&self, key: &MatchKey) -> Result<Vec<Customer>, Self::Error> {
        self.find_customers(key).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storebridge_core::Email;

    use super::*;

    fn customer(email: Option<&str>, phone: Option<&str>) -> Customer {
        Customer {
            id: "gid://shopify/Customer/1".into(),
            email: email.map(str::to_owned),
            phone: phone.map(str::to_owned),
            ..Customer::default()
        }
    }

    #[test]
    fn test_email_match_is_case_insensitive_and_exact() {
        let key = MatchKey::Email(Email::parse("ann@example.com").unwrap());
        assert!(customer_matches(&customer(Some("Ann@Example.com"), None), &key));
        assert!(!customer_matches(&customer(Some("joann@example.com"), None), &key));
        assert!(!customer_matches(&customer(None, None), &key));
    }

    #[test]
    fn test_phone_match_ignores_formatting() {
        let key = MatchKey::Phone("+1 (555) 010-0000".into());
        assert!(customer_matches(&customer(None, Some("+15550100000")), &key));
        assert!(!customer_matches(&customer(None, Some("+15550100001")), &key));
    }
}
