//! Company, location and contact operations.

use storebridge_core::matching::{CandidateSource, MatchKey};
use tracing::instrument;

use super::queries::{
    CompanyAssignCustomerAsContact, CompanyAssignMainContact, CompanyCreate,
    CompanyLocationAssignAddress, CompanyLocationAssignRoles, CompanyLocationCreate,
    CompanyLocationTaxSettingsUpdate, CompanyLocationUpdate, CompanyUpdate, FindCompanies,
    GetCompany, GetCompanyContactDetails, GetCompanyContacts, GetCompanyLocations,
    SearchVariables, company_assign_customer_as_contact, company_assign_main_contact,
    company_create, company_location_assign_address, company_location_assign_roles,
    company_location_create, company_location_tax_settings_update, company_location_update,
    company_update, get_company, get_company_contact_details, get_company_contacts,
    get_company_locations,
};
use super::{
    AdminClient, SEARCH_PAGE_SIZE, check_user_errors, require_entity, require_payload, search_term,
};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{
    Company, CompanyAddress, CompanyCreateInput, CompanyInput, CompanyLocationInput,
    CompanyLocationUpdateInput, CompanySummary, ContactLink, CreatedCompany, RoleAssign,
    TaxSettings,
};

pub use super::queries::company_location_assign_address::AddressType;

const CONTACTS_PAGE_SIZE: i64 = 100;
const LOCATIONS_PAGE_SIZE: i64 = 100;

impl AdminClient {
    // =========================================================================
    // Company queries
    // =========================================================================

    /// Get a company with its locations, contacts, roles, metafields and
    /// the `order_count` most recent orders.
    ///
    /// Locations and contacts beyond the first page are fetched until the
    /// lists are complete.
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails, or if roles, metafields or
    /// role assignments do not fit on one page.
    #[instrument(skip(self), fields(company_id = %id))]
    pub async fn get_company(
        &self,
        id: &str,
        order_count: i64,
    ) -> Result<Option<Company>, AdminShopifyError> {
        let data = self
            .execute::<GetCompany>(get_company::Variables {
                id: id.to_string(),
                order_count,
            })
            .await?;
        let Some(mut company) = data.company else {
            return Ok(None);
        };

        while let Some(after) = company.location_cursor.take() {
            let data = self
                .execute::<GetCompanyLocations>(get_company_locations::Variables {
                    company_id: id.to_string(),
                    first: LOCATIONS_PAGE_SIZE,
                    after: Some(after),
                })
                .await?;
            let page = data
                .company
                .ok_or_else(|| AdminShopifyError::MissingPayload(format!("company {id}")))?
                .locations;
            company.locations.extend(page.nodes);
            company.location_cursor = page.page_info.next_cursor();
        }

        while let Some(after) = company.contact_cursor.take() {
            let data = self
                .execute::<GetCompanyContactDetails>(get_company_contact_details::Variables {
                    company_id: id.to_string(),
                    first: CONTACTS_PAGE_SIZE,
                    after: Some(after),
                })
                .await?;
            let page = data
                .company
                .ok_or_else(|| AdminShopifyError::MissingPayload(format!("company {id}")))?
                .contacts;
            company.contacts.extend(page.nodes);
            company.contact_cursor = page.page_info.next_cursor();
        }

        Ok(Some(company))
    }

    /// Search companies, keeping exact matches for `key`.
    ///
    /// Only external-id and name keys apply to companies.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn find_companies(
        &self,
        key: &MatchKey,
    ) -> Result<Vec<CompanySummary>, AdminShopifyError> {
        let field = match key {
            MatchKey::ExternalId(_) => "external_id",
            MatchKey::Name(_) => "name",
            _ => return Ok(Vec::new()),
        };
        let data = self
            .execute::<FindCompanies>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term(field, key.value()),
            ))
            .await?;

        Ok(data
            .companies
            .nodes
            .into_iter()
            .filter(|c| company_matches(c, key))
            .collect())
    }

    /// List every contact of a company, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_company_contacts(
        &self,
        company_id: &str,
    ) -> Result<Vec<ContactLink>, AdminShopifyError> {
        let mut contacts = Vec::new();
        let mut after = None;

        loop {
            let data = self
                .execute::<GetCompanyContacts>(get_company_contacts::Variables {
                    company_id: company_id.to_string(),
                    first: CONTACTS_PAGE_SIZE,
                    after: after.take(),
                })
                .await?;
            let Some(company) = data.company else {
                return Err(AdminShopifyError::MissingPayload(format!(
                    "company {company_id}"
                )));
            };

            contacts.extend(company.contacts.nodes);
            match company.contacts.page_info.next_cursor() {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        Ok(contacts)
    }

    // =========================================================================
    // Company mutations
    // =========================================================================

    /// Create a company, optionally with its first location.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(name = ?input.company.name))]
    pub async fn create_company(
        &self,
        input: CompanyCreateInput,
    ) -> Result<CreatedCompany, AdminShopifyError> {
        let data = self
            .execute::<CompanyCreate>(company_create::Variables { input })
            .await?;
        let payload = require_payload("companyCreate", data.company_create)?;
        check_user_errors("companyCreate", payload.user_errors)?;
        require_entity("company", payload.company)
    }

    /// Update company scalars.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn update_company(
        &self,
        company_id: &str,
        input: CompanyInput,
    ) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CompanyUpdate>(company_update::Variables {
                company_id: company_id.to_string(),
                input,
            })
            .await?;
        let payload = require_payload("companyUpdate", data.company_update)?;
        check_user_errors("companyUpdate", payload.user_errors)?;
        Ok(require_entity("company", payload.company)?.id)
    }

    /// Create a location under a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(company_id = %company_id, name = ?input.name))]
    pub async fn create_location(
        &self,
        company_id: &str,
        input: CompanyLocationInput,
    ) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CompanyLocationCreate>(company_location_create::Variables {
                company_id: company_id.to_string(),
                input,
            })
            .await?;
        let payload = require_payload("companyLocationCreate", data.company_location_create)?;
        check_user_errors("companyLocationCreate", payload.user_errors)?;
        Ok(require_entity("companyLocation", payload.company_location)?.id)
    }

    /// Update location scalars.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(location_id = %location_id))]
    pub async fn update_location(
        &self,
        location_id: &str,
        input: CompanyLocationUpdateInput,
    ) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CompanyLocationUpdate>(company_location_update::Variables {
                company_location_id: location_id.to_string(),
                input,
            })
            .await?;
        let payload = require_payload("companyLocationUpdate", data.company_location_update)?;
        check_user_errors("companyLocationUpdate", payload.user_errors)?;
        Ok(require_entity("companyLocation", payload.company_location)?.id)
    }

    /// Assign an address to a location as shipping and/or billing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, address), fields(location_id = %location_id))]
    pub async fn assign_location_address(
        &self,
        location_id: &str,
        address: CompanyAddress,
        address_types: Vec<AddressType>,
    ) -> Result<(), AdminShopifyError> {
        let data = self
            .execute::<CompanyLocationAssignAddress>(company_location_assign_address::Variables {
                location_id: location_id.to_string(),
                address,
                address_types,
            })
            .await?;
        let payload = require_payload(
            "companyLocationAssignAddress",
            data.company_location_assign_address,
        )?;
        check_user_errors("companyLocationAssignAddress", payload.user_errors)
    }

    /// Apply tax registration and exemptions to a location.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, settings), fields(location_id = %location_id))]
    pub async fn update_location_tax_settings(
        &self,
        location_id: &str,
        settings: &TaxSettings,
    ) -> Result<(), AdminShopifyError> {
        let data = self
            .execute::<CompanyLocationTaxSettingsUpdate>(
                company_location_tax_settings_update::Variables {
                    company_location_id: location_id.to_string(),
                    tax_registration_id: settings.tax_registration_id.clone(),
                    tax_exempt: Some(settings.tax_exempt),
                    exemptions_to_assign: (!settings.tax_exemptions.is_empty())
                        .then(|| settings.tax_exemptions.clone()),
                },
            )
            .await?;
        let payload = require_payload(
            "companyLocationTaxSettingsUpdate",
            data.company_location_tax_settings_update,
        )?;
        check_user_errors("companyLocationTaxSettingsUpdate", payload.user_errors)
    }

    /// Link a customer to a company as a contact. Returns the contact id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(company_id = %company_id, customer_id = %customer_id))]
    pub async fn assign_customer_as_contact(
        &self,
        company_id: &str,
        customer_id: &str,
    ) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CompanyAssignCustomerAsContact>(
                company_assign_customer_as_contact::Variables {
                    company_id: company_id.to_string(),
                    customer_id: customer_id.to_string(),
                },
            )
            .await?;
        let payload = require_payload(
            "companyAssignCustomerAsContact",
            data.company_assign_customer_as_contact,
        )?;
        check_user_errors("companyAssignCustomerAsContact", payload.user_errors)?;
        Ok(require_entity("companyContact", payload.company_contact)?.id)
    }

    /// Make a contact the company's main contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(company_id = %company_id, contact_id = %contact_id))]
    pub async fn assign_main_contact(
        &self,
        company_id: &str,
        contact_id: &str,
    ) -> Result<(), AdminShopifyError> {
        let data = self
            .execute::<CompanyAssignMainContact>(company_assign_main_contact::Variables {
                company_id: company_id.to_string(),
                company_contact_id: contact_id.to_string(),
            })
            .await?;
        let payload =
            require_payload("companyAssignMainContact", data.company_assign_main_contact)?;
        check_user_errors("companyAssignMainContact", payload.user_errors)
    }

    /// Assign contact roles at a location. A duplicate assignment is benign.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, roles), fields(location_id = %location_id, roles = roles.len()))]
    pub async fn assign_location_roles(
        &self,
        location_id: &str,
        roles: Vec<RoleAssign>,
    ) -> Result<(), AdminShopifyError> {
        let data = self
            .execute::<CompanyLocationAssignRoles>(company_location_assign_roles::Variables {
                company_location_id: location_id.to_string(),
                roles_to_assign: roles,
            })
            .await?;
        let payload = require_payload(
            "companyLocationAssignRoles",
            data.company_location_assign_roles,
        )?;
        check_user_errors("companyLocationAssignRoles", payload.user_errors)
    }
}

fn company_matches(company: &CompanySummary, key: &MatchKey) -> bool {
    match key {
        MatchKey::ExternalId(id) => {
            company.external_id.as_deref().map(str::trim) == Some(id.trim())
        }
        MatchKey::Name(name) => company.name.trim().eq_ignore_ascii_case(name.trim()),
        _ => false,
    }
}

impl CandidateSource<CompanySummary> for AdminClient {
    type Error = AdminShopifyError;

    async fn candidates(&self, key: &MatchKey) -> Result<Vec<CompanySummary>, Self::Error> {
        self.find_companies(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, external_id: Option<&str>) -> CompanySummary {
        CompanySummary {
            id: "gid://shopify/Company/1".into(),
            name: name.into(),
            external_id: external_id.map(str::to_owned),
        }
    }

    #[test]
    fn test_company_matches_exactly() {
        let acme = summary("Acme Corp", Some("C-1"));
        assert!(company_matches(&acme, &MatchKey::ExternalId("C-1".into())));
        assert!(!company_matches(&acme, &MatchKey::ExternalId("C-10".into())));
        assert!(company_matches(&acme, &MatchKey::Name("acme corp".into())));
        assert!(!company_matches(&acme, &MatchKey::Name("Acme".into())));
        assert!(!company_matches(&acme, &MatchKey::Handle("acme".into())));
    }
}
