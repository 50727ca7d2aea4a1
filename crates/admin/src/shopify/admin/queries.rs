//! GraphQL operation definitions for the Shopify Admin API.
//!
//! Each operation implements [`GraphQLQuery`] over a document in
//! `graphql/admin/`, with a sibling module holding its `Variables` and
//! `ResponseData`, the same layout `graphql_client`'s derive generates.
//! Documents hold several operations; `operationName` selects one.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use storebridge_core::MetafieldInput;

use crate::shopify::UserError;
use crate::shopify::types::{
    CollectionInput, CollectionRecord, Company, CompanyAddress, CompanyContact, CompanyCreateInput,
    CompanyInput, CompanyLocation, CompanyLocationInput, CompanyLocationUpdateInput,
    CompanySummary, ContactLink, CreatedCompany, Customer, CustomerInput, DiscountRecord,
    FileCreateInput, FileRecord, IdRef, MetafieldDefinition, MetafieldDefinitionInput, MoveInput,
    OwnerType, Page, ProductInput, ProductRecord, RoleAssign, SegmentRecord, VariantRecord,
};

pub const COMPANIES: &str = include_str!("../../../graphql/admin/companies.graphql");
pub const CUSTOMERS: &str = include_str!("../../../graphql/admin/customers.graphql");
pub const COLLECTIONS: &str = include_str!("../../../graphql/admin/collections.graphql");
pub const PRODUCTS: &str = include_str!("../../../graphql/admin/products.graphql");
pub const SEGMENTS: &str = include_str!("../../../graphql/admin/segments.graphql");
pub const METAFIELDS: &str = include_str!("../../../graphql/admin/metafields.graphql");
pub const FILES: &str = include_str!("../../../graphql/admin/files.graphql");
pub const DISCOUNTS: &str = include_str!("../../../graphql/admin/discounts.graphql");

macro_rules! operation {
    ($name:ident, $document:expr, $module:ident) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $document,
                    operation_name: stringify!($name),
                }
            }
        }
    };
}

/// Mutation payload: the returned entity plus `userErrors`.
macro_rules! payload {
    ($field:ident: $ty:ty) => {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct Payload {
            pub $field: Option<$ty>,
            #[serde(default)]
            pub user_errors: Vec<UserError>,
        }
    };
}

/// Wrapper for a root field holding a `{ nodes }` list.
#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

/// `($first, $query)` search variables.
#[derive(Debug, Clone, Serialize)]
pub struct SearchVariables {
    pub first: i64,
    pub query: String,
}

impl SearchVariables {
    pub fn new(first: i64, query: impl Into<String>) -> Self {
        Self {
            first,
            query: query.into(),
        }
    }
}

// =============================================================================
// Companies
// =============================================================================

operation!(FindCompanies, COMPANIES, find_companies);
pub mod find_companies {
    use super::{CompanySummary, Deserialize, Nodes, SearchVariables};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub companies: Nodes<CompanySummary>,
    }
}

operation!(GetCompany, COMPANIES, get_company);
pub mod get_company {
    use super::{Company, Deserialize, Serialize};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub id: String,
        pub order_count: i64,
    }
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub company: Option<Company>,
    }
}

operation!(GetCompanyContacts, COMPANIES, get_company_contacts);
pub mod get_company_contacts {
    use super::{ContactLink, Deserialize, Page, Serialize};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub first: i64,
        pub after: Option<String>,
    }
    #[derive(Debug, Deserialize)]
    pub struct Contacts {
        pub contacts: Page<ContactLink>,
    }
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub company: Option<Contacts>,
    }
}

operation!(GetCompanyLocations, COMPANIES, get_company_locations);
pub mod get_company_locations {
    use super::{CompanyLocation, Deserialize, Page, Serialize};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub first: i64,
        pub after: Option<String>,
    }
    #[derive(Debug, Deserialize)]
    pub struct Locations {
        pub locations: Page<CompanyLocation>,
    }
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub company: Option<Locations>,
    }
}

operation!(GetCompanyContactDetails, COMPANIES, get_company_contact_details);
pub mod get_company_contact_details {
    use super::{CompanyContact, Deserialize, Page, Serialize};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub first: i64,
        pub after: Option<String>,
    }
    #[derive(Debug, Deserialize)]
    pub struct Contacts {
        pub contacts: Page<CompanyContact>,
    }
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub company: Option<Contacts>,
    }
}

operation!(CompanyCreate, COMPANIES, company_create);
pub mod company_create {
    use super::{CompanyCreateInput, CreatedCompany, Deserialize, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CompanyCreateInput,
    }
    payload!(company: CreatedCompany);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_create: Option<Payload>,
    }
}

operation!(CompanyUpdate, COMPANIES, company_update);
pub mod company_update {
    use super::{CompanyInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub input: CompanyInput,
    }
    payload!(company: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_update: Option<Payload>,
    }
}

operation!(CompanyLocationCreate, COMPANIES, company_location_create);
pub mod company_location_create {
    use super::{CompanyLocationInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub input: CompanyLocationInput,
    }
    payload!(company_location: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_location_create: Option<Payload>,
    }
}

operation!(CompanyLocationUpdate, COMPANIES, company_location_update);
pub mod company_location_update {
    use super::{CompanyLocationUpdateInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_location_id: String,
        pub input: CompanyLocationUpdateInput,
    }
    payload!(company_location: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_location_update: Option<Payload>,
    }
}

operation!(CompanyLocationAssignAddress, COMPANIES, company_location_assign_address);
pub mod company_location_assign_address {
    use super::{CompanyAddress, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Copy, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum AddressType {
        Shipping,
        Billing,
    }
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub location_id: String,
        pub address: CompanyAddress,
        pub address_types: Vec<AddressType>,
    }
    payload!(addresses: Vec<IdRef>);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_location_assign_address: Option<Payload>,
    }
}

operation!(CompanyLocationTaxSettingsUpdate, COMPANIES, company_location_tax_settings_update);
pub mod company_location_tax_settings_update {
    use super::{Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_location_id: String,
        pub tax_registration_id: Option<String>,
        pub tax_exempt: Option<bool>,
        pub exemptions_to_assign: Option<Vec<String>>,
    }
    payload!(company_location: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_location_tax_settings_update: Option<Payload>,
    }
}

operation!(CompanyAssignCustomerAsContact, COMPANIES, company_assign_customer_as_contact);
pub mod company_assign_customer_as_contact {
    use super::{Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub customer_id: String,
    }
    payload!(company_contact: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_assign_customer_as_contact: Option<Payload>,
    }
}

operation!(CompanyAssignMainContact, COMPANIES, company_assign_main_contact);
pub mod company_assign_main_contact {
    use super::{Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_id: String,
        pub company_contact_id: String,
    }
    payload!(company: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_assign_main_contact: Option<Payload>,
    }
}

operation!(CompanyLocationAssignRoles, COMPANIES, company_location_assign_roles);
pub mod company_location_assign_roles {
    use super::{Deserialize, IdRef, RoleAssign, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub company_location_id: String,
        pub roles_to_assign: Vec<RoleAssign>,
    }
    payload!(role_assignments: Vec<IdRef>);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub company_location_assign_roles: Option<Payload>,
    }
}

// =============================================================================
// Customers
// =============================================================================

operation!(FindCustomers, CUSTOMERS, find_customers);
pub mod find_customers {
    use super::{Customer, Deserialize, Nodes, SearchVariables};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub customers: Nodes<Customer>,
    }
}

operation!(CustomerCreate, CUSTOMERS, customer_create);
pub mod customer_create {
    use super::{CustomerInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CustomerInput,
    }
    payload!(customer: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub customer_create: Option<Payload>,
    }
}

operation!(CustomerUpdate, CUSTOMERS, customer_update);
pub mod customer_update {
    use super::{CustomerInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CustomerInput,
    }
    payload!(customer: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub customer_update: Option<Payload>,
    }
}

// =============================================================================
// Collections
// =============================================================================

operation!(FindCollections, COLLECTIONS, find_collections);
pub mod find_collections {
    use super::{CollectionRecord, Deserialize, Nodes, SearchVariables};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub collections: Nodes<CollectionRecord>,
    }
}

operation!(CollectionCreate, COLLECTIONS, collection_create);
pub mod collection_create {
    use super::{CollectionInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CollectionInput,
    }
    payload!(collection: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub collection_create: Option<Payload>,
    }
}

operation!(CollectionUpdate, COLLECTIONS, collection_update);
pub mod collection_update {
    use super::{CollectionInput, Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CollectionInput,
    }
    payload!(collection: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub collection_update: Option<Payload>,
    }
}

operation!(CollectionAddProductsV2, COLLECTIONS, collection_add_products_v2);
pub mod collection_add_products_v2 {
    use super::{Deserialize, IdRef, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub id: String,
        pub product_ids: Vec<String>,
    }
    payload!(job: IdRef);
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        #[serde(rename = "collectionAddProductsV2")]
        pub collection_add_products_v2: Option<Payload>,
    }
}

operation!(CollectionReorderProducts, COLLECTIONS, collection_reorder_products);
pub mod collection_reorder_products {
    use super::{Deserialize, IdRef, MoveInput, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: String,
        pub moves: Vec<MoveInput>,
    }
    payload!(job: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub collection_reorder_products: Option<Payload>,
    }
}

// =============================================================================
// Products and variants
// =============================================================================

operation!(FindProducts, PRODUCTS, find_products);
pub mod find_products {
    use super::{Deserialize, Nodes, ProductRecord, SearchVariables};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub products: Nodes<ProductRecord>,
    }
}

operation!(FindVariants, PRODUCTS, find_variants);
pub mod find_variants {
    use super::{Deserialize, Nodes, SearchVariables, VariantRecord};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_variants: Nodes<VariantRecord>,
    }
}

operation!(ProductCreate, PRODUCTS, product_create);
pub mod product_create {
    use super::{Deserialize, IdRef, ProductInput, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub product: ProductInput,
    }
    payload!(product: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_create: Option<Payload>,
    }
}

operation!(ProductUpdate, PRODUCTS, product_update);
pub mod product_update {
    use super::{Deserialize, IdRef, ProductInput, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub product: ProductInput,
    }
    payload!(product: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_update: Option<Payload>,
    }
}

// =============================================================================
// Segments
// =============================================================================

operation!(FindSegments, SEGMENTS, find_segments);
pub mod find_segments {
    use super::{Deserialize, Nodes, SearchVariables, SegmentRecord};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub segments: Nodes<SegmentRecord>,
    }
}

// =============================================================================
// Metafields
// =============================================================================

operation!(MetafieldsSet, METAFIELDS, metafields_set);
pub mod metafields_set {
    use super::{Deserialize, IgnoredAny, MetafieldInput, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub metafields: Vec<MetafieldInput>,
    }
    payload!(metafields: Vec<IgnoredAny>);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafields_set: Option<Payload>,
    }
}

operation!(MetafieldDefinitions, METAFIELDS, metafield_definitions);
pub mod metafield_definitions {
    use super::{Deserialize, MetafieldDefinition, OwnerType, Page, Serialize};
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub owner_type: OwnerType,
        pub first: i64,
        pub after: Option<String>,
    }
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafield_definitions: Page<MetafieldDefinition>,
    }
}

operation!(MetafieldDefinitionCreate, METAFIELDS, metafield_definition_create);
pub mod metafield_definition_create {
    use super::{Deserialize, IdRef, MetafieldDefinitionInput, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub definition: MetafieldDefinitionInput,
    }
    payload!(created_definition: IdRef);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafield_definition_create: Option<Payload>,
    }
}

// =============================================================================
// Files
// =============================================================================

operation!(FindFiles, FILES, find_files);
pub mod find_files {
    use super::{Deserialize, FileRecord, Nodes, SearchVariables};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub files: Nodes<FileRecord>,
    }
}

operation!(FileCreate, FILES, file_create);
pub mod file_create {
    use super::{Deserialize, FileCreateInput, FileRecord, Serialize, UserError};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub files: Vec<FileCreateInput>,
    }
    payload!(files: Vec<FileRecord>);
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub file_create: Option<Payload>,
    }
}

operation!(FileStatus, FILES, file_status);
pub mod file_status {
    use super::{Deserialize, FileRecord, Serialize};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: String,
    }
    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub node: Option<FileRecord>,
    }
}

// =============================================================================
// Discounts
// =============================================================================

operation!(DiscountCodeByCode, DISCOUNTS, discount_code_by_code);
pub mod discount_code_by_code {
    use super::{Deserialize, DiscountRecord, Serialize};
    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub code: String,
    }
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub code_discount_node_by_code: Option<DiscountRecord>,
    }
}

operation!(FindAutomaticDiscounts, DISCOUNTS, find_automatic_discounts);
pub mod find_automatic_discounts {
    use super::{Deserialize, DiscountRecord, Nodes, SearchVariables};
    pub type Variables = SearchVariables;
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub automatic_discount_nodes: Nodes<DiscountRecord>,
    }
}

/// Payload shared by every discount create/update mutation. The operation
/// itself is chosen at runtime from the variant table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPayload {
    #[serde(default)]
    pub code_discount_node: Option<IdRef>,
    #[serde(default)]
    pub automatic_discount_node: Option<IdRef>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

impl DiscountPayload {
    pub fn node_id(self) -> Option<String> {
        self.code_discount_node
            .or(self.automatic_discount_node)
            .map(|n| n.id)
    }
}
