//! Records read from and inputs written to the Shopify Admin API.
//!
//! Records mirror the selections in `graphql/admin/*.graphql` and are
//! deserialized straight from the response. Connection fields
//! (`{ nodes: [...] }`) are flattened into `Vec`s.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use storebridge_core::{OrderFact, RawMetafield};

/// Flatten a `{ nodes: [...] }` connection, treating `null` as empty.
fn nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    struct Nodes<T> {
        nodes: Vec<T>,
    }

    Ok(Option::<Nodes<T>>::deserialize(deserializer)?
        .map(|n| n.nodes)
        .unwrap_or_default())
}

/// Flatten a connection that must fit on one page.
///
/// Fails when `pageInfo.hasNextPage` is set rather than returning part of
/// the list.
fn complete_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<Connection<T>>::deserialize(deserializer)? {
        Some(connection) if connection.page_info.has_next_page => Err(D::Error::custom(format!(
            "connection has more pages after {} nodes",
            connection.nodes.len()
        ))),
        Some(connection) => Ok(connection.nodes),
        None => Ok(Vec::new()),
    }
}

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Pagination info for connection queries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Cursor for the last item.
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// The cursor to request next, if there is another page.
    #[must_use]
    pub fn next_cursor(self) -> Option<String> {
        self.end_cursor.filter(|_| self.has_next_page)
    }
}

/// A connection selected inside a larger record; `pageInfo` may be absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// Items.
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    /// Pagination info, when selected.
    #[serde(default)]
    pub page_info: PageInfo,
}

/// One page of a paginated connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub nodes: Vec<T>,
    /// Pagination info.
    pub page_info: PageInfo,
}

/// A bare `{ id }` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdRef {
    /// Global id.
    pub id: String,
}

// =============================================================================
// Companies
// =============================================================================

/// A company address. Also the `CompanyAddressInput` wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl CompanyAddress {
    /// A shipping address the target accepts: street, city and country.
    #[must_use]
    pub fn is_valid_shipping(&self) -> bool {
        !is_blank(self.address1.as_ref())
            && !is_blank(self.city.as_ref())
            && !is_blank(self.country_code.as_ref())
    }
}

/// Tax settings of a company location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSettings {
    /// Registration id.
    pub tax_registration_id: Option<String>,
    /// Whether the location is tax exempt.
    #[serde(default)]
    pub tax_exempt: bool,
    /// Exemption codes.
    #[serde(default)]
    pub tax_exemptions: Vec<String>,
}

impl TaxSettings {
    /// Whether there is anything worth writing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        is_blank(self.tax_registration_id.as_ref())
            && !self.tax_exempt
            && self.tax_exemptions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct RoleName {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct AssignedContact {
    customer: Option<IdRef>,
}

/// A role held by a contact at one location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    role: Option<RoleName>,
    company_contact: Option<AssignedContact>,
}

impl RoleAssignment {
    /// Role name, e.g. `Ordering only`.
    #[must_use]
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    /// Customer behind the contact holding the role.
    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.company_contact
            .as_ref()
            .and_then(|c| c.customer.as_ref())
            .map(|c| c.id.as_str())
    }
}

/// A company location as read from the source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLocation {
    /// Global id.
    pub id: String,
    /// Name.
    pub name: String,
    /// External id.
    pub external_id: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Locale.
    pub locale: Option<String>,
    /// Note.
    pub note: Option<String>,
    /// Shipping address.
    pub shipping_address: Option<CompanyAddress>,
    /// Billing address.
    pub billing_address: Option<CompanyAddress>,
    /// Tax settings.
    pub tax_settings: Option<TaxSettings>,
    /// Contact role assignments.
    #[serde(default, deserialize_with = "complete_nodes")]
    pub role_assignments: Vec<RoleAssignment>,
}

impl CompanyLocation {
    /// Whether the location carries a usable shipping address.
    #[must_use]
    pub fn has_valid_shipping(&self) -> bool {
        self.shipping_address
            .as_ref()
            .is_some_and(CompanyAddress::is_valid_shipping)
    }
}

/// A location as listed under a target company.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    /// Global id.
    pub id: String,
    /// Name.
    pub name: String,
    /// External id.
    pub external_id: Option<String>,
}

impl From<&CompanyLocation> for LocationSummary {
    fn from(location: &CompanyLocation) -> Self {
        Self {
            id: location.id.clone(),
            name: location.name.clone(),
            external_id: location.external_id.clone(),
        }
    }
}

/// A customer record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Global id.
    pub id: String,
    /// Email.
    pub email: Option<String>,
    /// Phone in E.164.
    pub phone: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Note.
    pub note: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Metafields.
    #[serde(default, deserialize_with = "complete_nodes")]
    pub metafields: Vec<RawMetafield>,
}

/// A company contact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyContact {
    /// Global id.
    pub id: String,
    /// Whether this is the company's main contact.
    #[serde(default)]
    pub is_main_contact: bool,
    /// Job title.
    pub title: Option<String>,
    /// Locale.
    pub locale: Option<String>,
    /// Underlying customer.
    pub customer: Option<Customer>,
}

/// A contact as listed for link checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactLink {
    /// Contact id.
    pub id: String,
    /// Customer behind the contact.
    pub customer: Option<IdRef>,
}

/// A contact role defined on a company.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactRole {
    /// Global id.
    pub id: String,
    /// Name.
    pub name: String,
}

/// An order, reduced to what tiering needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<&OrderSummary> for OrderFact {
    fn from(order: &OrderSummary) -> Self {
        Self {
            created_at: order.created_at,
            cancelled: order.cancelled_at.is_some(),
        }
    }
}

/// A company with everything the migration copies.
///
/// Locations and contacts may span several pages; the cursors mark where
/// [`AdminClient::get_company`](crate::shopify::AdminClient::get_company)
/// continues reading. Every other connection must fit on one page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "CompanyRecord")]
pub struct Company {
    /// Global id.
    pub id: String,
    /// Name.
    pub name: String,
    /// External id.
    pub external_id: Option<String>,
    /// Note.
    pub note: Option<String>,
    /// Customer since.
    pub customer_since: Option<DateTime<Utc>>,
    /// Metafields.
    pub metafields: Vec<RawMetafield>,
    /// Roles contacts may hold.
    pub contact_roles: Vec<ContactRole>,
    /// Locations.
    pub locations: Vec<CompanyLocation>,
    /// Contacts.
    pub contacts: Vec<CompanyContact>,
    /// Most recent orders, newest first.
    pub orders: Vec<OrderSummary>,
    /// Cursor after the last location read, while more remain.
    pub location_cursor: Option<String>,
    /// Cursor after the last contact read, while more remain.
    pub contact_cursor: Option<String>,
}

/// `Company` as it arrives on the wire.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRecord {
    id: String,
    name: String,
    external_id: Option<String>,
    note: Option<String>,
    customer_since: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "complete_nodes")]
    metafields: Vec<RawMetafield>,
    #[serde(default, deserialize_with = "complete_nodes")]
    contact_roles: Vec<ContactRole>,
    #[serde(default)]
    locations: Option<Connection<CompanyLocation>>,
    #[serde(default)]
    contacts: Option<Connection<CompanyContact>>,
    #[serde(default, deserialize_with = "nodes")]
    orders: Vec<OrderSummary>,
}

impl From<CompanyRecord> for Company {
    fn from(record: CompanyRecord) -> Self {
        let (locations, location_cursor) = record
            .locations
            .map_or_else(Default::default, |c| (c.nodes, c.page_info.next_cursor()));
        let (contacts, contact_cursor) = record
            .contacts
            .map_or_else(Default::default, |c| (c.nodes, c.page_info.next_cursor()));
        Self {
            id: record.id,
            name: record.name,
            external_id: record.external_id,
            note: record.note,
            customer_since: record.customer_since,
            metafields: record.metafields,
            contact_roles: record.contact_roles,
            locations,
            contacts,
            orders: record.orders,
            location_cursor,
            contact_cursor,
        }
    }
}

impl Company {
    /// Orders as tiering facts.
    #[must_use]
    pub fn order_facts(&self) -> Vec<OrderFact> {
        self.orders.iter().map(OrderFact::from).collect()
    }

    /// Locations as match candidates.
    #[must_use]
    pub fn location_summaries(&self) -> Vec<LocationSummary> {
        self.locations.iter().map(LocationSummary::from).collect()
    }
}

/// A company as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    /// Global id.
    pub id: String,
    /// Name.
    pub name: String,
    /// External id.
    pub external_id: Option<String>,
}

/// A company returned by `companyCreate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedCompany {
    /// Global id.
    pub id: String,
    /// Locations created along with the company.
    #[serde(default, deserialize_with = "nodes")]
    pub locations: Vec<LocationSummary>,
}

/// `CompanyInput`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_since: Option<DateTime<Utc>>,
}

/// `CompanyLocationInput`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLocationInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<CompanyAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<CompanyAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_same_as_shipping: Option<bool>,
}

impl From<&CompanyLocation> for CompanyLocationInput {
    fn from(location: &CompanyLocation) -> Self {
        Self {
            name: Some(location.name.clone()),
            external_id: location.external_id.clone(),
            phone: location.phone.clone(),
            locale: location.locale.clone(),
            note: location.note.clone(),
            shipping_address: location.shipping_address.clone(),
            billing_address: location.billing_address.clone(),
            billing_same_as_shipping: Some(location.billing_address.is_none()),
        }
    }
}

/// `CompanyLocationUpdateInput`: scalars only, addresses go through
/// `companyLocationAssignAddress`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLocationUpdateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&CompanyLocation> for CompanyLocationUpdateInput {
    fn from(location: &CompanyLocation) -> Self {
        Self {
            name: Some(location.name.clone()),
            external_id: location.external_id.clone(),
            phone: location.phone.clone(),
            locale: location.locale.clone(),
            note: location.note.clone(),
        }
    }
}

/// `CompanyCreateInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCreateInput {
    /// Company scalars.
    pub company: CompanyInput,
    /// First location, created in the same call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_location: Option<CompanyLocationInput>,
}

/// `CompanyLocationRoleAssign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssign {
    /// Contact receiving the role.
    pub company_contact_id: String,
    /// Role id.
    pub company_contact_role_id: String,
}

// =============================================================================
// Customers
// =============================================================================

/// `CustomerInput`, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// =============================================================================
// Collections and products
// =============================================================================

/// A collection as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionRecord {
    /// Global id.
    pub id: String,
    /// Handle.
    pub handle: String,
    /// Title.
    pub title: String,
    /// Metafields.
    #[serde(default, deserialize_with = "nodes")]
    pub metafields: Vec<RawMetafield>,
}

/// One smart-collection condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRuleInput {
    /// Column, e.g. `TAG`.
    pub column: String,
    /// Relation, e.g. `EQUALS`.
    pub relation: String,
    /// Value compared against.
    pub condition: String,
}

/// `CollectionRuleSetInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRuleSetInput {
    /// Any rule matches (`true`) or all must match.
    pub applied_disjunctively: bool,
    /// Rules.
    pub rules: Vec<CollectionRuleInput>,
}

/// `CollectionInput`, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<CollectionRuleSetInput>,
}

/// `MoveInput` for manual collection ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveInput {
    /// Product id.
    pub id: String,
    /// Zero-based position, `UnsignedInt64` on the wire.
    pub new_position: String,
}

/// A product as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductRecord {
    /// Global id.
    pub id: String,
    /// Handle.
    pub handle: String,
    /// Title.
    pub title: String,
    /// Metafields.
    #[serde(default, deserialize_with = "nodes")]
    pub metafields: Vec<RawMetafield>,
}

/// A variant as returned by a SKU search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantRecord {
    /// Global id.
    pub id: String,
    /// SKU.
    pub sku: Option<String>,
}

/// `ProductCreateInput` / `ProductUpdateInput`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// =============================================================================
// Segments, discounts, files, definitions
// =============================================================================

/// A customer segment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SegmentRecord {
    /// Global id.
    pub id: String,
    /// Name.
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct DiscountTitle {
    title: Option<String>,
}

/// A discount node (code or automatic).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRecord {
    /// Node id.
    pub id: String,
    #[serde(default)]
    code_discount: Option<DiscountTitle>,
    #[serde(default)]
    automatic_discount: Option<DiscountTitle>,
}

impl DiscountRecord {
    /// Title, whichever kind of node this is.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.code_discount
            .as_ref()
            .or(self.automatic_discount.as_ref())
            .and_then(|d| d.title.as_deref())
    }
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    /// Received, not yet processed.
    Uploaded,
    /// Being processed.
    Processing,
    /// Ready for use.
    Ready,
    /// Processing failed.
    Failed,
    /// A status this client does not know.
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    /// Whether polling can stop.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct FileError {
    message: String,
}

/// A file in the target's content library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Global id.
    pub id: String,
    /// Status.
    pub file_status: FileStatus,
    #[serde(default)]
    file_errors: Vec<FileError>,
}

impl FileRecord {
    /// Processing errors joined for a report.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.file_errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// `FileCreateInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreateInput {
    /// Remote URL the target downloads from.
    pub original_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// `IMAGE`, `VIDEO`, `FILE`...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TypeName {
    name: String,
}

/// An existing metafield definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetafieldDefinition {
    /// Namespace.
    pub namespace: String,
    /// Key.
    pub key: String,
    #[serde(rename = "type")]
    definition_type: TypeName,
}

impl MetafieldDefinition {
    /// `namespace.key`.
    #[must_use]
    pub fn key_path(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }

    /// Storage type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.definition_type.name
    }
}

/// Resource a metafield definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    /// Companies.
    Company,
    /// Customers.
    Customer,
    /// Collections.
    Collection,
    /// Products.
    Product,
}

/// `MetafieldDefinitionInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldDefinitionInput {
    /// Display name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Key.
    pub key: String,
    /// Storage type name.
    #[serde(rename = "type")]
    pub definition_type: String,
    /// Owner resource.
    pub owner_type: OwnerType,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_company_deserializes_connections() {
        let json = serde_json::json!({
            "id": "gid://shopify/Company/1",
            "name": "Acme",
            "externalId": "C-1",
            "note": null,
            "customerSince": "2024-01-05T00:00:00Z",
            "metafields": { "nodes": [
                {
                    "namespace": "custom",
                    "key": "region",
                    "type": "single_line_text_field",
                    "value": "west"
                }
            ]},
            "contactRoles": { "nodes": [
                { "id": "gid://shopify/CompanyContactRole/1", "name": "Ordering only" }
            ] },
            "locations": { "nodes": [{
                "id": "gid://shopify/CompanyLocation/1",
                "name": "HQ",
                "externalId": null,
                "phone": null,
                "locale": "en",
                "note": null,
                "shippingAddress": { "address1": "1 Main", "city": "Reno", "countryCode": "US" },
                "billingAddress": null,
                "taxSettings": {
                    "taxRegistrationId": null,
                    "taxExempt": false,
                    "taxExemptions": []
                },
                "roleAssignments": { "nodes": [{
                    "role": { "name": "Ordering only" },
                    "companyContact": {
                        "id": "gid://shopify/CompanyContact/5",
                        "customer": { "id": "gid://shopify/Customer/9" }
                    }
                }]}
            }]},
            "contacts": { "nodes": [] },
            "orders": { "nodes": [{ "createdAt": "2025-01-01T00:00:00Z", "cancelledAt": null }] }
        });

        let company: Company = serde_json::from_value(json).unwrap();
        assert_eq!(company.metafields.len(), 1);
        assert_eq!(company.contact_roles[0].name, "Ordering only");
        let location = &company.locations[0];
        assert!(location.has_valid_shipping());
        assert!(location.tax_settings.as_ref().unwrap().is_empty());
        assert_eq!(location.role_assignments[0].role_name(), Some("Ordering only"));
        assert_eq!(
            location.role_assignments[0].customer_id(),
            Some("gid://shopify/Customer/9")
        );
        assert_eq!(company.order_facts().len(), 1);
        assert!(!company.order_facts()[0].cancelled);
    }

    #[test]
    fn test_company_keeps_cursors_for_partial_pages() {
        let json = serde_json::json!({
            "id": "gid://shopify/Company/1",
            "name": "Acme",
            "externalId": null,
            "note": null,
            "customerSince": null,
            "locations": {
                "nodes": [],
                "pageInfo": { "hasNextPage": true, "endCursor": "loc-100" }
            },
            "contacts": {
                "nodes": [],
                "pageInfo": { "hasNextPage": false, "endCursor": "con-3" }
            }
        });

        let company: Company = serde_json::from_value(json).unwrap();
        assert_eq!(company.location_cursor.as_deref(), Some("loc-100"));
        assert!(company.contact_cursor.is_none());
        assert!(company.metafields.is_empty());
    }

    #[test]
    fn test_partial_single_page_connection_is_rejected() {
        let json = serde_json::json!({
            "id": "gid://shopify/Company/1",
            "name": "Acme",
            "externalId": null,
            "note": null,
            "customerSince": null,
            "contactRoles": {
                "nodes": [{ "id": "gid://shopify/CompanyContactRole/1", "name": "Buyer" }],
                "pageInfo": { "hasNextPage": true }
            }
        });

        let err = serde_json::from_value::<Company>(json).unwrap_err();
        assert!(err.to_string().contains("more pages after 1 nodes"), "{err}");
    }

    #[test]
    fn test_null_connection_is_empty() {
        let json = serde_json::json!({
            "id": "gid://shopify/Customer/1",
            "metafields": null
        });
        let customer: Customer = serde_json::from_value(json).unwrap();
        assert!(customer.metafields.is_empty());
        assert!(customer.tags.is_empty());
    }

    #[test]
    fn test_shipping_requires_street_city_country() {
        let address = CompanyAddress {
            address1: Some("1 Main".into()),
            city: Some("  ".into()),
            country_code: Some("US".into()),
            ..CompanyAddress::default()
        };
        assert!(!address.is_valid_shipping());
    }

    #[test]
    fn test_address_input_omits_missing_fields() {
        let address = CompanyAddress {
            address1: Some("1 Main".into()),
            country_code: Some("US".into()),
            ..CompanyAddress::default()
        };
        let value = serde_json::to_value(&address).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "address1": "1 Main", "countryCode": "US" })
        );
    }

    #[test]
    fn test_file_status_unknown_variant() {
        let record: FileRecord = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/MediaImage/1",
            "fileStatus": "SOMETHING_NEW"
        }))
        .unwrap();
        assert_eq!(record.file_status, FileStatus::Unknown);
        assert!(!record.file_status.is_terminal());
    }

    #[test]
    fn test_discount_record_title() {
        let record: DiscountRecord = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/DiscountAutomaticNode/1",
            "automaticDiscount": { "title": "Spring" }
        }))
        .unwrap();
        assert_eq!(record.title(), Some("Spring"));
    }
}
