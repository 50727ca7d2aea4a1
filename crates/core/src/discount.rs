//! Discount variants.
//!
//! A discount sheet row describes one of six variants: a code or automatic
//! discount, each of basic (amount off), free-shipping or buy-X-get-Y kind.
//! Rather than branching on every combination, [`variant`] looks the
//! `(method, kind)` pair up in a static table. Each entry names a dedicated
//! builder returning the normalized [`DiscountSpec`] plus the create and
//! update mutations for that variant. Adding a variant is one more entry.
//!
//! References (product handles, customer emails, segment names) stay as
//! written until the caller resolves them with [`DiscountSpec::map_references`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::grouping::{ListField, MergeGroup, MergeSpec};
use crate::types::SourceRow;

/// Sheet column names.
pub mod columns {
    /// Discount code (code discounts).
    pub const CODE: &str = "Code";
    /// Title; the match key for automatic discounts.
    pub const TITLE: &str = "Title";
    /// `code` or `automatic`.
    pub const METHOD: &str = "Method";
    /// `basic`, `free_shipping` or `bxgy`.
    pub const TYPE: &str = "Type";
    /// `percentage` or `fixed_amount`.
    pub const VALUE_TYPE: &str = "Value Type";
    /// Numeric value; percentages are written out of 100.
    pub const VALUE: &str = "Value";
    /// `all`, `products`, `collections` or `variants`.
    pub const APPLIES_TO: &str = "Applies To";
    /// `all`, `customers` or `segments`.
    pub const ELIGIBILITY: &str = "Eligibility";
    /// Minimum order subtotal.
    pub const MINIMUM_SUBTOTAL: &str = "Minimum Subtotal";
    /// Minimum item quantity.
    pub const MINIMUM_QUANTITY: &str = "Minimum Quantity";
    /// Start date (RFC 3339 or `YYYY-MM-DD`).
    pub const STARTS_AT: &str = "Starts At";
    /// End date (RFC 3339 or `YYYY-MM-DD`).
    pub const ENDS_AT: &str = "Ends At";
    /// Total usage limit.
    pub const USAGE_LIMIT: &str = "Usage Limit";
    /// `true` to limit to one use per customer.
    pub const ONCE_PER_CUSTOMER: &str = "Once Per Customer";
    /// Combines with order discounts.
    pub const COMBINES_ORDER: &str = "Combines With Order";
    /// Combines with product discounts.
    pub const COMBINES_PRODUCT: &str = "Combines With Product";
    /// Combines with shipping discounts.
    pub const COMBINES_SHIPPING: &str = "Combines With Shipping";
    /// Free shipping cap.
    pub const MAX_SHIPPING_PRICE: &str = "Max Shipping Price";
    /// BXGY: quantity the customer buys.
    pub const BUY_QUANTITY: &str = "Buy Quantity";
    /// BXGY: quantity the customer gets.
    pub const GET_QUANTITY: &str = "Get Quantity";
    /// BXGY: percent off the "get" items, 100 for free.
    pub const GET_DISCOUNT: &str = "Get Discount";
    /// BXGY: uses per order.
    pub const USES_PER_ORDER: &str = "Uses Per Order";
    /// Product handle (one per row).
    pub const PRODUCT_HANDLE: &str = "Product Handle";
    /// Collection handle (one per row).
    pub const COLLECTION_HANDLE: &str = "Collection Handle";
    /// Variant SKU (one per row).
    pub const VARIANT_SKU: &str = "Variant SKU";
    /// Customer email (one per row).
    pub const CUSTOMER_EMAIL: &str = "Customer Email";
    /// Segment name (one per row).
    pub const SEGMENT_NAME: &str = "Segment Name";
    /// BXGY "get" product handle.
    pub const GET_PRODUCT_HANDLE: &str = "Get Product Handle";
    /// BXGY "get" collection handle.
    pub const GET_COLLECTION_HANDLE: &str = "Get Collection Handle";
}

/// Errors building a discount from a grouped row.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountBuildError {
    /// A required column is empty.
    #[error("missing required column {0:?}")]
    Missing(&'static str),
    /// A column holds a value that cannot be parsed.
    #[error("invalid {field} {value:?}")]
    Invalid {
        /// Column name.
        field: &'static str,
        /// Value as written.
        value: String,
    },
    /// The combination is not expressible for this variant.
    #[error("{method} {kind} discounts do not support {reason}")]
    Unsupported {
        /// Method.
        method: DiscountMethod,
        /// Kind.
        kind: DiscountKind,
        /// What was asked for.
        reason: &'static str,
    },
}

fn invalid(field: &'static str, value: &str) -> DiscountBuildError {
    DiscountBuildError::Invalid {
        field,
        value: value.to_owned(),
    }
}

/// How the discount is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscountMethod {
    /// Customer enters a code.
    Code,
    /// Applied automatically at checkout.
    Automatic,
}

impl FromStr for DiscountMethod {
    type Err = DiscountBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" | "" => Ok(Self::Code),
            "automatic" | "auto" => Ok(Self::Automatic),
            _ => Err(invalid(columns::METHOD, s)),
        }
    }
}

impl std::fmt::Display for DiscountMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Code => "code",
            Self::Automatic => "automatic",
        })
    }
}

/// What the discount does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscountKind {
    /// Amount or percentage off items.
    Basic,
    /// Free shipping.
    FreeShipping,
    /// Buy X get Y.
    BuyXGetY,
}

impl FromStr for DiscountKind {
    type Err = DiscountBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "basic" | "amount_off" | "" => Ok(Self::Basic),
            "free_shipping" | "shipping" => Ok(Self::FreeShipping),
            "bxgy" | "buy_x_get_y" => Ok(Self::BuyXGetY),
            _ => Err(invalid(columns::TYPE, s)),
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::FreeShipping => "free shipping",
            Self::BuyXGetY => "buy X get Y",
        })
    }
}

/// How the value column is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Percent off, written out of 100.
    Percentage,
    /// Fixed amount off.
    FixedAmount,
}

impl FromStr for ValueType {
    type Err = DiscountBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "percentage" | "percent" => Ok(Self::Percentage),
            "fixed_amount" | "fixed" | "amount" => Ok(Self::FixedAmount),
            _ => Err(invalid(columns::VALUE_TYPE, s)),
        }
    }
}

/// Discount value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountValue {
    /// Fraction in `(0, 1]`.
    Percentage(Decimal),
    /// Amount in shop currency.
    FixedAmount {
        /// Amount off.
        amount: Decimal,
        /// Apply to each entitled item rather than once per order.
        applies_on_each_item: bool,
    },
}

/// Which references a list holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Product handles.
    Product,
    /// Collection handles.
    Collection,
    /// Variant SKUs.
    Variant,
    /// Customer emails.
    Customer,
    /// Segment names.
    Segment,
}

/// Items a discount applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Items<R> {
    /// Every item.
    All,
    /// Listed products.
    Products(Vec<R>),
    /// Listed collections.
    Collections(Vec<R>),
    /// Listed variants.
    Variants(Vec<R>),
}

impl<R> Items<R> {
    fn references(&self) -> Option<(ReferenceKind, &[R])> {
        match self {
            Self::All => None,
            Self::Products(r) => Some((ReferenceKind::Product, r)),
            Self::Collections(r) => Some((ReferenceKind::Collection, r)),
            Self::Variants(r) => Some((ReferenceKind::Variant, r)),
        }
    }

    fn try_map<S, E, F>(self, f: &mut F) -> Result<Items<S>, E>
    where
        F: FnMut(ReferenceKind, Vec<R>) -> Result<Vec<S>, E>,
    {
        Ok(match self {
            Self::All => Items::All,
            Self::Products(r) => Items::Products(f(ReferenceKind::Product, r)?),
            Self::Collections(r) => Items::Collections(f(ReferenceKind::Collection, r)?),
            Self::Variants(r) => Items::Variants(f(ReferenceKind::Variant, r)?),
        })
    }
}

/// Who may use the discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility<R> {
    /// Everyone.
    All,
    /// Listed customers.
    Customers(Vec<R>),
    /// Listed customer segments.
    Segments(Vec<R>),
}

impl<R> Eligibility<R> {
    fn references(&self) -> Option<(ReferenceKind, &[R])> {
        match self {
            Self::All => None,
            Self::Customers(r) => Some((ReferenceKind::Customer, r)),
            Self::Segments(r) => Some((ReferenceKind::Segment, r)),
        }
    }

    fn try_map<S, E, F>(self, f: &mut F) -> Result<Eligibility<S>, E>
    where
        F: FnMut(ReferenceKind, Vec<R>) -> Result<Vec<S>, E>,
    {
        Ok(match self {
            Self::All => Eligibility::All,
            Self::Customers(r) => Eligibility::Customers(f(ReferenceKind::Customer, r)?),
            Self::Segments(r) => Eligibility::Segments(f(ReferenceKind::Segment, r)?),
        })
    }
}

/// Minimum purchase requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinimumRequirement {
    /// None.
    #[default]
    None,
    /// Minimum subtotal.
    Subtotal(Decimal),
    /// Minimum item quantity.
    Quantity(u64),
}

/// Which other discount classes this one combines with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Combinations {
    /// Order discounts.
    pub order: bool,
    /// Product discounts.
    pub product: bool,
    /// Shipping discounts.
    pub shipping: bool,
}

/// Variant-specific part of a discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountBody<R> {
    /// Amount or percentage off.
    Basic {
        /// Value off.
        value: DiscountValue,
        /// Entitled items.
        items: Items<R>,
        /// Minimum requirement.
        minimum: MinimumRequirement,
    },
    /// Free shipping to all countries.
    FreeShipping {
        /// Minimum requirement.
        minimum: MinimumRequirement,
        /// Only shipping rates up to this price qualify.
        max_shipping_price: Option<Decimal>,
    },
    /// Buy X get Y.
    BuyXGetY {
        /// Items that must be bought.
        buys: Items<R>,
        /// How many must be bought.
        buys_quantity: u64,
        /// Items the customer gets.
        gets: Items<R>,
        /// How many the customer gets.
        gets_quantity: u64,
        /// Fraction off the "get" items, 1 for free.
        gets_percentage: Decimal,
        /// Uses per order.
        uses_per_order_limit: Option<u64>,
    },
}

/// Normalized discount, independent of the wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountSpec<R> {
    /// Method.
    pub method: DiscountMethod,
    /// Title.
    pub title: String,
    /// Code, for code discounts.
    pub code: Option<String>,
    /// Start.
    pub starts_at: DateTime<Utc>,
    /// Optional end.
    pub ends_at: Option<DateTime<Utc>>,
    /// Total usage limit (code discounts).
    pub usage_limit: Option<u64>,
    /// One use per customer (code discounts).
    pub once_per_customer: bool,
    /// Combinations.
    pub combines_with: Combinations,
    /// Eligibility.
    pub eligibility: Eligibility<R>,
    /// Variant-specific part.
    pub body: DiscountBody<R>,
}

impl<R> DiscountSpec<R> {
    /// Kind of the body.
    #[must_use]
    pub const fn kind(&self) -> DiscountKind {
        match self.body {
            DiscountBody::Basic { .. } => DiscountKind::Basic,
            DiscountBody::FreeShipping { .. } => DiscountKind::FreeShipping,
            DiscountBody::BuyXGetY { .. } => DiscountKind::BuyXGetY,
        }
    }

    /// The variant table entry for this spec.
    #[must_use]
    pub fn variant(&self) -> &'static DiscountVariant {
        variant(self.method, self.kind())
    }

    /// Every unresolved reference list, in a stable order.
    #[must_use]
    pub fn references(&self) -> Vec<(ReferenceKind, &[R])> {
        let mut refs = Vec::new();
        refs.extend(self.eligibility.references());
        match &self.body {
            DiscountBody::Basic { items, .. } => refs.extend(items.references()),
            DiscountBody::FreeShipping { .. } => {}
            DiscountBody::BuyXGetY { buys, gets, .. } => {
                refs.extend(buys.references());
                refs.extend(gets.references());
            }
        }
        refs
    }

    /// Replace every reference list, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn map_references<S, E, F>(self, mut f: F) -> Result<DiscountSpec<S>, E>
    where
        F: FnMut(ReferenceKind, Vec<R>) -> Result<Vec<S>, E>,
    {
        let eligibility = self.eligibility.try_map(&mut f)?;
        let body = match self.body {
            DiscountBody::Basic {
                value,
                items,
                minimum,
            } => DiscountBody::Basic {
                value,
                items: items.try_map(&mut f)?,
                minimum,
            },
            DiscountBody::FreeShipping {
                minimum,
                max_shipping_price,
            } => DiscountBody::FreeShipping {
                minimum,
                max_shipping_price,
            },
            DiscountBody::BuyXGetY {
                buys,
                buys_quantity,
                gets,
                gets_quantity,
                gets_percentage,
                uses_per_order_limit,
            } => DiscountBody::BuyXGetY {
                buys: buys.try_map(&mut f)?,
                buys_quantity,
                gets: gets.try_map(&mut f)?,
                gets_quantity,
                gets_percentage,
                uses_per_order_limit,
            },
        };
        Ok(DiscountSpec {
            method: self.method,
            title: self.title,
            code: self.code,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            usage_limit: self.usage_limit,
            once_per_customer: self.once_per_customer,
            combines_with: self.combines_with,
            eligibility,
            body,
        })
    }
}

/// A discount row after grouping, with columns parsed but references unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountDraft {
    /// Method.
    pub method: DiscountMethod,
    /// Kind.
    pub kind: DiscountKind,
    /// Title (falls back to the code).
    pub title: String,
    /// Code.
    pub code: Option<String>,
    /// Value type.
    pub value_type: Option<ValueType>,
    /// Value as written.
    pub value: Option<Decimal>,
    /// `Applies To` target.
    pub applies_to: Option<ReferenceKind>,
    /// `Eligibility` target.
    pub eligibility: Option<ReferenceKind>,
    /// Product handles.
    pub products: Vec<String>,
    /// Collection handles.
    pub collections: Vec<String>,
    /// Variant SKUs.
    pub variants: Vec<String>,
    /// Customer emails.
    pub customers: Vec<String>,
    /// Segment names.
    pub segments: Vec<String>,
    /// BXGY "get" product handles.
    pub get_products: Vec<String>,
    /// BXGY "get" collection handles.
    pub get_collections: Vec<String>,
    /// Minimum subtotal.
    pub minimum_subtotal: Option<Decimal>,
    /// Minimum quantity.
    pub minimum_quantity: Option<u64>,
    /// Start.
    pub starts_at: Option<DateTime<Utc>>,
    /// End.
    pub ends_at: Option<DateTime<Utc>>,
    /// Usage limit.
    pub usage_limit: Option<u64>,
    /// Once per customer.
    pub once_per_customer: bool,
    /// Combinations.
    pub combines_with: Combinations,
    /// Free shipping cap.
    pub max_shipping_price: Option<Decimal>,
    /// BXGY buy quantity.
    pub buy_quantity: Option<u64>,
    /// BXGY get quantity.
    pub get_quantity: Option<u64>,
    /// BXGY percent off the get items, out of 100.
    pub get_discount: Option<Decimal>,
    /// BXGY uses per order.
    pub uses_per_order: Option<u64>,
}

/// Row grouping for discount sheets.
#[must_use]
pub fn merge_spec() -> MergeSpec {
    use columns as c;
    MergeSpec::new()
        .scalar(c::CODE, c::CODE)
        .scalar(c::TITLE, c::TITLE)
        .scalar(c::VALUE, c::VALUE)
        .scalar(c::MINIMUM_SUBTOTAL, c::MINIMUM_SUBTOTAL)
        .scalar(c::MINIMUM_QUANTITY, c::MINIMUM_QUANTITY)
        .scalar(c::STARTS_AT, c::STARTS_AT)
        .scalar(c::ENDS_AT, c::ENDS_AT)
        .scalar(c::USAGE_LIMIT, c::USAGE_LIMIT)
        .scalar(c::ONCE_PER_CUSTOMER, c::ONCE_PER_CUSTOMER)
        .scalar(c::COMBINES_ORDER, c::COMBINES_ORDER)
        .scalar(c::COMBINES_PRODUCT, c::COMBINES_PRODUCT)
        .scalar(c::COMBINES_SHIPPING, c::COMBINES_SHIPPING)
        .scalar(c::MAX_SHIPPING_PRICE, c::MAX_SHIPPING_PRICE)
        .scalar(c::BUY_QUANTITY, c::BUY_QUANTITY)
        .scalar(c::GET_QUANTITY, c::GET_QUANTITY)
        .scalar(c::GET_DISCOUNT, c::GET_DISCOUNT)
        .scalar(c::USES_PER_ORDER, c::USES_PER_ORDER)
        .discriminator(c::METHOD, c::METHOD)
        .discriminator(c::TYPE, c::TYPE)
        .discriminator(c::VALUE_TYPE, c::VALUE_TYPE)
        .discriminator(c::APPLIES_TO, c::APPLIES_TO)
        .discriminator(c::ELIGIBILITY, c::ELIGIBILITY)
        .list(ListField::new(c::PRODUCT_HANDLE, [c::PRODUCT_HANDLE]))
        .list(ListField::new(c::COLLECTION_HANDLE, [c::COLLECTION_HANDLE]))
        .list(ListField::new(c::VARIANT_SKU, [c::VARIANT_SKU]))
        .list(ListField::new(c::CUSTOMER_EMAIL, [c::CUSTOMER_EMAIL]))
        .list(ListField::new(c::SEGMENT_NAME, [c::SEGMENT_NAME]))
        .list(ListField::new(c::GET_PRODUCT_HANDLE, [c::GET_PRODUCT_HANDLE]))
        .list(ListField::new(c::GET_COLLECTION_HANDLE, [c::GET_COLLECTION_HANDLE]))
}

/// Grouping key: the code for code discounts, the title for automatic ones.
#[must_use]
pub fn group_key(row: &SourceRow) -> Option<String> {
    let automatic = row
        .get(columns::METHOD)
        .and_then(|m| m.parse::<DiscountMethod>().ok())
        == Some(DiscountMethod::Automatic);
    if automatic {
        row.get(columns::TITLE)
            .map(|t| format!("title:{}", t.to_lowercase()))
    } else {
        row.get(columns::CODE).map(str::to_uppercase)
    }
}

fn parse_decimal(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<Decimal>, DiscountBuildError> {
    value
        .map(|v| {
            let cleaned = v.trim().trim_end_matches('%').trim_start_matches('$').trim();
            Decimal::from_str(cleaned).map_err(|_| invalid(field, v))
        })
        .transpose()
}

fn parse_count(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<u64>, DiscountBuildError> {
    value
        .map(|v| v.trim().parse::<u64>().map_err(|_| invalid(field, v)))
        .transpose()
}

fn parse_flag(field: &'static str, value: Option<&str>) -> Result<bool, DiscountBuildError> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" => Ok(false),
            _ => Err(invalid(field, &v)),
        },
    }
}

fn parse_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DiscountBuildError> {
    let Some(v) = value else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(v.trim()) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| invalid(field, v))
}

fn parse_applies_to(value: Option<&str>) -> Result<Option<ReferenceKind>, DiscountBuildError> {
    let Some(v) = value else {
        return Ok(None);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "all" | "order" | "entire order" => Ok(None),
        "products" | "product" => Ok(Some(ReferenceKind::Product)),
        "collections" | "collection" => Ok(Some(ReferenceKind::Collection)),
        "variants" | "variant" => Ok(Some(ReferenceKind::Variant)),
        _ => Err(invalid(columns::APPLIES_TO, v)),
    }
}

fn parse_eligibility(value: Option<&str>) -> Result<Option<ReferenceKind>, DiscountBuildError> {
    let Some(v) = value else {
        return Ok(None);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "all" | "everyone" => Ok(None),
        "customers" | "customer" => Ok(Some(ReferenceKind::Customer)),
        "segments" | "segment" => Ok(Some(ReferenceKind::Segment)),
        _ => Err(invalid(columns::ELIGIBILITY, v)),
    }
}

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_owned).collect()
}

impl DiscountDraft {
    /// Parse a grouped discount.
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable columns or a missing code/title.
    pub fn from_group(group: &MergeGroup) -> Result<Self, DiscountBuildError> {
        use columns as c;

        let method: DiscountMethod = group.discriminator(c::METHOD).unwrap_or_default().parse()?;
        let kind: DiscountKind = group.discriminator(c::TYPE).unwrap_or_default().parse()?;
        let code = group.scalar(c::CODE).map(str::to_owned);
        if method == DiscountMethod::Code && code.is_none() {
            return Err(DiscountBuildError::Missing(c::CODE));
        }
        let title = group
            .scalar(c::TITLE)
            .map(str::to_owned)
            .or_else(|| code.clone())
            .ok_or(DiscountBuildError::Missing(c::TITLE))?;

        Ok(Self {
            method,
            kind,
            title,
            code,
            value_type: group
                .discriminator(c::VALUE_TYPE)
                .map(str::parse::<ValueType>)
                .transpose()?,
            value: parse_decimal(c::VALUE, group.scalar(c::VALUE))?,
            applies_to: parse_applies_to(group.discriminator(c::APPLIES_TO))?,
            eligibility: parse_eligibility(group.discriminator(c::ELIGIBILITY))?,
            products: owned(group.list_values(c::PRODUCT_HANDLE)),
            collections: owned(group.list_values(c::COLLECTION_HANDLE)),
            variants: owned(group.list_values(c::VARIANT_SKU)),
            customers: owned(group.list_values(c::CUSTOMER_EMAIL)),
            segments: owned(group.list_values(c::SEGMENT_NAME)),
            get_products: owned(group.list_values(c::GET_PRODUCT_HANDLE)),
            get_collections: owned(group.list_values(c::GET_COLLECTION_HANDLE)),
            minimum_subtotal: parse_decimal(
                c::MINIMUM_SUBTOTAL,
                group.scalar(c::MINIMUM_SUBTOTAL),
            )?,
            minimum_quantity: parse_count(c::MINIMUM_QUANTITY, group.scalar(c::MINIMUM_QUANTITY))?,
            starts_at: parse_date(c::STARTS_AT, group.scalar(c::STARTS_AT))?,
            ends_at: parse_date(c::ENDS_AT, group.scalar(c::ENDS_AT))?,
            usage_limit: parse_count(c::USAGE_LIMIT, group.scalar(c::USAGE_LIMIT))?,
            once_per_customer: parse_flag(
                c::ONCE_PER_CUSTOMER,
                group.scalar(c::ONCE_PER_CUSTOMER),
            )?,
            combines_with: Combinations {
                order: parse_flag(c::COMBINES_ORDER, group.scalar(c::COMBINES_ORDER))?,
                product: parse_flag(c::COMBINES_PRODUCT, group.scalar(c::COMBINES_PRODUCT))?,
                shipping: parse_flag(c::COMBINES_SHIPPING, group.scalar(c::COMBINES_SHIPPING))?,
            },
            max_shipping_price: parse_decimal(
                c::MAX_SHIPPING_PRICE,
                group.scalar(c::MAX_SHIPPING_PRICE),
            )?,
            buy_quantity: parse_count(c::BUY_QUANTITY, group.scalar(c::BUY_QUANTITY))?,
            get_quantity: parse_count(c::GET_QUANTITY, group.scalar(c::GET_QUANTITY))?,
            get_discount: parse_decimal(c::GET_DISCOUNT, group.scalar(c::GET_DISCOUNT))?,
            uses_per_order: parse_count(c::USES_PER_ORDER, group.scalar(c::USES_PER_ORDER))?,
        })
    }

    /// Build the normalized spec through the variant table.
    ///
    /// `now` is used when no start date is given.
    ///
    /// # Errors
    ///
    /// Returns the variant builder's error.
    pub fn build(&self, now: DateTime<Utc>) -> Result<DiscountSpec<String>, DiscountBuildError> {
        let variant = variant(self.method, self.kind);
        let body = (variant.build)(self)?;

        let eligibility = match self.eligibility {
            None => Eligibility::All,
            Some(_) if self.method == DiscountMethod::Automatic => {
                return Err(self.unsupported("customer eligibility"));
            }
            Some(ReferenceKind::Segment) => Eligibility::Segments(self.segments.clone()),
            Some(_) => Eligibility::Customers(self.customers.clone()),
        };

        Ok(DiscountSpec {
            method: self.method,
            title: self.title.clone(),
            code: self.code.clone(),
            starts_at: self.starts_at.unwrap_or(now),
            ends_at: self.ends_at,
            usage_limit: self.usage_limit,
            once_per_customer: self.once_per_customer,
            combines_with: self.combines_with,
            eligibility,
            body,
        })
    }

    fn unsupported(&self, reason: &'static str) -> DiscountBuildError {
        DiscountBuildError::Unsupported {
            method: self.method,
            kind: self.kind,
            reason,
        }
    }

    fn items(&self) -> Items<String> {
        match self.applies_to {
            None => Items::All,
            Some(ReferenceKind::Collection) => Items::Collections(self.collections.clone()),
            Some(ReferenceKind::Variant) => Items::Variants(self.variants.clone()),
            Some(_) => Items::Products(self.products.clone()),
        }
    }

    fn minimum(&self) -> MinimumRequirement {
        match (self.minimum_subtotal, self.minimum_quantity) {
            (Some(subtotal), _) => MinimumRequirement::Subtotal(subtotal),
            (None, Some(quantity)) => MinimumRequirement::Quantity(quantity),
            (None, None) => MinimumRequirement::None,
        }
    }

    fn value(&self) -> Result<DiscountValue, DiscountBuildError> {
        let value = self.value.ok_or(DiscountBuildError::Missing(columns::VALUE))?;
        let value_type = self
            .value_type
            .ok_or(DiscountBuildError::Missing(columns::VALUE_TYPE))?;
        match value_type {
            ValueType::Percentage => {
                percent_fraction(columns::VALUE, value).map(DiscountValue::Percentage)
            }
            ValueType::FixedAmount if value > Decimal::ZERO => Ok(DiscountValue::FixedAmount {
                amount: value,
                applies_on_each_item: false,
            }),
            ValueType::FixedAmount => Err(invalid(columns::VALUE, &value.to_string())),
        }
    }
}

/// Convert a percent out of 100 into a fraction in `(0, 1]`.
fn percent_fraction(field: &'static str, percent: Decimal) -> Result<Decimal, DiscountBuildError> {
    if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(invalid(field, &percent.to_string()));
    }
    Ok(percent / Decimal::ONE_HUNDRED)
}

type Builder = fn(&DiscountDraft) -> Result<DiscountBody<String>, DiscountBuildError>;

/// One row of the variant table.
pub struct DiscountVariant {
    /// Method.
    pub method: DiscountMethod,
    /// Kind.
    pub kind: DiscountKind,
    /// GraphQL operation creating this variant.
    pub create_operation: &'static str,
    /// GraphQL operation updating this variant.
    pub update_operation: &'static str,
    /// Payload field of the create mutation.
    pub create_field: &'static str,
    /// Payload field of the update mutation.
    pub update_field: &'static str,
    build: Builder,
}

impl std::fmt::Debug for DiscountVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountVariant")
            .field("method", &self.method)
            .field("kind", &self.kind)
            .field("create_operation", &self.create_operation)
            .field("update_operation", &self.update_operation)
            .finish_non_exhaustive()
    }
}

static CODE_BASIC: DiscountVariant = DiscountVariant {
    method: DiscountMethod::Code,
    kind: DiscountKind::Basic,
    create_operation: "DiscountCodeBasicCreate",
    update_operation: "DiscountCodeBasicUpdate",
    create_field: "discountCodeBasicCreate",
    update_field: "discountCodeBasicUpdate",
    build: build_basic,
};

static CODE_FREE_SHIPPING: DiscountVariant = DiscountVariant {
    method: DiscountMethod::Code,
    kind: DiscountKind::FreeShipping,
    create_operation: "DiscountCodeFreeShippingCreate",
    update_operation: "DiscountCodeFreeShippingUpdate",
    create_field: "discountCodeFreeShippingCreate",
    update_field: "discountCodeFreeShippingUpdate",
    build: build_free_shipping,
};

static CODE_BXGY: DiscountVariant = DiscountVariant {
    method: DiscountMethod::Code,
    kind: DiscountKind::BuyXGetY,
    create_operation: "DiscountCodeBxgyCreate",
    update_operation: "DiscountCodeBxgyUpdate",
    create_field: "discountCodeBxgyCreate",
    update_field: "discountCodeBxgyUpdate",
    build: build_bxgy,
};

static AUTOMATIC_BASIC: DiscountVariant = DiscountVariant {
    method: DiscountMethod::Automatic,
    kind: DiscountKind::Basic,
    create_operation: "DiscountAutomaticBasicCreate",
    update_operation: "DiscountAutomaticBasicUpdate",
    create_field: "discountAutomaticBasicCreate",
    update_field: "discountAutomaticBasicUpdate",
    build: build_basic,
};

static AUTOMATIC_FREE_SHIPPING: DiscountVariant = DiscountVariant {
    method: DiscountMethod::Automatic,
    kind: DiscountKind::FreeShipping,
    create_operation: "DiscountAutomaticFreeShippingCreate",
    update_operation: "DiscountAutomaticFreeShippingUpdate",
    create_field: "discountAutomaticFreeShippingCreate",
    update_field: "discountAutomaticFreeShippingUpdate",
    build: build_free_shipping,
};

static AUTOMATIC_BXGY: DiscountVariant = DiscountVariant {
    method: DiscountMethod::Automatic,
    kind: DiscountKind::BuyXGetY,
    create_operation: "DiscountAutomaticBxgyCreate",
    update_operation: "DiscountAutomaticBxgyUpdate",
    create_field: "discountAutomaticBxgyCreate",
    update_field: "discountAutomaticBxgyUpdate",
    build: build_bxgy,
};

/// Look up the table entry for a `(method, kind)` pair.
#[must_use]
pub fn variant(method: DiscountMethod, kind: DiscountKind) -> &'static DiscountVariant {
    match (method, kind) {
        (DiscountMethod::Code, DiscountKind::Basic) => &CODE_BASIC,
        (DiscountMethod::Code, DiscountKind::FreeShipping) => &CODE_FREE_SHIPPING,
        (DiscountMethod::Code, DiscountKind::BuyXGetY) => &CODE_BXGY,
        (DiscountMethod::Automatic, DiscountKind::Basic) => &AUTOMATIC_BASIC,
        (DiscountMethod::Automatic, DiscountKind::FreeShipping) => &AUTOMATIC_FREE_SHIPPING,
        (DiscountMethod::Automatic, DiscountKind::BuyXGetY) => &AUTOMATIC_BXGY,
    }
}

fn build_basic(draft: &DiscountDraft) -> Result<DiscountBody<String>, DiscountBuildError> {
    let mut value = draft.value()?;
    let items = draft.items();
    if let DiscountValue::FixedAmount {
        applies_on_each_item,
        ..
    } = &mut value
    {
        *applies_on_each_item = !matches!(items, Items::All);
    }
    Ok(DiscountBody::Basic {
        value,
        items,
        minimum: draft.minimum(),
    })
}

fn build_free_shipping(draft: &DiscountDraft) -> Result<DiscountBody<String>, DiscountBuildError> {
    if draft.applies_to.is_some() {
        return Err(draft.unsupported("item restrictions"));
    }
    Ok(DiscountBody::FreeShipping {
        minimum: draft.minimum(),
        max_shipping_price: draft.max_shipping_price,
    })
}

fn build_bxgy(draft: &DiscountDraft) -> Result<DiscountBody<String>, DiscountBuildError> {
    let buys = draft.items();
    if matches!(buys, Items::All | Items::Variants(_)) {
        return Err(draft.unsupported("buy items other than products or collections"));
    }
    let gets = if draft.get_collections.is_empty() {
        Items::Products(draft.get_products.clone())
    } else {
        Items::Collections(draft.get_collections.clone())
    };
    let gets_percentage = match draft.get_discount {
        Some(percent) => percent_fraction(columns::GET_DISCOUNT, percent)?,
        None => Decimal::ONE,
    };
    Ok(DiscountBody::BuyXGetY {
        buys,
        buys_quantity: draft
            .buy_quantity
            .ok_or(DiscountBuildError::Missing(columns::BUY_QUANTITY))?,
        gets,
        gets_quantity: draft
            .get_quantity
            .ok_or(DiscountBuildError::Missing(columns::GET_QUANTITY))?,
        gets_percentage,
        uses_per_order_limit: draft.uses_per_order,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::grouping::group_rows;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn draft_from(rows: &[&[(&str, &str)]]) -> Result<DiscountDraft, DiscountBuildError> {
        let rows: Vec<SourceRow> = rows
            .iter()
            .enumerate()
            .map(|(i, cells)| SourceRow::new(i + 1, cells.iter().copied()))
            .collect();
        let grouping = group_rows(&rows, group_key, &merge_spec());
        assert_eq!(grouping.groups.len(), 1);
        DiscountDraft::from_group(grouping.groups[0].as_ref().unwrap())
    }

    #[test]
    fn test_code_basic_percentage_for_collections() {
        let draft = draft_from(&[
            &[
                ("Code", "SPRING10"),
                ("Type", "basic"),
                ("Value Type", "percentage"),
                ("Value", "10%"),
                ("Applies To", "collections"),
                ("Collection Handle", "spring"),
            ],
            &[("Code", "spring10"), ("Collection Handle", "summer")],
        ])
        .unwrap();
        let spec = draft.build(now()).unwrap();

        assert_eq!(spec.code.as_deref(), Some("SPRING10"));
        assert_eq!(spec.starts_at, now());
        assert_eq!(
            spec.body,
            DiscountBody::Basic {
                value: DiscountValue::Percentage(Decimal::new(10, 2)),
                items: Items::Collections(vec!["spring".into(), "summer".into()]),
                minimum: MinimumRequirement::None,
            }
        );
        assert_eq!(spec.variant().create_operation, "DiscountCodeBasicCreate");
    }

    #[test]
    fn test_fixed_amount_on_products_applies_per_item() {
        let draft = draft_from(&[&[
            ("Code", "FIVE"),
            ("Value Type", "fixed_amount"),
            ("Value", "$5.00"),
            ("Applies To", "products"),
            ("Product Handle", "shirt"),
            ("Minimum Subtotal", "50"),
        ]])
        .unwrap();
        let spec = draft.build(now()).unwrap();
        let DiscountBody::Basic { value, minimum, .. } = spec.body else {
            panic!("expected basic body");
        };
        assert_eq!(
            value,
            DiscountValue::FixedAmount {
                amount: Decimal::new(500, 2),
                applies_on_each_item: true,
            }
        );
        assert_eq!(minimum, MinimumRequirement::Subtotal(Decimal::from(50)));
    }

    #[test]
    fn test_customer_eligibility_collects_emails() {
        let draft = draft_from(&[
            &[
                ("Code", "VIP"),
                ("Value Type", "percentage"),
                ("Value", "20"),
                ("Eligibility", "customers"),
                ("Customer Email", "a@example.com"),
            ],
            &[("Code", "VIP"), ("Eligibility", "customers"), ("Customer Email", "b@example.com")],
        ])
        .unwrap();
        let spec = draft.build(now()).unwrap();
        assert_eq!(
            spec.eligibility,
            Eligibility::Customers(vec!["a@example.com".into(), "b@example.com".into()])
        );
    }

    #[test]
    fn test_automatic_free_shipping_keyed_by_title() {
        let draft = draft_from(&[&[
            ("Method", "automatic"),
            ("Title", "Free shipping over 100"),
            ("Type", "free_shipping"),
            ("Minimum Subtotal", "100"),
        ]])
        .unwrap();
        let spec = draft.build(now()).unwrap();
        assert_eq!(spec.code, None);
        assert_eq!(spec.kind(), DiscountKind::FreeShipping);
        assert_eq!(
            spec.variant().update_operation,
            "DiscountAutomaticFreeShippingUpdate"
        );
    }

    #[test]
    fn test_automatic_rejects_customer_eligibility() {
        let draft = draft_from(&[&[
            ("Method", "automatic"),
            ("Title", "Members"),
            ("Value Type", "percentage"),
            ("Value", "5"),
            ("Eligibility", "segments"),
        ]])
        .unwrap();
        assert!(matches!(
            draft.build(now()),
            Err(DiscountBuildError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_bxgy_defaults_to_free() {
        let draft = draft_from(&[&[
            ("Code", "BOGO"),
            ("Type", "bxgy"),
            ("Applies To", "products"),
            ("Product Handle", "mug"),
            ("Get Product Handle", "coaster"),
            ("Buy Quantity", "2"),
            ("Get Quantity", "1"),
        ]])
        .unwrap();
        let spec = draft.build(now()).unwrap();
        let DiscountBody::BuyXGetY {
            gets_percentage,
            buys_quantity,
            ..
        } = spec.body
        else {
            panic!("expected bxgy body");
        };
        assert_eq!(gets_percentage, Decimal::ONE);
        assert_eq!(buys_quantity, 2);
    }

    #[test]
    fn test_code_required_for_code_discounts() {
        let rows = vec![SourceRow::new(1, [("Title", "No code"), ("Method", "code")])];
        let grouping = group_rows(&rows, group_key, &merge_spec());
        assert!(grouping.groups.is_empty());
        assert_eq!(grouping.dropped, vec![1]);
    }

    #[test]
    fn test_invalid_percentage() {
        let draft =
            draft_from(&[&[("Code", "BAD"), ("Value Type", "percentage"), ("Value", "150")]])
                .unwrap();
        assert!(matches!(
            draft.build(now()),
            Err(DiscountBuildError::Invalid { field: "Value", .. })
        ));
    }

    #[test]
    fn test_map_references_resolves_every_list() {
        let draft = draft_from(&[&[
            ("Code", "BOGO"),
            ("Type", "bxgy"),
            ("Applies To", "collections"),
            ("Collection Handle", "mugs"),
            ("Get Product Handle", "coaster"),
            ("Buy Quantity", "1"),
            ("Get Quantity", "1"),
            ("Eligibility", "segments"),
            ("Segment Name", "VIP"),
        ]])
        .unwrap();
        let spec = draft.build(now()).unwrap();
        let kinds: Vec<ReferenceKind> = spec.references().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                ReferenceKind::Segment,
                ReferenceKind::Collection,
                ReferenceKind::Product
            ]
        );

        let resolved = spec
            .map_references(|kind, refs| -> Result<Vec<String>, ()> {
                Ok(refs.into_iter().map(|r| format!("{kind:?}:{r}")).collect())
            })
            .unwrap();
        assert_eq!(
            resolved.eligibility,
            Eligibility::Segments(vec!["Segment:VIP".into()])
        );
    }

    #[test]
    fn test_conflicting_discriminator_is_a_grouping_error() {
        let rows = vec![
            SourceRow::new(1, [("Code", "X"), ("Applies To", "products")]),
            SourceRow::new(2, [("Code", "X"), ("Applies To", "collections")]),
        ];
        let grouping = group_rows(&rows, group_key, &merge_spec());
        assert!(grouping.groups[0].is_err());
    }
}
