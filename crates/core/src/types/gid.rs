//! Shopify global IDs (`gid://shopify/<Type>/<id>`).
//!
//! Every target-side reference the orchestrators pass around is one of these
//! opaque strings. The Key Resolver uses [`Gid::looks_like_gid`] to skip a
//! lookup when a spreadsheet cell already carries a resolved ID.

use core::fmt;

use serde::{Deserialize, Serialize};

const GID_PREFIX: &str = "gid://shopify/";

fn is_local_id_char(c: char) -> bool {
    c != '/' && c != ':' && !c.is_whitespace()
}

/// Errors that can occur when parsing a [`Gid`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GidError {
    /// The input does not start with `gid://shopify/`.
    #[error("not a Shopify global id: {0}")]
    MissingPrefix(String),
    /// The type or id segment is missing.
    #[error("malformed Shopify global id: {0}")]
    Malformed(String),
}

/// Macro to define the resource kinds the migration touches.
///
/// Creates an enum with:
/// - `as_str()` returning the GraphQL type name used inside the GID
/// - `from_type_name()` for the reverse mapping
/// - `Display` delegating to `as_str()`
macro_rules! define_resource_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Target-side resource type encoded in a [`Gid`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ResourceKind {
            $(
                #[doc = concat!("`", $name, "` resource.")]
                $variant,
            )+
        }

        impl ResourceKind {
            /// GraphQL type name as it appears inside a global id.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Parse a GraphQL type name.
            #[must_use]
            pub fn from_type_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for ResourceKind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_resource_kinds! {
    Company => "Company",
    CompanyLocation => "CompanyLocation",
    CompanyContact => "CompanyContact",
    CompanyContactRole => "CompanyContactRole",
    Customer => "Customer",
    Collection => "Collection",
    Product => "Product",
    ProductVariant => "ProductVariant",
    Segment => "Segment",
    DiscountCodeNode => "DiscountCodeNode",
    DiscountAutomaticNode => "DiscountAutomaticNode",
    GenericFile => "GenericFile",
    MediaImage => "MediaImage",
    Video => "Video",
    Order => "Order",
}

/// A Shopify global id.
///
/// The type segment is kept as a string so ids of resource types this crate
/// does not enumerate still round-trip; [`Gid::kind`] maps it when known.
///
/// ## Examples
///
/// ```
/// use storebridge_core::{Gid, ResourceKind};
///
/// let gid = Gid::parse("gid://shopify/Company/42").unwrap();
/// assert_eq!(gid.kind(), Some(ResourceKind::Company));
/// assert_eq!(gid.local_id(), "42");
///
/// assert!(Gid::looks_like_gid("gid://shopify/Product/1"));
/// assert!(!Gid::looks_like_gid("my-product-handle"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gid(String);

impl Gid {
    /// Build a gid from a kind and a local (usually numeric) id.
    #[must_use]
    pub fn new(kind: ResourceKind, local_id: impl fmt::Display) -> Self {
        Self(format!("{GID_PREFIX}{kind}/{local_id}"))
    }

    /// Parse a gid string.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is missing, either segment is empty, or
    /// the local id contains `/`, `:` or whitespace.
    pub fn parse(s: &str) -> Result<Self, GidError> {
        let s = s.trim();
        let rest = s
            .strip_prefix(GID_PREFIX)
            .ok_or_else(|| GidError::MissingPrefix(s.to_owned()))?;

        match rest.split_once('/') {
            Some((type_name, local))
                if !type_name.is_empty()
                    && !local.is_empty()
                    && local.chars().all(is_local_id_char) =>
            {
                Ok(Self(s.to_owned()))
            }
            _ => Err(GidError::Malformed(s.to_owned())),
        }
    }

    /// Whether a reference is already an opaque target id.
    #[must_use]
    pub fn looks_like_gid(reference: &str) -> bool {
        Self::parse(reference).is_ok()
    }

    /// Accept either a full gid or a bare numeric id of the given kind.
    ///
    /// Used for manifest files, which usually list plain numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is neither a gid nor all digits.
    pub fn from_gid_or_number(s: &str, kind: ResourceKind) -> Result<Self, GidError> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::new(kind, s));
        }
        Self::parse(s)
    }

    /// The GraphQL type segment.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.0
            .trim_start_matches(GID_PREFIX)
            .split('/')
            .next()
            .unwrap_or("")
    }

    /// The resource kind, if it is one this crate knows about.
    #[must_use]
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::from_type_name(self.type_name())
    }

    /// The local id segment (query string stripped).
    #[must_use]
    pub fn local_id(&self) -> &str {
        let rest = self.0.trim_start_matches(GID_PREFIX);
        let local = rest.split_once('/').map_or("", |(_, local)| local);
        local.split('?').next().unwrap_or(local)
    }

    /// Returns the gid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the gid and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Gid {
    type Err = GidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Gid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_formats_gid() {
        let gid = Gid::new(ResourceKind::CompanyLocation, 7);
        assert_eq!(gid.as_str(), "gid://shopify/CompanyLocation/7");
    }

    #[test]
    fn test_parse_valid() {
        let gid = Gid::parse("gid://shopify/Customer/123").unwrap();
        assert_eq!(gid.type_name(), "Customer");
        assert_eq!(gid.kind(), Some(ResourceKind::Customer));
        assert_eq!(gid.local_id(), "123");
    }

    #[test]
    fn test_parse_unknown_kind_still_parses() {
        let gid = Gid::parse("gid://shopify/Metaobject/9").unwrap();
        assert_eq!(gid.kind(), None);
        assert_eq!(gid.local_id(), "9");
    }

    #[test]
    fn test_local_id_strips_query() {
        let gid = Gid::parse("gid://shopify/MediaImage/5?v=2").unwrap();
        assert_eq!(gid.local_id(), "5");
    }

    #[test]
    fn test_parse_rejects_handles_and_skus() {
        assert!(matches!(
            Gid::parse("summer-sale"),
            Err(GidError::MissingPrefix(_))
        ));
        assert!(matches!(
            Gid::parse("gid://shopify/Product/"),
            Err(GidError::Malformed(_))
        ));
        assert!(matches!(
            Gid::parse("gid://shopify/"),
            Err(GidError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_scoped_keys() {
        for key in [
            "gid://shopify/Company/1::buyer",
            "gid://shopify/Company/1/CompanyLocation/2",
            "gid://shopify/Company/1 HQ",
        ] {
            assert!(matches!(Gid::parse(key), Err(GidError::Malformed(_))), "{key}");
            assert!(!Gid::looks_like_gid(key), "{key}");
        }
    }

    #[test]
    fn test_looks_like_gid() {
        assert!(Gid::looks_like_gid("gid://shopify/Segment/1"));
        assert!(Gid::looks_like_gid("  gid://shopify/Segment/1 "));
        assert!(!Gid::looks_like_gid("SKU-001"));
        assert!(!Gid::looks_like_gid(""));
    }

    #[test]
    fn test_from_gid_or_number() {
        let from_number = Gid::from_gid_or_number("8812", ResourceKind::Company).unwrap();
        assert_eq!(from_number.as_str(), "gid://shopify/Company/8812");

        let passthrough =
            Gid::from_gid_or_number("gid://shopify/Company/1", ResourceKind::Company).unwrap();
        assert_eq!(passthrough.as_str(), "gid://shopify/Company/1");

        assert!(Gid::from_gid_or_number("acme", ResourceKind::Company).is_err());
    }

    #[test]
    fn test_resource_kind_roundtrip() {
        for kind in [
            ResourceKind::Company,
            ResourceKind::ProductVariant,
            ResourceKind::DiscountAutomaticNode,
        ] {
            assert_eq!(ResourceKind::from_type_name(kind.as_str()), Some(kind));
        }
    }
}
