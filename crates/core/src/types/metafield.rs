//! Metafield types and spreadsheet header descriptors.
//!
//! Sheet exports carry metafields as columns named
//! `Metafield: <namespace>.<key> [<type>]`. Headers are parsed once, up
//! front, into [`MetafieldColumn`] descriptors; both the definition step and
//! the row grouper consume the descriptors instead of re-reading headers.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Metafield:\s*([A-Za-z0-9_\-]+)\.([A-Za-z0-9_\-]+)\s*\[\s*([a-z_.]+)\s*\]\s*$")
        .expect("valid metafield header regex")
});

const HEADER_PREFIX: &str = "Metafield:";

/// Errors raised while parsing metafield column headers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// The header starts with `Metafield:` but does not follow the convention.
    #[error("malformed metafield header {0:?}, expected `Metafield: namespace.key [type]`")]
    Malformed(String),
    /// The bracketed type is not a supported storage type.
    #[error("unsupported metafield type {type_name:?} in header {header:?}")]
    UnknownType {
        /// The header as written.
        header: String,
        /// The unrecognised type tag.
        type_name: String,
    },
    /// Two columns declare the same namespace and key.
    #[error("metafield {0} is declared by more than one column")]
    Duplicate(String),
}

macro_rules! define_metafield_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Closed set of storage types the target platform accepts.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MetafieldType {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl MetafieldType {
            /// Wire name of the type.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Parse a wire name.
            #[must_use]
            pub fn from_type_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

define_metafield_types! {
    SingleLineTextField => "single_line_text_field",
    MultiLineTextField => "multi_line_text_field",
    RichTextField => "rich_text_field",
    NumberInteger => "number_integer",
    NumberDecimal => "number_decimal",
    Boolean => "boolean",
    Date => "date",
    DateTime => "date_time",
    Json => "json",
    Url => "url",
    Color => "color",
    Money => "money",
    Rating => "rating",
    Weight => "weight",
    Volume => "volume",
    Dimension => "dimension",
    ProductReference => "product_reference",
    VariantReference => "variant_reference",
    CollectionReference => "collection_reference",
    CustomerReference => "customer_reference",
    CompanyReference => "company_reference",
    FileReference => "file_reference",
    PageReference => "page_reference",
    MetaobjectReference => "metaobject_reference",
    ListSingleLineTextField => "list.single_line_text_field",
    ListNumberInteger => "list.number_integer",
    ListNumberDecimal => "list.number_decimal",
    ListDate => "list.date",
    ListUrl => "list.url",
    ListColor => "list.color",
    ListProductReference => "list.product_reference",
    ListVariantReference => "list.variant_reference",
    ListCollectionReference => "list.collection_reference",
    ListCustomerReference => "list.customer_reference",
    ListFileReference => "list.file_reference",
    ListPageReference => "list.page_reference",
    ListMetaobjectReference => "list.metaobject_reference",
}

impl MetafieldType {
    /// Whether values are JSON arrays of items.
    #[must_use]
    pub fn is_list(self) -> bool {
        self.as_str().starts_with("list.")
    }
}

impl std::fmt::Display for MetafieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetafieldType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetafieldType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_type_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown metafield type {name}")))
    }
}

/// A complete, typed metafield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafield {
    /// Namespace, e.g. `custom`.
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
    /// Storage type.
    #[serde(rename = "type")]
    pub metafield_type: MetafieldType,
    /// String-serialized value.
    pub value: String,
}

impl Metafield {
    /// `namespace.key`, the identity of a metafield within one owner.
    #[must_use]
    pub fn key_path(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

/// A metafield as read from an API response, where any part may be absent.
///
/// The type is kept as a string because the target may hold types outside
/// [`MetafieldType`]; those still have to survive a merge untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetafield {
    /// Namespace.
    pub namespace: Option<String>,
    /// Key.
    pub key: Option<String>,
    /// Storage type name.
    #[serde(rename = "type")]
    pub metafield_type: Option<String>,
    /// Serialized value.
    pub value: Option<String>,
}

impl RawMetafield {
    /// The `(namespace.key, type, value)` triple when every part is present.
    #[must_use]
    pub fn complete(&self) -> Option<(String, &str, &str)> {
        let namespace = self.namespace.as_deref().filter(|s| !s.is_empty())?;
        let key = self.key.as_deref().filter(|s| !s.is_empty())?;
        let metafield_type = self.metafield_type.as_deref().filter(|s| !s.is_empty())?;
        let value = self.value.as_deref()?;
        Some((format!("{namespace}.{key}"), metafield_type, value))
    }
}

impl From<&Metafield> for RawMetafield {
    fn from(m: &Metafield) -> Self {
        Self {
            namespace: Some(m.namespace.clone()),
            key: Some(m.key.clone()),
            metafield_type: Some(m.metafield_type.as_str().to_owned()),
            value: Some(m.value.clone()),
        }
    }
}

/// One entry of a `metafieldsSet` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldInput {
    /// Owning resource gid.
    pub owner_id: String,
    /// Namespace.
    pub namespace: String,
    /// Key.
    pub key: String,
    /// Storage type name.
    #[serde(rename = "type")]
    pub metafield_type: String,
    /// Serialized value.
    pub value: String,
}

impl MetafieldInput {
    /// `namespace.key`.
    #[must_use]
    pub fn key_path(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

/// A spreadsheet column that carries one metafield.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetafieldColumn {
    /// Namespace.
    pub namespace: String,
    /// Key.
    pub key: String,
    /// Declared storage type.
    pub metafield_type: MetafieldType,
    /// Header text, used to read the cell.
    pub column: String,
}

impl MetafieldColumn {
    /// Parse a single header.
    ///
    /// Returns `Ok(None)` for headers that are not metafield columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the header uses the `Metafield:` prefix but is
    /// malformed or names an unknown type.
    pub fn parse_header(header: &str) -> Result<Option<Self>, HeaderError> {
        let trimmed = header.trim();
        if !trimmed.starts_with(HEADER_PREFIX) {
            return Ok(None);
        }

        let caps = HEADER_RE
            .captures(trimmed)
            .ok_or_else(|| HeaderError::Malformed(header.to_owned()))?;
        let (namespace, key, type_name) = match (caps.get(1), caps.get(2), caps.get(3)) {
            (Some(ns), Some(key), Some(t)) => (ns.as_str(), key.as_str(), t.as_str()),
            _ => return Err(HeaderError::Malformed(header.to_owned())),
        };

        let metafield_type =
            MetafieldType::from_type_name(type_name).ok_or_else(|| HeaderError::UnknownType {
                header: header.to_owned(),
                type_name: type_name.to_owned(),
            })?;

        Ok(Some(Self {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
            metafield_type,
            column: header.to_owned(),
        }))
    }

    /// Parse every metafield column out of a header row.
    ///
    /// # Errors
    ///
    /// Returns the first malformed header, unknown type or duplicate
    /// `namespace.key`.
    pub fn parse_headers<'a, I>(headers: I) -> Result<Vec<Self>, HeaderError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();

        for header in headers {
            if let Some(column) = Self::parse_header(header)? {
                if !seen.insert(column.key_path()) {
                    return Err(HeaderError::Duplicate(column.key_path()));
                }
                columns.push(column);
            }
        }

        Ok(columns)
    }

    /// `namespace.key`.
    #[must_use]
    pub fn key_path(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let col =
            MetafieldColumn::parse_header("Metafield: custom.care_guide [multi_line_text_field]")
                .unwrap()
                .unwrap();
        assert_eq!(col.namespace, "custom");
        assert_eq!(col.key, "care_guide");
        assert_eq!(col.metafield_type, MetafieldType::MultiLineTextField);
        assert_eq!(col.column, "Metafield: custom.care_guide [multi_line_text_field]");
    }

    #[test]
    fn test_parse_header_list_type() {
        let col = MetafieldColumn::parse_header("Metafield: specs.related [list.product_reference]")
            .unwrap()
            .unwrap();
        assert!(col.metafield_type.is_list());
    }

    #[test]
    fn test_non_metafield_headers_are_ignored() {
        assert_eq!(MetafieldColumn::parse_header("Title").unwrap(), None);
        assert_eq!(MetafieldColumn::parse_header("Handle").unwrap(), None);
    }

    #[test]
    fn test_malformed_and_unknown_type() {
        assert!(matches!(
            MetafieldColumn::parse_header("Metafield: custom [boolean]"),
            Err(HeaderError::Malformed(_))
        ));
        assert!(matches!(
            MetafieldColumn::parse_header("Metafield: custom.flag [bool]"),
            Err(HeaderError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_parse_headers_rejects_duplicates() {
        let headers = [
            "Handle",
            "Metafield: custom.flag [boolean]",
            "Metafield: custom.flag [single_line_text_field]",
        ];
        assert_eq!(
            MetafieldColumn::parse_headers(headers),
            Err(HeaderError::Duplicate("custom.flag".to_owned()))
        );
    }

    #[test]
    fn test_parse_headers_keeps_order() {
        let headers = [
            "Metafield: a.one [boolean]",
            "Title",
            "Metafield: b.two [date]",
        ];
        let cols = MetafieldColumn::parse_headers(headers).unwrap();
        let paths: Vec<String> = cols.iter().map(MetafieldColumn::key_path).collect();
        assert_eq!(paths, vec!["a.one", "b.two"]);
    }

    #[test]
    fn test_raw_metafield_complete() {
        let full = RawMetafield {
            namespace: Some("custom".into()),
            key: Some("tier".into()),
            metafield_type: Some("single_line_text_field".into()),
            value: Some(String::new()),
        };
        assert!(full.complete().is_some());

        let missing_type = RawMetafield {
            metafield_type: None,
            ..full.clone()
        };
        assert!(missing_type.complete().is_none());

        let null_value = RawMetafield { value: None, ..full };
        assert!(null_value.complete().is_none());
    }

    #[test]
    fn test_metafield_input_serializes_camel_case() {
        let input = MetafieldInput {
            owner_id: "gid://shopify/Company/1".into(),
            namespace: "custom".into(),
            key: "tier".into(),
            metafield_type: "single_line_text_field".into(),
            value: "Gold".into(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["ownerId"], "gid://shopify/Company/1");
        assert_eq!(json["type"], "single_line_text_field");
    }
}
