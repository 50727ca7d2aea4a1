//! Flat spreadsheet row.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One immutable record from a tabular source.
///
/// Column order is preserved so the report writer can echo the input back
/// in the same shape it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    /// 1-based data line (header excluded).
    pub line: usize,
    cells: IndexMap<String, String>,
}

impl SourceRow {
    /// Build a row from `(column, value)` pairs. Values are trimmed.
    #[must_use]
    pub fn new<I, K, V>(line: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        Self {
            line,
            cells: cells
                .into_iter()
                .map(|(k, v)| (k.into(), v.as_ref().trim().to_owned()))
                .collect(),
        }
    }

    /// Non-empty value of a column.
    ///
    /// Missing columns and blank cells both read as `None`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Raw value of a column, blank if absent.
    #[must_use]
    pub fn raw(&self, column: &str) -> &str {
        self.cells.get(column).map_or("", String::as_str)
    }

    /// Column names in source order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// `(column, value)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_treats_blank_as_missing() {
        let row = SourceRow::new(1, [("Handle", "  shirt "), ("Title", "   ")]);
        assert_eq!(row.get("Handle"), Some("shirt"));
        assert_eq!(row.get("Title"), None);
        assert_eq!(row.get("Vendor"), None);
        assert_eq!(row.raw("Title"), "");
    }

    #[test]
    fn test_columns_keep_source_order() {
        let row = SourceRow::new(3, [("b", "1"), ("a", "2"), ("c", "3")]);
        let cols: Vec<&str> = row.columns().collect();
        assert_eq!(cols, vec!["b", "a", "c"]);
    }
}
