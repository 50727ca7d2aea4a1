//! Row grouping: collapse multi-row spreadsheet exports into logical entities.
//!
//! Exports spread one entity over several rows (a collection with one row per
//! product, a discount with one row per eligible customer). [`group_rows`]
//! folds them back together according to a declarative [`MergeSpec`]:
//!
//! - scalar fields: the first non-empty value wins, later rows never overwrite
//! - discriminators: must agree across every row of the group
//! - list fields: concatenated, deduplicated by composite key, optionally
//!   sorted by a position column
//! - metafield columns: single values fill missing only, `list.*` values are
//!   concatenated into a JSON array
//!
//! Grouping is a pure function of its inputs.

use indexmap::IndexMap;
use serde_json::Value;

use crate::types::{Metafield, MetafieldColumn, SourceRow};

/// Separator used to build composite dedupe keys for list items.
const KEY_SEPARATOR: &str = "::";

/// Errors raised for one group.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupingError {
    /// A single-valued field disagrees across rows of the same group.
    #[error(
        "{key}: conflicting values for {field}: {first:?} (line {first_line}) vs {other:?} (line {other_line})"
    )]
    Conflict {
        /// Group key.
        key: String,
        /// Field name.
        field: String,
        /// Value seen first.
        first: String,
        /// Line that supplied `first`.
        first_line: usize,
        /// Disagreeing value.
        other: String,
        /// Line that supplied `other`.
        other_line: usize,
    },
}

/// A list field: one or more columns that together form one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListField {
    /// Field name used to read the list back from a [`MergeGroup`].
    pub name: String,
    /// Columns making up one item, in order.
    pub columns: Vec<String>,
    /// In-cell separator for multi-valued cells (`"a, b, c"`).
    pub separator: Option<char>,
    /// Column holding the sort position.
    pub position_column: Option<String>,
}

impl ListField {
    /// A list built from the given columns.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            separator: None,
            position_column: None,
        }
    }

    /// Split cells on `separator`; the n-th pieces of each column form one item.
    #[must_use]
    pub const fn split_on(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Sort the finalized list by this column.
    #[must_use]
    pub fn positioned(mut self, column: impl Into<String>) -> Self {
        self.position_column = Some(column.into());
        self
    }
}

/// Declares how rows of one entity kind are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSpec {
    scalars: Vec<(String, String)>,
    discriminators: Vec<(String, String)>,
    lists: Vec<ListField>,
    metafields: Vec<MetafieldColumn>,
}

impl MergeSpec {
    /// An empty spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill-missing-only scalar read from `column`.
    #[must_use]
    pub fn scalar(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.scalars.push((field.into(), column.into()));
        self
    }

    /// Single-valued field that must agree across the group.
    #[must_use]
    pub fn discriminator(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.discriminators.push((field.into(), column.into()));
        self
    }

    /// List field.
    #[must_use]
    pub fn list(mut self, list: ListField) -> Self {
        self.lists.push(list);
        self
    }

    /// Metafield columns parsed from the header row.
    #[must_use]
    pub fn metafields(mut self, columns: impl IntoIterator<Item = MetafieldColumn>) -> Self {
        self.metafields.extend(columns);
        self
    }
}

/// One entry of a finalized list field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// One value per declared column, in column order.
    pub values: Vec<String>,
    /// Parsed position, if the list is positioned and the cell was numeric.
    pub position: Option<i64>,
}

impl ListItem {
    /// The first column's value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }

    /// The value of the n-th declared column, `None` when blank.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values
            .get(index)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// The accumulated result of every row sharing one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    /// Grouping key.
    pub key: String,
    /// Source lines folded into this group, in input order.
    pub lines: Vec<usize>,
    scalars: IndexMap<String, String>,
    discriminators: IndexMap<String, String>,
    lists: IndexMap<String, Vec<ListItem>>,
    metafields: Vec<Metafield>,
}

impl MergeGroup {
    /// A scalar field, `None` if no row supplied it.
    #[must_use]
    pub fn scalar(&self, field: &str) -> Option<&str> {
        self.scalars.get(field).map(String::as_str)
    }

    /// A discriminator field, `None` if no row supplied it.
    #[must_use]
    pub fn discriminator(&self, field: &str) -> Option<&str> {
        self.discriminators.get(field).map(String::as_str)
    }

    /// A finalized list field, empty if undeclared or never supplied.
    #[must_use]
    pub fn list(&self, field: &str) -> &[ListItem] {
        self.lists.get(field).map_or(&[], Vec::as_slice)
    }

    /// First-column values of a list field.
    #[must_use]
    pub fn list_values(&self, field: &str) -> Vec<&str> {
        self.list(field).iter().map(ListItem::value).collect()
    }

    /// Metafields in header order.
    #[must_use]
    pub fn metafields(&self) -> &[Metafield] {
        &self.metafields
    }

    /// First source line of the group.
    #[must_use]
    pub fn first_line(&self) -> usize {
        self.lines.first().copied().unwrap_or_default()
    }
}

/// Output of [`group_rows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    /// Groups in first-seen key order.
    pub groups: Vec<Result<MergeGroup, GroupingError>>,
    /// Lines of rows that produced no key.
    pub dropped: Vec<usize>,
}

#[derive(Debug)]
struct Accumulator {
    key: String,
    lines: Vec<usize>,
    scalars: IndexMap<String, String>,
    discriminators: IndexMap<String, (String, usize)>,
    lists: IndexMap<String, IndexMap<String, ListItem>>,
    single_metafields: IndexMap<usize, String>,
    list_metafields: IndexMap<usize, IndexMap<String, Value>>,
    conflict: Option<GroupingError>,
}

impl Accumulator {
    fn new(key: String) -> Self {
        Self {
            key,
            lines: Vec::new(),
            scalars: IndexMap::new(),
            discriminators: IndexMap::new(),
            lists: IndexMap::new(),
            single_metafields: IndexMap::new(),
            list_metafields: IndexMap::new(),
            conflict: None,
        }
    }

    fn absorb(&mut self, row: &SourceRow, spec: &MergeSpec) {
        self.lines.push(row.line);
        if self.conflict.is_some() {
            return;
        }

        for (field, column) in &spec.scalars {
            if let Some(value) = row.get(column) {
                self.scalars
                    .entry(field.clone())
                    .or_insert_with(|| value.to_owned());
            }
        }

        for (field, column) in &spec.discriminators {
            let Some(value) = row.get(column) else {
                continue;
            };
            match self.discriminators.get(field) {
                None => {
                    self.discriminators
                        .insert(field.clone(), (value.to_owned(), row.line));
                }
                Some((first, first_line)) if !same_discriminator(first, value) => {
                    self.conflict = Some(GroupingError::Conflict {
                        key: self.key.clone(),
                        field: field.clone(),
                        first: first.clone(),
                        first_line: *first_line,
                        other: value.to_owned(),
                        other_line: row.line,
                    });
                    return;
                }
                Some(_) => {}
            }
        }

        for list in &spec.lists {
            let items = self.lists.entry(list.name.clone()).or_default();
            for (dedupe_key, item) in list_items(row, list) {
                items.entry(dedupe_key).or_insert(item);
            }
        }

        for (index, column) in spec.metafields.iter().enumerate() {
            let Some(cell) = row.get(&column.column) else {
                continue;
            };
            if column.metafield_type.is_list() {
                let values = self.list_metafields.entry(index).or_default();
                for value in list_metafield_values(cell) {
                    values.entry(value.to_string()).or_insert(value);
                }
            } else {
                self.single_metafields
                    .entry(index)
                    .or_insert_with(|| cell.to_owned());
            }
        }
    }

    fn finish(self, spec: &MergeSpec) -> Result<MergeGroup, GroupingError> {
        if let Some(conflict) = self.conflict {
            return Err(conflict);
        }

        let lists = self
            .lists
            .into_iter()
            .map(|(name, items)| {
                let mut items: Vec<ListItem> = items.into_values().collect();
                let positioned = spec
                    .lists
                    .iter()
                    .any(|l| l.name == name && l.position_column.is_some());
                if positioned {
                    // stable: ties keep insertion order, absent positions last
                    items.sort_by_key(|item| (item.position.is_none(), item.position));
                }
                (name, items)
            })
            .collect();

        let metafields = spec
            .metafields
            .iter()
            .enumerate()
            .filter_map(|(index, column)| {
                let value = if column.metafield_type.is_list() {
                    let values = self.list_metafields.get(&index)?;
                    Value::Array(values.values().cloned().collect()).to_string()
                } else {
                    self.single_metafields.get(&index)?.clone()
                };
                Some(Metafield {
                    namespace: column.namespace.clone(),
                    key: column.key.clone(),
                    metafield_type: column.metafield_type,
                    value,
                })
            })
            .collect();

        Ok(MergeGroup {
            key: self.key,
            lines: self.lines,
            scalars: self.scalars,
            discriminators: self
                .discriminators
                .into_iter()
                .map(|(field, (value, _))| (field, value))
                .collect(),
            lists,
            metafields,
        })
    }
}

fn same_discriminator(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn split_cell(cell: &str, separator: Option<char>) -> Vec<String> {
    match separator {
        Some(sep) => cell.split(sep).map(|s| s.trim().to_owned()).collect(),
        None => vec![cell.trim().to_owned()],
    }
}

/// Items a row contributes to one list, keyed by their composite dedupe key.
fn list_items(row: &SourceRow, list: &ListField) -> Vec<(String, ListItem)> {
    let columns: Vec<Vec<String>> = list
        .columns
        .iter()
        .map(|c| split_cell(row.raw(c), list.separator))
        .collect();
    let positions: Vec<String> = list
        .position_column
        .as_deref()
        .map(|c| split_cell(row.raw(c), list.separator))
        .unwrap_or_default();

    let width = columns.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .filter_map(|i| {
            let values: Vec<String> = columns
                .iter()
                .map(|parts| parts.get(i).cloned().unwrap_or_default())
                .collect();
            if values.iter().all(String::is_empty) {
                return None;
            }
            let position_text = positions.get(i).map_or("", String::as_str);
            let mut dedupe_key = values.join(KEY_SEPARATOR);
            if list.position_column.is_some() {
                dedupe_key.push_str(KEY_SEPARATOR);
                dedupe_key.push_str(position_text);
            }
            let item = ListItem {
                values,
                position: position_text.parse().ok(),
            };
            Some((dedupe_key, item))
        })
        .collect()
}

/// A `list.*` cell is either a JSON array or a single bare value.
fn list_metafield_values(cell: &str) -> Vec<Value> {
    if cell.starts_with('[') {
        if let Ok(Value::Array(values)) = serde_json::from_str::<Value>(cell) {
            return values;
        }
    }
    vec![Value::String(cell.to_owned())]
}

/// Group rows by `key_fn`, merging each group according to `spec`.
///
/// Rows for which `key_fn` returns `None` are dropped and their lines
/// returned in [`Grouping::dropped`]. A discriminator conflict fails only
/// the group it occurs in.
pub fn group_rows<F>(rows: &[SourceRow], key_fn: F, spec: &MergeSpec) -> Grouping
where
    F: Fn(&SourceRow) -> Option<String>,
{
    let mut groups: IndexMap<String, Accumulator> = IndexMap::new();
    let mut dropped = Vec::new();

    for row in rows {
        let Some(key) = key_fn(row).filter(|k| !k.is_empty()) else {
            dropped.push(row.line);
            continue;
        };
        groups
            .entry(key.clone())
            .or_insert_with(|| Accumulator::new(key))
            .absorb(row, spec);
    }

    Grouping {
        groups: groups.into_values().map(|acc| acc.finish(spec)).collect(),
        dropped,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::MetafieldType;

    fn row(line: usize, cells: &[(&str, &str)]) -> SourceRow {
        SourceRow::new(line, cells.iter().copied())
    }

    fn by_handle(row: &SourceRow) -> Option<String> {
        row.get("Handle").map(str::to_lowercase)
    }

    fn collection_spec() -> MergeSpec {
        MergeSpec::new()
            .scalar("title", "Title")
            .discriminator("must_match", "Must Match")
            .list(ListField::new("products", ["Product Handle"]).positioned("Product Position"))
    }

    #[test]
    fn test_grouping_is_repeatable() {
        let rows = vec![
            row(
                1,
                &[
                    ("Handle", "summer"),
                    ("Title", "Summer"),
                    ("Product Handle", "p2"),
                    ("Product Position", "2"),
                ],
            ),
            row(2, &[("Handle", "summer"), ("Product Handle", "p1"), ("Product Position", "1")]),
            row(3, &[("Handle", "winter"), ("Title", "Winter")]),
        ];
        let spec = collection_spec();

        let first = group_rows(&rows, by_handle, &spec);
        let second = group_rows(&rows, by_handle, &spec);
        assert_eq!(first, second);
        assert_eq!(first.groups.len(), 2);
    }

    #[test]
    fn test_scalars_fill_missing_only() {
        let rows = vec![
            row(1, &[("Handle", "summer"), ("Title", "")]),
            row(2, &[("Handle", "summer"), ("Title", "From Row Two")]),
            row(3, &[("Handle", "summer"), ("Title", "From Row Three")]),
        ];
        let grouping = group_rows(&rows, by_handle, &collection_spec());
        let group = grouping.groups[0].as_ref().unwrap();

        assert_eq!(group.scalar("title"), Some("From Row Two"));
        assert_eq!(group.lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_list_dedupe_and_position_sort() {
        let rows = vec![
            row(1, &[("Handle", "c"), ("Product Handle", "p1"), ("Product Position", "1")]),
            row(2, &[("Handle", "c"), ("Product Handle", "p1"), ("Product Position", "1")]),
            row(3, &[("Handle", "c"), ("Product Handle", "p2"), ("Product Position", "2")]),
        ];
        let grouping = group_rows(&rows, by_handle, &collection_spec());
        let group = grouping.groups[0].as_ref().unwrap();

        let items: Vec<(&str, Option<i64>)> = group
            .list("products")
            .iter()
            .map(|i| (i.value(), i.position))
            .collect();
        assert_eq!(items, vec![("p1", Some(1)), ("p2", Some(2))]);
    }

    #[test]
    fn test_absent_positions_sort_last_and_stable() {
        let rows = vec![
            row(1, &[("Handle", "c"), ("Product Handle", "x")]),
            row(2, &[("Handle", "c"), ("Product Handle", "b"), ("Product Position", "2")]),
            row(3, &[("Handle", "c"), ("Product Handle", "a"), ("Product Position", "2")]),
            row(4, &[("Handle", "c"), ("Product Handle", "z"), ("Product Position", "1")]),
        ];
        let grouping = group_rows(&rows, by_handle, &collection_spec());
        let group = grouping.groups[0].as_ref().unwrap();
        assert_eq!(group.list_values("products"), vec!["z", "b", "a", "x"]);
    }

    #[test]
    fn test_discriminator_conflict_fails_only_that_group() {
        let rows = vec![
            row(1, &[("Handle", "a"), ("Must Match", "all")]),
            row(2, &[("Handle", "a"), ("Must Match", " ALL ")]),
            row(3, &[("Handle", "b"), ("Must Match", "all")]),
            row(4, &[("Handle", "b"), ("Must Match", "any")]),
        ];
        let grouping = group_rows(&rows, by_handle, &collection_spec());

        assert!(grouping.groups[0].is_ok());
        let err = grouping.groups[1].as_ref().unwrap_err();
        assert_eq!(
            err,
            &GroupingError::Conflict {
                key: "b".into(),
                field: "must_match".into(),
                first: "all".into(),
                first_line: 3,
                other: "any".into(),
                other_line: 4,
            }
        );
    }

    #[test]
    fn test_rows_without_key_are_dropped() {
        let rows = vec![
            row(1, &[("Handle", "")]),
            row(2, &[("Handle", "a")]),
            row(3, &[("Title", "orphan")]),
        ];
        let grouping = group_rows(&rows, by_handle, &collection_spec());
        assert_eq!(grouping.groups.len(), 1);
        assert_eq!(grouping.dropped, vec![1, 3]);
    }

    #[test]
    fn test_separated_list_cells() {
        let spec = MergeSpec::new().list(ListField::new("tags", ["Tags"]).split_on(','));
        let rows = vec![
            row(1, &[("Handle", "a"), ("Tags", "vip, wholesale")]),
            row(2, &[("Handle", "a"), ("Tags", "wholesale,,east")]),
        ];
        let grouping = group_rows(&rows, by_handle, &spec);
        let group = grouping.groups[0].as_ref().unwrap();
        assert_eq!(group.list_values("tags"), vec!["vip", "wholesale", "east"]);
    }

    #[test]
    fn test_metafields_single_and_list() {
        let columns = MetafieldColumn::parse_headers([
            "Metafield: custom.care [single_line_text_field]",
            "Metafield: custom.related [list.product_reference]",
        ])
        .unwrap();
        let spec = MergeSpec::new().metafields(columns);
        let rows = vec![
            row(
                1,
                &[
                    ("Handle", "a"),
                    ("Metafield: custom.care [single_line_text_field]", "Hand wash"),
                    (
                        "Metafield: custom.related [list.product_reference]",
                        "gid://shopify/Product/1",
                    ),
                ],
            ),
            row(
                2,
                &[
                    ("Handle", "a"),
                    ("Metafield: custom.care [single_line_text_field]", "Dry clean"),
                    (
                        "Metafield: custom.related [list.product_reference]",
                        "[\"gid://shopify/Product/1\",\"gid://shopify/Product/2\"]",
                    ),
                ],
            ),
        ];
        let grouping = group_rows(&rows, by_handle, &spec);
        let group = grouping.groups[0].as_ref().unwrap();
        let metafields = group.metafields();

        assert_eq!(metafields.len(), 2);
        assert_eq!(metafields[0].value, "Hand wash");
        assert_eq!(metafields[1].metafield_type, MetafieldType::ListProductReference);
        assert_eq!(
            metafields[1].value,
            r#"["gid://shopify/Product/1","gid://shopify/Product/2"]"#
        );
    }
}
