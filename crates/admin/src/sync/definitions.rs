//! Metafield definitions for a sheet's typed metafield columns.

use std::collections::HashMap;

use storebridge_core::MetafieldColumn;
use tracing::{error, info, instrument, warn};

use crate::shopify::{AdminClient, AdminShopifyError, MetafieldDefinitionInput, OwnerType};

/// What [`ensure_definitions`] found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionReport {
    /// Columns whose definition already existed with the same type.
    pub existing: usize,
    /// Definitions created.
    pub created: usize,
    /// `namespace.key` of definitions whose type differs from the column's.
    pub mismatched: Vec<String>,
    /// `namespace.key` of definitions that could not be created.
    pub failed: Vec<String>,
}

/// `loyalty_points` to `Loyalty points`.
fn display_name(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Make sure every column has a definition on `owner_type`.
///
/// An existing definition with another type is logged and left alone; the
/// column is still written with its declared type. Creation failures are
/// logged and reported, not returned.
///
/// # Errors
///
/// Returns an error if the existing definitions cannot be listed.
#[instrument(skip(client, columns), fields(owner = ?owner_type, columns = columns.len()))]
pub async fn ensure_definitions(
    client: &AdminClient,
    owner_type: OwnerType,
    columns: &[MetafieldColumn],
) -> Result<DefinitionReport, AdminShopifyError> {
    let mut report = DefinitionReport::default();
    if columns.is_empty() {
        return Ok(report);
    }

    let existing: HashMap<String, String> = client
        .metafield_definitions(owner_type)
        .await?
        .into_iter()
        .map(|d| (d.key_path(), d.type_name().to_owned()))
        .collect();

    for column in columns {
        let key = column.key_path();
        let declared = column.metafield_type.as_str();
        match existing.get(&key) {
            Some(current) if current == declared => report.existing += 1,
            Some(current) => {
                warn!(
                    key = %key,
                    definition_type = %current,
                    column_type = declared,
                    "definition type differs, not coercing"
                );
                report.mismatched.push(key);
            }
            None => {
                let input = MetafieldDefinitionInput {
                    name: display_name(&column.key),
                    namespace: column.namespace.clone(),
                    key: column.key.clone(),
                    definition_type: declared.to_owned(),
                    owner_type,
                };
                match client.create_metafield_definition(input).await {
                    Ok(()) => {
                        info!(key = %key, definition_type = declared, "definition created");
                        report.created += 1;
                    }
                    Err(e) => {
                        error!(key = %key, error = %e, "definition create failed");
                        report.failed.push(key);
                    }
                }
            }
        }
    }

    Ok(report)
}
