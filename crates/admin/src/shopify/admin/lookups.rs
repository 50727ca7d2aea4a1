//! Natural-key lookups backing the key resolver.

use storebridge_core::Email;
use storebridge_core::matching::MatchKey;
use tracing::instrument;

use super::queries::{FindSegments, SearchVariables};
use super::{AdminClient, SEARCH_PAGE_SIZE, search_term};
use crate::shopify::AdminShopifyError;
use crate::resolve::{Lookup, LookupKind};
use crate::shopify::types::SegmentRecord;

impl AdminClient {
    /// Find customer segments by exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_segments_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<SegmentRecord>, AdminShopifyError> {
        let data = self
            .execute::<FindSegments>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term("name", name),
            ))
            .await?;
        let wanted = name.trim();
        Ok(data
            .segments
            .nodes
            .into_iter()
            .filter(|s| s.name.trim().eq_ignore_ascii_case(wanted))
            .collect())
    }
}

impl Lookup for AdminClient {
    type Error = AdminShopifyError;

    async fn lookup(&self, kind: LookupKind, key: &str) -> Result<Vec<String>, Self::Error> {
        let ids = match kind {
            LookupKind::Product => ids(self.find_products_by_handle(key).await?, |p| p.id),
            LookupKind::Collection => ids(self.find_collections_by_handle(key).await?, |c| c.id),
            LookupKind::Variant => ids(self.find_variants_by_sku(key).await?, |v| v.id),
            LookupKind::Segment => ids(self.find_segments_by_name(key).await?, |s| s.id),
            LookupKind::Customer => match Email::parse(key) {
                Ok(email) => ids(self.find_customers(&MatchKey::Email(email)).await?, |c| c.id),
                Err(_) => Vec::new(),
            },
            LookupKind::Location | LookupKind::Role => Vec::new(),
        };
        Ok(ids)
    }
}

fn ids<T>(records: Vec<T>, id: impl Fn(T) -> String) -> Vec<String> {
    records.into_iter().map(id).collect()
}
