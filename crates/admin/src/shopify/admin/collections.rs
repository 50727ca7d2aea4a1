//! Collection operations.

use storebridge_core::matching::{CandidateSource, MatchKey};
use tracing::instrument;

use super::queries::{
    CollectionAddProductsV2, CollectionCreate, CollectionReorderProducts, CollectionUpdate,
    FindCollections, SearchVariables, collection_add_products_v2, collection_create,
    collection_reorder_products, collection_update,
};
use super::{
    AdminClient, SEARCH_PAGE_SIZE, check_user_errors, require_entity, require_payload, search_term,
};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{CollectionInput, CollectionRecord, MoveInput};

/// Products per `collectionAddProductsV2` call.
pub const ADD_PRODUCTS_CHUNK: usize = 250;

/// Moves per `collectionReorderProducts` call.
const REORDER_CHUNK: usize = 250;

impl AdminClient {
    /// Find collections by exact handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_collections_by_handle(
        &self,
        handle: &str,
    ) -> Result<Vec<CollectionRecord>, AdminShopifyError> {
        let data = self
            .execute::<FindCollections>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term("handle", handle),
            ))
            .await?;
        let wanted = handle.trim();
        Ok(data
            .collections
            .nodes
            .into_iter()
            .filter(|c| c.handle.eq_ignore_ascii_case(wanted))
            .collect())
    }

    /// Create a collection. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(handle = ?input.handle))]
    pub async fn create_collection(
        &self,
        input: CollectionInput,
    ) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CollectionCreate>(collection_create::Variables { input })
            .await?;
        let payload = require_payload("collectionCreate", data.collection_create)?;
        check_user_errors("collectionCreate", payload.user_errors)?;
        Ok(require_entity("collection", payload.collection)?.id)
    }

    /// Update a collection. `input.id` must be set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(collection_id = ?input.id))]
    pub async fn update_collection(
        &self,
        input: CollectionInput,
    ) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<CollectionUpdate>(collection_update::Variables { input })
            .await?;
        let payload = require_payload("collectionUpdate", data.collection_update)?;
        check_user_errors("collectionUpdate", payload.user_errors)?;
        Ok(require_entity("collection", payload.collection)?.id)
    }

    /// Add products to a manual collection, [`ADD_PRODUCTS_CHUNK`] at a time.
    ///
    /// # Errors
    ///
    /// Returns the first failing chunk's error. Earlier chunks stay applied.
    #[instrument(
        skip(self, product_ids),
        fields(collection_id = %collection_id, products = product_ids.len())
    )]
    pub async fn add_collection_products(
        &self,
        collection_id: &str,
        product_ids: &[String],
    ) -> Result<(), AdminShopifyError> {
        for chunk in product_ids.chunks(ADD_PRODUCTS_CHUNK) {
            let data = self
                .execute::<CollectionAddProductsV2>(collection_add_products_v2::Variables {
                    id: collection_id.to_string(),
                    product_ids: chunk.to_vec(),
                })
                .await?;
            let payload =
                require_payload("collectionAddProductsV2", data.collection_add_products_v2)?;
            check_user_errors("collectionAddProductsV2", payload.user_errors)?;
        }
        Ok(())
    }

    /// Move products to explicit positions in a manually sorted collection.
    ///
    /// # Errors
    ///
    /// Returns the first failing chunk's error.
    #[instrument(skip(self, moves), fields(collection_id = %collection_id, moves = moves.len()))]
    pub async fn reorder_collection_products(
        &self,
        collection_id: &str,
        moves: &[MoveInput],
    ) -> Result<(), AdminShopifyError> {
        for chunk in moves.chunks(REORDER_CHUNK) {
            let data = self
                .execute::<CollectionReorderProducts>(collection_reorder_products::Variables {
                    id: collection_id.to_string(),
                    moves: chunk.to_vec(),
                })
                .await?;
            let payload =
                require_payload("collectionReorderProducts", data.collection_reorder_products)?;
            check_user_errors("collectionReorderProducts", payload.user_errors)?;
        }
        Ok(())
    }
}

impl CandidateSource<CollectionRecord> for AdminClient {
    type Error = AdminShopifyError;

    async fn candidates(&self, key: &MatchKey) -> Result<Vec<CollectionRecord>, Self::Error> {
        match key {
            MatchKey::Handle(handle) => self.find_collections_by_handle(handle).await,
            _ => Ok(Vec::new()),
        }
    }
}
