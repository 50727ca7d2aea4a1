//! Product and variant operations.

use storebridge_core::matching::{CandidateSource, MatchKey};
use tracing::instrument;

use super::queries::{
    FindProducts, FindVariants, ProductCreate, ProductUpdate, SearchVariables, product_create,
    product_update,
};
use super::{
    AdminClient, SEARCH_PAGE_SIZE, check_user_errors, require_entity, require_payload, search_term,
};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{ProductInput, ProductRecord, VariantRecord};

impl AdminClient {
    /// Find products by exact handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_products_by_handle(
        &self,
        handle: &str,
    ) -> Result<Vec<ProductRecord>, AdminShopifyError> {
        let data = self
            .execute::<FindProducts>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term("handle", handle),
            ))
            .await?;
        let wanted = handle.trim();
        Ok(data
            .products
            .nodes
            .into_iter()
            .filter(|p| p.handle.eq_ignore_ascii_case(wanted))
            .collect())
    }

    /// Find variants by exact SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_variants_by_sku(
        &self,
        sku: &str,
    ) -> Result<Vec<VariantRecord>, AdminShopifyError> {
        let data = self
            .execute::<FindVariants>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term("sku", sku),
            ))
            .await?;
        let wanted = sku.trim();
        Ok(data
            .product_variants
            .nodes
            .into_iter()
            .filter(|v| v.sku.as_deref().map(str::trim) == Some(wanted))
            .collect())
    }

    /// Create a product. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(handle = ?input.handle))]
    pub async fn create_product(&self, input: ProductInput) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<ProductCreate>(product_create::Variables { product: input })
            .await?;
        let payload = require_payload("productCreate", data.product_create)?;
        check_user_errors("productCreate", payload.user_errors)?;
        Ok(require_entity("product", payload.product)?.id)
    }

    /// Update a product. `input.id` must be set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(product_id = ?input.id))]
    pub async fn update_product(&self, input: ProductInput) -> Result<String, AdminShopifyError> {
        let data = self
            .execute::<ProductUpdate>(product_update::Variables { product: input })
            .await?;
        let payload = require_payload("productUpdate", data.product_update)?;
        check_user_errors("productUpdate", payload.user_errors)?;
        Ok(require_entity("product", payload.product)?.id)
    }
}

impl CandidateSource<ProductRecord> for AdminClient {
    type Error = AdminShopifyError;

    async fn candidates(&self, key: &MatchKey) -> Result<Vec<ProductRecord>, Self::Error> {
        match key {
            MatchKey::Handle(handle) => self.find_products_by_handle(handle).await,
            _ => Ok(Vec::new()),
        }
    }
}
