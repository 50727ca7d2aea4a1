//! Metafield values and definitions.

use storebridge_core::MetafieldInput;
use tracing::instrument;

use super::queries::{
    MetafieldDefinitionCreate, MetafieldDefinitions, MetafieldsSet, metafield_definition_create,
    metafield_definitions, metafields_set,
};
use super::{AdminClient, check_user_errors, require_payload};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{MetafieldDefinition, MetafieldDefinitionInput, OwnerType};

/// Inputs per `metafieldsSet` call; the API rejects more.
pub const METAFIELDS_SET_CHUNK: usize = 25;

const DEFINITIONS_PAGE_SIZE: i64 = 250;

impl AdminClient {
    /// Write metafields, [`METAFIELDS_SET_CHUNK`] per call.
    ///
    /// # Errors
    ///
    /// Returns the first failing chunk's error. Earlier chunks stay applied.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn set_metafields(&self, inputs: &[MetafieldInput]) -> Result<(), AdminShopifyError> {
        for chunk in inputs.chunks(METAFIELDS_SET_CHUNK) {
            let data = self
                .execute::<MetafieldsSet>(metafields_set::Variables {
                    metafields: chunk.to_vec(),
                })
                .await?;
            let payload = require_payload("metafieldsSet", data.metafields_set)?;
            check_user_errors("metafieldsSet", payload.user_errors)?;
        }
        Ok(())
    }

    /// List every metafield definition for an owner type.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    #[instrument(skip(self))]
    pub async fn metafield_definitions(
        &self,
        owner_type: OwnerType,
    ) -> Result<Vec<MetafieldDefinition>, AdminShopifyError> {
        let mut definitions = Vec::new();
        let mut after = None;

        loop {
            let data = self
                .execute::<MetafieldDefinitions>(metafield_definitions::Variables {
                    owner_type,
                    first: DEFINITIONS_PAGE_SIZE,
                    after: after.take(),
                })
                .await?;
            let page = data.metafield_definitions;
            definitions.extend(page.nodes);
            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        Ok(definitions)
    }

    /// Create a metafield definition. An existing definition is benign.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(
        skip(self, definition),
        fields(namespace = %definition.namespace, key = %definition.key)
    )]
    pub async fn create_metafield_definition(
        &self,
        definition: MetafieldDefinitionInput,
    ) -> Result<(), AdminShopifyError> {
        let data = self
            .execute::<MetafieldDefinitionCreate>(metafield_definition_create::Variables {
                definition,
            })
            .await?;
        let payload =
            require_payload("metafieldDefinitionCreate", data.metafield_definition_create)?;
        check_user_errors("metafieldDefinitionCreate", payload.user_errors)
    }
}
