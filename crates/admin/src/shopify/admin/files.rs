//! Content library files.

use tracing::instrument;

use super::queries::{FileCreate, FileStatus, FindFiles, SearchVariables, file_create, file_status};
use super::{AdminClient, SEARCH_PAGE_SIZE, check_user_errors, require_payload, search_term};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{FileCreateInput, FileRecord};

impl AdminClient {
    /// Find files whose filename matches exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_files_by_filename(
        &self,
        filename: &str,
    ) -> Result<Vec<FileRecord>, AdminShopifyError> {
        let data = self
            .execute::<FindFiles>(SearchVariables::new(
                SEARCH_PAGE_SIZE,
                search_term("filename", filename),
            ))
            .await?;
        Ok(data.files.nodes)
    }

    /// Create a file from a remote URL. Processing continues asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, input), fields(source = %input.original_source))]
    pub async fn create_file(
        &self,
        input: FileCreateInput,
    ) -> Result<FileRecord, AdminShopifyError> {
        let data = self
            .execute::<FileCreate>(file_create::Variables { files: vec![input] })
            .await?;
        let payload = require_payload("fileCreate", data.file_create)?;
        check_user_errors("fileCreate", payload.user_errors)?;
        payload
            .files
            .and_then(|files| files.into_iter().next())
            .ok_or_else(|| AdminShopifyError::MissingPayload("files".to_string()))
    }

    /// Current status of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn file_status(&self, id: &str) -> Result<Option<FileRecord>, AdminShopifyError> {
        let data = self
            .execute::<FileStatus>(file_status::Variables { id: id.to_string() })
            .await?;
        Ok(data.node)
    }
}
