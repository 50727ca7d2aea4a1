//! CLI error type.

use storebridge_admin::shopify::AdminShopifyError;
use storebridge_admin::{ConfigError, SyncError};
use storebridge_core::HeaderError;
use thiserror::Error;

/// Errors that stop a run before or outside record processing.
///
/// Record-level failures never surface here; they are counted by the run
/// tracker and written to the report.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading an input or writing the report failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The sheet or report is not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A metafield header does not follow the column convention.
    #[error("Sheet header error: {0}")]
    Header(#[from] HeaderError),

    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A run-wide API call failed, e.g. listing metafield definitions.
    #[error("Shopify error: {0}")]
    Api(#[from] AdminShopifyError),

    /// A run-wide precondition failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The command line asks for something that cannot run.
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
