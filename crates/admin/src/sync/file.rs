//! Files: sheet rows uploaded to the target's content library.
//!
//! Unlike every other flow, rows run concurrently: up to
//! `FileSettings::concurrency` pipelines are in flight, and results come
//! back in completion order.

use futures::stream::{self, Stream, StreamExt};
use storebridge_core::{RecordOutcome, SourceRow};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::SyncError;
use crate::config::FileSettings;
use crate::shopify::{AdminClient, FileCreateInput, FileStatus};

/// Sheet columns.
pub mod columns {
    /// Public URL the target downloads from.
    pub const URL: &str = "URL";
    /// Filename; defaults to the URL's last path segment.
    pub const FILENAME: &str = "Filename";
    /// Alt text.
    pub const ALT: &str = "Alt";
    /// `IMAGE`, `VIDEO` or `FILE`.
    pub const CONTENT_TYPE: &str = "Content Type";
}

/// One validated sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    /// Source URL.
    pub url: Url,
    /// Filename used for the duplicate check.
    pub filename: String,
    /// Alt text.
    pub alt: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
}

impl FileRow {
    /// Validate a sheet row.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the URL is missing, unparsable or not
    /// http(s), or no filename can be derived.
    pub fn from_row(row: &SourceRow) -> Result<Self, SyncError> {
        let raw = row
            .get(columns::URL)
            .ok_or_else(|| SyncError::Precondition("missing URL".to_owned()))?;
        let url = Url::parse(raw)
            .map_err(|e| SyncError::Precondition(format!("invalid URL {raw:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::Precondition(format!(
                "unsupported URL scheme {:?}",
                url.scheme()
            )));
        }

        let filename = row
            .get(columns::FILENAME)
            .map(str::to_owned)
            .or_else(|| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
            })
            .ok_or_else(|| SyncError::Precondition(format!("no filename for {raw:?}")))?;

        Ok(Self {
            filename,
            alt: row.get(columns::ALT).map(str::to_owned),
            content_type: row.get(columns::CONTENT_TYPE).map(str::to_ascii_uppercase),
            url,
        })
    }

    fn input(&self) -> FileCreateInput {
        FileCreateInput {
            original_source: self.url.to_string(),
            filename: Some(self.filename.clone()),
            alt: self.alt.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

/// Report key for a row: the filename, else the raw URL.
#[must_use]
pub fn row_key(row: &SourceRow) -> String {
    row.get(columns::FILENAME)
        .or_else(|| row.get(columns::URL))
        .unwrap_or_default()
        .to_owned()
}

/// Upload one file and wait for the target to process it.
///
/// # Errors
///
/// Returns an error if a request fails or the target reports the file as
/// failed. A file still processing after the last poll is reported as
/// created with a reason.
#[instrument(skip(client, file, settings), fields(file = %file.filename))]
pub async fn upload_file(
    client: &AdminClient,
    file: &FileRow,
    settings: FileSettings,
) -> Result<RecordOutcome, SyncError> {
    let mut existing = client.find_files_by_filename(&file.filename).await?;
    if existing.len() == 1
        && let Some(found) = existing.pop()
    {
        return Ok(RecordOutcome::skipped(Some(found.id), "file already exists"));
    }
    if !existing.is_empty() {
        warn!(matches = existing.len(), "several files share this name, uploading anyway");
    }

    let mut record = client.create_file(file.input()).await?;
    let id = record.id.clone();
    info!(file_id = %id, "file created");

    for attempt in 0..settings.poll_attempts {
        if record.file_status.is_terminal() {
            break;
        }
        tokio::time::sleep(settings.poll_interval).await;
        debug!(file_id = %id, attempt, status = ?record.file_status, "polling file status");
        if let Some(current) = client.file_status(&id).await? {
            record = current;
        }
    }

    match record.file_status {
        FileStatus::Ready => Ok(RecordOutcome::created(id)),
        FileStatus::Failed => Err(SyncError::FileProcessing(format!(
            "{id}: {}",
            record.error_summary()
        ))),
        status => {
            let mut outcome = RecordOutcome::created(id);
            outcome.reason = Some(format!(
                "still {status:?} after {} polls",
                settings.poll_attempts
            ));
            Ok(outcome)
        }
    }
}

/// Run every row through [`upload_file`], `settings.concurrency` at a time.
///
/// Items come back in completion order, paired with their source row.
pub fn upload_files(
    client: &AdminClient,
    rows: Vec<SourceRow>,
    settings: FileSettings,
) -> impl Stream<Item = (SourceRow, Result<RecordOutcome, SyncError>)> + '_ {
    stream::iter(rows.into_iter().map(move |row| async move {
        let result = match FileRow::from_row(&row) {
            Ok(file) => upload_file(client, &file, settings).await,
            Err(e) => Err(e),
        };
        (row, result)
    }))
    .buffer_unordered(settings.concurrency.max(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_defaults_to_url_segment() {
        let row = SourceRow::new(
            2,
            [("URL", "https://cdn.example.com/img/logo.png"), ("Content Type", "image")],
        );
        let file = FileRow::from_row(&row).unwrap();
        assert_eq!(file.filename, "logo.png");
        assert_eq!(file.content_type.as_deref(), Some("IMAGE"));
    }

    #[test]
    fn test_rejects_bad_urls() {
        for url in ["", "not a url", "ftp://example.com/a.png"] {
            let row = SourceRow::new(2, [("URL", url)]);
            assert!(matches!(FileRow::from_row(&row), Err(SyncError::Precondition(_))), "{url}");
        }
    }

    #[test]
    fn test_row_key_prefers_filename() {
        let row = SourceRow::new(2, [("URL", "https://x.test/a.png"), ("Filename", "b.png")]);
        assert_eq!(row_key(&row), "b.png");
    }
}
