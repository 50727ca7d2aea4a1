//! Incremental CSV run report.
//!
//! Each record becomes one line as soon as it finishes: the record key, the
//! input fields echoed back, then `status`, `reason` and `target_id`. The
//! file is flushed after every line so an interrupted run keeps its report.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use storebridge_core::{RecordOutcome, SourceRow};

use crate::error::CliError;

const OUTCOME_COLUMNS: [&str; 3] = ["status", "reason", "target_id"];

/// Report writer; does nothing when no report was requested.
#[derive(Debug)]
pub struct Report<W: Write = File> {
    writer: Option<csv::Writer<W>>,
    path: PathBuf,
    columns: Vec<String>,
}

impl Report<File> {
    /// Open the report at `path`, or a no-op report when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn open(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Ok(Self {
                writer: None,
                path: PathBuf::new(),
                columns: Vec::new(),
            });
        };
        let file = File::create(path).map_err(|e| CliError::io(path, e))?;
        Ok(Self {
            writer: Some(csv::Writer::from_writer(file)),
            path: path.to_path_buf(),
            columns: Vec::new(),
        })
    }
}

impl<W: Write> Report<W> {
    /// Report into an arbitrary writer.
    pub fn to_writer(inner: W) -> Self {
        Self {
            writer: Some(csv::Writer::from_writer(inner)),
            path: PathBuf::from("<report>"),
            columns: Vec::new(),
        }
    }

    /// Write the header row. `columns` are the input fields echoed per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn begin(&mut self, columns: &[String]) -> Result<(), CliError> {
        self.columns = columns.to_vec();
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let header = std::iter::once("key")
            .chain(columns.iter().map(String::as_str))
            .chain(OUTCOME_COLUMNS);
        writer.write_record(header)?;
        writer.flush().map_err(|e| CliError::io(&self.path, e))
    }

    /// Append one record and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be written.
    pub fn write(
        &mut self,
        key: &str,
        row: Option<&SourceRow>,
        outcome: &RecordOutcome,
    ) -> Result<(), CliError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let reason = outcome.report_reason();
        let fields = self
            .columns
            .iter()
            .map(|c| row.map_or("", |r| r.raw(c)));
        let line = std::iter::once(key)
            .chain(fields)
            .chain([
                outcome.status.as_str(),
                reason.as_str(),
                outcome.target_id.as_deref().unwrap_or_default(),
            ]);
        writer.write_record(line)?;
        writer.flush().map_err(|e| CliError::io(&self.path, e))
    }

    #[cfg(test)]
    fn contents(&self) -> Option<&W> {
        self.writer.as_ref().map(csv::Writer::get_ref)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_echo_input_and_outcome() {
        let mut report = Report::to_writer(Vec::new());
        report.begin(&["Handle".to_owned(), "Title".to_owned()]).unwrap();

        let row = SourceRow::new(1, [("Handle", "tee"), ("Title", "Tee, blue")]);
        report
            .write("tee", Some(&row), &RecordOutcome::created("gid://shopify/Product/1".to_owned()))
            .unwrap();
        let failed =
            RecordOutcome::failed("Precondition failed: new product needs a title".to_owned());
        report.write("mug", None, &failed).unwrap();

        let text = String::from_utf8(report.contents().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "key,Handle,Title,status,reason,target_id",
                "tee,tee,\"Tee, blue\",created,,gid://shopify/Product/1",
                "mug,,,failed,Precondition failed: new product needs a title,",
            ]
        );
    }

    #[test]
    fn test_disabled_report_is_a_no_op() {
        let mut report = Report::open(None).unwrap();
        report.begin(&[]).unwrap();
        report.write("x", None, &RecordOutcome::failed("boom".to_owned())).unwrap();
    }
}
