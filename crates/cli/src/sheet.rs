//! Spreadsheet (CSV) input.

use std::io::Read;
use std::path::Path;

use storebridge_core::{MetafieldColumn, SourceRow};

use crate::error::CliError;

/// A parsed sheet: its header row and its data rows.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Data rows, numbered from 1.
    pub rows: Vec<SourceRow>,
}

impl Sheet {
    /// Read a sheet from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid CSV.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::io(path, e))?;
        let sheet = Self::from_reader(file)?;
        tracing::info!(path = %path.display(), rows = sheet.rows.len(), "sheet loaded");
        Ok(sheet)
    }

    /// Read a sheet from any reader. The first record is the header.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed CSV. Short rows are padded with blanks.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CliError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let cells = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), record.get(i).unwrap_or_default()));
            rows.push(SourceRow::new(index + 1, cells));
        }

        Ok(Self { headers, rows })
    }

    /// Typed metafield columns declared in the header.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or duplicate metafield header.
    pub fn metafield_columns(&self) -> Result<Vec<MetafieldColumn>, CliError> {
        Ok(MetafieldColumn::parse_headers(self.headers.iter().map(String::as_str))?)
    }

    /// The row read from data line `line`.
    #[must_use]
    pub fn row(&self, line: usize) -> Option<&SourceRow> {
        line.checked_sub(1).and_then(|i| self.rows.get(i))
    }
}
