//! Company id manifests: one id per line.

use std::path::Path;

use storebridge_core::{Gid, GidError, ResourceKind};

use crate::error::CliError;

/// Parse manifest text.
///
/// Blank lines and `#` comments (whole-line or trailing) are ignored. Bare
/// numbers become company gids. An invalid line is returned as an error
/// next to its 1-based line number so the run can report it and continue.
#[must_use]
pub fn parse(text: &str) -> Vec<Result<Gid, (usize, GidError)>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let id = line.split('#').next().unwrap_or_default().trim();
            (!id.is_empty()).then(|| {
                Gid::from_gid_or_number(id, ResourceKind::Company).map_err(|e| (i + 1, e))
            })
        })
        .collect()
}

/// Read and parse a manifest file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load(path: &Path) -> Result<Vec<Result<Gid, (usize, GidError)>>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    Ok(parse(&text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_blanks_and_numbers() {
        let text = "# wholesale accounts\n\n123\n  gid://shopify/Company/456  # big one\n\nnot-an-id\n";
        let parsed = parse(text);
        assert_eq!(parsed.len(), 3);

        let ids: Vec<&str> = parsed
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(Gid::as_str)
            .collect();
        assert_eq!(ids, ["gid://shopify/Company/123", "gid://shopify/Company/456"]);

        let bad = parsed.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(bad.0, 6);
    }
}
