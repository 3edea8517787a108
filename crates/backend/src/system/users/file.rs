use std::path::Path;

use super::source::UserSourceError;

/// Read a local CSV credential file.
///
/// Expected header: `role,username,display_name,credential`. Rows may carry
/// fewer fields; those are filtered later by `parse_rows`.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, UserSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            UserSourceError::SourceUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            UserSourceError::SourceUnavailable(format!("malformed {}: {}", path.display(), e))
        })?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_rows_with_short_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "role,username,display_name,credential").unwrap();
        writeln!(file, "ANALISTA,40123456,Ana Quispe,").unwrap();
        writeln!(file, "SUPERVISOR,40999999").unwrap();
        writeln!(file, "lector, 41000000 ,\"Rojas, Luis\",abc").unwrap();

        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["ANALISTA", "40123456", "Ana Quispe", ""]);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[2], vec!["lector", "41000000", "Rojas, Luis", "abc"]);
    }

    #[test]
    fn test_missing_file() {
        let err = read_rows(Path::new("/nonexistent/users.csv")).unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }
}
