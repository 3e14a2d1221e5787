use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use thiserror::Error;

use crate::permissions::AggregatedUserPermission;

/// Column order of the output file.
pub const HEADER: [&str; 8] = [
    "id",
    "username",
    "allowCreate",
    "allowDelete",
    "allowEdit",
    "allowRead",
    "modifyAllRecords",
    "viewAllRecords",
];

#[derive(Debug, Error)]
pub enum ExportError {
    /// Target exists and overwriting was not requested.
    #[error("{} already exists", .0.display())]
    FileExists(PathBuf),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `rows` to `path` with a header row. Refuses to replace an existing
/// file unless `force` is set. Returns the number of data rows written.
pub fn write_csv(
    path: &Path,
    rows: &[AggregatedUserPermission],
    force: bool,
) -> Result<usize, ExportError> {
    if path.exists() && !force {
        return Err(ExportError::FileExists(path.to_path_buf()));
    }

    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, allow_read: bool) -> AggregatedUserPermission {
        AggregatedUserPermission {
            id: id.to_string(),
            username: format!("{}@example.com", id),
            allow_create: false,
            allow_delete: false,
            allow_edit: false,
            allow_read,
            modify_all_records: false,
            view_all_records: false,
        }
    }

    #[test]
    fn test_header_matches_row_fields() {
        let value = serde_json::to_value(row("005A", true)).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let mut header = HEADER.to_vec();
        header.sort();
        let mut keys = keys;
        keys.sort();
        assert_eq!(keys, header);
    }

    #[test]
    fn test_writes_header_even_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        assert_eq!(write_csv(&path, &[], false).unwrap(), 0);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\n", HEADER.join(","))
        );
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "existing").unwrap();

        let err = write_csv(&path, &[row("005A", true)], false).unwrap_err();
        assert!(matches!(err, ExportError::FileExists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");
    }

    #[test]
    fn test_force_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "existing").unwrap();

        let written = write_csv(&path, &[row("005A", true), row("005B", false)], true).unwrap();
        assert_eq!(written, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "005A,005A@example.com,false,false,false,true,false,false");
        assert_eq!(lines[2], "005B,005B@example.com,false,false,false,false,false,false");
    }
}
