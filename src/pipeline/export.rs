//! Tabular export: records → [`ExportTable`] → `.xlsx` workbook.
//!
//! Columns are the union of keys across all records, in first-seen order.
//! When every record carries the same keys in the same order (the normal
//! case, and always with [`crate::config::SchemaMode::Fixed`]) this is the
//! prompt order. A record without a given key gets an empty cell there.
//!
//! The workbook is built in memory and written through a temporary file in
//! the destination directory, then renamed over the target, so an existing
//! file is replaced whole and never left half-written.

use crate::error::ContactsError;
use crate::output::CustomerRecord;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(Cell::Number)
                .unwrap_or_else(|| Cell::Text(n.to_string())),
            Value::String(s) => Cell::Text(s.clone()),
            // Nested values are written as compact JSON text.
            other => Cell::Text(other.to_string()),
        }
    }
}

/// The tabular form of a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    /// Materialise the table from records in order.
    pub fn from_records(records: &[CustomerRecord]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for record in records {
            for key in record.keys() {
                if seen.insert(key) {
                    columns.push(key.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).map(Cell::from).unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `row`, under column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let col = self.columns.iter().position(|c| c == name)?;
        self.rows.get(row)?.get(col)
    }

    /// Render the table as an `.xlsx` workbook held in memory.
    ///
    /// One sheet, a bold header row, then one row per record. An empty table
    /// produces a workbook with a single blank sheet.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();

        for (c, name) in self.columns.iter().enumerate() {
            sheet.write_string_with_format(0, column_index(c)?, name, &header)?;
        }

        for (r, row) in self.rows.iter().enumerate() {
            let r = u32::try_from(r + 1)
                .map_err(|_| XlsxError::ParameterError(format!("row {r} out of range")))?;
            for (c, cell) in row.iter().enumerate() {
                let c = column_index(c)?;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s)?;
                    }
                    Cell::Number(n) => {
                        sheet.write_number(r, c, *n)?;
                    }
                    Cell::Bool(b) => {
                        sheet.write_boolean(r, c, *b)?;
                    }
                }
            }
        }

        workbook.save_to_buffer()
    }
}

fn column_index(c: usize) -> Result<u16, XlsxError> {
    u16::try_from(c).map_err(|_| XlsxError::ParameterError(format!("column {c} out of range")))
}

/// Write `table` to `path`, replacing any existing file.
pub fn write_xlsx(table: &ExportTable, path: &Path) -> Result<(), ContactsError> {
    let export_err = |detail: String| ContactsError::ExportFailed {
        path: path.to_path_buf(),
        detail,
    };

    let bytes = table.to_xlsx_bytes().map_err(|e| export_err(e.to_string()))?;
    debug!("Workbook built: {} bytes", bytes.len());

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| export_err(e.to_string()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| export_err(e.to_string()))?;
    tmp.write_all(&bytes).map_err(|e| export_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| export_err(e.error.to_string()))?;

    info!(
        "Wrote {} rows × {} columns to {}",
        table.row_count(),
        table.columns.len(),
        path.display()
    );
    Ok(())
}

/// Build the table from `records` and write it to `path`.
pub async fn export_records(
    records: &[CustomerRecord],
    path: &Path,
) -> Result<ExportTable, ContactsError> {
    let table = ExportTable::from_records(records);
    let to_write = table.clone();
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_xlsx(&to_write, &target))
        .await
        .map_err(|e| ContactsError::Internal(format!("export task failed: {e}")))??;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> CustomerRecord {
        match value {
            Value::Object(map) => CustomerRecord::from(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn union_of_keys_in_first_seen_order() {
        let records = vec![
            record(json!({"Name": "A", "Email": "a@x.io"})),
            record(json!({"Name": "B", "City": "Oslo"})),
        ];
        let table = ExportTable::from_records(&records);
        assert_eq!(table.columns, vec!["Name", "Email", "City"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "City"), Some(&Cell::Empty));
        assert_eq!(table.cell(1, "Email"), Some(&Cell::Empty));
        assert_eq!(table.cell(1, "City"), Some(&Cell::Text("Oslo".into())));
    }

    #[test]
    fn empty_records_empty_table() {
        let table = ExportTable::from_records(&[]);
        assert!(table.columns.is_empty());
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn cell_conversion() {
        assert_eq!(Cell::from(&json!(null)), Cell::Empty);
        assert_eq!(Cell::from(&json!(true)), Cell::Bool(true));
        assert_eq!(Cell::from(&json!(48.5)), Cell::Number(48.5));
        assert_eq!(Cell::from(&json!("x")), Cell::Text("x".into()));
        assert_eq!(Cell::from(&json!(["a", 1])), Cell::Text("[\"a\",1]".into()));
    }

    #[test]
    fn xlsx_bytes_are_a_zip() {
        let table = ExportTable::from_records(&[record(json!({"Name": "A"}))]);
        let bytes = table.to_xlsx_bytes().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    fn zipped_part(bytes: &[u8], name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut part = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut part)
            .unwrap();
        part
    }

    #[test]
    fn header_row_precedes_record_rows() {
        let table = ExportTable::from_records(&[
            record(json!({"Name": "Alice", "City": "Oslo"})),
            record(json!({"Name": "Bob", "Latitude": 48.5})),
        ]);
        let bytes = table.to_xlsx_bytes().unwrap();

        let strings = zipped_part(&bytes, "xl/sharedStrings.xml");
        let pos = |s: &str| strings.find(s).unwrap_or_else(|| panic!("{s} missing"));
        assert!(pos(">Name<") < pos(">City<"));
        assert!(pos(">City<") < pos(">Latitude<"));
        assert!(pos(">Latitude<") < pos(">Alice<"));

        let sheet = zipped_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<row r="1""#));
        assert!(sheet.contains(r#"<row r="3""#));
        assert!(!sheet.contains(r#"<row r="4""#));
        assert!(sheet.contains("<v>48.5</v>"));
        // Bob has no City, so B3 is never written.
        assert!(sheet.contains(r#"r="A3""#));
        assert!(!sheet.contains(r#"r="B3""#));
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customer_info.xlsx");
        std::fs::write(&path, b"stale contents").unwrap();

        let table = ExportTable::from_records(&[record(json!({"Name": "A"}))]);
        write_xlsx(&table, &path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[..2], b"PK");
        assert_ne!(written, b"stale contents");
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_into_missing_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/customer_info.xlsx");
        write_xlsx(&ExportTable::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_failure_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory already occupies the target path.
        let path = dir.path().join("customer_info.xlsx");
        std::fs::create_dir(&path).unwrap();
        let err = write_xlsx(&ExportTable::default(), &path).unwrap_err();
        assert!(matches!(err, ContactsError::ExportFailed { .. }), "{err}");
    }
}
