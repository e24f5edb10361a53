/// Ingestion of uploaded files into an in-memory table collection.
///
/// Delimited text and structured text become real tables; anything else
/// degrades to a single diagnostic table describing the file, so callers
/// always get a collection they can list and select from.

use log::warn;
use serde_json::Value as JsonValue;

use crate::interpreter::{MemTable, TableSet};
use crate::value::{Record, Value};

/// File extensions the host upload surface accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["db", "sqlite", "sqlite3", "csv", "json"];

/// An uploaded file: its original name and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Upload {
            name: name.into(),
            bytes,
        }
    }

    /// The lowercased extension after the final dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    pub fn has_accepted_extension(&self) -> bool {
        match self.extension() {
            Some(ext) => ACCEPTED_EXTENSIONS.contains(&ext.as_str()),
            None => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Build a table collection from an upload, degrading to a diagnostic table
/// when the content cannot be parsed. The result always has at least one
/// table.
pub fn tables_from_upload(upload: &Upload) -> TableSet {
    let parsed = match upload.extension().as_deref() {
        Some("csv") => upload.as_text().and_then(|text| tables_from_csv(&upload.name, text)),
        Some("json") => upload.as_text().and_then(|text| tables_from_json(&upload.name, text)),
        _ => None,
    };

    match parsed {
        Some(tables) if !tables.is_empty() => tables,
        _ => {
            warn!(
                "unrecognized upload '{}' ({} bytes), degrading to diagnostic table",
                upload.name,
                upload.bytes.len()
            );
            diagnostic_tables(upload)
        }
    }
}

/// Parse delimited text: the first non-blank line is the header row, each
/// later non-blank line is one record. Quote characters are stripped, fields
/// are numbers when fully numeric and text otherwise, and a short row fills
/// its remaining columns with empty text. Returns one table named after the
/// file.
pub fn tables_from_csv(file_name: &str, text: &str) -> Option<TableSet> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next()?;
    let columns: Vec<String> = header.split(',').map(|h| unquote(h)).collect();

    let rows: Vec<Record> = lines
        .map(|line| {
            let cells: Vec<Value> = line
                .split(',')
                .map(|cell| Value::parse_scalar(&unquote(cell)))
                .collect();
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let value = cells
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| Value::Text(String::new()));
                    (col.clone(), value)
                })
                .collect()
        })
        .collect();

    let mut tables = TableSet::new();
    tables.insert(table_name_from_file(file_name), MemTable::new(columns, rows));
    Some(tables)
}

/// Parse structured text. An array of objects becomes one table named after
/// the file; an object becomes one table per array-valued key, non-array
/// values skipped. Anything else is unparseable.
pub fn tables_from_json(file_name: &str, text: &str) -> Option<TableSet> {
    let parsed: JsonValue = serde_json::from_str(text).ok()?;

    match parsed {
        JsonValue::Array(items) => {
            let table = table_from_items(&items)?;
            let mut tables = TableSet::new();
            tables.insert(table_name_from_file(file_name), table);
            Some(tables)
        }
        JsonValue::Object(map) => {
            let mut tables = TableSet::new();
            for (key, value) in map {
                if let JsonValue::Array(items) = value {
                    if let Some(table) = table_from_items(&items) {
                        tables.insert(key, table);
                    }
                }
            }
            Some(tables)
        }
        _ => None,
    }
}

/// Column order comes from the first object's keys; later objects may add
/// keys (kept in the record, not displayed) or miss keys (absent, shown as
/// null). Non-object elements are skipped.
fn table_from_items(items: &[JsonValue]) -> Option<MemTable> {
    let first = items.first()?.as_object()?;
    let columns: Vec<String> = first.keys().cloned().collect();

    let rows: Vec<Record> = items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect()
        })
        .collect();

    Some(MemTable::new(columns, rows))
}

/// File name with its extension stripped and every character outside
/// `[A-Za-z0-9_]` replaced by an underscore.
fn table_name_from_file(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "table".to_string()
    } else {
        sanitized
    }
}

fn unquote(field: &str) -> String {
    field.trim().replace('"', "")
}

fn diagnostic_tables(upload: &Upload) -> TableSet {
    let columns = vec!["property".to_string(), "value".to_string()];
    let details = [
        ("filename", Value::Text(upload.name.clone())),
        ("size_bytes", Value::Int(upload.bytes.len() as i64)),
        (
            "note",
            Value::Text("file format not recognized; showing file details instead".to_string()),
        ),
    ];
    let rows = details
        .iter()
        .map(|(property, value)| {
            let mut row = Record::new();
            row.insert("property".to_string(), Value::Text(property.to_string()));
            row.insert("value".to_string(), value.clone());
            row
        })
        .collect();

    let mut tables = TableSet::new();
    tables.insert("uploaded_file_info", MemTable::new(columns, rows));
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_upload() {
        let text = "id,category,amount\n1,\"News\",10.5\n2,Tech,3\n\n3,News,\n";
        let tables = tables_from_csv("report-2024.csv", text).unwrap();

        assert_eq!(tables.names(), vec!["report_2024"]);
        let table = tables.get("report_2024").unwrap();
        assert_eq!(table.columns, vec!["id", "category", "amount"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(table.rows[0].get("category"), Some(&Value::Text("News".to_string())));
        assert_eq!(table.rows[0].get("amount"), Some(&Value::Float(10.5)));
        assert_eq!(table.rows[1].get("amount"), Some(&Value::Int(3)));
        // Trailing empty field stays text, not a number
        assert_eq!(table.rows[2].get("amount"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn test_csv_short_rows_fill_with_empty_text() {
        let text = "a,b,c\n1,2\n";
        let tables = tables_from_csv("x.csv", text).unwrap();
        let table = tables.get("x").unwrap();
        assert_eq!(table.rows[0].get("c"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn test_json_array_upload() {
        let text = r#"[{"id": 1, "x": 5}, {"id": 2, "x": 7}]"#;
        let tables = tables_from_json("My Data.json", text).unwrap();

        assert_eq!(tables.names(), vec!["My_Data"]);
        let table = tables.get("My_Data").unwrap();
        assert_eq!(table.columns, vec!["id", "x"]);
        assert_eq!(table.rows[1].get("x"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_json_object_of_arrays_upload() {
        let text = r#"{
            "episodes": [{"id": 1, "title": "Pilot"}],
            "meta": "ignored",
            "hosts": [{"name": "Sam"}]
        }"#;
        let tables = tables_from_json("backup.json", text).unwrap();

        assert_eq!(tables.names(), vec!["episodes", "hosts"]);
        assert_eq!(
            tables.get("episodes").unwrap().rows[0].get("title"),
            Some(&Value::Text("Pilot".to_string()))
        );
    }

    #[test]
    fn test_json_scalar_is_unparseable() {
        assert!(tables_from_json("x.json", "42").is_none());
        assert!(tables_from_json("x.json", "not json").is_none());
    }

    #[test]
    fn test_unrecognized_upload_degrades_to_diagnostic_table() {
        let upload = Upload::new("notes.txt", b"just some text".to_vec());
        let tables = tables_from_upload(&upload);

        assert_eq!(tables.names(), vec!["uploaded_file_info"]);
        let table = tables.get("uploaded_file_info").unwrap();
        assert_eq!(table.columns, vec!["property", "value"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.rows[0].get("value"),
            Some(&Value::Text("notes.txt".to_string()))
        );
        assert_eq!(table.rows[1].get("value"), Some(&Value::Int(14)));
    }

    #[test]
    fn test_binary_csv_degrades_to_diagnostic_table() {
        let upload = Upload::new("broken.csv", vec![0xff, 0xfe, 0x00]);
        let tables = tables_from_upload(&upload);
        assert_eq!(tables.names(), vec!["uploaded_file_info"]);
    }

    #[test]
    fn test_extension_screening() {
        assert!(Upload::new("a.db", Vec::new()).has_accepted_extension());
        assert!(Upload::new("a.SQLITE3", Vec::new()).has_accepted_extension());
        assert!(Upload::new("a.csv", Vec::new()).has_accepted_extension());
        assert!(!Upload::new("a.txt", Vec::new()).has_accepted_extension());
        assert!(!Upload::new("archive", Vec::new()).has_accepted_extension());
        assert!(!Upload::new("trailing.", Vec::new()).has_accepted_extension());
    }

    #[test]
    fn test_table_name_sanitization() {
        assert_eq!(table_name_from_file("flask_app.db"), "flask_app");
        assert_eq!(table_name_from_file("my data (1).csv"), "my_data__1_");
        assert_eq!(table_name_from_file("data.backup.json"), "data_backup");
        assert_eq!(table_name_from_file(".csv"), "table");
    }
}
