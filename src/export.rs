/// CSV and snapshot export.
///
/// CSV export renders the loaded table without the internal `id` column,
/// showing month numbers as their English abbreviations. Snapshot export
/// replays pending transcript edits into the live engine and then serializes
/// it, so the downloaded image carries the edits. Both attach a filesystem
/// safe timestamp to their suggested filename.

use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

use crate::engine::QueryExecutor;
use crate::error::EngineError;
use crate::overlay::ChangeOverlay;
use crate::value::{Record, Value};

/// Prefix of the suggested CSV download filename.
pub const CSV_FILENAME_PREFIX: &str = "podcast_data_";

/// Prefix of the suggested snapshot download filename.
pub const SNAPSHOT_FILENAME_PREFIX: &str = "podcast_db_backup_";

/// Statement replayed once per pending edit before a snapshot is taken.
pub const REPLAY_STATEMENT: &str =
    "UPDATE podcasts SET transcript = ?, status = ? WHERE id = ?";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ============================================================================
// CSV
// ============================================================================

/// Render a month number as its English abbreviation. Values outside 1..=12,
/// fractional floats, and non-numeric text pass through in display form.
///
/// # Examples
///
/// ```
/// use podgrid::{month_abbrev, Value};
///
/// assert_eq!(month_abbrev(&Value::Int(3)), "Mar");
/// assert_eq!(month_abbrev(&Value::Text("07".to_string())), "Jul");
/// assert_eq!(month_abbrev(&Value::Text("March".to_string())), "March");
/// ```
pub fn month_abbrev(value: &Value) -> String {
    let number = match value {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::Text(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if (1..=12).contains(&n) => MONTHS[(n - 1) as usize].to_string(),
        _ => value.to_display(),
    }
}

/// Render records as CSV text in the given column order, minus the `id`
/// column. Header names are joined as-is; data cells containing commas,
/// quotes, or newlines are quoted with doubled inner quotes. No trailing
/// newline.
pub fn to_csv(records: &[Record], columns: &[String]) -> String {
    let visible: Vec<&String> = columns
        .iter()
        .filter(|column| column.as_str() != "id")
        .collect();

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        visible
            .iter()
            .map(|column| column.as_str())
            .collect::<Vec<&str>>()
            .join(","),
    );

    for record in records {
        let cells: Vec<String> = visible
            .iter()
            .map(|column| {
                let value = record.get(column.as_str()).unwrap_or(&Value::Null);
                let text = if column.as_str() == "month" {
                    month_abbrev(value)
                } else {
                    value.to_display()
                };
                escape_csv(&text)
            })
            .collect();
        lines.push(cells.join(","));
    }

    lines.join("\n")
}

fn escape_csv(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// One pending edit the engine rejected during snapshot replay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayReplayFailure {
    pub id: i64,
    pub reason: String,
}

/// A serialized engine image plus any edits that failed to replay into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub skipped: Vec<OverlayReplayFailure>,
}

/// Replay every pending edit into the engine in ascending record id order,
/// then serialize the engine. A rejected edit is skipped and reported instead
/// of aborting the export; only a failed serialization is an error.
pub fn to_snapshot(
    engine: &mut dyn QueryExecutor,
    overlay: &ChangeOverlay,
) -> Result<Snapshot, EngineError> {
    let mut skipped = Vec::new();

    for id in overlay.ids() {
        let entry = match overlay.get(id) {
            Some(entry) => entry,
            None => continue,
        };
        let status = entry
            .status
            .as_ref()
            .map(|text| Value::Text(text.clone()))
            .unwrap_or(Value::Null);
        let params = [Value::Text(entry.transcript.clone()), status, Value::Int(id)];

        if let Err(err) = engine.run(REPLAY_STATEMENT, &params) {
            warn!("snapshot: skipping change for record {}: {}", id, err);
            skipped.push(OverlayReplayFailure {
                id,
                reason: err.to_string(),
            });
        }
    }

    let bytes = engine.export()?;
    Ok(Snapshot { bytes, skipped })
}

// ============================================================================
// Timestamps
// ============================================================================

/// Milliseconds since the Unix epoch, 0 when the system clock is unreadable.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Render a millisecond timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_timestamp(ms: i64) -> String {
    let (year, month, day, hour, minute, second, millisecond) = datetime_from_ms(ms);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year, month, day, hour, minute, second, millisecond
    )
}

/// Render a millisecond timestamp with `-` in place of `:`, so it is safe in
/// filenames on any platform.
pub fn filename_timestamp(ms: i64) -> String {
    let (year, month, day, hour, minute, second, _) = datetime_from_ms(ms);
    format!(
        "{:04}-{:02}-{:02}T{:02}-{:02}-{:02}",
        year, month, day, hour, minute, second
    )
}

pub fn csv_filename(ms: i64) -> String {
    format!("{}{}.csv", CSV_FILENAME_PREFIX, filename_timestamp(ms))
}

pub fn snapshot_filename(ms: i64) -> String {
    format!("{}{}.db", SNAPSHOT_FILENAME_PREFIX, filename_timestamp(ms))
}

/// Split milliseconds since epoch into calendar and clock fields.
fn datetime_from_ms(ms: i64) -> (i32, u32, u32, u32, u32, u32, u32) {
    let ms_per_day: i64 = 24 * 60 * 60 * 1000;
    // Euclidean division keeps the remainder non-negative; truncating
    // division would land pre-epoch timestamps on the wrong day
    let days = ms.div_euclid(ms_per_day) as i32;
    let remaining = ms.rem_euclid(ms_per_day);

    let (year, month, day) = ymd_from_days(days);

    let hour = (remaining / (60 * 60 * 1000)) as u32;
    let minute = ((remaining % (60 * 60 * 1000)) / (60 * 1000)) as u32;
    let second = ((remaining % (60 * 1000)) / 1000) as u32;
    let millisecond = (remaining % 1000) as u32;

    (year, month, day, hour, minute, second, millisecond)
}

/// Convert days since the Unix epoch to (year, month, day).
fn ymd_from_days(days: i32) -> (i32, u32, u32) {
    // Algorithm from https://howardhinnant.github.io/date_algorithms.html
    let z = days + 719468;
    let era = if z >= 0 { z / 146097 } else { (z - 146096) / 146097 };
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = (yoe as i32) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResultSet;
    use crate::overlay::ChangeEntry;

    fn report(id: i64, month: i64, name: &str) -> Record {
        let mut row = Record::new();
        row.insert("id".to_string(), Value::Int(id));
        row.insert("month".to_string(), Value::Int(month));
        row.insert("report_name".to_string(), Value::Text(name.to_string()));
        row
    }

    fn columns() -> Vec<String> {
        vec![
            "id".to_string(),
            "month".to_string(),
            "report_name".to_string(),
        ]
    }

    #[test]
    fn test_csv_has_one_line_per_record_plus_header() {
        let records = vec![report(1, 1, "a"), report(2, 2, "b"), report(3, 3, "c")];
        let csv = to_csv(&records, &columns());
        assert_eq!(csv.lines().count(), 4);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_csv_excludes_id_column() {
        let records = vec![report(42, 5, "hidden id")];
        let csv = to_csv(&records, &columns());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("month,report_name"));
        assert_eq!(lines.next(), Some("May,hidden id"));
    }

    #[test]
    fn test_csv_renders_missing_fields_as_empty() {
        let mut row = Record::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("month".to_string(), Value::Int(2));
        // report_name deliberately absent
        let csv = to_csv(&[row], &columns());
        assert_eq!(csv.lines().nth(1), Some("Feb,"));
    }

    #[test]
    fn test_csv_quotes_cells_with_special_characters() {
        let mut row = Record::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("month".to_string(), Value::Int(1));
        row.insert(
            "report_name".to_string(),
            Value::Text("one, \"two\"\nthree".to_string()),
        );
        let csv = to_csv(&[row], &columns());
        assert_eq!(csv, "month,report_name\nJan,\"one, \"\"two\"\"\nthree\"");
    }

    #[test]
    fn test_month_abbreviations() {
        assert_eq!(month_abbrev(&Value::Int(1)), "Jan");
        assert_eq!(month_abbrev(&Value::Int(12)), "Dec");
        assert_eq!(month_abbrev(&Value::Int(0)), "0");
        assert_eq!(month_abbrev(&Value::Int(13)), "13");
        assert_eq!(month_abbrev(&Value::Float(3.0)), "Mar");
        assert_eq!(month_abbrev(&Value::Float(3.7)), "3.7");
        assert_eq!(month_abbrev(&Value::Text("07".to_string())), "Jul");
        assert_eq!(month_abbrev(&Value::Text("March".to_string())), "March");
        assert_eq!(month_abbrev(&Value::Null), "");
    }

    #[test]
    fn test_iso_timestamp_at_epoch() {
        assert_eq!(iso_timestamp(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_iso_timestamp_known_instant() {
        assert_eq!(iso_timestamp(1_700_000_000_000), "2023-11-14T22:13:20.000Z");
        assert_eq!(iso_timestamp(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn test_filename_timestamp_has_no_colons() {
        let stamp = filename_timestamp(1_700_000_000_000);
        assert_eq!(stamp, "2023-11-14T22-13-20");
        assert!(!stamp.contains(':'));
    }

    #[test]
    fn test_export_filenames() {
        assert_eq!(csv_filename(0), "podcast_data_1970-01-01T00-00-00.csv");
        assert_eq!(
            snapshot_filename(0),
            "podcast_db_backup_1970-01-01T00-00-00.db"
        );
    }

    struct RecordingEngine {
        statements: Vec<(String, Vec<Value>)>,
        reject_id: Option<i64>,
        export_fails: bool,
    }

    impl RecordingEngine {
        fn new() -> Self {
            RecordingEngine {
                statements: Vec::new(),
                reject_id: None,
                export_fails: false,
            }
        }
    }

    impl QueryExecutor for RecordingEngine {
        fn execute(&self, _sql: &str) -> Result<ResultSet, EngineError> {
            Ok(ResultSet::empty())
        }

        fn run(&mut self, sql: &str, params: &[Value]) -> Result<(), EngineError> {
            if self.reject_id.map(Value::Int).as_ref() == params.last() {
                return Err(EngineError::ExecutionError("constraint failed".to_string()));
            }
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(())
        }

        fn export(&self) -> Result<Vec<u8>, EngineError> {
            if self.export_fails {
                Err(EngineError::ExecutionError("serialize failed".to_string()))
            } else {
                Ok(vec![0xde, 0xad])
            }
        }
    }

    fn overlay_with_two_edits() -> ChangeOverlay {
        let mut overlay = ChangeOverlay::new();
        overlay.record(
            9,
            ChangeEntry {
                transcript: "later".to_string(),
                status: None,
                timestamp: iso_timestamp(0),
            },
        );
        overlay.record(
            2,
            ChangeEntry {
                transcript: "earlier".to_string(),
                status: Some("Completed".to_string()),
                timestamp: iso_timestamp(0),
            },
        );
        overlay
    }

    #[test]
    fn test_snapshot_replays_changes_in_id_order() {
        let mut engine = RecordingEngine::new();
        let snapshot = to_snapshot(&mut engine, &overlay_with_two_edits()).unwrap();

        assert_eq!(snapshot.bytes, vec![0xde, 0xad]);
        assert!(snapshot.skipped.is_empty());
        assert_eq!(engine.statements.len(), 2);
        assert_eq!(engine.statements[0].0, REPLAY_STATEMENT);
        assert_eq!(
            engine.statements[0].1,
            vec![
                Value::Text("earlier".to_string()),
                Value::Text("Completed".to_string()),
                Value::Int(2)
            ]
        );
        // Entry without a stored status replays a null status
        assert_eq!(
            engine.statements[1].1,
            vec![Value::Text("later".to_string()), Value::Null, Value::Int(9)]
        );
    }

    #[test]
    fn test_snapshot_skips_rejected_changes() {
        let mut engine = RecordingEngine::new();
        engine.reject_id = Some(2);
        let snapshot = to_snapshot(&mut engine, &overlay_with_two_edits()).unwrap();

        assert_eq!(snapshot.skipped.len(), 1);
        assert_eq!(snapshot.skipped[0].id, 2);
        assert!(snapshot.skipped[0].reason.contains("constraint failed"));
        // The other edit still made it in
        assert_eq!(engine.statements.len(), 1);
        assert_eq!(snapshot.bytes, vec![0xde, 0xad]);
    }

    #[test]
    fn test_snapshot_fails_when_serialization_fails() {
        let mut engine = RecordingEngine::new();
        engine.export_fails = true;
        let result = to_snapshot(&mut engine, &ChangeOverlay::new());
        assert!(matches!(result, Err(EngineError::ExecutionError(_))));
    }
}
