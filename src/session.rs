/// One working session over an uploaded database: the live engine, the
/// persisted edit overlay, the materialized record store, and the view state.
///
/// The session owns the loading protocol. It lists the engine's tables,
/// prefers the podcasts table when present, falls back to the first table
/// otherwise, and reapplies pending transcript edits on top of whatever it
/// loaded. Every mutation that can shrink the visible result set snaps the
/// page back into range afterwards.

use log::{debug, info};

use crate::engine::{EngineHandle, QueryExecutor, ResultSet};
use crate::error::{EngineError, StoreError};
use crate::export::{
    csv_filename, now_millis, snapshot_filename, to_csv, to_snapshot, OverlayReplayFailure,
    REPLAY_STATEMENT,
};
use crate::overlay::{ChangeOverlay, Storage};
use crate::pipeline::{self, CurrentPage, FilterOptions, SummaryStats, ViewState};
use crate::store::RecordStore;
use crate::value::{Record, Value};

/// The table the session is built around.
pub const FOCAL_TABLE: &str = "podcasts";

/// Columns requested from the focal table, in render order.
pub const DISPLAY_COLUMNS: [&str; 7] = [
    "id",
    "category",
    "month",
    "year",
    "report_name",
    "status",
    "transcript",
];

const LIST_TABLES_QUERY: &str = "SELECT name FROM sqlite_master WHERE type='table'";

/// What a load produced, for callers that render a status line.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The table that was materialized.
    pub table: String,
    /// Every table the engine reported, in engine order.
    pub all_tables: Vec<String>,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Count of records rewritten from the pending edit overlay.
    pub overlay_applied: usize,
    /// True when the podcasts table was absent and another table was loaded.
    pub focal_missing: bool,
}

/// A rendered CSV download.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// A serialized database download.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotExport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub skipped: Vec<OverlayReplayFailure>,
}

pub struct Session {
    engine: EngineHandle,
    storage: Box<dyn Storage + Send>,
    store: RecordStore,
    overlay: ChangeOverlay,
    state: ViewState,
    loaded_table: Option<String>,
}

impl Session {
    /// Create a session over the given storage, picking up any pending edits
    /// a previous session persisted there.
    pub fn new(storage: Box<dyn Storage + Send>) -> Self {
        let overlay = ChangeOverlay::load(storage.as_ref());
        Session {
            engine: EngineHandle::new(),
            storage,
            store: RecordStore::new(),
            overlay,
            state: ViewState::new(),
            loaded_table: None,
        }
    }

    pub fn attach_engine(&mut self, executor: Box<dyn QueryExecutor + Send>) {
        self.engine.init(executor);
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Materialize a table from the engine and reset the view.
    ///
    /// Prefers the podcasts table with its display columns, retrying with a
    /// bare `SELECT *` when the narrowed query comes back empty. When the
    /// podcasts table is absent the first reported table is loaded instead.
    /// Pending edits are reapplied only over the podcasts table.
    pub fn load(&mut self) -> Result<LoadReport, EngineError> {
        let engine = self.engine.executor()?;

        let listing = engine.execute(LIST_TABLES_QUERY)?;
        let all_tables: Vec<String> = listing
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(|value| value.to_display())
            .collect();
        if all_tables.is_empty() {
            return Err(EngineError::LoadFailure(
                "database contains no tables".to_string(),
            ));
        }

        let focal_missing = !all_tables.iter().any(|name| name == FOCAL_TABLE);
        let target = if focal_missing {
            all_tables[0].clone()
        } else {
            FOCAL_TABLE.to_string()
        };

        let result = if focal_missing {
            engine.execute(&format!("SELECT * FROM {}", target))?
        } else {
            let narrowed = format!("SELECT {} FROM {}", DISPLAY_COLUMNS.join(", "), FOCAL_TABLE);
            let narrowed = engine.execute(&narrowed)?;
            if narrowed.is_empty() {
                engine.execute(&format!("SELECT * FROM {}", FOCAL_TABLE))?
            } else {
                narrowed
            }
        };

        let columns = result.columns.clone();
        self.store.load(columns.clone(), result.to_records());

        let overlay_applied = if target == FOCAL_TABLE {
            self.store.apply_overlay(&self.overlay)
        } else {
            0
        };

        self.state = ViewState::new();
        self.loaded_table = Some(target.clone());
        info!(
            "loaded table {} ({} rows, {} pending edits applied)",
            target,
            self.store.len(),
            overlay_applied
        );

        Ok(LoadReport {
            table: target,
            all_tables,
            rows: self.store.len(),
            columns,
            overlay_applied,
            focal_missing,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn loaded_table(&self) -> Option<&str> {
        self.loaded_table.as_deref()
    }

    /// Run an arbitrary query against the engine, bypassing the store.
    pub fn execute(&self, sql: &str) -> Result<ResultSet, EngineError> {
        self.engine.executor()?.execute(sql)
    }

    // ------------------------------------------------------------------
    // View derivation
    // ------------------------------------------------------------------

    pub fn current_page(&self) -> CurrentPage {
        pipeline::run(&self.store, &self.state)
    }

    pub fn filter_options(&self) -> FilterOptions {
        pipeline::filter_options(&self.store)
    }

    pub fn summary(&self) -> SummaryStats {
        pipeline::summarize(&self.store)
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.state.set_search_term(term);
    }

    pub fn set_filter(&mut self, column: &str, value: &str) {
        self.state.set_filter(column, value);
    }

    pub fn clear_filters(&mut self) {
        self.state.clear_filters();
    }

    pub fn sort_by(&mut self, column: &str) {
        self.state.sort_by(column);
    }

    /// Jump to a page. Out-of-range pages are honored and render empty, so a
    /// caller paging past the end sees exactly what it asked for.
    pub fn set_page(&mut self, page: usize) {
        self.state.set_page(page);
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), StoreError> {
        self.state.set_page_size(size)
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Save a transcript edit: update the store, record it in the overlay,
    /// persist the overlay, and replay it into the live engine when one is
    /// attached. Returns the updated record.
    pub fn commit_transcript(&mut self, id: i64, transcript: &str) -> Result<Record, StoreError> {
        let record = self
            .store
            .commit_edit(id, transcript, now_millis(), &mut self.overlay)?;

        // Replay is best effort; the overlay remains the durable copy
        if let Ok(executor) = self.engine.executor_mut() {
            if let Some(entry) = self.overlay.get(id) {
                let status = entry
                    .status
                    .as_ref()
                    .map(|text| Value::Text(text.clone()))
                    .unwrap_or(Value::Null);
                let params = [
                    Value::Text(entry.transcript.clone()),
                    status,
                    Value::Int(id),
                ];
                if let Err(err) = executor.run(REPLAY_STATEMENT, &params) {
                    debug!("engine did not accept the edit for record {}: {}", id, err);
                }
            }
        }

        self.overlay.persist(self.storage.as_mut());
        self.clamp_page();
        Ok(record)
    }

    pub fn pending_edits(&self) -> usize {
        self.overlay.len()
    }

    /// Discard every pending edit and reload the table from the engine.
    pub fn clear_changes(&mut self) -> Result<LoadReport, EngineError> {
        ChangeOverlay::clear(self.storage.as_mut());
        self.overlay = ChangeOverlay::new();
        self.load()
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Render the whole loaded table as a CSV download, ignoring the view's
    /// search, filters, and pagination.
    pub fn export_csv(&self, timestamp_ms: i64) -> CsvExport {
        CsvExport {
            filename: csv_filename(timestamp_ms),
            content: to_csv(self.store.records(), self.store.columns()),
        }
    }

    /// Serialize the engine with pending edits replayed into it.
    pub fn export_snapshot(&mut self, timestamp_ms: i64) -> Result<SnapshotExport, EngineError> {
        let executor = self.engine.executor_mut()?;
        let snapshot = to_snapshot(executor, &self.overlay)?;
        Ok(SnapshotExport {
            filename: snapshot_filename(timestamp_ms),
            bytes: snapshot.bytes,
            skipped: snapshot.skipped,
        })
    }

    /// Snap the page back into range after an operation shrank the result.
    fn clamp_page(&mut self) {
        let count = pipeline::filtered_count(&self.store, &self.state);
        let last = pipeline::total_pages(count, self.state.page_size).max(1);
        if self.state.page > last {
            self.state.page = last;
        }
    }
}
