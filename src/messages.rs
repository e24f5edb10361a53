/// WebSocket message types for client-server communication
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Load (or reload) the best table from the attached engine
    Load,

    /// Run an arbitrary query and return its raw result
    Query { sql: String },

    /// Replace the free-text search term
    SetSearch { term: String },

    /// Set one column filter; an empty value removes it
    SetFilter { column: String, value: String },

    /// Drop search, filters, and sort in one step
    ClearFilters,

    /// Sort by a column, toggling direction on repeat
    SortBy { column: String },

    /// Jump to a page
    SetPage { page: usize },

    /// Switch the page size
    SetPageSize { size: usize },

    /// Request the current page without changing anything
    Page,

    /// Request the filter dropdown options
    Options,

    /// Request the summary statistics
    Summary,

    /// Save a transcript edit
    EditTranscript { id: i64, transcript: String },

    /// Discard all pending edits and reload
    ClearChanges,

    /// Render the loaded table as a CSV download
    ExportCsv,
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// A table was loaded
    Loaded {
        table: String,
        all_tables: Vec<String>,
        rows: usize,
        columns: Vec<String>,
        overlay_applied: usize,
        focal_missing: bool,
    },

    /// Raw result of a Query
    ResultData {
        columns: Vec<String>,
        rows: Vec<Vec<JsonValue>>,
    },

    /// The current page of the derived view
    PageData {
        columns: Vec<String>,
        records: Vec<HashMap<String, JsonValue>>,
        page: usize,
        total_pages: usize,
        total_records: usize,
        start: usize,
        end: usize,
    },

    /// Filter dropdown options
    FilterOptions {
        categories: Vec<String>,
        statuses: Vec<String>,
        years: Vec<i64>,
    },

    /// Summary statistics over the loaded table
    Summary {
        total: usize,
        completed: usize,
        pending: usize,
        todo: usize,
        errors: usize,
        other: usize,
        with_transcript: usize,
        without_transcript: usize,
        categories: usize,
        min_year: Option<i64>,
        max_year: Option<i64>,
        completion_rate: u32,
    },

    /// A transcript edit was saved
    TranscriptSaved {
        id: i64,
        record: HashMap<String, JsonValue>,
    },

    /// All pending edits were discarded
    ChangesCleared { rows: usize },

    /// A CSV download is ready
    CsvReady { filename: String, content: String },

    /// Error occurred
    Error { message: String },
}
