/// PodGrid - Client-Style Tabular Data Session Engine
///
/// An in-memory session engine for browsing and annotating podcast production
/// records. Uploads are opened through a provider chain, materialized into a
/// record store, and rendered through a pure view pipeline with search,
/// filters, sorting, and pagination. Transcript edits persist in a keyed
/// storage overlay that survives reloads and replays into exports.

pub mod value;
pub mod error;
pub mod engine;
pub mod interpreter;
pub mod upload;
pub mod overlay;
pub mod store;
pub mod pipeline;
pub mod export;
pub mod provider;
pub mod session;

pub use value::{record_id, Record, Value};
pub use error::{EngineError, StoreError};
pub use engine::{EngineHandle, QueryExecutor, ResultSet};
pub use interpreter::{InterpreterEngine, MemTable, QueryIntent, TableSet};
pub use upload::{tables_from_upload, Upload, ACCEPTED_EXTENSIONS};
pub use overlay::{ChangeEntry, ChangeOverlay, MemoryStorage, Storage, STORAGE_KEY};
pub use store::RecordStore;
pub use pipeline::{
    classify_status, filter_options, status_label, summarize, word_count, CurrentPage,
    FilterOptions, SortKey, SortOrder, StatusClass, SummaryStats, ViewState, DEFAULT_PAGE_SIZE,
    PAGE_SIZES,
};
pub use export::{
    csv_filename, iso_timestamp, month_abbrev, now_millis, snapshot_filename, to_csv, to_snapshot,
    OverlayReplayFailure, Snapshot, REPLAY_STATEMENT,
};
pub use provider::{EngineProvider, InterpreterProvider, LoadOutcome, ProviderChain, TabularFileProvider};
pub use session::{CsvExport, LoadReport, Session, SnapshotExport, DISPLAY_COLUMNS, FOCAL_TABLE};

// WebSocket server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod messages;
#[cfg(feature = "server")]
pub mod websocket;
#[cfg(feature = "server")]
pub mod server;
