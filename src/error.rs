/// Failure taxonomy for engine access and store operations.

use thiserror::Error;

/// Failures raised by query-execution capabilities and file ingestion.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The database could not be fetched, opened, or queried at load time.
    /// Callers keep whatever data was previously shown.
    #[error("database load failed: {0}")]
    LoadFailure(String),

    /// A query or mutation statement was malformed or unsupported.
    #[error("query execution failed: {0}")]
    ExecutionError(String),

    /// An uploaded file did not match any shape a provider understands.
    /// Never fatal on the fallback path, which degrades to a diagnostic table.
    #[error("unrecognized file: {0}")]
    UnrecognizedFile(String),
}

/// Failures raised by record-store and view operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An edit was committed against an id that is not in the store.
    #[error("record {0} not found")]
    RecordNotFound(i64),

    /// A page size outside the enumerated set was requested.
    #[error("page size {0} is not one of 5, 10, 25, 50, 100")]
    InvalidPageSize(usize),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
