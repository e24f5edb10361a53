/// Query-execution capability consumed by the session layer.
///
/// The real deployment backs this with a SQL engine loaded from a database
/// file; when none is available, `InterpreterEngine` substitutes with the
/// same result shapes.

use crate::error::EngineError;
use crate::value::{Record, Value};

/// Column names plus row tuples, the shape every query execution returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn empty() -> Self {
        ResultSet {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Materialize the rows as column-name keyed maps.
    /// Tuples shorter than the column list leave the trailing columns absent.
    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// The capability the session is built against: execute a query, run a
/// mutating statement with positional parameters, or export raw bytes.
pub trait QueryExecutor {
    fn execute(&self, sql: &str) -> Result<ResultSet, EngineError>;

    fn run(&mut self, sql: &str, params: &[Value]) -> Result<(), EngineError>;

    fn export(&self) -> Result<Vec<u8>, EngineError>;
}

/// Holds the injected executor behind an explicit lifecycle: the handle
/// starts empty, `init` plugs an engine in, and every access before that
/// fails with `LoadFailure` instead of touching ambient global state.
pub struct EngineHandle {
    executor: Option<Box<dyn QueryExecutor + Send>>,
}

impl EngineHandle {
    pub fn new() -> Self {
        EngineHandle { executor: None }
    }

    pub fn init(&mut self, executor: Box<dyn QueryExecutor + Send>) {
        self.executor = Some(executor);
    }

    pub fn is_ready(&self) -> bool {
        self.executor.is_some()
    }

    pub fn executor(&self) -> Result<&dyn QueryExecutor, EngineError> {
        match self.executor.as_deref() {
            Some(executor) => Ok(executor),
            None => Err(EngineError::LoadFailure(
                "query engine is not initialized".to_string(),
            )),
        }
    }

    pub fn executor_mut(&mut self) -> Result<&mut (dyn QueryExecutor + Send), EngineError> {
        match self.executor.as_deref_mut() {
            Some(executor) => Ok(executor),
            None => Err(EngineError::LoadFailure(
                "query engine is not initialized".to_string(),
            )),
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        EngineHandle::new()
    }
}
