/// Minimal query interpreter for engineless operation.
///
/// When no real SQL engine is available, the session runs against an
/// in-memory table collection instead. The interpreter recognizes the small
/// closed set of query shapes the loader actually issues and answers each
/// with the same `ResultSet` shape a real engine would return. Everything
/// outside that set yields an empty result, never an error.

use crate::engine::{QueryExecutor, ResultSet};
use crate::error::EngineError;
use crate::value::{Record, Value};

/// The recognized query shapes, produced by [`QueryIntent::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIntent {
    /// List the names of every table.
    ListTables,
    /// Describe the columns of one table.
    DescribeColumns(String),
    /// Return every row of one table.
    SelectAll(String),
    /// Anything else; answered with an empty result set.
    Unrecognized,
}

impl QueryIntent {
    /// Classify a query string into one of the recognized shapes.
    ///
    /// Keywords match case-insensitively; table names keep their original
    /// case and must be plain identifiers. A query that adds anything beyond
    /// the recognized shape (a WHERE clause, extra columns) is unrecognized.
    ///
    /// # Examples
    ///
    /// ```
    /// use podgrid::QueryIntent;
    ///
    /// assert_eq!(
    ///     QueryIntent::classify("SELECT name FROM sqlite_master WHERE type='table'"),
    ///     QueryIntent::ListTables
    /// );
    /// assert_eq!(
    ///     QueryIntent::classify("PRAGMA table_info(podcasts)"),
    ///     QueryIntent::DescribeColumns("podcasts".to_string())
    /// );
    /// assert_eq!(
    ///     QueryIntent::classify("select * from episodes;"),
    ///     QueryIntent::SelectAll("episodes".to_string())
    /// );
    /// assert_eq!(
    ///     QueryIntent::classify("DELETE FROM podcasts"),
    ///     QueryIntent::Unrecognized
    /// );
    /// ```
    pub fn classify(sql: &str) -> QueryIntent {
        let trimmed = sql.trim().trim_end_matches(';').trim_end();
        if trimmed.is_empty() {
            return QueryIntent::Unrecognized;
        }

        let normalized = trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if normalized.starts_with("pragma table_info") {
            if let (Some(open), Some(close)) = (trimmed.find('('), trimmed.rfind(')')) {
                if open < close {
                    let name = trimmed[open + 1..close].trim();
                    if is_identifier(name) && trimmed[close + 1..].trim().is_empty() {
                        return QueryIntent::DescribeColumns(name.to_string());
                    }
                }
            }
            return QueryIntent::Unrecognized;
        }

        if normalized.starts_with("select name from sqlite_master") {
            return QueryIntent::ListTables;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() == 4
            && tokens[0].eq_ignore_ascii_case("select")
            && tokens[1] == "*"
            && tokens[2].eq_ignore_ascii_case("from")
            && is_identifier(tokens[3])
        {
            return QueryIntent::SelectAll(tokens[3].to_string());
        }

        QueryIntent::Unrecognized
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One in-memory table: an ordered column list plus its rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemTable {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl MemTable {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        MemTable { columns, rows }
    }
}

/// An ordered collection of in-memory tables.
///
/// Insertion order is observable: it drives the order of `ListTables`
/// answers and which table a focal-table fallback load picks first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: Vec<(String, MemTable)>,
}

impl TableSet {
    pub fn new() -> Self {
        TableSet { tables: Vec::new() }
    }

    /// Insert a table, replacing any existing table of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, table: MemTable) {
        let name = name.into();
        if let Some(slot) = self.tables.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = table;
        } else {
            self.tables.push((name, table));
        }
    }

    pub fn get(&self, name: &str) -> Option<&MemTable> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// A small sales table used by the demo server and tests.
    pub fn sample() -> TableSet {
        let columns = vec![
            "id".to_string(),
            "product".to_string(),
            "amount".to_string(),
            "date".to_string(),
            "category".to_string(),
        ];
        let data = [
            (1, "Laptop", 1200.0, "2024-01-15", "Electronics"),
            (2, "Phone", 800.0, "2024-01-18", "Electronics"),
            (3, "Book", 25.0, "2024-01-20", "Education"),
            (4, "Headphones", 150.0, "2024-01-22", "Electronics"),
            (5, "Tablet", 400.0, "2024-01-25", "Electronics"),
            (6, "Monitor", 300.0, "2024-02-01", "Electronics"),
            (7, "Keyboard", 80.0, "2024-02-03", "Electronics"),
            (8, "Course", 200.0, "2024-02-05", "Education"),
            (9, "Mouse", 50.0, "2024-02-08", "Electronics"),
            (10, "Notebook", 15.0, "2024-02-10", "Education"),
        ];
        let rows = data
            .iter()
            .map(|(id, product, amount, date, category)| {
                let mut row = Record::new();
                row.insert("id".to_string(), Value::Int(*id));
                row.insert("product".to_string(), Value::Text(product.to_string()));
                row.insert("amount".to_string(), Value::Float(*amount));
                row.insert("date".to_string(), Value::Text(date.to_string()));
                row.insert("category".to_string(), Value::Text(category.to_string()));
                row
            })
            .collect();

        let mut tables = TableSet::new();
        tables.insert("sales", MemTable::new(columns, rows));
        tables
    }
}

/// A `QueryExecutor` that answers the recognized query shapes from a
/// `TableSet`. Mutation is unsupported, so snapshot replay against it
/// degrades to logged skips, and `export` yields an empty image.
pub struct InterpreterEngine {
    tables: TableSet,
}

impl InterpreterEngine {
    pub fn new(tables: TableSet) -> Self {
        InterpreterEngine { tables }
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    fn list_tables(&self) -> ResultSet {
        ResultSet {
            columns: vec!["name".to_string()],
            rows: self
                .tables
                .names()
                .iter()
                .map(|name| vec![Value::Text(name.to_string())])
                .collect(),
        }
    }

    /// One description row per column: `[cid, name, type, notnull, dflt_value, pk]`.
    /// `type` is REAL when the first row holds a number for that column, else
    /// TEXT; `pk` marks only a column literally named `id`. A zero-row table
    /// keeps the header columns but yields no description rows.
    fn describe_columns(&self, table: &str) -> ResultSet {
        let columns = vec![
            "cid".to_string(),
            "name".to_string(),
            "type".to_string(),
            "notnull".to_string(),
            "dflt_value".to_string(),
            "pk".to_string(),
        ];
        let rows = match self.tables.get(table) {
            Some(mem) if !mem.rows.is_empty() => {
                let first = &mem.rows[0];
                mem.columns
                    .iter()
                    .enumerate()
                    .map(|(cid, col)| {
                        let numeric = matches!(
                            first.get(col),
                            Some(Value::Int(_)) | Some(Value::Float(_))
                        );
                        let type_name = if numeric { "REAL" } else { "TEXT" };
                        vec![
                            Value::Int(cid as i64),
                            Value::Text(col.clone()),
                            Value::Text(type_name.to_string()),
                            Value::Int(0),
                            Value::Null,
                            Value::Int(if col == "id" { 1 } else { 0 }),
                        ]
                    })
                    .collect()
            }
            _ => Vec::new(),
        };
        ResultSet { columns, rows }
    }

    fn select_all(&self, table: &str) -> ResultSet {
        match self.tables.get(table) {
            Some(mem) if !mem.rows.is_empty() => ResultSet {
                columns: mem.columns.clone(),
                rows: mem
                    .rows
                    .iter()
                    .map(|row| {
                        mem.columns
                            .iter()
                            .map(|col| row.get(col).cloned().unwrap_or(Value::Null))
                            .collect()
                    })
                    .collect(),
            },
            _ => ResultSet::empty(),
        }
    }
}

impl QueryExecutor for InterpreterEngine {
    fn execute(&self, sql: &str) -> Result<ResultSet, EngineError> {
        Ok(match QueryIntent::classify(sql) {
            QueryIntent::ListTables => self.list_tables(),
            QueryIntent::DescribeColumns(table) => self.describe_columns(&table),
            QueryIntent::SelectAll(table) => self.select_all(&table),
            QueryIntent::Unrecognized => ResultSet::empty(),
        })
    }

    fn run(&mut self, sql: &str, _params: &[Value]) -> Result<(), EngineError> {
        Err(EngineError::ExecutionError(format!(
            "unsupported statement: {}",
            sql
        )))
    }

    fn export(&self) -> Result<Vec<u8>, EngineError> {
        Ok(Vec::new())
    }
}
