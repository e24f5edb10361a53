/// Pure derivation of the rendered view from the record store.
///
/// Every interaction recomputes the visible page from scratch, in a fixed
/// order: search filter, column filters, stable sort, pagination. Filter
/// options and summary statistics are derived over the unfiltered store, so
/// narrowing a filter never shrinks the choices offered.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::store::RecordStore;
use crate::value::{Record, Value};

/// The page sizes a view may use.
pub const PAGE_SIZES: [usize; 5] = [5, 10, 25, 50, 100];

/// The page size a fresh view starts with.
pub const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// View state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// The column and direction a view is sorted by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Transient per-interaction view parameters.
///
/// The mutators enforce the paging rules: changing the search term, a column
/// filter, or the page size snaps back to page 1, while changing the sort
/// leaves the page alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub search_term: String,
    pub column_filters: HashMap<String, String>,
    pub sort: Option<SortKey>,
    pub page: usize,
    pub page_size: usize,
}

impl ViewState {
    pub fn new() -> Self {
        ViewState {
            search_term: String::new(),
            column_filters: HashMap::new(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 1;
    }

    /// Set one column filter to an exact display value. An empty value
    /// removes the filter.
    pub fn set_filter(&mut self, column: &str, value: &str) {
        if value.is_empty() {
            self.column_filters.remove(column);
        } else {
            self.column_filters
                .insert(column.to_string(), value.to_string());
        }
        self.page = 1;
    }

    /// Sort by a column, toggling to descending when it is already the
    /// ascending sort column. Does not reset the page.
    pub fn sort_by(&mut self, column: &str) {
        let order = match &self.sort {
            Some(key) if key.column == column && key.order == SortOrder::Ascending => {
                SortOrder::Descending
            }
            _ => SortOrder::Ascending,
        };
        self.sort = Some(SortKey {
            column: column.to_string(),
            order,
        });
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), StoreError> {
        if !PAGE_SIZES.contains(&size) {
            return Err(StoreError::InvalidPageSize(size));
        }
        self.page_size = size;
        self.page = 1;
        Ok(())
    }

    /// Reset filters, search term, sort, and page in one step.
    pub fn clear_filters(&mut self) {
        self.search_term.clear();
        self.column_filters.clear();
        self.sort = None;
        self.page = 1;
    }
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new()
    }
}

// ============================================================================
// Page derivation
// ============================================================================

/// One rendered page of the derived view, with the numbers needed for a
/// "showing X to Y of Z" line.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentPage {
    pub records: Vec<Record>,
    pub page: usize,
    pub total_pages: usize,
    /// Count of records after search and filters, before pagination.
    pub total_records: usize,
    /// 1-based position of the first row shown, 0 when the page is empty.
    pub start: usize,
    /// 1-based position of the last row shown, 0 when the page is empty.
    pub end: usize,
}

/// Derive the visible page. The requested page is taken as-is: a page past
/// the end yields an empty slice rather than being clamped, so callers decide
/// when to snap back.
pub fn run(store: &RecordStore, state: &ViewState) -> CurrentPage {
    let rows = filtered_sorted(store.records(), state);

    let total_records = rows.len();
    let total = total_pages(total_records, state.page_size);
    let offset = (state.page - 1) * state.page_size;
    let records: Vec<Record> = rows
        .iter()
        .skip(offset)
        .take(state.page_size)
        .map(|record| (*record).clone())
        .collect();

    let (start, end) = if records.is_empty() {
        (0, 0)
    } else {
        (offset + 1, offset + records.len())
    };

    CurrentPage {
        records,
        page: state.page,
        total_pages: total,
        total_records,
        start,
        end,
    }
}

/// Count of records that survive the search term and column filters.
pub fn filtered_count(store: &RecordStore, state: &ViewState) -> usize {
    let needle = state.search_term.to_lowercase();
    store
        .records()
        .iter()
        .filter(|record| matches_search(record, &needle))
        .filter(|record| matches_filters(record, &state.column_filters))
        .count()
}

/// `ceil(count / page_size)`; zero pages for an empty result.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    (count + page_size - 1) / page_size
}

fn filtered_sorted<'a>(records: &'a [Record], state: &ViewState) -> Vec<&'a Record> {
    let needle = state.search_term.to_lowercase();
    let mut rows: Vec<&Record> = records
        .iter()
        .filter(|record| matches_search(record, &needle))
        .filter(|record| matches_filters(record, &state.column_filters))
        .collect();

    if let Some(key) = &state.sort {
        rows.sort_by(|a, b| compare_records(a, b, key));
    }
    rows
}

/// A record matches when any non-null field's display form contains the
/// lowercased term. An empty term matches everything.
fn matches_search(record: &Record, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record
        .values()
        .any(|value| !value.is_null() && value.to_display().to_lowercase().contains(needle))
}

/// Every filter entry must match the record's display form exactly. A null
/// field displays as empty and so never matches a non-empty filter.
fn matches_filters(record: &Record, filters: &HashMap<String, String>) -> bool {
    filters.iter().all(|(column, want)| {
        record
            .get(column)
            .map(|value| value.to_display() == *want)
            .unwrap_or(false)
    })
}

fn compare_records(a: &Record, b: &Record, key: &SortKey) -> Ordering {
    let va = a.get(&key.column).unwrap_or(&Value::Null);
    let vb = b.get(&key.column).unwrap_or(&Value::Null);

    // Nulls sort after every value regardless of direction
    match (va.is_null(), vb.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let base = match (va, vb) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => {
            let (x, y) = (va.as_f64(), vb.as_f64());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        // Mixed types compare by display form for deterministic ordering
        (x, y) => x.to_display().cmp(&y.to_display()),
    };

    match key.order {
        SortOrder::Ascending => base,
        SortOrder::Descending => base.reverse(),
    }
}

// ============================================================================
// Derived options and statistics
// ============================================================================

/// Distinct filter choices, derived over the unfiltered store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    /// Distinct non-empty categories, in first-appearance order.
    pub categories: Vec<String>,
    /// Distinct non-empty statuses, in first-appearance order.
    pub statuses: Vec<String>,
    /// Distinct non-zero years, ascending.
    pub years: Vec<i64>,
}

pub fn filter_options(store: &RecordStore) -> FilterOptions {
    let mut options = FilterOptions::default();
    for record in store.records() {
        if let Some(value) = record.get("category") {
            push_distinct(&mut options.categories, value);
        }
        if let Some(value) = record.get("status") {
            push_distinct(&mut options.statuses, value);
        }
        if let Some(year) = record.get("year").and_then(year_of) {
            if !options.years.contains(&year) {
                options.years.push(year);
            }
        }
    }
    options.years.sort_unstable();
    options
}

fn push_distinct(seen: &mut Vec<String>, value: &Value) {
    let display = value.to_display();
    if !display.is_empty() && !seen.contains(&display) {
        seen.push(display);
    }
}

fn year_of(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) if *n != 0 => Some(*n),
        Value::Float(f) if f.fract() == 0.0 && *f != 0.0 => Some(*f as i64),
        _ => None,
    }
}

/// Headline numbers over the unfiltered store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub todo: usize,
    pub errors: usize,
    pub other: usize,
    pub with_transcript: usize,
    pub without_transcript: usize,
    pub categories: usize,
    pub min_year: Option<i64>,
    pub max_year: Option<i64>,
    /// `round(100 * completed / total)`, 0 for an empty store.
    pub completion_rate: u32,
}

pub fn summarize(store: &RecordStore) -> SummaryStats {
    let mut stats = SummaryStats {
        total: store.len(),
        ..SummaryStats::default()
    };
    let mut categories: Vec<String> = Vec::new();

    for record in store.records() {
        match classify_status(record.get("status").unwrap_or(&Value::Null)) {
            StatusClass::Completed => stats.completed += 1,
            StatusClass::Pending => stats.pending += 1,
            StatusClass::Todo => stats.todo += 1,
            StatusClass::Error => stats.errors += 1,
            StatusClass::Other | StatusClass::Unknown => stats.other += 1,
        }

        let has_transcript = record
            .get("transcript")
            .map(|value| !value.to_display().trim().is_empty())
            .unwrap_or(false);
        if has_transcript {
            stats.with_transcript += 1;
        } else {
            stats.without_transcript += 1;
        }

        if let Some(value) = record.get("category") {
            push_distinct(&mut categories, value);
        }

        if let Some(year) = record.get("year").and_then(year_of) {
            stats.min_year = Some(stats.min_year.map_or(year, |min| min.min(year)));
            stats.max_year = Some(stats.max_year.map_or(year, |max| max.max(year)));
        }
    }

    stats.categories = categories.len();
    if stats.total > 0 {
        stats.completion_rate =
            ((stats.completed as f64 / stats.total as f64) * 100.0).round() as u32;
    }
    stats
}

// ============================================================================
// Status classification
// ============================================================================

/// The status buckets used by both the summary counters and the per-row
/// badge, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Completed,
    Pending,
    Todo,
    Error,
    Other,
    Unknown,
}

/// Classify a status value, case-insensitively. A status starting with
/// `error` wins over every other rule; a null or missing status is unknown.
///
/// # Examples
///
/// ```
/// use podgrid::{classify_status, StatusClass, Value};
///
/// assert_eq!(
///     classify_status(&Value::Text("error: timeout".to_string())),
///     StatusClass::Error
/// );
/// assert_eq!(
///     classify_status(&Value::Text("Success".to_string())),
///     StatusClass::Completed
/// );
/// assert_eq!(classify_status(&Value::Null), StatusClass::Unknown);
/// ```
pub fn classify_status(status: &Value) -> StatusClass {
    if status.is_null() {
        return StatusClass::Unknown;
    }
    let lower = status.to_display().to_lowercase();
    if lower.starts_with("error") {
        StatusClass::Error
    } else if lower == "completed" || lower == "success" {
        StatusClass::Completed
    } else if lower == "pending" || lower == "processing" {
        StatusClass::Pending
    } else if lower == "to do" || lower == "todo" {
        StatusClass::Todo
    } else {
        StatusClass::Other
    }
}

/// The badge text rendered for a status value. Recognized buckets get a
/// fixed label; anything else shows its raw text.
pub fn status_label(status: &Value) -> String {
    match classify_status(status) {
        StatusClass::Error => "Error".to_string(),
        StatusClass::Completed => "Success".to_string(),
        StatusClass::Pending => "Pending".to_string(),
        StatusClass::Todo => "To Do".to_string(),
        StatusClass::Unknown => "Unknown".to_string(),
        StatusClass::Other => status.to_display(),
    }
}

/// Whitespace-separated word count, used by the transcript editor.
///
/// # Examples
///
/// ```
/// use podgrid::word_count;
///
/// assert_eq!(word_count("two  words"), 2);
/// assert_eq!(word_count("   "), 0);
/// ```
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
