//! Row storage: a per-chunk buffer and the append-only table it drains into.

use serde::Serialize;

use crate::clock::Season;

/// Column names in output order.
pub const COLUMNS: [&str; 12] = [
    "elapsed_seconds",
    "second",
    "minute",
    "hour",
    "weekday",
    "day_of_month",
    "month",
    "season",
    "year",
    "vm_load",
    "requests_per_second",
    "disk_usage",
];

/// One simulated second of output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub elapsed_seconds: u64,
    pub second: u32,
    pub minute: u32,
    pub hour: u32,
    pub weekday: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub season: Season,
    pub year: i32,
    pub vm_load: f64,
    pub requests_per_second: f64,
    pub disk_usage: f64,
}

/// Append-only collection of rows sharing the [`COLUMNS`] schema.
///
/// The table keeps every flushed row in memory until export, so a run holds
/// roughly `total_ticks` rows at its end. Chunked flushing only bounds the
/// working buffer to one chunk; the table itself grows with the run.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&Row> {
        self.rows.last()
    }
}

/// Rows of the chunk currently being generated.
#[derive(Debug, Clone, Default)]
pub struct RowBuffer {
    rows: Vec<Row>,
}

impl RowBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rows.capacity()
    }

    /// Move every buffered row to the end of `table`, returning how many moved.
    /// The buffer keeps its allocation for the next chunk.
    pub fn flush_into(&mut self, table: &mut Table) -> usize {
        let moved = self.rows.len();
        table.rows.append(&mut self.rows);
        moved
    }
}
