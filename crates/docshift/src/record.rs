//! In-memory record set
//!
//! Documents carry no fixed schema, so a [`RecordSet`] keeps its rows as
//! key/value maps and derives the column list from the rows themselves.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// One extracted document: column name to scalar value
pub type Row = Map<String, Value>;

/// Rows plus the union of their keys in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RecordSet {
    /// Build a record set, discovering columns across all rows
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();

        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
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

    /// Value of `column` in row `index`; `None` when the row lacks the key
    pub fn value(&self, index: usize, column: &str) -> Option<&Value> {
        self.rows.get(index).and_then(|row| row.get(column))
    }

    /// Remove the named columns from the column list and from every row
    ///
    /// Names that are not present are ignored. The row count never changes.
    pub fn drop_columns(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }

        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
        self.columns.retain(|column| !doomed.contains(column.as_str()));

        for row in &mut self.rows {
            for name in names {
                row.remove(name);
            }
        }
    }
}
