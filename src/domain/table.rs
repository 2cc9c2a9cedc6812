// Tabular query result model
use chrono::NaiveDate;
use serde_json::Value;

/// Raw tabular result returned by the warehouse. The warehouse returns
/// cell values as JSON, with numbers sometimes encoded as strings, so
/// the accessors coerce both representations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// The degraded form a failed query collapses to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn f64_at(&self, row: usize, column: &str) -> Option<f64> {
        match self.cell(row, column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn i64_at(&self, row: usize, column: &str) -> Option<i64> {
        match self.cell(row, column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn str_at(&self, row: usize, column: &str) -> Option<&str> {
        self.cell(row, column)?.as_str()
    }

    /// Parse a date cell. Accepts plain dates and timestamp strings with
    /// a leading `YYYY-MM-DD`.
    pub fn date_at(&self, row: usize, column: &str) -> Option<NaiveDate> {
        let s = self.str_at(row, column)?;
        let prefix = s.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}
