pub mod export;
pub mod import;

use crate::error::{DatagenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use export::{export_zip, to_csv};
pub use import::from_csv;

/// column name used by the error marker table
pub const ERROR_COLUMN: &str = "Error";

/// one row of tabular data, keys in column order
pub type Row = Map<String, Value>;

/// an ordered sequence of rows with the column order they were first seen in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// build a table from row objects; columns follow the first row, then any
    /// keys that only appear in later rows
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// build a table from a json array of objects
    pub fn from_records(records: Vec<Value>) -> Result<Self> {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| match record {
                Value::Object(row) => Ok(row),
                other => Err(DatagenError::InvalidTable(format!(
                    "record {} is not an object: {}",
                    idx, other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_rows(rows))
    }

    /// build a table with a known column order, kept even when there are no rows
    pub fn from_columns(columns: Vec<String>, records: Vec<Value>) -> Result<Self> {
        let mut table = Self::from_records(records)?;
        for column in table.columns.drain(..) {
            if !columns.contains(&column) {
                return Err(DatagenError::InvalidTable(format!(
                    "unexpected column `{}`",
                    column
                )));
            }
        }
        table.columns = columns;
        Ok(table)
    }

    /// single-row table carrying a failure message in the `Error` column
    pub fn error_marker(message: impl Into<String>) -> Self {
        let mut row = Row::new();
        row.insert(ERROR_COLUMN.to_string(), Value::String(message.into()));
        Self {
            columns: vec![ERROR_COLUMN.to_string()],
            rows: vec![row],
        }
    }

    /// render a generation outcome, turning failures into the error marker
    pub fn from_outcome(outcome: Result<Table>) -> Self {
        outcome.unwrap_or_else(|e| Self::error_marker(e.to_string()))
    }

    /// the failure message if this table is an error marker
    pub fn error(&self) -> Option<&str> {
        if !self.columns.iter().any(|c| c == ERROR_COLUMN) {
            return None;
        }
        self.rows
            .first()
            .and_then(|row| row.get(ERROR_COLUMN))
            .and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
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

    /// serialize the rows as a json array of row objects
    pub fn to_records_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }

    /// plain-text grid for terminal output
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return "(no rows)".to_string();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| cell_text(row.get(c)))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: Vec<&str>| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::with_capacity(cells.len() + 2);
        out.push(line(self.columns.iter().map(String::as_str).collect()));
        out.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &cells {
            out.push(line(row.iter().map(String::as_str).collect()));
        }
        out.push(format!("({} row(s))", self.rows.len()));
        out.join("\n")
    }
}

/// text form of a cell: strings raw, null empty, anything else as json
pub(crate) fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
