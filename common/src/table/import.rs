use super::{Row, Table};
use crate::error::Result;
use serde_json::{Number, Value};

/// read a csv with a header row; cells become numbers, booleans or strings,
/// and empty cells are null
pub fn from_csv(data: &[u8]) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(data);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = columns
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.clone(), parse_cell(cell)))
            .collect();
        rows.push(row);
    }

    tracing::debug!(columns = columns.len(), rows = rows.len(), "csv parsed");
    Ok(Table { columns, rows })
}

fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}
