use super::{cell_text, Table};
use crate::error::{DatagenError, Result};
use indexmap::IndexMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::CompressionMethod;

/// utf-8 csv with a header row of the table's columns
pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(table.columns().iter().map(|c| cell_text(row.get(c))))?;
    }

    writer
        .into_inner()
        .map_err(|e| DatagenError::Io(e.into_error()))
}

/// zip archive holding one `<table>_data.csv` entry per table, in map order
#[tracing::instrument(skip(tables), fields(table_count = tables.len()))]
pub fn export_zip(tables: &IndexMap<String, Table>) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, table) in tables {
        let entry = format!("{}_data.csv", name);
        tracing::debug!(entry = %entry, rows = table.len(), "writing archive entry");

        zip.start_file(entry, options)?;
        zip.write_all(&to_csv(table)?)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
