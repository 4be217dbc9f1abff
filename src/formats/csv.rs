//! CSV writing for parameter rows and summaries.

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// Render a JSON value as a CSV cell.
///
/// Strings are written without quotes, `null` becomes an empty cell, and arrays/objects are
/// written as compact JSON.
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Write a header row of field names and exactly one data row of values.
///
/// With no fields both lines are empty.
pub fn write_single_row(fields: &Map<String, Value>) -> ConfigResult<String> {
    // csv quotes a zero-field record as `""`, which reads back as one empty column.
    if fields.is_empty() {
        return Ok("\n\n".to_string());
    }
    let header: Vec<&str> = fields.keys().map(String::as_str).collect();
    let row: Vec<String> = fields.values().map(cell_text).collect();
    write_rows(&header, std::iter::once(row))
}

/// Write a header row followed by `rows`.
pub fn write_rows<I, R, S>(header: &[&str], rows: I) -> ConfigResult<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| ConfigError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ConfigError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
