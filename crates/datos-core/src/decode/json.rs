use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    error::DecodeError,
    table::{Cell, Table},
};

/// Parses a JSON document and flattens it into a table.
pub fn decode_json(bytes: &[u8]) -> Result<Table, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    table_from_json(value)
}

/// Flattens a parsed JSON document into a table.
///
/// Accepted layouts:
///
/// - `{"col": [v, ...], ...}`: columns of equal length
/// - `{"col": {"idx": v, ...}, ...}`: columns keyed by row index
/// - `[{"col": v, ...}, ...]`: records, columns in first-seen order
/// - `[[v, ...], ...]`: rows of values, columns named `0`, `1`, ...
/// - `[v, ...]`: a single column named `0`
pub fn table_from_json(value: Value) -> Result<Table, DecodeError> {
    let table = match value {
        Value::Object(map) => from_object(map)?,
        Value::Array(items) => from_array(items)?,
        other => {
            return Err(DecodeError::JsonLayout(format!(
                "expected an object or an array at the top level, found {}",
                kind(&other)
            )))
        }
    };

    debug!(
        rows = table.shape().0,
        columns = table.shape().1,
        "flattened json document"
    );
    Ok(table)
}

fn from_object(map: Map<String, Value>) -> Result<Table, DecodeError> {
    if map.is_empty() {
        return Ok(Table::default());
    }

    if map.values().all(Value::is_array) {
        return from_columns(map);
    }
    if map.values().all(Value::is_object) {
        return from_indexed_columns(map);
    }
    if map.values().any(|v| v.is_array() || v.is_object()) {
        return Err(DecodeError::JsonLayout(
            "mixing arrays, objects and scalars as column values".into(),
        ));
    }

    Err(DecodeError::JsonLayout(
        "If using all scalar values, you must pass an index".into(),
    ))
}

fn from_columns(map: Map<String, Value>) -> Result<Table, DecodeError> {
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(map.len());
    let mut names = Vec::with_capacity(map.len());

    for (name, value) in map {
        if let Value::Array(values) = value {
            names.push(name);
            columns.push(values);
        }
    }

    let height = columns.first().map(Vec::len).unwrap_or_default();
    if columns.iter().any(|c| c.len() != height) {
        return Err(DecodeError::JsonLayout(
            "All arrays must be of the same length".into(),
        ));
    }

    let mut table = Table::new(names);
    let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
    for line in 1..=height {
        let row = iters
            .iter_mut()
            .map(|it| it.next().map(cell_from_json).unwrap_or(Cell::Null))
            .collect();
        table.push_row(row, line)?;
    }

    Ok(table)
}

fn from_indexed_columns(map: Map<String, Value>) -> Result<Table, DecodeError> {
    let mut index: Vec<String> = Vec::new();
    for value in map.values() {
        if let Value::Object(column) = value {
            for key in column.keys() {
                if !index.contains(key) {
                    index.push(key.clone());
                }
            }
        }
    }

    let mut names = Vec::with_capacity(map.len());
    let mut columns = Vec::with_capacity(map.len());
    for (name, value) in map {
        if let Value::Object(column) = value {
            names.push(name);
            columns.push(column);
        }
    }

    let mut table = Table::new(names);
    for (i, key) in index.iter().enumerate() {
        let row = columns
            .iter_mut()
            .map(|column| column.remove(key).map(cell_from_json).unwrap_or(Cell::Null))
            .collect();
        table.push_row(row, i + 1)?;
    }

    Ok(table)
}

fn from_array(items: Vec<Value>) -> Result<Table, DecodeError> {
    if items.is_empty() {
        return Ok(Table::default());
    }

    if items.iter().all(Value::is_object) {
        return from_records(items);
    }
    if items.iter().all(Value::is_array) {
        return from_rows(items);
    }
    if items.iter().any(|v| v.is_array() || v.is_object()) {
        return Err(DecodeError::JsonLayout(
            "mixing arrays, objects and scalars as rows".into(),
        ));
    }

    let mut table = Table::new(["0"]);
    for (i, item) in items.into_iter().enumerate() {
        table.push_row(vec![cell_from_json(item)], i + 1)?;
    }
    Ok(table)
}

fn from_records(items: Vec<Value>) -> Result<Table, DecodeError> {
    let mut names: Vec<String> = Vec::new();
    for item in &items {
        if let Value::Object(record) = item {
            for key in record.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
    }

    let mut table = Table::new(names.clone());
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(mut record) = item else {
            continue;
        };
        let row = names
            .iter()
            .map(|name| record.remove(name).map(cell_from_json).unwrap_or(Cell::Null))
            .collect();
        table.push_row(row, i + 1)?;
    }

    Ok(table)
}

fn from_rows(items: Vec<Value>) -> Result<Table, DecodeError> {
    let width = items
        .iter()
        .filter_map(Value::as_array)
        .map(Vec::len)
        .max()
        .unwrap_or_default();

    let mut table = Table::new((0..width).map(|i| i.to_string()));
    for (i, item) in items.into_iter().enumerate() {
        let Value::Array(values) = item else {
            continue;
        };
        table.push_row(values.into_iter().map(cell_from_json).collect(), i + 1)?;
    }

    Ok(table)
}

/// Scalars map onto the matching cell; nested values keep their compact JSON text.
fn cell_from_json(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        },
        Value::String(s) => Cell::Text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => Cell::Text(nested.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
