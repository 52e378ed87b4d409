use std::{fmt::Display, io::Cursor};

use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use tracing::debug;

use crate::{
    error::DecodeError,
    table::{Cell, Table},
};

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Reads the first worksheet of a legacy binary (`.xls`) workbook.
pub fn decode_xls(bytes: &[u8]) -> Result<Table, DecodeError> {
    first_sheet::<Xls<_>>("xls", bytes)
}

/// Reads the first worksheet of an Office Open XML (`.xlsx`) workbook.
pub fn decode_xlsx(bytes: &[u8]) -> Result<Table, DecodeError> {
    first_sheet::<Xlsx<_>>("xlsx", bytes)
}

fn first_sheet<'a, R>(kind: &'static str, bytes: &'a [u8]) -> Result<Table, DecodeError>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: Display,
{
    let mut workbook = open_workbook_from_rs::<R, _>(Cursor::new(bytes)).map_err(
        |err: R::Error| {
            DecodeError::Spreadsheet {
                kind,
                reason: err.to_string(),
            }
        },
    )?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::NoWorksheet)?
        .map_err(|err| {
            DecodeError::Spreadsheet {
                kind,
                reason: err.to_string(),
            }
        })?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        debug!(kind, "first worksheet is empty");
        return Ok(Table::default());
    };

    let mut table = Table::new(header.iter().map(header_name));
    for (i, row) in rows.enumerate() {
        table.push_row(row.iter().map(cell_from_data).collect(), i + 2)?;
    }

    debug!(
        kind,
        rows = table.shape().0,
        columns = table.shape().1,
        "read first worksheet"
    );
    Ok(table)
}

fn header_name(data: &Data) -> String {
    match cell_from_data(data) {
        Cell::Null => String::new(),
        cell => cell.to_string(),
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::Int(n) => Cell::Int(*n),
        Data::Float(f) => float_cell(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => Cell::Text(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Spreadsheet numbers are all floats; whole values read back as integers.
fn float_cell(value: f64) -> Cell {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_FLOAT_INT {
        Cell::Int(value as i64)
    } else {
        Cell::Float(value)
    }
}
