//! Two-dimensional data decoded from a distribution.

use std::{collections::HashSet, fmt};

use serde::Serialize;
use tabled::builder::Builder;

use crate::error::DecodeError;

/// Strings read as missing values in delimited text.
const NA_VALUES: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "#N/A"];

/// A single value of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Infers the value of a field read from delimited text.
    pub fn infer(field: &str) -> Self {
        let trimmed = field.trim();

        if NA_VALUES.contains(&trimmed) {
            return Cell::Null;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Cell::Int(n);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Cell::Float(f);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }

        Cell::Text(field.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(n) => Some(*n as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Named columns and rows of cells.
///
/// Every row holds exactly one cell per column and column names are unique:
/// blank names become `Unnamed: {index}` and repeated names get a `.1`,
/// `.2`, ... suffix.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: normalize_columns(columns.into_iter().map(Into::into).collect()),
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding it with nulls when it is short.
    ///
    /// A row with more cells than there are columns is rejected; `line` is
    /// only used for the error message.
    pub fn push_row(&mut self, mut row: Vec<Cell>, line: usize) -> Result<(), DecodeError> {
        let expected = self.columns.len();
        if row.len() > expected {
            return Err(DecodeError::RowTooLong {
                line,
                expected,
                found: row.len(),
            });
        }
        row.resize(expected, Cell::Null);
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::new();
        builder.push_record(self.columns.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().map(Cell::to_string));
        }
        write!(f, "{}", builder.build())
    }
}

fn normalize_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(columns.len());

    columns
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            };

            let mut candidate = base.clone();
            let mut suffix = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}
