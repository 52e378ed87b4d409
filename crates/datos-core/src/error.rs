use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// A payload could not be turned into a table.
#[derive(Error, Diagnostic, Debug)]
pub enum DecodeError {
    #[error("No columns to parse from file")]
    #[diagnostic(code(datos_core::no_columns))]
    NoColumns,

    #[error("Expected {expected} fields in line {line}, saw {found}")]
    #[diagnostic(code(datos_core::row_too_long))]
    RowTooLong {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    #[diagnostic(code(datos_core::csv))]
    Csv(#[from] csv::Error),

    #[error("Could not parse delimited text with any encoding ({})", attempts.join("; "))]
    #[diagnostic(
        code(datos_core::encoding),
        help("Save the file to disk to inspect it, or set `csv_delimiter` if detection picked the wrong one")
    )]
    EncodingLadderExhausted { attempts: Vec<String> },

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(datos_core::json))]
    Json(#[from] serde_json::Error),

    #[error("Unsupported JSON layout: {0}")]
    #[diagnostic(code(datos_core::json_layout))]
    JsonLayout(String),

    #[error("Unreadable {kind} workbook: {reason}")]
    #[diagnostic(code(datos_core::spreadsheet))]
    Spreadsheet { kind: &'static str, reason: String },

    #[error("Workbook has no worksheets")]
    #[diagnostic(code(datos_core::no_worksheet))]
    NoWorksheet,
}

/// Where a resolution gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The resource could not be fetched.
    Download,
    /// The body could not be written to the destination path.
    Save,
    /// The body was fetched but no decoder could read it.
    Decode,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Download => f.write_str("download"),
            FailureStage::Save => f.write_str("save"),
            FailureStage::Decode => f.write_str("parse"),
        }
    }
}

/// Why a resource could not be materialized.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("{stage} error for {url}: {reason}")]
#[diagnostic(code(datos_core::resolution_failed))]
pub struct ResolutionFailure {
    pub url: String,
    pub stage: FailureStage,
    pub reason: String,
}

impl ResolutionFailure {
    pub fn new(url: impl Into<String>, stage: FailureStage, reason: impl fmt::Display) -> Self {
        Self {
            url: url.into(),
            stage,
            reason: reason.to_string(),
        }
    }
}
