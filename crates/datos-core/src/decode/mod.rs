//! Decoders turning a fetched payload into a [`Table`].
//!
//! Which decoder runs is decided by the declared content-type alone, through a
//! case-sensitive prefix match against a fixed registry.

mod delimited;
mod json;
mod spreadsheet;

pub use delimited::{decode_delimited, detect_delimiter, TextEncoding, ENCODING_LADDER};
pub use json::{decode_json, table_from_json};
pub use spreadsheet::{decode_xls, decode_xlsx};

use tracing::debug;

use crate::{error::DecodeError, table::Table};

/// Content-type families with a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    DelimitedText,
    Json,
    LegacySpreadsheet,
    ModernSpreadsheet,
}

const REGISTRY: [(&str, Format); 4] = [
    ("text/csv", Format::DelimitedText),
    ("application/json", Format::Json),
    ("application/vnd.ms-excel", Format::LegacySpreadsheet),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Format::ModernSpreadsheet,
    ),
];

impl Format {
    /// Looks up the decoder for a content-type such as `text/csv; charset=utf-8`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(prefix, _)| content_type.starts_with(prefix))
            .map(|(_, format)| *format)
    }

    /// Whether this decoder re-downloads the access URL when
    /// `refetch_for_decode` is enabled. JSON always decodes the first body.
    pub fn reads_from_url(self) -> bool {
        !matches!(self, Format::Json)
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::DelimitedText => "delimited-text",
            Format::Json => "json",
            Format::LegacySpreadsheet => "xls",
            Format::ModernSpreadsheet => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Delimiter for delimited text; detected from the header line when `None`.
    pub csv_delimiter: Option<u8>,
}

pub fn decode(format: Format, bytes: &[u8], options: &DecodeOptions) -> Result<Table, DecodeError> {
    debug!(format = format.name(), size = bytes.len(), "decoding");

    match format {
        Format::DelimitedText => decode_delimited(bytes, options.csv_delimiter),
        Format::Json => decode_json(bytes),
        Format::LegacySpreadsheet => decode_xls(bytes),
        Format::ModernSpreadsheet => decode_xlsx(bytes),
    }
}
