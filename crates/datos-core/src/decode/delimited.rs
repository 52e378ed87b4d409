use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use tracing::{debug, trace};

use crate::{
    error::DecodeError,
    table::{Cell, Table},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimiters considered by [`detect_delimiter`], in order of preference.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Character encodings tried for delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Windows1252,
    Utf16,
}

/// Order in which encodings are tried; the first that decodes and parses wins.
pub const ENCODING_LADDER: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
    TextEncoding::Utf16,
];

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "cp1252",
            TextEncoding::Utf16 => "utf-16",
        }
    }

    /// Decodes `bytes` without replacement characters, or `None` when the
    /// bytes are not text in this encoding.
    ///
    /// Latin-1 is strict ISO-8859-1: the C1 range 0x80-0x9F is rejected so that
    /// Windows-1252 files (curly quotes, euro sign) reach the next rung. Any
    /// decoded text holding NUL is rejected, which is what UTF-16 looks like
    /// through a single-byte encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        let text: Cow<'_, str> = match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                UTF_8.decode_without_bom_handling_and_without_replacement(bytes)?
            }
            TextEncoding::Latin1 => {
                if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
                    return None;
                }
                Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
            }
            TextEncoding::Windows1252 => {
                WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)?
            }
            TextEncoding::Utf16 => {
                let (encoding, bom_len) = match Encoding::for_bom(bytes) {
                    Some((encoding, len)) if encoding != UTF_8 => (encoding, len),
                    _ => (sniff_utf16(bytes)?, 0),
                };
                encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])?
            }
        };

        if text.contains('\0') {
            return None;
        }
        Some(text.into_owned())
    }
}

/// Guesses the byte order of BOM-less UTF-16 from where NUL bytes fall.
/// Input without any NUL is left to the single-byte encodings.
fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    let (even, odd) = bytes
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == 0)
        .fold((0usize, 0usize), |(even, odd), (i, _)| {
            if i % 2 == 0 {
                (even + 1, odd)
            } else {
                (even, odd + 1)
            }
        });

    match (even, odd) {
        (0, 0) => None,
        (even, odd) if even > odd => Some(UTF_16BE),
        _ => Some(UTF_16LE),
    }
}

/// Parses delimited text, walking [`ENCODING_LADDER`] until one encoding both
/// decodes the bytes and yields a well-formed table.
pub fn decode_delimited(bytes: &[u8], delimiter: Option<u8>) -> Result<Table, DecodeError> {
    let mut attempts = Vec::with_capacity(ENCODING_LADDER.len());

    for encoding in ENCODING_LADDER {
        let Some(text) = encoding.decode(bytes) else {
            trace!(encoding = encoding.name(), "not valid text");
            attempts.push(format!("{}: invalid byte sequence", encoding.name()));
            continue;
        };

        match parse_delimited(&text, delimiter) {
            Ok(table) => {
                debug!(
                    encoding = encoding.name(),
                    rows = table.shape().0,
                    columns = table.shape().1,
                    "parsed delimited text"
                );
                return Ok(table);
            }
            Err(err) => {
                trace!(encoding = encoding.name(), error = %err, "parse failed");
                attempts.push(format!("{}: {err}", encoding.name()));
            }
        }
    }

    Err(DecodeError::EncodingLadderExhausted {
        attempts,
    })
}

/// Picks the candidate delimiter occurring most often in the first line,
/// ignoring quoted sections. Falls back to a comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut quoted = false;
    for byte in header.bytes() {
        if byte == b'"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == byte) {
            counts[i] += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .map(|(i, _)| CANDIDATE_DELIMITERS[i])
        .unwrap_or(b',')
}

fn parse_delimited(text: &str, delimiter: Option<u8>) -> Result<Table, DecodeError> {
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(text));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = records.next().ok_or(DecodeError::NoColumns)??;
    let mut table = Table::new(header.iter());

    for record in records {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(table.shape().0 + 2);
        table.push_row(record.iter().map(Cell::infer).collect(), line)?;
    }

    Ok(table)
}
