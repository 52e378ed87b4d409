use std::path::PathBuf;

use crate::{error::ResolutionFailure, table::Table};

/// A remote resource to materialize: an access URL and, optionally, the
/// content-type the catalog advertises for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub url: String,
    pub declared_content_type: Option<String>,
}

impl ResourceRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            declared_content_type: None,
        }
    }

    /// Sets the declared content-type. An empty string counts as undeclared.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        self.declared_content_type = (!content_type.is_empty()).then_some(content_type);
        self
    }
}

/// The outcome of resolving a [`ResourceRef`]. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialization {
    /// The body was streamed to `path`; `size` bytes were written.
    SavedToFile { path: PathBuf, size: u64 },
    /// The body was decoded into a table.
    Table(Table),
    /// No decoder applies; the body as received.
    RawBytes(Vec<u8>),
    ResolutionFailed(ResolutionFailure),
}

impl Materialization {
    pub fn is_failure(&self) -> bool {
        matches!(self, Materialization::ResolutionFailed(_))
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Materialization::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            Materialization::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Materialization::RawBytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            Materialization::ResolutionFailed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Converts into a `Result`, treating every non-failure variant as success.
    pub fn into_result(self) -> Result<Self, ResolutionFailure> {
        match self {
            Materialization::ResolutionFailed(failure) => Err(failure),
            other => Ok(other),
        }
    }
}
