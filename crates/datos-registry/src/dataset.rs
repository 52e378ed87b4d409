use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde_json::Value;
use tracing::trace;

use crate::{
    error::{RegistryError, Result},
    metadata::{by_language, DatasetMetadata, Distribution},
};

/// A dataset of the catalog, identified by the last segment of its URL.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: String,
    url: String,
    metadata: Option<DatasetMetadata>,
}

impl Dataset {
    /// A dataset known only by its URL; metadata accessors return empty values
    /// until metadata is attached with [`Dataset::with_metadata`].
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let id = url.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id,
            url,
            metadata: None,
        }
    }

    /// Builds a dataset from one item of a catalog listing.
    ///
    /// The item must carry its `_about` URL; everything else is optional.
    pub fn from_item(item: &Value) -> Result<Self> {
        let about = item
            .get("_about")
            .and_then(Value::as_str)
            .ok_or(RegistryError::MissingField("_about"))?;

        let metadata: DatasetMetadata = serde_json::from_value(item.clone())?;
        trace!(url = about, "dataset from listing item");

        Ok(Self::from_url(about).with_metadata(metadata))
    }

    pub fn with_metadata(mut self, metadata: DatasetMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn metadata(&self) -> Option<&DatasetMetadata> {
        self.metadata.as_ref()
    }

    /// Link to the dataset on the publisher's portal.
    pub fn publisher_data_url(&self) -> Option<&str> {
        self.metadata.as_ref()?.identifier.as_deref()
    }

    /// Titles keyed by language code.
    pub fn title(&self) -> BTreeMap<String, String> {
        self.metadata
            .as_ref()
            .map(|m| by_language(&m.title))
            .unwrap_or_default()
    }

    /// Descriptions keyed by language code.
    pub fn description(&self) -> BTreeMap<String, String> {
        self.metadata
            .as_ref()
            .map(|m| by_language(&m.description))
            .unwrap_or_default()
    }

    /// Keywords grouped by language, without duplicates, in sorted order.
    pub fn keywords(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in self.metadata.iter().flat_map(|m| &m.keyword) {
            grouped
                .entry(entry.lang.clone())
                .or_default()
                .insert(entry.value.clone());
        }

        grouped
            .into_iter()
            .map(|(lang, words)| (lang, words.into_iter().collect()))
            .collect()
    }

    pub fn distributions(&self) -> &[Distribution] {
        self.metadata
            .as_ref()
            .map(|m| m.distribution.as_slice())
            .unwrap_or_default()
    }

    /// Distributions whose advertised format is exactly `format`.
    pub fn distributions_by_format(&self, format: &str) -> Vec<&Distribution> {
        self.distributions()
            .iter()
            .filter(|d| d.format() == Some(format))
            .collect()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenDataSet('{}')", self.id)
    }
}
