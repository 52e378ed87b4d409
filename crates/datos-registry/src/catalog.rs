//! Paginated access to the catalog's dataset listing and title search.

use datos_config::Config;
use datos_core::config::transport_from_config;
use datos_dl::Transport;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::{
    dataset::Dataset,
    error::{RegistryError, Result},
    metadata::DatasetMetadata,
};

/// Characters escaped in a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Client for the catalog endpoints of the API.
#[derive(Clone)]
pub struct Catalog {
    transport: Transport,
    api_url: String,
    guard_next_page: bool,
}

impl Catalog {
    pub fn new(transport: Transport, api_url: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into();
        Url::parse(&api_url).map_err(|err| RegistryError::InvalidUrl(format!("{api_url}: {err}")))?;

        Ok(Self {
            transport,
            api_url: api_url.trim_end_matches('/').to_string(),
            guard_next_page: true,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(transport_from_config(config), &config.api_url)?
            .guard_next_page(config.guard_next_page()))
    }

    /// With `false`, a page without a `result.next` key is an error instead
    /// of the end of the listing.
    pub fn guard_next_page(mut self, guard: bool) -> Self {
        self.guard_next_page = guard;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Lists datasets starting at page `start_page`, reading at most
    /// `pages_limit` pages (all remaining pages when `None`).
    pub fn list_datasets(&self, start_page: usize, pages_limit: Option<usize>) -> Result<Vec<Dataset>> {
        let url = format!("{}/catalog/dataset.json?_page={start_page}", self.api_url);
        self.walk(url, pages_limit)
    }

    /// Datasets whose title matches `query`.
    pub fn search_datasets(
        &self,
        query: &str,
        start_page: usize,
        pages_limit: Option<usize>,
    ) -> Result<Vec<Dataset>> {
        let url = format!(
            "{}/catalog/dataset/title/{}.json?_page={start_page}",
            self.api_url,
            utf8_percent_encode(query, SEGMENT)
        );
        self.walk(url, pages_limit)
    }

    /// Fetches the metadata record of dataset `id`.
    pub fn fetch_metadata(&self, id: &str) -> Result<DatasetMetadata> {
        let url = self.dataset_url(id);
        let mut page: Value = self.transport.json(&url)?;

        let item = page
            .pointer_mut("/result/items/0")
            .map(Value::take)
            .ok_or_else(|| RegistryError::EmptyResult(id.to_string()))?;

        Ok(serde_json::from_value(item)?)
    }

    /// The dataset `id` with its metadata loaded.
    pub fn get_dataset(&self, id: &str) -> Result<Dataset> {
        let metadata = self.fetch_metadata(id)?;
        Ok(Dataset::from_url(self.dataset_url(id)).with_metadata(metadata))
    }

    fn dataset_url(&self, id: &str) -> String {
        format!(
            "{}/catalog/dataset/{}",
            self.api_url,
            utf8_percent_encode(id, SEGMENT)
        )
    }

    fn walk(&self, first_url: String, pages_limit: Option<usize>) -> Result<Vec<Dataset>> {
        let mut datasets = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if pages_limit.is_some_and(|limit| pages >= limit) {
                break;
            }

            let page: Value = self.transport.json(&url)?;
            let result = page
                .get("result")
                .ok_or(RegistryError::MissingField("result"))?;
            let items = result
                .get("items")
                .and_then(Value::as_array)
                .ok_or(RegistryError::MissingField("result.items"))?;

            for item in items {
                datasets.push(Dataset::from_item(item)?);
            }
            pages += 1;
            debug!(url = %url, items = items.len(), "catalog page read");

            next = match result.get("next") {
                Some(Value::String(next)) if !next.is_empty() => Some(next.clone()),
                Some(_) => None,
                None if self.guard_next_page => None,
                None => return Err(RegistryError::MissingField("result.next")),
            };
        }

        info!("read {} datasets from {} page(s)", datasets.len(), pages);
        Ok(datasets)
    }
}
