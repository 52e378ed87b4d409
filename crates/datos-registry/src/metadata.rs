//! Dataset and distribution records as served by the catalog API.
//!
//! The API is loose about shapes: multilingual fields arrive as a single
//! `{"_lang", "_value"}` object, an array of them, or a bare string; byte sizes
//! as numbers or numeric strings; formats as an object wrapping the MIME type.
//! Everything here deserializes leniently and missing keys become empty values.

use std::{collections::BTreeMap, fmt, path::Path};

use datos_core::{FailureStage, Materialization, ResolutionFailure, ResourceRef, Resolver};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A piece of text tagged with its language code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "Value")]
pub struct LangValue {
    #[serde(rename = "_lang")]
    pub lang: String,
    #[serde(rename = "_value")]
    pub value: String,
}

impl TryFrom<Value> for LangValue {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        match raw {
            Value::Object(mut map) => {
                Ok(Self {
                    lang: map.remove("_lang").and_then(scalar_text).unwrap_or_default(),
                    value: map.remove("_value").and_then(scalar_text).unwrap_or_default(),
                })
            }
            Value::Array(_) | Value::Null => Err(format!("not a language value: {raw}")),
            scalar => {
                Ok(Self {
                    lang: String::new(),
                    value: scalar_text(scalar).unwrap_or_default(),
                })
            }
        }
    }
}

/// Strings, numbers and booleans as text; anything else is dropped.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A single item or an array of them. Items of the wrong shape are skipped.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        item => vec![item],
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn empty_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Accepts a number or a numeric string; negatives and other shapes are `None`.
fn optional_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    fn from_float(f: f64) -> Option<u64> {
        (f >= 0.0 && f.is_finite()).then_some(f as u64)
    }

    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    })
}

/// `"format": {"value": "text/csv"}` becomes `Some("text/csv")`.
fn format_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let format = match Value::deserialize(deserializer)? {
        Value::Object(mut map) => map.remove("value"),
        plain => Some(plain),
    };

    Ok(match format {
        Some(Value::String(f)) if !f.is_empty() => Some(f),
        _ => None,
    })
}

pub(crate) fn by_language(entries: &[LangValue]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|entry| (entry.lang.clone(), entry.value.clone()))
        .collect()
}

/// Metadata record of a single dataset.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct DatasetMetadata {
    #[serde(rename = "_about", default, deserialize_with = "empty_is_none")]
    pub about: Option<String>,

    /// Link to the dataset on the publisher's own portal.
    #[serde(default, deserialize_with = "empty_is_none")]
    pub identifier: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub title: Vec<LangValue>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub description: Vec<LangValue>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub keyword: Vec<LangValue>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub distribution: Vec<Distribution>,
}

/// One downloadable form of a dataset.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Distribution {
    #[serde(rename = "accessURL", default, deserialize_with = "empty_is_none")]
    access_url: Option<String>,

    #[serde(rename = "byteSize", default, deserialize_with = "optional_number")]
    byte_size: Option<u64>,

    #[serde(default, deserialize_with = "format_value")]
    format: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    title: Vec<LangValue>,
}

impl Distribution {
    pub fn new(access_url: impl Into<String>, format: Option<&str>) -> Self {
        Self {
            access_url: Some(access_url.into()),
            format: format.map(String::from),
            ..Self::default()
        }
    }

    pub fn access_url(&self) -> Option<&str> {
        self.access_url.as_deref()
    }

    /// Advertised size in bytes.
    pub fn byte_size(&self) -> Option<u64> {
        self.byte_size
    }

    /// Advertised MIME type, e.g. `text/csv`.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Titles keyed by language code.
    pub fn titles(&self) -> BTreeMap<String, String> {
        by_language(&self.title)
    }

    /// The resource to hand to a [`Resolver`], if the distribution has an access URL.
    pub fn resource_ref(&self) -> Option<ResourceRef> {
        let url = self.access_url()?;
        let resource = ResourceRef::new(url);
        Some(match self.format() {
            Some(format) => resource.with_content_type(format),
            None => resource,
        })
    }

    /// Fetches the distribution, saving it to `output` when given.
    ///
    /// A distribution without an access URL resolves to a download failure.
    pub fn download(&self, resolver: &Resolver, output: Option<&Path>) -> Materialization {
        match self.resource_ref() {
            Some(resource) => resolver.resolve(&resource, output),
            None => {
                Materialization::ResolutionFailed(ResolutionFailure::new(
                    "",
                    FailureStage::Download,
                    "distribution has no access URL",
                ))
            }
        }
    }

    /// The distribution's content, or `None` when it has no access URL.
    pub fn data(&self, resolver: &Resolver) -> Option<Materialization> {
        self.resource_ref()
            .map(|resource| resolver.resolve(&resource, None))
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Distribution(accessURL={}, format={}, titles={:?})",
            self.access_url().unwrap_or("None"),
            self.format().unwrap_or("None"),
            self.titles()
        )
    }
}
