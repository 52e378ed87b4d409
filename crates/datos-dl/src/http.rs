use std::{fmt, io::Read, time::Duration};

use serde::de::DeserializeOwned;
use tracing::debug;
use ureq::{
    http::{
        header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE},
        Response, StatusCode,
    },
    Agent, Body,
};
use url::Url;

use crate::{
    error::{DownloadError, Result},
    http_client::{apply_headers, ClientConfig},
    types::FetchMode,
};

/// Upper bound on the buffer reserved up front from a `Content-Length` header.
const MAX_PREALLOC: u64 = 1 << 20;

/// Response body as requested through [`FetchMode`].
pub enum FetchBody {
    Stream(Box<dyn Read>),
    Buffered(Vec<u8>),
}

impl fmt::Debug for FetchBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchBody::Stream(_) => f.write_str("Stream(..)"),
            FetchBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
        }
    }
}

/// A successful (status 200) response.
#[derive(Debug)]
pub struct Fetched {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: FetchBody,
}

impl Fetched {
    /// Returns the whole body, draining the stream if the response was fetched
    /// in [`FetchMode::Stream`].
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self.body {
            FetchBody::Buffered(bytes) => Ok(bytes),
            FetchBody::Stream(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

/// Single-attempt HTTP GET client.
#[derive(Clone)]
pub struct Transport {
    agent: Agent,
    config: ClientConfig,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Transport {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            agent: config.build(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issues a GET request against `url`.
    ///
    /// Any status other than 200 is reported as [`DownloadError::HttpError`];
    /// DNS, TLS, connection and timeout faults as [`DownloadError::Network`].
    /// No retries are attempted.
    ///
    /// In [`FetchMode::Buffer`] the configured timeout also bounds reading the
    /// body. In [`FetchMode::Stream`] the body read is bounded by
    /// [`ClientConfig::stream_timeout`]. A fault while reading the body,
    /// timeouts included, surfaces as [`DownloadError::Io`].
    pub fn fetch(&self, url: &str, mode: FetchMode) -> Result<Fetched> {
        debug!(url = url, mode = ?mode, "fetching");

        let body_timeout = match mode {
            FetchMode::Stream => self.config.stream_timeout,
            FetchMode::Buffer => self.config.timeout,
        };
        let resp = self.get(url, None, body_timeout)?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(String::from);
        let content_length = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|h| h.to_str().ok())
            .and_then(|len| len.parse::<u64>().ok());

        let mut reader = resp.into_body().into_reader();
        let body = match mode {
            FetchMode::Stream => FetchBody::Stream(Box::new(reader)),
            FetchMode::Buffer => {
                // the header is only a hint; never trust it for the allocation
                let hint = content_length.unwrap_or(0).min(MAX_PREALLOC) as usize;
                let mut bytes = Vec::with_capacity(hint);
                reader.read_to_end(&mut bytes)?;
                FetchBody::Buffered(bytes)
            }
        };

        Ok(Fetched {
            status: StatusCode::OK.as_u16(),
            content_type,
            content_length,
            body,
        })
    }

    /// Fetches `url` asking for JSON and deserializes the buffered body.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "fetching json");

        let resp = self.get(url, Some("application/json"), self.config.timeout)?;

        let mut bytes = Vec::new();
        resp.into_body().into_reader().read_to_end(&mut bytes)?;

        serde_json::from_slice(&bytes).map_err(|source| {
            DownloadError::InvalidResponse {
                url: url.to_string(),
                source,
            }
        })
    }

    fn get(
        &self,
        url: &str,
        accept: Option<&str>,
        body_timeout: Option<Duration>,
    ) -> Result<Response<Body>> {
        Url::parse(url).map_err(|source| {
            DownloadError::InvalidUrl {
                url: url.to_string(),
                source,
            }
        })?;

        let mut req = apply_headers(self.agent.get(url), &self.config.headers);
        if let Some(accept) = accept {
            req = req.header(ACCEPT, accept);
        }

        let resp = req
            .config()
            .timeout_recv_body(body_timeout)
            .build()
            .call()?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(DownloadError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(resp)
    }
}
