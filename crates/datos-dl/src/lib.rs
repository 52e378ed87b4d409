//! Blocking HTTP transport used to fetch catalog pages and distribution files.
//!
//! A [`http::Transport`] performs single-attempt GET requests, either handing
//! back a streaming reader or a fully buffered body, and [`download::Download`]
//! streams a response body into a file in fixed-size chunks.

pub mod download;
pub mod error;
pub mod http;
pub mod http_client;
pub mod types;

pub use error::DownloadError;
pub use http::{FetchBody, Fetched, Transport};
pub use http_client::{ClientConfig, BROWSER_USER_AGENT};
pub use types::{FetchMode, Progress};
