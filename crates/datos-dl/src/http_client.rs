use std::time::Duration;

use ureq::{http::HeaderMap, Agent, RequestBuilder};

/// User-Agent of a desktop browser, for publishers that reject library clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    /// Bounds connecting, waiting for the response head and reading a
    /// buffered body, each on its own.
    pub timeout: Option<Duration>,
    /// Bounds reading a streamed body, which may be a large file saved to disk.
    pub stream_timeout: Option<Duration>,
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    /// Identifies as `datosgobes/<version>`, follows up to 10 redirects,
    /// gives up on connect, response or buffered body after 10 seconds and on
    /// a streamed body after 10 minutes.
    ///
    /// # Examples
    ///
    /// ```
    /// use datos_dl::http_client::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert!(cfg.user_agent.as_deref().unwrap().starts_with("datosgobes/"));
    /// assert_eq!(cfg.max_redirects, 10);
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(concat!("datosgobes/", env!("CARGO_PKG_VERSION")).into()),
            headers: None,
            timeout: Some(Duration::from_secs(10)),
            stream_timeout: Some(Duration::from_secs(600)),
            max_redirects: 10,
        }
    }
}

impl ClientConfig {
    pub fn with_browser_user_agent(mut self) -> Self {
        self.user_agent = Some(BROWSER_USER_AGENT.to_string());
        self
    }

    /// Builds an HTTP `Agent` configured from this `ClientConfig`.
    ///
    /// Non-2xx statuses are returned as responses rather than errors so the
    /// transport can report the status code and URL itself. Body read limits
    /// depend on the fetch mode and are set per request by the transport.
    pub fn build(&self) -> Agent {
        let mut config = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(self.max_redirects)
            .timeout_connect(self.timeout)
            .timeout_recv_response(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// Apply headers from an optional `HeaderMap` to a `RequestBuilder`.
pub(crate) fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    headers: &Option<HeaderMap>,
) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}
