//! Bridges the shared [`Config`] to the transport and resolver settings.

use datos_config::Config;
use datos_dl::{ClientConfig, Transport};

use crate::{decode::DecodeOptions, resolver::ResolverOptions};

/// HTTP client settings derived from the configuration.
///
/// An explicit `user_agent` wins over `browser_user_agent`; with neither set
/// the library's own User-Agent is sent.
pub fn client_config(config: &Config) -> ClientConfig {
    let mut client = ClientConfig {
        timeout: config.timeout(),
        max_redirects: config.max_redirects(),
        ..ClientConfig::default()
    };

    if let Some(user_agent) = config.user_agent() {
        client.user_agent = Some(user_agent.to_string());
    } else if config.browser_user_agent() {
        client = client.with_browser_user_agent();
    }

    client
}

pub fn transport_from_config(config: &Config) -> Transport {
    Transport::new(client_config(config))
}

impl From<&Config> for ResolverOptions {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size(),
            refetch_for_decode: config.refetch_for_decode(),
            trust_response_content_type: config.trust_response_content_type(),
            remove_partial_downloads: config.remove_partial_downloads(),
            decode: DecodeOptions {
                csv_delimiter: config.csv_delimiter(),
            },
        }
    }
}
