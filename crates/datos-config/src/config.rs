use std::{fs, path::Path, path::PathBuf, time::Duration};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};
use url::Url;

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
    utils::{xdg_config_home, DEFAULT_API_URL},
};

/// Settings shared by the catalog walker, the transport and the content resolver.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Base URL of the catalog API.
    /// Default: http://datos.gob.es/apidata
    pub api_url: String,

    /// Connect and response timeout in seconds. Set to 0 to wait forever.
    /// Default: 10
    pub timeout: Option<u64>,

    /// User-Agent header sent with every request.
    /// Takes precedence over `browser_user_agent`.
    pub user_agent: Option<String>,

    /// Send a browser-like User-Agent. Some publishers answer 403 to
    /// non-browser clients.
    /// Default: false
    pub browser_user_agent: Option<bool>,

    /// Maximum number of redirects followed per request.
    /// Default: 10
    pub max_redirects: Option<u32>,

    /// Size in bytes of the chunks written when saving a distribution to disk.
    /// Default: 1024
    pub chunk_size: Option<usize>,

    /// Download the access URL a second time before decoding CSV and
    /// spreadsheet distributions instead of reusing the first response body.
    /// Default: false
    pub refetch_for_decode: Option<bool>,

    /// Fall back to the response Content-Type when a distribution declares no format.
    /// Default: false
    pub trust_response_content_type: Option<bool>,

    /// Field delimiter for delimited text. Detected from the header line when unset.
    pub csv_delimiter: Option<String>,

    /// Delete a partially written file when a download fails mid-way.
    /// Default: true
    pub remove_partial_downloads: Option<bool>,

    /// Stop paginating when a catalog page has no `next` key instead of failing.
    /// Default: true
    pub guard_next_page: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Location of the configuration file: `$DATOS_CONFIG`, or
/// `$XDG_CONFIG_HOME/datos/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("DATOS_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("datos").join("config.toml"),
    }
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Some(10),
            user_agent: None,
            browser_user_agent: Some(false),
            max_redirects: Some(10),
            chunk_size: Some(1024),
            refetch_for_decode: Some(false),
            trust_response_content_type: Some(false),
            csv_delimiter: None,
            remove_partial_downloads: Some(true),
            guard_next_page: Some(true),
        }
    }

    /// Loads the configuration from [`config_path`]. A missing file yields the
    /// default configuration.
    pub fn new() -> Result<Self> {
        Self::from_path(config_path())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;
        Ok(config)
    }

    /// Validates the configuration and fills unset options with their defaults.
    pub fn resolve(&mut self) -> Result<()> {
        Url::parse(&self.api_url).map_err(|err| {
            ConfigError::InvalidApiUrl(format!("{}: {err}", self.api_url))
        })?;
        self.api_url = self.api_url.trim_end_matches('/').to_string();

        if self.chunk_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size",
                reason: "must be greater than zero".into(),
            });
        }

        if let Some(delimiter) = &self.csv_delimiter {
            if delimiter.len() != 1 {
                return Err(ConfigError::InvalidValue {
                    field: "csv_delimiter",
                    reason: format!("expected a single ASCII character, got {delimiter:?}"),
                });
            }
        }

        self.timeout.get_or_insert(10);
        self.browser_user_agent.get_or_insert(false);
        self.max_redirects.get_or_insert(10);
        self.chunk_size.get_or_insert(1024);
        self.refetch_for_decode.get_or_insert(false);
        self.trust_response_content_type.get_or_insert(false);
        self.remove_partial_downloads.get_or_insert(true);
        self.guard_next_page.get_or_insert(true);

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout.unwrap_or(10) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref().filter(|ua| !ua.is_empty())
    }

    pub fn browser_user_agent(&self) -> bool {
        self.browser_user_agent.unwrap_or(false)
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects.unwrap_or(10)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.filter(|&n| n > 0).unwrap_or(1024)
    }

    pub fn refetch_for_decode(&self) -> bool {
        self.refetch_for_decode.unwrap_or(false)
    }

    pub fn trust_response_content_type(&self) -> bool {
        self.trust_response_content_type.unwrap_or(false)
    }

    pub fn csv_delimiter(&self) -> Option<u8> {
        self.csv_delimiter
            .as_deref()
            .and_then(|d| d.as_bytes().first().copied())
    }

    pub fn remove_partial_downloads(&self) -> bool {
        self.remove_partial_downloads.unwrap_or(true)
    }

    pub fn guard_next_page(&self) -> bool {
        self.guard_next_page.unwrap_or(true)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;
        annotate_toml_table::<Config>(doc.as_table_mut())?;
        Ok(doc)
    }
}

/// Writes the default configuration, annotated with field documentation, to `path`.
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(
            path.display().to_string(),
        ));
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        path.display()
    );
    Ok(())
}
