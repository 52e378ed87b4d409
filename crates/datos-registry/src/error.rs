//! Error types for the registry crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while walking the catalog or reading dataset metadata.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    #[diagnostic(
        code(datos_registry::download),
        help("Check your network connection and the `api_url` setting")
    )]
    Download(#[from] datos_dl::DownloadError),

    #[error(transparent)]
    #[diagnostic(
        code(datos_registry::json),
        help("The catalog answered with a document of an unexpected shape")
    )]
    Json(#[from] serde_json::Error),

    #[error("Missing field `{0}` in catalog response")]
    #[diagnostic(code(datos_registry::missing_field))]
    MissingField(&'static str),

    #[error("No dataset found for `{0}`")]
    #[diagnostic(
        code(datos_registry::empty_result),
        help("Dataset identifiers are the last path segment of the dataset URL")
    )]
    EmptyResult(String),

    #[error("Invalid URL: {0}")]
    #[diagnostic(
        code(datos_registry::invalid_url),
        help("Ensure the URL is valid and properly formatted")
    )]
    InvalidUrl(String),
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::MissingField("result.next");
        assert_eq!(err.to_string(), "Missing field `result.next` in catalog response");

        let err = RegistryError::EmptyResult("l01280796-paro".into());
        assert_eq!(err.to_string(), "No dataset found for `l01280796-paro`");

        let err = RegistryError::InvalidUrl("bad-url".to_string());
        assert_eq!(err.to_string(), "Invalid URL: bad-url");
    }

    #[test]
    fn test_from_download_error() {
        let err: RegistryError = datos_dl::DownloadError::HttpError {
            status: 503,
            url: "http://datos.gob.es/apidata/catalog/dataset.json".into(),
        }
        .into();
        assert!(matches!(err, RegistryError::Download(_)));
        assert!(err.to_string().contains("503"));
    }
}
