use std::{fmt::Display, path::Path, sync::Arc};

use datos_config::Config;
use datos_dl::{
    download::{Download, DEFAULT_CHUNK_SIZE},
    DownloadError, FetchMode, Fetched, Progress, Transport,
};
use tracing::{debug, info, warn};

use crate::{
    config::transport_from_config,
    decode::{decode, DecodeOptions, Format},
    error::{FailureStage, ResolutionFailure},
    resource::{Materialization, ResourceRef},
};

/// Knobs of a [`Resolver`], usually taken from a [`Config`].
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Chunk size used when streaming to disk.
    pub chunk_size: usize,
    /// Download the URL again before running the delimited-text or
    /// spreadsheet decoders instead of decoding the first body.
    pub refetch_for_decode: bool,
    /// Use the response Content-Type when the resource declares none.
    pub trust_response_content_type: bool,
    /// Delete the destination file when a save fails part-way.
    pub remove_partial_downloads: bool,
    pub decode: DecodeOptions,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            refetch_for_decode: false,
            trust_response_content_type: false,
            remove_partial_downloads: true,
            decode: DecodeOptions::default(),
        }
    }
}

type SharedProgress = Arc<dyn Fn(Progress) + Send + Sync>;

/// Decides how a remote resource is materialized and carries it out.
///
/// A resolver holds no per-call state, so one instance can serve any number
/// of resources, from any number of threads.
#[derive(Clone, Default)]
pub struct Resolver {
    transport: Transport,
    options: ResolverOptions,
    on_progress: Option<SharedProgress>,
}

impl Resolver {
    pub fn new(transport: Transport, options: ResolverOptions) -> Self {
        Self {
            transport,
            options,
            on_progress: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(transport_from_config(config), ResolverOptions::from(config))
    }

    /// Reports download progress while saving to a file.
    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Materializes `resource`.
    ///
    /// With a `save_path` the body is streamed to that file and no decoding
    /// happens. Otherwise the body is buffered; if the content-type maps to a
    /// decoder the result is a [`Materialization::Table`], else the raw bytes.
    ///
    /// Never panics and never returns an error: every failure is reported as
    /// [`Materialization::ResolutionFailed`] naming the stage that failed.
    pub fn resolve(&self, resource: &ResourceRef, save_path: Option<&Path>) -> Materialization {
        match save_path {
            Some(path) => self.save(resource, path),
            None => self.materialize(resource),
        }
    }

    fn save(&self, resource: &ResourceRef, path: &Path) -> Materialization {
        let on_progress = self.on_progress.clone().map(|cb| {
            Box::new(move |event: Progress| cb(event)) as Box<dyn Fn(Progress) + Send + Sync>
        });

        let result = Download::new(&resource.url, path)
            .chunk_size(self.options.chunk_size)
            .remove_partial(self.options.remove_partial_downloads)
            .with_progress(on_progress)
            .execute(&self.transport);

        match result {
            Ok(size) => {
                info!("saved {} ({} bytes) to {}", resource.url, size, path.display());
                Materialization::SavedToFile {
                    path: path.to_path_buf(),
                    size,
                }
            }
            Err(err @ DownloadError::FileWrite { .. }) => {
                self.fail(resource, FailureStage::Save, err)
            }
            Err(err) => self.fail(resource, FailureStage::Download, err),
        }
    }

    fn materialize(&self, resource: &ResourceRef) -> Materialization {
        let fetched = match self.transport.fetch(&resource.url, FetchMode::Buffer) {
            Ok(fetched) => fetched,
            Err(err) => return self.fail(resource, FailureStage::Download, err),
        };

        let content_type = match &resource.declared_content_type {
            Some(declared) => Some(declared.clone()),
            None if self.options.trust_response_content_type => fetched.content_type.clone(),
            None => None,
        };

        let body = match fetched.into_bytes() {
            Ok(body) => body,
            Err(err) => return self.fail(resource, FailureStage::Download, err),
        };

        let Some(format) = content_type.as_deref().and_then(Format::from_content_type) else {
            debug!(
                url = %resource.url,
                content_type = content_type.as_deref().unwrap_or("<none>"),
                "no decoder, returning raw bytes"
            );
            return Materialization::RawBytes(body);
        };

        let bytes = if self.options.refetch_for_decode && format.reads_from_url() {
            debug!(url = %resource.url, "re-fetching for {}", format.name());
            match self
                .transport
                .fetch(&resource.url, FetchMode::Buffer)
                .and_then(Fetched::into_bytes)
            {
                Ok(bytes) => bytes,
                Err(err) => return self.fail(resource, FailureStage::Download, err),
            }
        } else {
            body
        };

        match decode(format, &bytes, &self.options.decode) {
            Ok(table) => Materialization::Table(table),
            Err(err) => self.fail(resource, FailureStage::Decode, err),
        }
    }

    fn fail(&self, resource: &ResourceRef, stage: FailureStage, reason: impl Display) -> Materialization {
        let failure = ResolutionFailure::new(&resource.url, stage, reason);
        warn!("{failure}");
        Materialization::ResolutionFailed(failure)
    }
}
