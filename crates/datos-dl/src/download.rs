use std::{
    fs::{self, File},
    io::{ErrorKind, Read, Write as _},
    path::{Path, PathBuf},
};

use tracing::{debug, trace, warn};

use crate::{
    error::{DownloadError, Result},
    http::{FetchBody, Transport},
    types::{FetchMode, Progress, ProgressCallback},
};

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Streams a URL into a file on disk.
pub struct Download {
    pub url: String,
    pub output: PathBuf,
    pub chunk_size: usize,
    pub remove_partial: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl Download {
    /// Creates a download of `url` into `output` that overwrites any existing
    /// file, writes 1024-byte chunks and deletes the file again if the transfer
    /// fails part-way.
    ///
    /// # Examples
    ///
    /// ```
    /// use datos_dl::download::Download;
    ///
    /// let dl = Download::new("https://example.com/data.csv", "data.csv")
    ///     .chunk_size(4096);
    /// assert_eq!(dl.chunk_size, 4096);
    /// ```
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            remove_partial: true,
            on_progress: None,
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Keep (`false`) or delete (`true`) a truncated file after a failed transfer.
    pub fn remove_partial(mut self, remove_partial: bool) -> Self {
        self.remove_partial = remove_partial;
        self
    }

    /// Registers a callback invoked with `Progress` events during the transfer.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use datos_dl::{download::Download, types::Progress, Transport};
    ///
    /// let written = Download::new("https://example.com/file.xlsx", "file.xlsx")
    ///     .progress(|event: Progress| {
    ///         if let Progress::Complete { total } = event {
    ///             eprintln!("done: {total} bytes");
    ///         }
    ///     })
    ///     .execute(&Transport::default());
    /// ```
    pub fn progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Fetches the URL in streaming mode and writes the body to the output
    /// path, returning the number of bytes written.
    pub fn execute(self, transport: &Transport) -> Result<u64> {
        let fetched = transport.fetch(&self.url, FetchMode::Stream)?;
        let total = fetched.content_length.unwrap_or(0);

        let reader: Box<dyn Read> = match fetched.body {
            FetchBody::Stream(reader) => reader,
            FetchBody::Buffered(bytes) => Box::new(std::io::Cursor::new(bytes)),
        };

        self.write_from(reader, total)
    }

    /// Writes everything `reader` yields into the output path.
    pub fn write_from<R: Read>(&self, reader: R, total: u64) -> Result<u64> {
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                DownloadError::FileWrite {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }

        let result = self.copy_chunks(reader, total);

        if result.is_err() && self.remove_partial && self.output.exists() {
            warn!("removing partial download {}", self.output.display());
            if let Err(err) = fs::remove_file(&self.output) {
                warn!("failed to remove {}: {}", self.output.display(), err);
            }
        }

        result
    }

    fn copy_chunks<R: Read>(&self, mut reader: R, total: u64) -> Result<u64> {
        let mut file = File::create(&self.output).map_err(write_error(&self.output))?;

        if let Some(ref cb) = self.on_progress {
            cb(Progress::Starting {
                total,
            });
        }

        let mut buffer = vec![0u8; self.chunk_size];
        let mut downloaded = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };

            file.write_all(&buffer[..n])
                .map_err(write_error(&self.output))?;
            downloaded += n as u64;
            trace!(downloaded = downloaded, total = total, "chunk written");

            if let Some(ref cb) = self.on_progress {
                cb(Progress::Chunk {
                    current: downloaded,
                    total,
                });
            }
        }

        file.flush().map_err(write_error(&self.output))?;

        if let Some(ref cb) = self.on_progress {
            cb(Progress::Complete {
                total: downloaded,
            });
        }

        debug!(
            "saved {} bytes from {} to {}",
            downloaded,
            self.url,
            self.output.display()
        );
        Ok(downloaded)
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError {
    let path = path.to_path_buf();
    move |source| {
        DownloadError::FileWrite {
            path,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Cursor},
        sync::{Arc, Mutex},
    };

    use tempfile::tempdir;

    use super::*;

    /// Yields `data` and then fails like a reset connection.
    struct BrokenReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            Ok(n)
        }
    }

    /// Fails with `Interrupted` before every successful read.
    struct InterruptedReader {
        data: Cursor<Vec<u8>>,
        interrupt: bool,
    }

    impl Read for InterruptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn test_write_from_copies_all_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();

        let written = Download::new("https://example.com/out.bin", &path)
            .write_from(Cursor::new(data.clone()), data.len() as u64)
            .unwrap();

        assert_eq!(written, 5000);
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_write_from_retries_interrupted_reads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let written = Download::new("https://example.com/out.bin", &path)
            .chunk_size(100)
            .write_from(
                InterruptedReader {
                    data: Cursor::new(vec![3u8; 250]),
                    interrupt: false,
                },
                250,
            )
            .unwrap();

        assert_eq!(written, 250);
        assert_eq!(fs::read(&path).unwrap(), vec![3u8; 250]);
    }

    #[test]
    fn test_write_from_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "a much longer previous content").unwrap();

        Download::new("https://example.com/out.txt", &path)
            .write_from(Cursor::new(b"new".to_vec()), 3)
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_write_from_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.txt");

        Download::new("https://example.com/out.txt", &path)
            .write_from(Cursor::new(b"x".to_vec()), 1)
            .unwrap();

        assert!(path.is_file());
    }

    #[test]
    fn test_progress_events_in_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        Download::new("https://example.com/out.bin", &path)
            .progress(move |p| sink.lock().unwrap().push(p))
            .write_from(Cursor::new(vec![7u8; 2500]), 2500)
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            events.first(),
            Some(&Progress::Starting {
                total: 2500
            })
        );
        assert_eq!(
            events.last(),
            Some(&Progress::Complete {
                total: 2500
            })
        );
        let chunks = events
            .iter()
            .filter(|e| matches!(e, Progress::Chunk { .. }))
            .count();
        assert_eq!(chunks, 3);
    }

    #[test]
    fn test_failed_transfer_removes_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let result = Download::new("https://example.com/out.bin", &path).write_from(
            BrokenReader {
                data: Cursor::new(vec![1u8; 3000]),
            },
            0,
        );

        assert!(matches!(result, Err(DownloadError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_transfer_can_keep_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let result = Download::new("https://example.com/out.bin", &path)
            .remove_partial(false)
            .write_from(
                BrokenReader {
                    data: Cursor::new(vec![1u8; 3000]),
                },
                0,
            );

        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap().len(), 3000);
    }

    #[test]
    fn test_unwritable_destination_is_file_write_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let result = Download::new("https://example.com/x", blocker.join("out.bin"))
            .write_from(Cursor::new(b"x".to_vec()), 1);

        assert!(matches!(result, Err(DownloadError::FileWrite { .. })));
    }
}
